//! Service layer: contact operations and their post-commit side effects

pub mod contacts;
pub mod history_recorder;
pub mod publisher;

pub use contacts::ContactService;
pub use history_recorder::HistoryRecorder;
pub use publisher::ChangePublisher;
