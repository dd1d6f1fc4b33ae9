//! Live contact updates: subscriber registry, change relay, snapshot payload

pub mod registry;
pub mod relay;
pub mod snapshot;

pub use registry::{BroadcastReport, Subscriber, SubscriberFeed, SubscriberRegistry};
pub use relay::{ChangeRelay, RelayHandle, DEFAULT_POLL_INTERVAL};
pub use snapshot::{current_snapshot, encode_snapshot, Snapshot};
