//! # Contacts Common Library
//!
//! Shared code for the contacts service:
//! - Error types
//! - Configuration resolution
//! - Record store (SQLite schema and queries)
//! - Change channel transports

pub mod channel;
pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
