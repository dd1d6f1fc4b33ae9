//! Change channel: a named pub/sub transport that only signals "state changed"
//!
//! Signals carry no payload. A subscription is level-triggered: `poll()`
//! reports whether at least one signal arrived since the previous poll, so a
//! burst of publishes collapses into a single observation.
//!
//! Transports are selected by connection string:
//! - `memory://` - in-process, single instance
//! - `sqlite://path` / `sqlite:path` - shared across processes through a
//!   `change_signals` table

use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryChannel;
pub use sqlite::SqliteChannel;

/// Name of the channel carrying contact change signals
pub const CONTACT_CHANGES: &str = "contact_changes";

/// Publish side and subscription factory of a change channel
#[async_trait]
pub trait ChangeChannel: Send + Sync {
    /// Channel name
    fn name(&self) -> &str;

    /// Publish one change signal
    async fn publish(&self) -> Result<()>;

    /// Subscribe to signals published from now on
    async fn subscribe(&self) -> Result<Box<dyn ChangeSubscription>>;

    /// Release transport resources; later publishes fail
    async fn close(&self);
}

/// Receiving side of a change channel
#[async_trait]
pub trait ChangeSubscription: Send {
    /// `true` if at least one signal arrived since the last poll
    async fn poll(&mut self) -> Result<bool>;
}

/// Open the transport named by `url` for channel `name`
pub async fn connect(url: &str, name: &str) -> Result<Arc<dyn ChangeChannel>> {
    if url.starts_with("memory:") {
        return Ok(Arc::new(MemoryChannel::new(name)));
    }
    if url.starts_with("sqlite:") {
        return Ok(Arc::new(SqliteChannel::connect(url, name).await?));
    }
    Err(Error::Config(format!(
        "Unsupported change channel URL '{}' (expected memory:// or sqlite://)",
        url
    )))
}
