//! Change publisher
//!
//! Fire-and-forget "contacts changed" signal. The publish is bounded by a
//! timeout and its failure is only logged, so an unreachable channel never
//! blocks or fails the mutation that triggered it.

use contacts_common::channel::ChangeChannel;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on a single publish
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct ChangePublisher {
    channel: Arc<dyn ChangeChannel>,
    timeout: Duration,
}

impl ChangePublisher {
    pub fn new(channel: Arc<dyn ChangeChannel>) -> Self {
        Self::with_timeout(channel, DEFAULT_PUBLISH_TIMEOUT)
    }

    pub fn with_timeout(channel: Arc<dyn ChangeChannel>, timeout: Duration) -> Self {
        Self { channel, timeout }
    }

    /// Signal that contact data changed
    ///
    /// Returns whether the signal was handed to the transport.
    pub async fn notify_changed(&self) -> bool {
        match tokio::time::timeout(self.timeout, self.channel.publish()).await {
            Ok(Ok(())) => {
                debug!("Change signal published on '{}'", self.channel.name());
                true
            }
            Ok(Err(e)) => {
                warn!("Dropping change signal on '{}': {}", self.channel.name(), e);
                false
            }
            Err(_) => {
                warn!(
                    "Dropping change signal on '{}': publish timed out after {:?}",
                    self.channel.name(),
                    self.timeout
                );
                false
            }
        }
    }
}
