//! Change relay
//!
//! Background task bridging the change channel to live subscribers. Every
//! poll interval it checks its subscription for a pending signal; when one
//! (or several) arrived it re-reads the whole contact list and broadcasts it.
//! Sending the full list instead of a diff means subscribers converge to the
//! same state without any merge protocol. Intermediate states between two
//! polls may never be broadcast.
//!
//! A failed poll or cycle is logged and the loop keeps going. The task ends
//! only through its cancellation token.

use super::registry::{BroadcastReport, SubscriberRegistry};
use super::snapshot::current_snapshot;
use contacts_common::channel::{ChangeChannel, ChangeSubscription};
use contacts_common::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default interval between channel polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ChangeRelay {
    db: SqlitePool,
    channel: Arc<dyn ChangeChannel>,
    registry: Arc<SubscriberRegistry>,
    poll_interval: Duration,
}

/// Running relay task
pub struct RelayHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl RelayHandle {
    /// Cancel the relay and wait until the task has stopped
    pub async fn shutdown(self) {
        info!("Canceling change relay");
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            error!("Change relay task failed: {}", e);
        }
        info!("Change relay stopped");
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl ChangeRelay {
    pub fn new(
        db: SqlitePool,
        channel: Arc<dyn ChangeChannel>,
        registry: Arc<SubscriberRegistry>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            db,
            channel,
            registry,
            poll_interval,
        }
    }

    /// Subscribe to the channel and start the relay loop
    ///
    /// Subscribing happens before this returns, so a mutation committed after
    /// `spawn` is guaranteed to be observed. The loop stops when `cancel` is
    /// cancelled.
    pub async fn spawn(self, cancel: CancellationToken) -> Result<RelayHandle> {
        let subscription = self.channel.subscribe().await?;
        info!(
            "Change relay subscribed to '{}', polling every {:?}",
            self.channel.name(),
            self.poll_interval
        );

        let token = cancel.clone();
        let join = tokio::spawn(async move { self.run(subscription, token).await });

        Ok(RelayHandle { cancel, join })
    }

    async fn run(self, mut subscription: Box<dyn ChangeSubscription>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            match subscription.poll().await {
                Ok(true) => match self.relay_cycle().await {
                    Ok(report) => debug!(
                        "Relayed contact snapshot: {} delivered, {} pruned",
                        report.delivered, report.pruned
                    ),
                    Err(e) => warn!("Change relay cycle failed: {}", e),
                },
                Ok(false) => {}
                Err(e) => warn!("Change relay poll failed: {}", e),
            }
        }
        debug!("Change relay loop exited");
    }

    /// Re-read the contact list and broadcast it to every subscriber
    pub async fn relay_cycle(&self) -> Result<BroadcastReport> {
        let snapshot = current_snapshot(&self.db).await?;
        Ok(self.registry.broadcast(snapshot))
    }
}
