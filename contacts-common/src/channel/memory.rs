//! In-process change channel
//!
//! Publishing bumps a generation counter held in a `tokio::sync::watch`
//! cell. Each subscription tracks the last generation it saw.

use super::{ChangeChannel, ChangeSubscription};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::debug;

pub struct MemoryChannel {
    name: String,
    tx: watch::Sender<u64>,
    closed: AtomicBool,
}

impl MemoryChannel {
    pub fn new(name: &str) -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            name: name.to_string(),
            tx,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ChangeChannel for MemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Channel(format!("channel '{}' is closed", self.name)));
        }
        // send_modify updates the value even with no live receivers
        self.tx.send_modify(|generation| *generation = generation.wrapping_add(1));
        debug!("Published change signal on '{}'", self.name);
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn ChangeSubscription>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Channel(format!("channel '{}' is closed", self.name)));
        }
        let mut rx = self.tx.subscribe();
        rx.borrow_and_update();
        Ok(Box::new(MemorySubscription { rx }))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

struct MemorySubscription {
    rx: watch::Receiver<u64>,
}

#[async_trait]
impl ChangeSubscription for MemorySubscription {
    async fn poll(&mut self) -> Result<bool> {
        let pending = self
            .rx
            .has_changed()
            .map_err(|_| Error::Channel("channel dropped".to_string()))?;
        if pending {
            self.rx.borrow_and_update();
        }
        Ok(pending)
    }
}
