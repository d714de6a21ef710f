//! Periodic event lifecycle sweep.
//!
//! Each tick opens CLOSED events whose window `[start_time, end_time)`
//! contains "now" and deletes events whose `end_time` has passed. A failed
//! tick is logged and retried on the next one.

use std::{sync::Arc, time::Duration};

use log::{error, info};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    db::{DbError, Store, SweepCounts},
};

#[derive(Clone)]
pub struct Sweeper {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self { store, clock, interval }
    }

    pub async fn tick(&self) -> Result<SweepCounts, DbError> {
        let now = self.clock.now();
        let opened = self.store.open_started_events(now).await?;
        let deleted = self.store.delete_expired_events(now).await?;
        Ok(SweepCounts { opened, deleted })
    }

    /// Spawns the sweep loop; the first tick runs immediately.
    pub fn start(self) -> SweepHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("event sweep started, every {:?}", self.interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => match self.tick().await {
                        Ok(counts) => info!(
                            "sweep: opened {} events, deleted {} events",
                            counts.opened, counts.deleted
                        ),
                        Err(err) => error!("sweep failed: {}", err),
                    },
                }
            }
            info!("event sweep stopped");
        });
        SweepHandle { cancel, task }
    }
}

pub struct SweepHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Cancels the loop and waits for the in-flight tick, if any.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            error!("sweep task ended abnormally: {}", err);
        }
    }
}
