//! Periodic full sync.

use super::Synchronizer;
use crate::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::{error, info, warn};

/// Handle to a running batch sync task.
pub struct BatchSyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl BatchSyncHandle {
    /// Stop the task, waiting for an in-flight run to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("batch sync task ended abnormally: {e}");
        }
    }
}

/// Run [`Synchronizer::sync_all_tables`] every `period`.
///
/// The first run happens one period after start. Ticks missed while a run is
/// in progress are skipped, so runs never overlap.
pub fn start_batch_sync(sync: Arc<Synchronizer>, period: Duration) -> BatchSyncHandle {
    let (shutdown, mut stop_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;
        info!(every_secs = period.as_secs_f64(), "batch sync scheduled");

        loop {
            tokio::select! {
                _ = ticker.tick() => match sync.sync_all_tables().await {
                    Ok(summary) => {
                        if summary.log.tables_failed > 0 {
                            warn!(failed = summary.log.tables_failed, "batch sync finished with failures");
                        }
                    }
                    Err(Error::SyncInProgress) => warn!("batch sync skipped: a run is already in progress"),
                    Err(e) => error!("batch sync error: {e}"),
                },
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("batch sync stopped");
    });
    BatchSyncHandle { shutdown, task }
}
