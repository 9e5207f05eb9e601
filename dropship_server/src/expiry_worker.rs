use std::time::Duration as StdDuration;

use chrono::Duration;
use dropship_engine::{db_types::Order, events::EventProducers, OrderFlowApi, SqliteDatabase};
use log::*;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

#[derive(Debug, Clone, Copy)]
pub struct ExpiryConfig {
    pub hold_timeout: Duration,
    pub auto_complete_timeout: Option<Duration>,
    pub interval: StdDuration,
}

/// Handle to a running expiry worker. Dropping the handle also stops the worker, but only [`Self::shutdown`] waits for
/// an in-flight sweep to finish.
pub struct ExpiryWorker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ExpiryWorker {
    /// Signals the worker to stop after the current sweep.
    pub fn stop(&self) {
        if self.shutdown.send(true).is_err() {
            debug!("🕰️ Expiry worker had already exited");
        }
    }

    /// Stops the worker and waits for it to exit.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.handle.await {
            error!("🕰️ Expiry worker did not shut down cleanly. {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Starts the expiry worker. It sweeps overdue orders every `config.interval`, starting immediately, until it is
/// stopped.
pub fn start_expiry_worker(db: SqliteDatabase, producers: EventProducers, config: ExpiryConfig) -> ExpiryWorker {
    let (shutdown, mut stop_signal) = watch::channel(false);
    let handle = tokio::spawn(async move {
        let mut timer = tokio::time::interval(config.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let api = OrderFlowApi::new(db, producers);
        info!("🕰️ Overdue order expiry worker started");
        loop {
            tokio::select! {
                _ = stop_signal.changed() => break,
                _ = timer.tick() => run_sweep(&api, &config).await,
            }
        }
        info!("🕰️ Overdue order expiry worker has stopped");
    });
    ExpiryWorker { shutdown, handle }
}

async fn run_sweep(api: &OrderFlowApi<SqliteDatabase>, config: &ExpiryConfig) {
    trace!("🕰️ Running overdue order expiry job");
    match api.expire_overdue_orders(config.hold_timeout, config.auto_complete_timeout).await {
        Ok(result) if result.is_empty() => trace!("🕰️ No overdue orders"),
        Ok(result) => {
            info!(
                "🕰️ {} on-hold orders cancelled, {} shipped orders completed, {} failures",
                result.cancelled.len(),
                result.completed.len(),
                result.failures
            );
            debug!("🕰️ Cancelled orders: {}", order_list(&result.cancelled));
            debug!("🕰️ Completed orders: {}", order_list(&result.completed));
        },
        Err(e) => {
            error!("🕰️ Error running overdue order expiry job: {e}");
        },
    }
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] user: {} total: {}", o.id, o.user_id, o.total))
        .collect::<Vec<String>>()
        .join(", ")
}
