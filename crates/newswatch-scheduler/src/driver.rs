//! Periodic driver: the external timer collaborator.
//!
//! The scheduler core is purely reactive; this loop is the thing that calls
//! `fill_queue` and `reap_stale` on a cadence. Deployments with their own
//! cron-like trigger can skip it entirely.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info};

use newswatch_core::{defaults, Result};

use crate::scheduler::SearchScheduler;

/// Configuration for the periodic driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Interval between queue-fill passes.
    pub fill_interval: Duration,
    /// Interval between stale-job sweeps.
    pub reap_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            fill_interval: Duration::from_secs(defaults::FILL_INTERVAL_SECS),
            reap_interval: Duration::from_secs(defaults::REAP_INTERVAL_SECS),
        }
    }
}

impl DriverConfig {
    /// Set the queue-fill interval.
    pub fn with_fill_interval(mut self, interval: Duration) -> Self {
        self.fill_interval = interval;
        self
    }

    /// Set the stale-job sweep interval.
    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }
}

/// Handle for controlling a running driver.
pub struct DriverHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl DriverHandle {
    /// Signal the driver to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx.send(()).await.map_err(|_| {
            newswatch_core::Error::Internal("Failed to send shutdown signal".into())
        })?;
        Ok(())
    }
}

/// Start the periodic driver and return a handle for control.
pub fn start(scheduler: Arc<SearchScheduler>, config: DriverConfig) -> DriverHandle {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        info!(
            subsystem = "driver",
            fill_interval_secs = config.fill_interval.as_secs(),
            reap_interval_secs = config.reap_interval.as_secs(),
            "Scheduler driver started"
        );

        let mut fill_tick = tokio::time::interval(config.fill_interval);
        let mut reap_tick = tokio::time::interval(config.reap_interval);
        // The first tick of each interval fires immediately.

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(subsystem = "driver", "Scheduler driver received shutdown signal");
                    break;
                }
                _ = fill_tick.tick() => {
                    match scheduler.fill_queue(Utc::now()).await {
                        Ok(report) => {
                            info!(
                                subsystem = "driver",
                                op = "fill_queue",
                                queued = report.queued,
                                pending_jobs = report.pending_jobs,
                                "Periodic fill pass"
                            );
                        }
                        Err(e) => {
                            error!(subsystem = "driver", error = ?e, "Periodic fill pass failed");
                        }
                    }
                }
                _ = reap_tick.tick() => {
                    match scheduler.reap_stale(Utc::now()).await {
                        Ok(reset) if reset > 0 => {
                            info!(
                                subsystem = "driver",
                                op = "reap_stale",
                                result_count = reset,
                                "Periodic stale sweep"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(subsystem = "driver", error = ?e, "Periodic stale sweep failed");
                        }
                    }
                }
            }
        }

        info!(subsystem = "driver", "Scheduler driver stopped");
    });

    DriverHandle { shutdown_tx }
}
