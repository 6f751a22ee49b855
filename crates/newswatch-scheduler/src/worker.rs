//! Search worker: claims due jobs, runs the external search, reports back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use newswatch_core::{defaults, scheduling, Result, SearchJob};

use crate::executor::SearchExecutor;
use crate::scheduler::SearchScheduler;

/// Configuration for the search worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when the queue is empty.
    pub poll_interval_ms: u64,
    /// Maximum number of concurrent search executions.
    pub max_concurrent: usize,
    /// Per-job execution timeout in seconds.
    pub job_timeout_secs: u64,
    /// Whether to process jobs at all.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            max_concurrent: defaults::WORKER_MAX_CONCURRENT,
            job_timeout_secs: defaults::JOB_TIMEOUT_SECS,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SEARCH_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `SEARCH_WORKER_MAX_CONCURRENT` | `4` | Max concurrent searches |
    /// | `SEARCH_WORKER_POLL_INTERVAL_MS` | `500` | Polling interval when idle |
    /// | `SEARCH_WORKER_JOB_TIMEOUT_SECS` | `300` | Per-job timeout |
    pub fn from_env() -> Self {
        let enabled = std::env::var("SEARCH_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent = std::env::var("SEARCH_WORKER_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::WORKER_MAX_CONCURRENT)
            .max(1);

        let poll_interval_ms = std::env::var("SEARCH_WORKER_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::POLL_INTERVAL_MS);

        let job_timeout_secs = std::env::var("SEARCH_WORKER_JOB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_TIMEOUT_SECS);

        Self {
            poll_interval_ms,
            max_concurrent,
            job_timeout_secs,
            enabled,
        }
    }

    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set maximum concurrent searches.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Set the per-job timeout in seconds.
    pub fn with_job_timeout(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the search worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job was claimed and its search started.
    JobStarted { job_id: Uuid, keyword_id: Uuid },
    /// A job completed successfully.
    JobCompleted {
        job_id: Uuid,
        keyword_id: Uuid,
        articles_found: u32,
    },
    /// A job attempt failed (it may still be retried).
    JobFailed {
        job_id: Uuid,
        keyword_id: Uuid,
        error: String,
    },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx.send(()).await.map_err(|_| {
            newswatch_core::Error::Internal("Failed to send shutdown signal".into())
        })?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that claims search jobs and runs them through the executor.
///
/// Many workers (in the same or different processes) may run against the
/// same store; the skip-locked claim inside the scheduler guarantees no job
/// is executed twice. A worker that dies mid-job leaves it `running` for
/// the stale-job reaper.
pub struct SearchWorker {
    scheduler: Arc<SearchScheduler>,
    executor: Arc<dyn SearchExecutor>,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl SearchWorker {
    /// Create a new search worker.
    pub fn new(
        scheduler: Arc<SearchScheduler>,
        executor: Arc<dyn SearchExecutor>,
        config: WorkerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            scheduler,
            executor,
            config,
            event_tx,
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Run the worker loop.
    ///
    /// Claims up to `max_concurrent` due jobs per pass and executes them
    /// concurrently; sleeps only when the queue is empty.
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!(
                subsystem = "worker",
                "Search worker is disabled, not starting"
            );
            return;
        }

        info!(
            subsystem = "worker",
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent,
            "Search worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!(subsystem = "worker", "Search worker received shutdown signal");
                break;
            }

            let batch = match self
                .scheduler
                .dequeue(self.config.max_concurrent as i64, Utc::now())
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    error!(subsystem = "worker", error = ?e, "Failed to claim job batch");
                    Vec::new()
                }
            };

            if batch.is_empty() {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(subsystem = "worker", "Search worker received shutdown signal");
                        break;
                    }
                    _ = sleep(poll_interval) => {}
                }
                continue;
            }

            debug!(
                subsystem = "worker",
                result_count = batch.len(),
                "Processing claimed batch"
            );

            let mut tasks = tokio::task::JoinSet::new();
            for job in batch {
                let runner = self.clone_refs();
                tasks.spawn(async move {
                    runner.execute_job(job).await;
                });
            }
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    error!(subsystem = "worker", error = ?e, "Search task panicked");
                }
            }
            // No sleep: immediately try to claim more work.
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!(subsystem = "worker", "Search worker stopped");
    }

    fn clone_refs(&self) -> WorkerRef {
        WorkerRef {
            scheduler: self.scheduler.clone(),
            executor: self.executor.clone(),
            event_tx: self.event_tx.clone(),
            job_timeout: Duration::from_secs(self.config.job_timeout_secs),
        }
    }
}

/// Reference bundle for executing a single job in a spawned task.
struct WorkerRef {
    scheduler: Arc<SearchScheduler>,
    executor: Arc<dyn SearchExecutor>,
    event_tx: broadcast::Sender<WorkerEvent>,
    job_timeout: Duration,
}

impl WorkerRef {
    /// Execute a single claimed job end to end.
    async fn execute_job(self, job: SearchJob) {
        let start = Instant::now();
        let job_id = job.id;
        let keyword_id = job.keyword_id;

        info!(
            subsystem = "worker",
            job_id = %job_id,
            keyword_id = %keyword_id,
            attempt = job.attempts,
            "Executing search job"
        );
        let _ = self
            .event_tx
            .send(WorkerEvent::JobStarted { job_id, keyword_id });

        let keyword = match self.scheduler.keywords().get(keyword_id).await {
            Ok(Some(keyword)) => keyword,
            Ok(None) => {
                // The keyword was deleted after enqueue. Retrying cannot
                // help, so exhaust the budget immediately.
                warn!(
                    subsystem = "worker",
                    job_id = %job_id,
                    keyword_id = %keyword_id,
                    "Keyword missing at execution time"
                );
                if let Err(e) = self
                    .scheduler
                    .fail_permanently(job_id, "keyword_missing", Utc::now())
                    .await
                {
                    error!(subsystem = "worker", job_id = %job_id, error = ?e,
                           "Failed to record keyword_missing failure");
                }
                let _ = self.event_tx.send(WorkerEvent::JobFailed {
                    job_id,
                    keyword_id,
                    error: "keyword_missing".to_string(),
                });
                return;
            }
            Err(e) => {
                // Store hiccup: finalize as a retryable failure. The job is
                // still `running` if even that fails, and the reaper will
                // recover it.
                error!(subsystem = "worker", job_id = %job_id, error = ?e,
                       "Keyword lookup failed");
                self.finalize_failure(job_id, keyword_id, &format!("keyword lookup failed: {e}"))
                    .await;
                return;
            }
        };

        let outcome = tokio::time::timeout(self.job_timeout, self.executor.search(&keyword)).await;

        match outcome {
            Ok(Ok(outcome)) => {
                let now = Utc::now();
                let next_eligible = scheduling::next_run_after(
                    now,
                    self.scheduler.policy().cooldown_minutes,
                );
                if let Err(e) = self
                    .scheduler
                    .keywords()
                    .mark_searched(keyword_id, now, next_eligible)
                    .await
                {
                    error!(subsystem = "worker", keyword_id = %keyword_id, error = ?e,
                           "Failed to record search completion on keyword");
                }
                match self.scheduler.complete(job_id, true, None, now).await {
                    Ok(_) => {
                        info!(
                            subsystem = "worker",
                            job_id = %job_id,
                            keyword_id = %keyword_id,
                            articles_found = outcome.articles_found,
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Search job completed"
                        );
                        let _ = self.event_tx.send(WorkerEvent::JobCompleted {
                            job_id,
                            keyword_id,
                            articles_found: outcome.articles_found,
                        });
                    }
                    Err(e) => {
                        error!(subsystem = "worker", job_id = %job_id, error = ?e,
                               "Failed to finalize completed job");
                    }
                }
            }
            Ok(Err(e)) => {
                self.finalize_failure(job_id, keyword_id, &e.to_string()).await;
            }
            Err(_) => {
                let message = format!(
                    "search timed out after {}s",
                    self.job_timeout.as_secs()
                );
                warn!(
                    subsystem = "worker",
                    job_id = %job_id,
                    keyword_id = %keyword_id,
                    "{message}"
                );
                self.finalize_failure(job_id, keyword_id, &message).await;
            }
        }
    }

    async fn finalize_failure(&self, job_id: Uuid, keyword_id: Uuid, message: &str) {
        match self
            .scheduler
            .complete(job_id, false, Some(message), Utc::now())
            .await
        {
            Ok(status) => {
                warn!(
                    subsystem = "worker",
                    job_id = %job_id,
                    keyword_id = %keyword_id,
                    status = ?status,
                    error = message,
                    "Search job attempt failed"
                );
            }
            Err(e) => {
                error!(subsystem = "worker", job_id = %job_id, error = ?e,
                       "Failed to finalize failed job");
            }
        }
        let _ = self.event_tx.send(WorkerEvent::JobFailed {
            job_id,
            keyword_id,
            error: message.to_string(),
        });
    }
}
