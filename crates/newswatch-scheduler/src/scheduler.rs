//! The scheduler facade: capacity gating, eligibility selection, queue
//! management, completion, and stale-job reaping.
//!
//! All state lives in the shared stores; the scheduler itself holds no
//! mutable state and every method is safe to call from many processes
//! concurrently. The clock is always an explicit parameter so tests control
//! time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use newswatch_core::scheduling::{effective_next_eligible, next_run_after, select_candidates};
use newswatch_core::{
    FillReport, JobStatus, JobStore, KeywordStore, QueueStats, Result, SchedulingPolicy, SearchJob,
};
use newswatch_db::Database;

/// Decides when and how often a keyword search may run.
///
/// One fill pass runs the capacity gate, the eligibility selector, and the
/// queue manager in order; workers claim batches with [`dequeue`] and report
/// back through [`complete`]; a periodic sweep calls [`reap_stale`].
///
/// [`dequeue`]: SearchScheduler::dequeue
/// [`complete`]: SearchScheduler::complete
/// [`reap_stale`]: SearchScheduler::reap_stale
pub struct SearchScheduler {
    keywords: Arc<dyn KeywordStore>,
    jobs: Arc<dyn JobStore>,
    policy: SchedulingPolicy,
}

impl SearchScheduler {
    /// Create a scheduler over explicit store implementations.
    pub fn new(
        keywords: Arc<dyn KeywordStore>,
        jobs: Arc<dyn JobStore>,
        policy: SchedulingPolicy,
    ) -> Self {
        Self {
            keywords,
            jobs,
            policy,
        }
    }

    /// Create a scheduler backed by the Postgres stores.
    pub fn from_database(db: &Database, policy: SchedulingPolicy) -> Self {
        Self::new(
            Arc::new(db.keywords.clone()),
            Arc::new(db.jobs.clone()),
            policy,
        )
    }

    /// The policy this scheduler was constructed with.
    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    /// The keyword store (worker-side keyword resolution).
    pub fn keywords(&self) -> &Arc<dyn KeywordStore> {
        &self.keywords
    }

    /// The job store (reporting surface).
    pub fn jobs(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }

    /// Run one scheduling pass: capacity gate, eligibility selection, then
    /// deduplicated enqueueing.
    ///
    /// Admission is bounded by `min(batch_size, daily_cap − pending jobs
    /// created in the rolling day)`. At zero remaining capacity this is a
    /// no-op with no writes; that is the backpressure mechanism against the
    /// external search dependency, not an error. Each inserted job advances
    /// the keyword's `next_eligible_at` immediately, so a second pass cannot
    /// re-select a keyword whose job has not yet executed.
    pub async fn fill_queue(&self, now: DateTime<Utc>) -> Result<FillReport> {
        if !self.policy.enabled {
            debug!(
                subsystem = "scheduler",
                op = "fill_queue",
                "Scheduler disabled, skipping fill pass"
            );
            return Ok(FillReport::default());
        }

        let pending = self
            .jobs
            .pending_created_since(now - self.policy.cap_window())
            .await?;
        let remaining = (self.policy.daily_cap - pending).max(0);
        if remaining == 0 {
            info!(
                subsystem = "scheduler",
                component = "capacity_gate",
                op = "fill_queue",
                pending_jobs = pending,
                "Queue already at daily capacity"
            );
            return Ok(FillReport {
                queued: 0,
                pending_jobs: pending,
                requested: 0,
                candidates: 0,
            });
        }

        let limit = remaining.min(self.policy.batch_size);
        let eligible = self.keywords.load_eligible(&self.policy, now, limit).await?;
        let candidates = select_candidates(&eligible, &self.policy, now, limit as usize);

        let mut queued = 0i64;
        for candidate in &candidates {
            let inserted = self
                .jobs
                .insert_if_absent(
                    candidate.keyword_id,
                    candidate.scheduled_at,
                    candidate.priority,
                    now,
                )
                .await?;

            if let Some(job_id) = inserted {
                // Advance the cooldown clock at enqueue time, not at
                // completion: a later pass must not re-select this keyword
                // before its job has even run.
                self.keywords
                    .set_next_eligible(
                        candidate.keyword_id,
                        next_run_after(now, self.policy.cooldown_minutes),
                    )
                    .await?;
                queued += 1;
                debug!(
                    subsystem = "scheduler",
                    component = "queue_manager",
                    job_id = %job_id,
                    keyword_id = %candidate.keyword_id,
                    priority = candidate.priority,
                    "Queued keyword search"
                );
            }
        }

        info!(
            subsystem = "scheduler",
            op = "fill_queue",
            queued,
            pending_jobs = pending + queued,
            requested = limit,
            candidates = candidates.len(),
            "Fill pass complete"
        );

        Ok(FillReport {
            queued,
            pending_jobs: pending + queued,
            requested: limit,
            candidates: candidates.len() as i64,
        })
    }

    /// Claim up to `limit` due jobs for exclusive execution.
    ///
    /// The effective limit is clamped to the policy batch size. Claimed jobs
    /// come back in priority-then-age order; across concurrent callers no
    /// global order is guaranteed, but no job is ever returned twice.
    pub async fn dequeue(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<SearchJob>> {
        if !self.policy.enabled {
            return Ok(Vec::new());
        }
        let limit = limit.min(self.policy.batch_size);
        if limit <= 0 {
            return Ok(Vec::new());
        }
        self.jobs.claim_batch(limit, now).await
    }

    /// Finalize a claimed job.
    ///
    /// Failures re-pend with the policy's fixed retry backoff until the
    /// attempt budget is spent, then transition to `failed`. Deliberately
    /// not gated on `enabled`: a flag flipped mid-flight must not strand
    /// claimed jobs.
    pub async fn complete(
        &self,
        job_id: Uuid,
        success: bool,
        error: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<JobStatus> {
        let retry_at = now + self.policy.retry_delay();
        let status = self.jobs.complete(job_id, success, error, retry_at, now).await?;
        debug!(
            subsystem = "scheduler",
            component = "completion",
            job_id = %job_id,
            success,
            status = ?status,
            "Job finalized"
        );
        Ok(status)
    }

    /// Fail a job permanently, bypassing the retry budget.
    ///
    /// Used when retrying cannot help, e.g. the keyword was deleted after
    /// enqueue.
    pub async fn fail_permanently(
        &self,
        job_id: Uuid,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        warn!(
            subsystem = "scheduler",
            component = "completion",
            job_id = %job_id,
            error,
            "Failing job permanently"
        );
        self.jobs.fail_permanently(job_id, error, now).await
    }

    /// Reset jobs abandoned by crashed or hung workers.
    ///
    /// A job is stale once it has sat `running` past the policy threshold;
    /// there is no heartbeat channel, so this is the sole recovery
    /// mechanism for lost workers.
    pub async fn reap_stale(&self, now: DateTime<Utc>) -> Result<u64> {
        if !self.policy.enabled {
            return Ok(0);
        }
        let cutoff = now - self.policy.stale_window();
        let reset = self.jobs.reap_stale(cutoff, now).await?;
        if reset > 0 {
            info!(
                subsystem = "scheduler",
                component = "reaper",
                op = "reap_stale",
                result_count = reset,
                "Reset stale jobs to pending"
            );
        }
        Ok(reset)
    }

    /// Out-of-band immediate enqueue, bypassing the periodic eligibility
    /// scan, the daily cap, and the priority floor.
    ///
    /// Cooldown still applies: a keyword searched within its window is
    /// skipped, as is a keyword with an active job. Works even when the
    /// scheduler is disabled. Returns the number of jobs inserted.
    pub async fn enqueue_specific(
        &self,
        keyword_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let mut queued = 0i64;
        for &keyword_id in keyword_ids {
            let Some(keyword) = self.keywords.get(keyword_id).await? else {
                warn!(
                    subsystem = "scheduler",
                    component = "queue_manager",
                    keyword_id = %keyword_id,
                    "Keyword missing, skipping immediate enqueue"
                );
                continue;
            };

            if effective_next_eligible(&keyword, self.policy.cooldown_minutes) > now {
                debug!(
                    subsystem = "scheduler",
                    component = "queue_manager",
                    keyword_id = %keyword_id,
                    "Keyword still in cooldown, skipping immediate enqueue"
                );
                continue;
            }

            let inserted = self
                .jobs
                .insert_if_absent(keyword_id, now, keyword.priority, now)
                .await?;
            if inserted.is_some() {
                self.keywords
                    .set_next_eligible(
                        keyword_id,
                        next_run_after(now, self.policy.cooldown_minutes),
                    )
                    .await?;
                queued += 1;
            }
        }

        info!(
            subsystem = "scheduler",
            op = "enqueue_specific",
            requested = keyword_ids.len(),
            queued,
            "Immediate enqueue complete"
        );
        Ok(queued)
    }

    /// Queue statistics for the reporting surface.
    pub async fn stats(&self) -> Result<QueueStats> {
        self.jobs.stats().await
    }
}
