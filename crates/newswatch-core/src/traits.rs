//! Repository traits at the store boundary.
//!
//! The scheduler logic is written against these traits so it can be unit
//! tested over in-memory stores. Every mutation is a single short
//! transaction in the implementing store; callers never hold locks across
//! calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{JobStatus, Keyword, QueueStats, Result, SchedulingPolicy, SearchJob};

/// Read/write access to the keyword table's scheduling fields.
///
/// Keyword CRUD itself is owned elsewhere; this trait covers only what the
/// scheduler needs.
#[async_trait]
pub trait KeywordStore: Send + Sync {
    /// Fetch a keyword by id.
    async fn get(&self, keyword_id: Uuid) -> Result<Option<Keyword>>;

    /// Load keywords eligible for scheduling at `now` under `policy`,
    /// ordered priority descending then least-recently-searched first
    /// (never-searched first), bounded by `limit`.
    async fn load_eligible(
        &self,
        policy: &SchedulingPolicy,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Keyword>>;

    /// Advance the keyword's cooldown clock. Called at enqueue time.
    async fn set_next_eligible(
        &self,
        keyword_id: Uuid,
        next_eligible_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Record that a search actually ran: stamps `last_searched_at`,
    /// advances `next_eligible_at` and increments the search counter.
    async fn mark_searched(
        &self,
        keyword_id: Uuid,
        now: DateTime<Utc>,
        next_eligible_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Durable job queue operations.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a pending job for `keyword_id` unless one is already pending
    /// or running for that keyword. Returns the new job id, or `None` when
    /// deduplicated. Check and insert are one atomic statement.
    async fn insert_if_absent(
        &self,
        keyword_id: Uuid,
        scheduled_at: DateTime<Utc>,
        priority: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>>;

    /// Atomically claim up to `limit` due pending jobs for exclusive
    /// execution, ordered priority descending then `scheduled_at` ascending.
    ///
    /// Rows locked by a concurrent claim are skipped, not waited on. Each
    /// claimed job transitions to `running` with `attempts` incremented and
    /// `last_attempt_at = now` inside the same transaction; two concurrent
    /// callers never receive the same job.
    async fn claim_batch(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<SearchJob>>;

    /// Finalize an attempt. Success transitions to `completed` and clears
    /// the error. Failure re-pends the job at `retry_at` while attempts
    /// remain, otherwise transitions to `failed`. Returns the resulting
    /// status.
    async fn complete(
        &self,
        job_id: Uuid,
        success: bool,
        error: Option<&str>,
        retry_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<JobStatus>;

    /// Fail a job permanently, regardless of remaining attempts.
    async fn fail_permanently(&self, job_id: Uuid, error: &str, now: DateTime<Utc>) -> Result<()>;

    /// Reset `running` jobs whose `last_attempt_at` predates `cutoff` back
    /// to `pending` with `scheduled_at = now`. The stuck attempt already
    /// counted; `attempts` is not incremented again. Returns the count.
    async fn reap_stale(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Result<u64>;

    /// Count pending jobs created at or after `since` (the rolling capacity
    /// window).
    async fn pending_created_since(&self, since: DateTime<Utc>) -> Result<i64>;

    /// Fetch a job by id.
    async fn get(&self, job_id: Uuid) -> Result<Option<SearchJob>>;

    /// All jobs for a keyword, newest first. Answers "why hasn't X been
    /// searched".
    async fn for_keyword(&self, keyword_id: Uuid) -> Result<Vec<SearchJob>>;

    /// Queue statistics for the reporting surface.
    async fn stats(&self) -> Result<QueueStats>;
}
