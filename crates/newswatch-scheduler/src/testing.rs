//! In-memory store implementations for tests.
//!
//! These mirror the Postgres stores' transition semantics over a single
//! mutex, so scheduler and worker behavior can be exercised without a live
//! database. Always compiled so integration tests (in `tests/`) can use
//! them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use newswatch_core::scheduling::{compare_candidates, is_eligible};
use newswatch_core::{
    new_v7, Error, JobStatus, JobStore, Keyword, KeywordStore, QueueStats, Result,
    SchedulingPolicy, SearchJob,
};

/// In-memory [`KeywordStore`].
#[derive(Clone, Default)]
pub struct MemoryKeywordStore {
    inner: Arc<Mutex<HashMap<Uuid, Keyword>>>,
}

impl MemoryKeywordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a keyword with the given scheduling fields, returning its id.
    pub async fn add(
        &self,
        term: &str,
        priority: i32,
        last_searched_at: Option<DateTime<Utc>>,
        next_eligible_at: Option<DateTime<Utc>>,
    ) -> Uuid {
        let now = Utc::now();
        let keyword = Keyword {
            id: new_v7(),
            term: term.to_string(),
            priority,
            last_searched_at,
            next_eligible_at,
            search_count: 0,
            created_at: now,
            updated_at: now,
        };
        let id = keyword.id;
        self.inner.lock().await.insert(id, keyword);
        id
    }

    /// Remove a keyword (simulates deletion by the CRUD layer).
    pub async fn remove(&self, keyword_id: Uuid) {
        self.inner.lock().await.remove(&keyword_id);
    }

    /// Snapshot a keyword's current state.
    pub async fn snapshot(&self, keyword_id: Uuid) -> Option<Keyword> {
        self.inner.lock().await.get(&keyword_id).cloned()
    }
}

#[async_trait]
impl KeywordStore for MemoryKeywordStore {
    async fn get(&self, keyword_id: Uuid) -> Result<Option<Keyword>> {
        Ok(self.inner.lock().await.get(&keyword_id).cloned())
    }

    async fn load_eligible(
        &self,
        policy: &SchedulingPolicy,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Keyword>> {
        let map = self.inner.lock().await;
        let mut eligible: Vec<Keyword> = map
            .values()
            .filter(|k| is_eligible(k, policy, now))
            .cloned()
            .collect();
        eligible.sort_by(compare_candidates);
        eligible.truncate(limit.max(0) as usize);
        Ok(eligible)
    }

    async fn set_next_eligible(
        &self,
        keyword_id: Uuid,
        next_eligible_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut map = self.inner.lock().await;
        let keyword = map
            .get_mut(&keyword_id)
            .ok_or(Error::KeywordNotFound(keyword_id))?;
        keyword.next_eligible_at = Some(next_eligible_at);
        keyword.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_searched(
        &self,
        keyword_id: Uuid,
        now: DateTime<Utc>,
        next_eligible_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut map = self.inner.lock().await;
        let keyword = map
            .get_mut(&keyword_id)
            .ok_or(Error::KeywordNotFound(keyword_id))?;
        keyword.last_searched_at = Some(now);
        keyword.next_eligible_at = Some(next_eligible_at);
        keyword.search_count += 1;
        keyword.updated_at = now;
        Ok(())
    }
}

/// In-memory [`JobStore`].
///
/// A single async mutex stands in for the database's row locks: each method
/// holds it for the whole transition, so concurrent claimants see the same
/// atomicity as `FOR UPDATE SKIP LOCKED`.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    inner: Arc<Mutex<HashMap<Uuid, SearchJob>>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot a job's current state.
    pub async fn snapshot(&self, job_id: Uuid) -> Option<SearchJob> {
        self.inner.lock().await.get(&job_id).cloned()
    }

    /// All jobs, unordered.
    pub async fn all(&self) -> Vec<SearchJob> {
        self.inner.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_if_absent(
        &self,
        keyword_id: Uuid,
        scheduled_at: DateTime<Utc>,
        priority: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>> {
        let mut map = self.inner.lock().await;
        let active_exists = map.values().any(|j| {
            j.keyword_id == keyword_id
                && matches!(j.status, JobStatus::Pending | JobStatus::Running)
        });
        if active_exists {
            return Ok(None);
        }

        let job = SearchJob {
            id: new_v7(),
            keyword_id,
            scheduled_at,
            priority,
            attempts: 0,
            max_attempts: newswatch_core::defaults::JOB_MAX_ATTEMPTS,
            status: JobStatus::Pending,
            last_attempt_at: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        let id = job.id;
        map.insert(id, job);
        Ok(Some(id))
    }

    async fn claim_batch(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<SearchJob>> {
        let mut map = self.inner.lock().await;
        let mut due: Vec<Uuid> = map
            .values()
            .filter(|j| j.status == JobStatus::Pending && j.scheduled_at <= now)
            .map(|j| j.id)
            .collect();
        due.sort_by(|a, b| {
            let ja = &map[a];
            let jb = &map[b];
            jb.priority
                .cmp(&ja.priority)
                .then(ja.scheduled_at.cmp(&jb.scheduled_at))
        });
        due.truncate(limit.max(0) as usize);

        let mut claimed = Vec::with_capacity(due.len());
        for id in due {
            if let Some(job) = map.get_mut(&id) {
                job.status = JobStatus::Running;
                job.attempts += 1;
                job.last_attempt_at = Some(now);
                job.updated_at = now;
                claimed.push(job.clone());
            }
        }
        Ok(claimed)
    }

    async fn complete(
        &self,
        job_id: Uuid,
        success: bool,
        error: Option<&str>,
        retry_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<JobStatus> {
        let mut map = self.inner.lock().await;
        let job = map.get_mut(&job_id).ok_or(Error::JobNotFound(job_id))?;

        if success {
            job.status = JobStatus::Completed;
            job.error = None;
        } else if job.attempts >= job.max_attempts {
            job.status = JobStatus::Failed;
            job.error = error.map(String::from);
        } else {
            job.status = JobStatus::Pending;
            job.scheduled_at = retry_at;
            job.error = error.map(String::from);
        }
        job.updated_at = now;
        Ok(job.status)
    }

    async fn fail_permanently(&self, job_id: Uuid, error: &str, now: DateTime<Utc>) -> Result<()> {
        let mut map = self.inner.lock().await;
        let job = map.get_mut(&job_id).ok_or(Error::JobNotFound(job_id))?;
        job.status = JobStatus::Failed;
        job.error = Some(error.to_string());
        job.updated_at = now;
        Ok(())
    }

    async fn reap_stale(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Result<u64> {
        let mut map = self.inner.lock().await;
        let mut reset = 0u64;
        for job in map.values_mut() {
            let stale = job.status == JobStatus::Running
                && job.last_attempt_at.is_some_and(|t| t < cutoff);
            if stale {
                job.status = JobStatus::Pending;
                job.scheduled_at = now;
                job.updated_at = now;
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn pending_created_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let map = self.inner.lock().await;
        Ok(map
            .values()
            .filter(|j| j.status == JobStatus::Pending && j.created_at >= since)
            .count() as i64)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<SearchJob>> {
        Ok(self.inner.lock().await.get(&job_id).cloned())
    }

    async fn for_keyword(&self, keyword_id: Uuid) -> Result<Vec<SearchJob>> {
        let map = self.inner.lock().await;
        let mut jobs: Vec<SearchJob> = map
            .values()
            .filter(|j| j.keyword_id == keyword_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let map = self.inner.lock().await;
        let hour_ago = Utc::now() - chrono::Duration::hours(1);
        let mut stats = QueueStats {
            pending: 0,
            running: 0,
            completed_last_hour: 0,
            failed_last_hour: 0,
            total: map.len() as i64,
        };
        for job in map.values() {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed if job.updated_at > hour_ago => {
                    stats.completed_last_hour += 1
                }
                JobStatus::Failed if job.updated_at > hour_ago => stats.failed_last_hour += 1,
                _ => {}
            }
        }
        Ok(stats)
    }
}
