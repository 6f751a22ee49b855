//! Search job store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use newswatch_core::{new_v7, Error, JobStatus, JobStore, QueueStats, Result, SearchJob};

/// Columns returned for every job query.
const JOB_COLUMNS: &str = "id, keyword_id, scheduled_at, priority, attempts, max_attempts, \
                           status::text AS status, last_attempt_at, error, created_at, updated_at";

/// PostgreSQL implementation of [`JobStore`].
#[derive(Clone)]
pub struct PgJobStore {
    pool: Pool<Postgres>,
}

impl PgJobStore {
    /// Create a new PgJobStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn str_to_status(s: &str) -> JobStatus {
        match s {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending, // fallback
        }
    }

    fn parse_job_row(row: sqlx::postgres::PgRow) -> SearchJob {
        let status: String = row.get("status");
        SearchJob {
            id: row.get("id"),
            keyword_id: row.get("keyword_id"),
            scheduled_at: row.get("scheduled_at"),
            priority: row.get("priority"),
            attempts: row.get("attempts"),
            max_attempts: row.get("max_attempts"),
            status: Self::str_to_status(&status),
            last_attempt_at: row.get("last_attempt_at"),
            error: row.get("error"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert_if_absent(
        &self,
        keyword_id: Uuid,
        scheduled_at: DateTime<Utc>,
        priority: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>> {
        let job_id = new_v7();

        // Atomic check-and-insert: INSERT ... WHERE NOT EXISTS keeps the
        // dedup check and the insert in one statement, so two concurrent
        // scheduling passes cannot both insert for the same keyword.
        let inserted = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO search_jobs
                 (id, keyword_id, scheduled_at, priority, status, created_at, updated_at)
             SELECT $1, $2, $3, $4, 'pending'::search_job_status, $5, $5
             WHERE NOT EXISTS (
                 SELECT 1 FROM search_jobs
                 WHERE keyword_id = $2
                   AND status IN ('pending'::search_job_status, 'running'::search_job_status)
             )
             RETURNING id",
        )
        .bind(job_id)
        .bind(keyword_id)
        .bind(scheduled_at)
        .bind(priority)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(inserted)
    }

    async fn claim_batch(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<SearchJob>> {
        // FOR UPDATE SKIP LOCKED: concurrent claimants skip each other's
        // rows instead of blocking, and the status flip plus attempt
        // accounting commit atomically with the claim.
        let query = format!(
            "UPDATE search_jobs
             SET status = 'running'::search_job_status,
                 attempts = attempts + 1,
                 last_attempt_at = $1,
                 updated_at = $1
             WHERE id IN (
                 SELECT id FROM search_jobs
                 WHERE status = 'pending'::search_job_status AND scheduled_at <= $1
                 ORDER BY priority DESC, scheduled_at ASC
                 LIMIT $2
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {JOB_COLUMNS}"
        );

        let rows = sqlx::query(&query)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut jobs: Vec<SearchJob> = rows.into_iter().map(Self::parse_job_row).collect();
        // UPDATE ... RETURNING does not preserve the subquery order.
        jobs.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.scheduled_at.cmp(&b.scheduled_at))
        });

        debug!(
            subsystem = "db",
            component = "jobs",
            op = "claim_batch",
            result_count = jobs.len(),
            "Claimed job batch"
        );
        Ok(jobs)
    }

    async fn complete(
        &self,
        job_id: Uuid,
        success: bool,
        error: Option<&str>,
        retry_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<JobStatus> {
        // Single-statement state machine: completed on success, pending with
        // backoff while attempts remain, failed once the budget is spent.
        let status: Option<String> = sqlx::query_scalar(
            "UPDATE search_jobs
             SET status = CASE
                     WHEN $2 THEN 'completed'::search_job_status
                     WHEN attempts >= max_attempts THEN 'failed'::search_job_status
                     ELSE 'pending'::search_job_status
                 END,
                 error = CASE WHEN $2 THEN NULL ELSE $3 END,
                 scheduled_at = CASE
                     WHEN NOT $2 AND attempts < max_attempts THEN $4
                     ELSE scheduled_at
                 END,
                 updated_at = $5
             WHERE id = $1
             RETURNING status::text",
        )
        .bind(job_id)
        .bind(success)
        .bind(error)
        .bind(retry_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match status {
            Some(s) => Ok(Self::str_to_status(&s)),
            None => Err(Error::JobNotFound(job_id)),
        }
    }

    async fn fail_permanently(&self, job_id: Uuid, error: &str, now: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE search_jobs
             SET status = 'failed'::search_job_status, error = $2, updated_at = $3
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::JobNotFound(job_id));
        }
        Ok(())
    }

    async fn reap_stale(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Result<u64> {
        // The stuck attempt already counted; attempts is left alone.
        let result = sqlx::query(
            "UPDATE search_jobs
             SET status = 'pending'::search_job_status, scheduled_at = $2, updated_at = $2
             WHERE status = 'running'::search_job_status AND last_attempt_at < $1",
        )
        .bind(cutoff)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }

    async fn pending_created_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM search_jobs
             WHERE status = 'pending'::search_job_status AND created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(count)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<SearchJob>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM search_jobs WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn for_keyword(&self, keyword_id: Uuid) -> Result<Vec<SearchJob>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM search_jobs
             WHERE keyword_id = $1
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&query)
            .bind(keyword_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_job_row).collect())
    }

    async fn stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'running') AS running,
                COUNT(*) FILTER (WHERE status = 'completed'
                                   AND updated_at > NOW() - INTERVAL '1 hour') AS completed_last_hour,
                COUNT(*) FILTER (WHERE status = 'failed'
                                   AND updated_at > NOW() - INTERVAL '1 hour') AS failed_last_hour,
                COUNT(*) AS total
             FROM search_jobs",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(QueueStats {
            pending: row.get::<i64, _>("pending"),
            running: row.get::<i64, _>("running"),
            completed_last_hour: row.get::<i64, _>("completed_last_hour"),
            failed_last_hour: row.get::<i64, _>("failed_last_hour"),
            total: row.get::<i64, _>("total"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_to_status_roundtrip() {
        assert_eq!(PgJobStore::str_to_status("pending"), JobStatus::Pending);
        assert_eq!(PgJobStore::str_to_status("running"), JobStatus::Running);
        assert_eq!(PgJobStore::str_to_status("completed"), JobStatus::Completed);
        assert_eq!(PgJobStore::str_to_status("failed"), JobStatus::Failed);
    }

    #[test]
    fn test_str_to_status_unknown_falls_back_to_pending() {
        assert_eq!(PgJobStore::str_to_status("bogus"), JobStatus::Pending);
    }
}
