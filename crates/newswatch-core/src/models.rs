//! Core data types for keyword search scheduling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// KEYWORDS
// =============================================================================

/// A tracked search term whose news coverage the system monitors.
///
/// Owned by the keyword CRUD layer; the scheduler reads `priority`,
/// `last_searched_at` and `next_eligible_at`, and writes the latter two
/// through [`crate::KeywordStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub id: Uuid,
    /// The monitored search term.
    pub term: String,
    /// Higher priority keywords are scheduled sooner. Default 0.
    pub priority: i32,
    /// Most recent completed search, if any.
    pub last_searched_at: Option<DateTime<Utc>>,
    /// If set and in the future, the keyword is not eligible.
    pub next_eligible_at: Option<DateTime<Utc>>,
    /// How many searches have actually run for this keyword.
    pub search_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An eligible keyword selected for enqueueing.
///
/// Priority is captured here at selection time and copied onto the job;
/// it is not re-read later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub keyword_id: Uuid,
    /// Earliest time the resulting job may run.
    pub scheduled_at: DateTime<Utc>,
    pub priority: i32,
}

// =============================================================================
// JOBS
// =============================================================================

/// Status of a search job in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// True for states a job never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One scheduled attempt to search for news about a specific keyword.
///
/// Rows are never deleted; the record is the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchJob {
    pub id: Uuid,
    pub keyword_id: Uuid,
    /// Earliest time this job may be claimed.
    pub scheduled_at: DateTime<Utc>,
    /// Snapshot of the keyword's priority at enqueue time.
    pub priority: i32,
    /// Attempts made so far, including the in-flight one while `running`.
    pub attempts: i32,
    pub max_attempts: i32,
    pub status: JobStatus,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// REPORTS & STATS
// =============================================================================

/// Outcome of one queue-fill pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FillReport {
    /// Jobs actually inserted this pass.
    pub queued: i64,
    /// Pending jobs after the pass (pre-existing plus queued).
    pub pending_jobs: i64,
    /// Capacity-bounded admission limit for this pass.
    pub requested: i64,
    /// Eligible candidates considered.
    pub candidates: i64,
}

/// Queue statistics summary for the reporting surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub running: i64,
    pub completed_last_hour: i64,
    pub failed_last_hour: i64,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_candidate_equality() {
        let now = Utc::now();
        let id = Uuid::nil();
        let a = Candidate {
            keyword_id: id,
            scheduled_at: now,
            priority: 5,
        };
        assert_eq!(a.clone(), a);
    }
}
