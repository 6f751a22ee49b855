//! Centralized default constants for the newswatch scheduler.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates should reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// SCHEDULING POLICY
// =============================================================================

/// Minimum spacing between two searches of the same keyword (minutes).
pub const COOLDOWN_MINUTES: i64 = 180;

/// Maximum jobs admitted per rolling day, independent of eligibility.
pub const DAILY_CAP: i64 = 250;

/// Maximum jobs filled per scheduling pass, and maximum claimed per dequeue.
pub const BATCH_SIZE: i64 = 15;

/// Keywords below this priority are never auto-scheduled.
pub const MIN_PRIORITY: i32 = 0;

/// Delay before a failed job becomes eligible again (minutes).
pub const RETRY_MINUTES: i64 = 30;

/// How long a job may sit `running` before being considered abandoned (minutes).
pub const STALE_MINUTES: i64 = 30;

/// Width of the rolling capacity window (hours).
pub const CAP_WINDOW_HOURS: i64 = 24;

// =============================================================================
// JOBS
// =============================================================================

/// Bounded retry budget per job.
pub const JOB_MAX_ATTEMPTS: i32 = 3;

/// Per-job execution timeout (seconds).
pub const JOB_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// WORKER
// =============================================================================

/// Polling interval when the queue is empty (milliseconds).
pub const POLL_INTERVAL_MS: u64 = 500;

/// Maximum concurrent search executions per worker.
pub const WORKER_MAX_CONCURRENT: usize = 4;

/// Capacity of the worker event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// DRIVER
// =============================================================================

/// Interval between autonomous queue-fill passes (seconds).
pub const FILL_INTERVAL_SECS: u64 = 900;

/// Interval between stale-job sweeps (seconds).
pub const REAP_INTERVAL_SECS: u64 = 300;
