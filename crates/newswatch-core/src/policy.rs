//! Scheduling policy configuration.
//!
//! The policy is an explicitly passed immutable value, constructed once at
//! startup and threaded through every call. There is no process-wide
//! settings singleton; tests parameterize the policy directly.

use chrono::Duration;

use crate::defaults;

/// Immutable configuration consumed by every scheduler component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingPolicy {
    /// Minimum spacing between two searches of the same keyword (minutes).
    pub cooldown_minutes: i64,
    /// Max jobs admitted per rolling day.
    pub daily_cap: i64,
    /// Max jobs filled per scheduling pass and claimed per dequeue call.
    pub batch_size: i64,
    /// Keywords below this priority are never auto-scheduled.
    pub min_priority: i32,
    /// Delay before a failed job becomes eligible again (minutes).
    pub retry_minutes: i64,
    /// How long a job may sit `running` before being considered abandoned (minutes).
    pub stale_minutes: i64,
    /// When false, the autonomous entry points (fill, dequeue, reap) are
    /// no-ops; out-of-band enqueueing still works.
    pub enabled: bool,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            cooldown_minutes: defaults::COOLDOWN_MINUTES,
            daily_cap: defaults::DAILY_CAP,
            batch_size: defaults::BATCH_SIZE,
            min_priority: defaults::MIN_PRIORITY,
            retry_minutes: defaults::RETRY_MINUTES,
            stale_minutes: defaults::STALE_MINUTES,
            enabled: true,
        }
    }
}

impl SchedulingPolicy {
    /// Create policy from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `KEYWORD_COOLDOWN_MINUTES` | `180` | Per-keyword search spacing |
    /// | `KEYWORD_DAILY_CAP` | `250` | Rolling-day admission cap |
    /// | `KEYWORD_BATCH_SIZE` | `15` | Fill/dequeue batch bound |
    /// | `KEYWORD_MIN_PRIORITY` | `0` | Auto-scheduling priority floor |
    /// | `KEYWORD_RETRY_MINUTES` | `30` | Failed-job backoff |
    /// | `KEYWORD_STALE_MINUTES` | `30` | Abandoned-job threshold |
    /// | `KEYWORD_SCHEDULER_ENABLED` | `true` | Enable autonomous scheduling |
    pub fn from_env() -> Self {
        fn parse_i64(var: &str, default: i64) -> i64 {
            std::env::var(var)
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(default)
        }

        let min_priority = std::env::var("KEYWORD_MIN_PRIORITY")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(defaults::MIN_PRIORITY);

        let enabled = std::env::var("KEYWORD_SCHEDULER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Self {
            cooldown_minutes: parse_i64("KEYWORD_COOLDOWN_MINUTES", defaults::COOLDOWN_MINUTES),
            daily_cap: parse_i64("KEYWORD_DAILY_CAP", defaults::DAILY_CAP),
            batch_size: parse_i64("KEYWORD_BATCH_SIZE", defaults::BATCH_SIZE).max(1),
            min_priority,
            retry_minutes: parse_i64("KEYWORD_RETRY_MINUTES", defaults::RETRY_MINUTES),
            stale_minutes: parse_i64("KEYWORD_STALE_MINUTES", defaults::STALE_MINUTES),
            enabled,
        }
    }

    /// Set the cooldown window in minutes.
    pub fn with_cooldown_minutes(mut self, minutes: i64) -> Self {
        self.cooldown_minutes = minutes;
        self
    }

    /// Set the rolling-day admission cap.
    pub fn with_daily_cap(mut self, cap: i64) -> Self {
        self.daily_cap = cap;
        self
    }

    /// Set the fill/dequeue batch bound.
    pub fn with_batch_size(mut self, size: i64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the auto-scheduling priority floor.
    pub fn with_min_priority(mut self, priority: i32) -> Self {
        self.min_priority = priority;
        self
    }

    /// Set the failed-job retry backoff in minutes.
    pub fn with_retry_minutes(mut self, minutes: i64) -> Self {
        self.retry_minutes = minutes;
        self
    }

    /// Set the abandoned-job threshold in minutes.
    pub fn with_stale_minutes(mut self, minutes: i64) -> Self {
        self.stale_minutes = minutes;
        self
    }

    /// Enable or disable autonomous scheduling.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Cooldown window as a chrono duration.
    pub fn cooldown(&self) -> Duration {
        Duration::minutes(self.cooldown_minutes)
    }

    /// Retry backoff as a chrono duration.
    pub fn retry_delay(&self) -> Duration {
        Duration::minutes(self.retry_minutes)
    }

    /// Staleness threshold as a chrono duration.
    pub fn stale_window(&self) -> Duration {
        Duration::minutes(self.stale_minutes)
    }

    /// Rolling capacity window as a chrono duration.
    pub fn cap_window(&self) -> Duration {
        Duration::hours(defaults::CAP_WINDOW_HOURS)
    }
}
