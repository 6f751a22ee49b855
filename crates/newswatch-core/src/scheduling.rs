//! Pure scheduling math over value types.
//!
//! Everything here is a pure function of its inputs: the clock is always an
//! explicit `now` parameter, so eligibility and ordering decisions are
//! unit-testable without a store. The database layer applies the same rules
//! in SQL; these functions are the reference semantics.

use std::cmp::Ordering;

use chrono::{DateTime, TimeZone, Utc};

use crate::{Candidate, Keyword, SchedulingPolicy};

/// Far-past sentinel for never-searched keywords.
///
/// Anchoring to the Unix epoch (rather than `now`) means a brand-new keyword
/// is eligible immediately and sorts ahead of any keyword that has ever been
/// searched.
pub fn far_past() -> DateTime<Utc> {
    Utc.timestamp_opt(0, 0).single().unwrap_or(DateTime::UNIX_EPOCH)
}

/// Next eligible run time after `base` with the given cooldown.
pub fn next_run_after(base: DateTime<Utc>, cooldown_minutes: i64) -> DateTime<Utc> {
    base + chrono::Duration::minutes(cooldown_minutes)
}

/// The effective next-eligible time for a keyword.
///
/// `next_eligible_at` wins when set; otherwise it is derived from
/// `last_searched_at + cooldown`, with [`far_past`] for never-searched
/// keywords.
pub fn effective_next_eligible(keyword: &Keyword, cooldown_minutes: i64) -> DateTime<Utc> {
    if let Some(next) = keyword.next_eligible_at {
        return next;
    }
    match keyword.last_searched_at {
        Some(last) => next_run_after(last, cooldown_minutes),
        None => far_past(),
    }
}

/// Whether a keyword may be auto-scheduled at `now` under `policy`.
pub fn is_eligible(keyword: &Keyword, policy: &SchedulingPolicy, now: DateTime<Utc>) -> bool {
    keyword.priority >= policy.min_priority
        && effective_next_eligible(keyword, policy.cooldown_minutes) <= now
}

/// Selection and queueing order: priority descending, then
/// least-recently-searched first (never-searched sorts first).
///
/// High-priority keywords preempt; within equal priority the coldest keyword
/// goes first so no keyword starves indefinitely under constant load.
pub fn compare_candidates(a: &Keyword, b: &Keyword) -> Ordering {
    b.priority.cmp(&a.priority).then_with(|| {
        let a_last = a.last_searched_at.unwrap_or_else(far_past);
        let b_last = b.last_searched_at.unwrap_or_else(far_past);
        a_last.cmp(&b_last)
    })
}

/// Compute the ordered, bounded candidate list from a keyword snapshot.
///
/// Filters by [`is_eligible`], orders by [`compare_candidates`] and truncates
/// to `limit`. Each candidate captures the keyword's priority and is
/// scheduled for `now`.
pub fn select_candidates(
    keywords: &[Keyword],
    policy: &SchedulingPolicy,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<Candidate> {
    let mut eligible: Vec<&Keyword> = keywords
        .iter()
        .filter(|k| is_eligible(k, policy, now))
        .collect();
    eligible.sort_by(|a, b| compare_candidates(a, b));
    eligible
        .into_iter()
        .take(limit)
        .map(|k| Candidate {
            keyword_id: k.id,
            scheduled_at: now,
            priority: k.priority,
        })
        .collect()
}
