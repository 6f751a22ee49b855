//! Scheduler behavior tests over in-memory stores: cooldown, capacity,
//! dedup, bounded retry, and stale recovery.

use std::sync::Arc;

use chrono::{Duration, Utc};

use newswatch_core::{JobStatus, JobStore, KeywordStore, SchedulingPolicy};
use newswatch_scheduler::testing::{MemoryJobStore, MemoryKeywordStore};
use newswatch_scheduler::SearchScheduler;

fn scheduler_with(
    policy: SchedulingPolicy,
) -> (SearchScheduler, MemoryKeywordStore, MemoryJobStore) {
    let keywords = MemoryKeywordStore::new();
    let jobs = MemoryJobStore::new();
    let scheduler = SearchScheduler::new(
        Arc::new(keywords.clone()),
        Arc::new(jobs.clone()),
        policy,
    );
    (scheduler, keywords, jobs)
}

#[tokio::test]
async fn test_fill_skips_keyword_inside_cooldown() {
    // Cooldown 180 min, searched 60 min ago: not eligible.
    let policy = SchedulingPolicy::default().with_cooldown_minutes(180);
    let (scheduler, keywords, _jobs) = scheduler_with(policy);
    let now = Utc::now();
    keywords
        .add("energy policy", 5, Some(now - Duration::minutes(60)), None)
        .await;

    let report = scheduler.fill_queue(now).await.unwrap();
    assert_eq!(report.queued, 0);
    assert_eq!(report.candidates, 0);
}

#[tokio::test]
async fn test_fill_queues_batch_up_to_batch_size() {
    // 12 eligible keywords, cap 10, batch 5: exactly 5 queued.
    let policy = SchedulingPolicy::default()
        .with_cooldown_minutes(180)
        .with_daily_cap(10)
        .with_batch_size(5);
    let (scheduler, keywords, _jobs) = scheduler_with(policy);
    let now = Utc::now();
    for i in 0..12 {
        keywords
            .add(
                &format!("keyword-{i}"),
                i,
                Some(now - Duration::hours(4)),
                None,
            )
            .await;
    }

    let report = scheduler.fill_queue(now).await.unwrap();
    assert_eq!(report.queued, 5);
    assert_eq!(report.pending_jobs, 5);
    assert_eq!(report.requested, 5);
}

#[tokio::test]
async fn test_enqueue_advances_cooldown_clock() {
    let policy = SchedulingPolicy::default().with_cooldown_minutes(120);
    let (scheduler, keywords, _jobs) = scheduler_with(policy);
    let now = Utc::now();
    let kw = keywords
        .add("election", 5, Some(now - Duration::hours(4)), None)
        .await;

    let report = scheduler.fill_queue(now).await.unwrap();
    assert_eq!(report.queued, 1);

    // next_eligible_at == enqueue time + cooldown.
    let snapshot = keywords.snapshot(kw).await.unwrap();
    assert_eq!(snapshot.next_eligible_at, Some(now + Duration::minutes(120)));

    // A second pass before the window elapses must not re-select it.
    let later = now + Duration::minutes(119);
    let report = scheduler.fill_queue(later).await.unwrap();
    assert_eq!(report.queued, 0);
}

#[tokio::test]
async fn test_fill_dedups_existing_active_job() {
    let policy = SchedulingPolicy::default().with_cooldown_minutes(60);
    let (scheduler, keywords, jobs) = scheduler_with(policy);
    let now = Utc::now();
    let kw = keywords
        .add("flood", 5, Some(now - Duration::hours(4)), None)
        .await;

    // A job already exists but the keyword's cooldown clock was never
    // advanced (e.g. enqueued by another path).
    let first = jobs.insert_if_absent(kw, now, 5, now).await.unwrap();
    assert!(first.is_some());

    let report = scheduler.fill_queue(now).await.unwrap();
    assert_eq!(report.queued, 0);
    assert_eq!(jobs.for_keyword(kw).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_capacity_gate_bounds_rolling_day() {
    let policy = SchedulingPolicy::default()
        .with_cooldown_minutes(60)
        .with_daily_cap(10)
        .with_batch_size(5);
    let (scheduler, keywords, jobs) = scheduler_with(policy);
    let now = Utc::now();
    for i in 0..12 {
        keywords
            .add(
                &format!("keyword-{i}"),
                i,
                Some(now - Duration::hours(4)),
                None,
            )
            .await;
    }

    let first = scheduler.fill_queue(now).await.unwrap();
    let second = scheduler.fill_queue(now).await.unwrap();
    let third = scheduler.fill_queue(now).await.unwrap();

    assert_eq!(first.queued, 5);
    assert_eq!(second.queued, 5);
    // At cap: no-op, no writes, not an error.
    assert_eq!(third.queued, 0);
    assert_eq!(third.pending_jobs, 10);
    assert_eq!(jobs.all().await.len(), 10);
}

#[tokio::test]
async fn test_dequeue_orders_by_priority_then_age() {
    let policy = SchedulingPolicy::default().with_cooldown_minutes(60);
    let (scheduler, keywords, _jobs) = scheduler_with(policy);
    let now = Utc::now();
    for (term, priority, searched_hours_ago) in
        [("low-old", 1, 9), ("high", 8, 4), ("low-new", 1, 5)]
    {
        keywords
            .add(
                term,
                priority,
                Some(now - Duration::hours(searched_hours_ago)),
                None,
            )
            .await;
    }
    scheduler.fill_queue(now).await.unwrap();

    let batch = scheduler.dequeue(10, now).await.unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(batch[0].priority, 8);
    assert!(batch.iter().all(|j| j.status == JobStatus::Running));
    assert!(batch.iter().all(|j| j.attempts == 1));
}

#[tokio::test]
async fn test_bounded_retry_ends_in_failed() {
    let policy = SchedulingPolicy::default()
        .with_cooldown_minutes(60)
        .with_retry_minutes(30);
    let (scheduler, keywords, jobs) = scheduler_with(policy);
    let mut now = Utc::now();
    let kw = keywords
        .add("storm", 5, Some(now - Duration::hours(4)), None)
        .await;
    scheduler.fill_queue(now).await.unwrap();

    let mut job_id = None;
    for attempt in 1..=3 {
        let batch = scheduler.dequeue(1, now).await.unwrap();
        assert_eq!(batch.len(), 1, "attempt {attempt} should claim the job");
        let job = &batch[0];
        assert_eq!(job.attempts, attempt);
        job_id = Some(job.id);

        let status = scheduler
            .complete(job.id, false, Some("timeout"), now)
            .await
            .unwrap();
        if attempt < 3 {
            assert_eq!(status, JobStatus::Pending);
            // Retried with fixed backoff: not due until retry_minutes pass.
            assert!(scheduler.dequeue(1, now).await.unwrap().is_empty());
            now += Duration::minutes(31);
        } else {
            assert_eq!(status, JobStatus::Failed);
        }
    }

    let job = jobs.snapshot(job_id.unwrap()).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 3);
    assert_eq!(job.error.as_deref(), Some("timeout"));
    // Terminal: nothing left to claim.
    assert!(scheduler
        .dequeue(1, now + Duration::hours(1))
        .await
        .unwrap()
        .is_empty());
    let _ = kw;
}

#[tokio::test]
async fn test_success_clears_error() {
    let policy = SchedulingPolicy::default().with_cooldown_minutes(60);
    let (scheduler, keywords, jobs) = scheduler_with(policy);
    let now = Utc::now();
    keywords
        .add("drought", 5, Some(now - Duration::hours(4)), None)
        .await;
    scheduler.fill_queue(now).await.unwrap();

    let job = scheduler.dequeue(1, now).await.unwrap().remove(0);
    scheduler
        .complete(job.id, false, Some("flaky upstream"), now)
        .await
        .unwrap();

    let retry_time = now + Duration::minutes(31);
    let job = scheduler.dequeue(1, retry_time).await.unwrap().remove(0);
    let status = scheduler.complete(job.id, true, None, retry_time).await.unwrap();
    assert_eq!(status, JobStatus::Completed);

    let snapshot = jobs.snapshot(job.id).await.unwrap();
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.error, None);
}

#[tokio::test]
async fn test_stale_job_is_reaped_and_reclaimable() {
    let policy = SchedulingPolicy::default()
        .with_cooldown_minutes(60)
        .with_stale_minutes(30);
    let (scheduler, keywords, _jobs) = scheduler_with(policy);
    let t0 = Utc::now();
    keywords
        .add("earthquake", 5, Some(t0 - Duration::hours(4)), None)
        .await;
    scheduler.fill_queue(t0).await.unwrap();

    let claimed = scheduler.dequeue(1, t0).await.unwrap();
    assert_eq!(claimed.len(), 1);
    // Worker crashes; nothing completes the job.

    let later = t0 + Duration::minutes(31);
    let reset = scheduler.reap_stale(later).await.unwrap();
    assert_eq!(reset, 1);

    let reclaimed = scheduler.dequeue(1, later).await.unwrap();
    assert_eq!(reclaimed.len(), 1);
    assert_eq!(reclaimed[0].id, claimed[0].id);
    assert_eq!(reclaimed[0].scheduled_at, later);
    // The stuck attempt counted once; the reclaim is attempt two.
    assert_eq!(reclaimed[0].attempts, 2);
}

#[tokio::test]
async fn test_reap_leaves_fresh_running_jobs_alone() {
    let policy = SchedulingPolicy::default()
        .with_cooldown_minutes(60)
        .with_stale_minutes(30);
    let (scheduler, keywords, _jobs) = scheduler_with(policy);
    let now = Utc::now();
    keywords
        .add("wildfire", 5, Some(now - Duration::hours(4)), None)
        .await;
    scheduler.fill_queue(now).await.unwrap();
    scheduler.dequeue(1, now).await.unwrap();

    let reset = scheduler.reap_stale(now + Duration::minutes(10)).await.unwrap();
    assert_eq!(reset, 0);
}

#[tokio::test]
async fn test_enqueue_specific_bypasses_cap_and_priority_floor() {
    let policy = SchedulingPolicy::default()
        .with_cooldown_minutes(60)
        .with_daily_cap(1)
        .with_min_priority(5);
    let (scheduler, keywords, jobs) = scheduler_with(policy);
    let now = Utc::now();
    let filler = keywords
        .add("filler", 9, Some(now - Duration::hours(4)), None)
        .await;
    let below_floor = keywords
        .add("niche topic", 1, Some(now - Duration::hours(4)), None)
        .await;

    // Exhaust the daily cap.
    let report = scheduler.fill_queue(now).await.unwrap();
    assert_eq!(report.queued, 1);
    assert_eq!(scheduler.fill_queue(now).await.unwrap().queued, 0);

    // Out-of-band enqueue still admits the low-priority keyword.
    let queued = scheduler.enqueue_specific(&[below_floor], now).await.unwrap();
    assert_eq!(queued, 1);
    assert_eq!(jobs.for_keyword(below_floor).await.unwrap().len(), 1);
    let _ = filler;
}

#[tokio::test]
async fn test_enqueue_specific_respects_cooldown_and_dedup() {
    let policy = SchedulingPolicy::default().with_cooldown_minutes(180);
    let (scheduler, keywords, jobs) = scheduler_with(policy);
    let now = Utc::now();
    let recent = keywords
        .add("recent", 5, Some(now - Duration::minutes(30)), None)
        .await;
    let ready = keywords
        .add("ready", 5, Some(now - Duration::hours(4)), None)
        .await;
    let missing = newswatch_core::new_v7();

    let queued = scheduler
        .enqueue_specific(&[recent, ready, missing], now)
        .await
        .unwrap();
    assert_eq!(queued, 1);
    assert!(jobs.for_keyword(recent).await.unwrap().is_empty());

    // Second immediate request: the job is still active, nothing new.
    let queued = scheduler.enqueue_specific(&[ready], now).await.unwrap();
    assert_eq!(queued, 0);
    assert_eq!(jobs.for_keyword(ready).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_disabled_scheduler_gates_autonomous_paths() {
    let policy = SchedulingPolicy::default()
        .with_cooldown_minutes(60)
        .with_enabled(false);
    let (scheduler, keywords, jobs) = scheduler_with(policy);
    let now = Utc::now();
    let kw = keywords
        .add("paused", 5, Some(now - Duration::hours(4)), None)
        .await;

    assert_eq!(scheduler.fill_queue(now).await.unwrap().queued, 0);
    assert!(scheduler.dequeue(5, now).await.unwrap().is_empty());
    assert_eq!(scheduler.reap_stale(now).await.unwrap(), 0);

    // Out-of-band enqueue still works while disabled.
    let queued = scheduler.enqueue_specific(&[kw], now).await.unwrap();
    assert_eq!(queued, 1);
    assert_eq!(jobs.all().await.len(), 1);
}

#[tokio::test]
async fn test_never_searched_keyword_is_scheduled_first() {
    let policy = SchedulingPolicy::default().with_cooldown_minutes(60).with_batch_size(1);
    let (scheduler, keywords, jobs) = scheduler_with(policy);
    let now = Utc::now();
    keywords
        .add("old hand", 5, Some(now - Duration::hours(9)), None)
        .await;
    let fresh = keywords.add("brand new", 5, None, None).await;

    let report = scheduler.fill_queue(now).await.unwrap();
    assert_eq!(report.queued, 1);
    assert_eq!(jobs.for_keyword(fresh).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_stats_reflect_transitions() {
    let policy = SchedulingPolicy::default().with_cooldown_minutes(60);
    let (scheduler, keywords, _jobs) = scheduler_with(policy);
    let now = Utc::now();
    for i in 0..3 {
        keywords
            .add(&format!("kw-{i}"), 5, Some(now - Duration::hours(4)), None)
            .await;
    }
    scheduler.fill_queue(now).await.unwrap();
    let batch = scheduler.dequeue(2, now).await.unwrap();
    scheduler.complete(batch[0].id, true, None, now).await.unwrap();

    let stats = scheduler.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.running, 1);
    assert_eq!(stats.completed_last_hour, 1);
}
