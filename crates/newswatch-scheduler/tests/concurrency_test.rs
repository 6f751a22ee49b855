//! Concurrent claim tests: N dequeuers over M due jobs must partition the
//! queue with no duplicates and no losses.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use newswatch_core::SchedulingPolicy;
use newswatch_scheduler::testing::{MemoryJobStore, MemoryKeywordStore};
use newswatch_scheduler::SearchScheduler;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dequeues_never_double_claim() {
    let policy = SchedulingPolicy::default()
        .with_cooldown_minutes(60)
        .with_daily_cap(100)
        .with_batch_size(5);
    let keywords = MemoryKeywordStore::new();
    let jobs = MemoryJobStore::new();
    let scheduler = Arc::new(SearchScheduler::new(
        Arc::new(keywords.clone()),
        Arc::new(jobs.clone()),
        policy,
    ));

    let now = Utc::now();
    for i in 0..30 {
        keywords
            .add(
                &format!("keyword-{i}"),
                i % 7,
                Some(now - Duration::hours(4)),
                None,
            )
            .await;
    }
    // Six fill passes of five admit all thirty.
    for _ in 0..6 {
        scheduler.fill_queue(now).await.unwrap();
    }
    assert_eq!(jobs.all().await.len(), 30);

    // More claim capacity than jobs: 8 workers x 5 slots over 30 jobs.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let scheduler = scheduler.clone();
        handles.push(tokio::spawn(async move {
            scheduler.dequeue(5, now).await.unwrap()
        }));
    }

    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut total = 0usize;
    for handle in handles {
        let batch = handle.await.unwrap();
        // Within a single claim, priority-then-age order holds.
        for pair in batch.windows(2) {
            assert!(
                pair[0].priority > pair[1].priority
                    || (pair[0].priority == pair[1].priority
                        && pair[0].scheduled_at <= pair[1].scheduled_at)
            );
        }
        for job in batch {
            assert!(seen.insert(job.id), "job {} claimed twice", job.id);
            total += 1;
        }
    }

    // The union is exactly the due set.
    assert_eq!(total, 30);

    // Nothing left to claim.
    assert!(scheduler.dequeue(5, now).await.unwrap().is_empty());
}
