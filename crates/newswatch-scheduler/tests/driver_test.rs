//! Periodic driver test: the timer loop fills the queue without manual calls.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};

use newswatch_core::SchedulingPolicy;
use newswatch_scheduler::testing::{MemoryJobStore, MemoryKeywordStore};
use newswatch_scheduler::{driver, DriverConfig, SearchScheduler};

#[tokio::test]
async fn test_driver_fills_queue_periodically() {
    let keywords = MemoryKeywordStore::new();
    let jobs = MemoryJobStore::new();
    let scheduler = Arc::new(SearchScheduler::new(
        Arc::new(keywords.clone()),
        Arc::new(jobs.clone()),
        SchedulingPolicy::default().with_cooldown_minutes(60),
    ));

    let now = Utc::now();
    keywords
        .add("monsoon", 5, Some(now - Duration::hours(4)), None)
        .await;

    let handle = driver::start(
        scheduler,
        DriverConfig::default()
            .with_fill_interval(StdDuration::from_millis(20))
            .with_reap_interval(StdDuration::from_millis(20)),
    );

    let mut filled = false;
    for _ in 0..100 {
        if jobs.all().await.len() == 1 {
            filled = true;
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    handle.shutdown().await.unwrap();

    assert!(filled, "driver never filled the queue");
}
