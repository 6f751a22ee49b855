//! End-to-end worker tests over in-memory stores: claim, execute, finalize,
//! and the keyword bookkeeping that follows a real search.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use newswatch_core::{Error, JobStatus, JobStore, Keyword, Result, SchedulingPolicy};
use newswatch_scheduler::testing::{MemoryJobStore, MemoryKeywordStore};
use newswatch_scheduler::{
    NoOpExecutor, SearchExecutor, SearchOutcome, SearchScheduler, SearchWorker, WorkerConfig,
};

/// Executor that fails a fixed number of times before succeeding.
struct ScriptedExecutor {
    failures_remaining: AtomicU32,
    calls: AtomicU32,
}

impl ScriptedExecutor {
    fn failing(times: u32) -> Self {
        Self {
            failures_remaining: AtomicU32::new(times),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl SearchExecutor for ScriptedExecutor {
    async fn search(&self, _keyword: &Keyword) -> Result<SearchOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Search("upstream timeout".to_string()));
        }
        Ok(SearchOutcome { articles_found: 3 })
    }
}

fn worker_setup(
    policy: SchedulingPolicy,
    executor: Arc<dyn SearchExecutor>,
) -> (Arc<SearchScheduler>, MemoryKeywordStore, MemoryJobStore, SearchWorker) {
    let keywords = MemoryKeywordStore::new();
    let jobs = MemoryJobStore::new();
    let scheduler = Arc::new(SearchScheduler::new(
        Arc::new(keywords.clone()),
        Arc::new(jobs.clone()),
        policy,
    ));
    let worker = SearchWorker::new(
        scheduler.clone(),
        executor,
        WorkerConfig::default().with_poll_interval(10),
    );
    (scheduler, keywords, jobs, worker)
}

/// Poll `check` until it returns true or the deadline passes.
async fn wait_for<F, Fut>(check: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("condition not reached within deadline");
}

#[tokio::test]
async fn test_worker_completes_job_and_marks_keyword() {
    let policy = SchedulingPolicy::default().with_cooldown_minutes(60);
    let (scheduler, keywords, jobs, worker) =
        worker_setup(policy, Arc::new(ScriptedExecutor::failing(0)));

    let now = Utc::now();
    let kw = keywords
        .add("energy policy", 5, Some(now - Duration::hours(4)), None)
        .await;
    scheduler.fill_queue(now).await.unwrap();

    let handle = worker.start();
    let jobs_check = jobs.clone();
    let kw_check = kw;
    wait_for(|| {
        let jobs = jobs_check.clone();
        async move {
            jobs.for_keyword(kw_check)
                .await
                .unwrap()
                .first()
                .is_some_and(|j| j.status == JobStatus::Completed)
        }
    })
    .await;
    handle.shutdown().await.unwrap();

    let snapshot = keywords.snapshot(kw).await.unwrap();
    assert_eq!(snapshot.search_count, 1);
    assert!(snapshot.last_searched_at.is_some());
    // Cooldown re-anchored to the actual completion time.
    assert!(snapshot.next_eligible_at.unwrap() > now);
}

#[tokio::test]
async fn test_worker_retries_failure_then_succeeds() {
    // Zero retry backoff so the second attempt is due immediately.
    let policy = SchedulingPolicy::default()
        .with_cooldown_minutes(60)
        .with_retry_minutes(0);
    let executor = Arc::new(ScriptedExecutor::failing(1));
    let (scheduler, keywords, jobs, worker) = worker_setup(policy, executor.clone());

    let now = Utc::now();
    let kw = keywords
        .add("flood", 5, Some(now - Duration::hours(4)), None)
        .await;
    scheduler.fill_queue(now).await.unwrap();

    let handle = worker.start();
    let jobs_check = jobs.clone();
    wait_for(|| {
        let jobs = jobs_check.clone();
        async move {
            jobs.for_keyword(kw)
                .await
                .unwrap()
                .first()
                .is_some_and(|j| j.status == JobStatus::Completed)
        }
    })
    .await;
    handle.shutdown().await.unwrap();

    let job = jobs.for_keyword(kw).await.unwrap().remove(0);
    assert_eq!(job.attempts, 2);
    assert_eq!(job.error, None);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_worker_fails_job_for_missing_keyword() {
    let policy = SchedulingPolicy::default().with_cooldown_minutes(60);
    let (scheduler, keywords, jobs, worker) =
        worker_setup(policy, Arc::new(NoOpExecutor::new()));

    let now = Utc::now();
    let kw = keywords
        .add("doomed", 5, Some(now - Duration::hours(4)), None)
        .await;
    scheduler.fill_queue(now).await.unwrap();
    // Keyword deleted after enqueue.
    keywords.remove(kw).await;

    let handle = worker.start();
    let jobs_check = jobs.clone();
    wait_for(|| {
        let jobs = jobs_check.clone();
        async move {
            jobs.for_keyword(kw)
                .await
                .unwrap()
                .first()
                .is_some_and(|j| j.status == JobStatus::Failed)
        }
    })
    .await;
    handle.shutdown().await.unwrap();

    let job = jobs.for_keyword(kw).await.unwrap().remove(0);
    assert_eq!(job.error.as_deref(), Some("keyword_missing"));
    // Permanent: a single attempt, no retry churn.
    assert_eq!(job.attempts, 1);
}

#[tokio::test]
async fn test_disabled_worker_leaves_queue_alone() {
    let policy = SchedulingPolicy::default().with_cooldown_minutes(60);
    let keywords = MemoryKeywordStore::new();
    let jobs = MemoryJobStore::new();
    let scheduler = Arc::new(SearchScheduler::new(
        Arc::new(keywords.clone()),
        Arc::new(jobs.clone()),
        policy,
    ));
    let worker = SearchWorker::new(
        scheduler.clone(),
        Arc::new(NoOpExecutor::new()),
        WorkerConfig::default()
            .with_poll_interval(10)
            .with_enabled(false),
    );

    let now = Utc::now();
    keywords
        .add("idle", 5, Some(now - Duration::hours(4)), None)
        .await;
    scheduler.fill_queue(now).await.unwrap();

    let _handle = worker.start();
    tokio::time::sleep(StdDuration::from_millis(100)).await;

    let stats = scheduler.stats().await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.running, 0);
}
