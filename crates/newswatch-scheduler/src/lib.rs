//! # newswatch-scheduler
//!
//! Keyword search scheduling and throttling queue.
//!
//! This crate decides, continuously and safely, which keywords are due for
//! a fresh external news search without overwhelming a rate-limited
//! dependency:
//! - Cooldown-based eligibility with priority ordering
//! - A rolling-day capacity gate as backpressure
//! - Durable, deduplicated job records with bounded retry
//! - Skip-locked batch claims safe across many worker processes
//! - Stale-job reaping as the sole recovery path for crashed workers
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chrono::Utc;
//! use newswatch_core::SchedulingPolicy;
//! use newswatch_db::Database;
//! use newswatch_scheduler::{
//!     driver, DriverConfig, NoOpExecutor, SearchScheduler, SearchWorker, WorkerConfig,
//! };
//!
//! let db = Database::connect("postgres://...").await?;
//! let scheduler = Arc::new(SearchScheduler::from_database(&db, SchedulingPolicy::from_env()));
//!
//! // Fill once by hand, or let the periodic driver do it.
//! let report = scheduler.fill_queue(Utc::now()).await?;
//! println!("queued {} jobs", report.queued);
//!
//! let driver_handle = driver::start(scheduler.clone(), DriverConfig::default());
//! let worker = SearchWorker::new(scheduler, Arc::new(NoOpExecutor::new()), WorkerConfig::from_env());
//! let worker_handle = worker.start();
//!
//! // Graceful shutdown
//! worker_handle.shutdown().await?;
//! driver_handle.shutdown().await?;
//! ```

pub mod driver;
pub mod executor;
pub mod scheduler;
pub mod telemetry;
pub mod testing;
pub mod worker;

// Re-export core types
pub use newswatch_core::*;

pub use driver::{DriverConfig, DriverHandle};
pub use executor::{NoOpExecutor, SearchExecutor, SearchOutcome};
pub use scheduler::SearchScheduler;
pub use telemetry::init_tracing;
pub use worker::{SearchWorker, WorkerConfig, WorkerEvent, WorkerHandle};
