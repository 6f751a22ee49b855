//! # newswatch-core
//!
//! Core types, traits, and scheduling math for the newswatch keyword
//! search scheduler.
//!
//! This crate provides:
//! - Value types for keywords, search jobs, and queue reports
//! - [`SchedulingPolicy`]: explicitly passed immutable configuration
//! - Pure eligibility and ordering functions ([`scheduling`])
//! - The [`KeywordStore`] and [`JobStore`] repository traits
//! - Shared error type and structured-logging conventions
//!
//! The scheduling decisions themselves are pure functions over value types;
//! persistence lives behind the repository traits so the logic is testable
//! without a live database.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod policy;
pub mod scheduling;
pub mod traits;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use models::{Candidate, FillReport, JobStatus, Keyword, QueueStats, SearchJob};
pub use policy::SchedulingPolicy;
pub use traits::{JobStore, KeywordStore};
pub use uuid_utils::new_v7;
