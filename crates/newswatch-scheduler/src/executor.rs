//! The seam to the external news search dependency.

use async_trait::async_trait;

use newswatch_core::{Keyword, Result};

/// Outcome of one external search execution.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Articles found by the external source for this keyword.
    pub articles_found: u32,
}

/// Executes the actual news search for a keyword.
///
/// The implementation calls out to rate-limited, latency-heavy external
/// services and stores the resulting articles; none of that is the
/// scheduler's concern. An `Err` routes through the bounded-retry state
/// machine.
#[async_trait]
pub trait SearchExecutor: Send + Sync {
    /// Search for news about `keyword`.
    async fn search(&self, keyword: &Keyword) -> Result<SearchOutcome>;
}

/// Executor that performs no search and always succeeds.
///
/// Useful for wiring checks and worker tests.
#[derive(Debug, Default)]
pub struct NoOpExecutor;

impl NoOpExecutor {
    /// Create a new no-op executor.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SearchExecutor for NoOpExecutor {
    async fn search(&self, _keyword: &Keyword) -> Result<SearchOutcome> {
        Ok(SearchOutcome::default())
    }
}
