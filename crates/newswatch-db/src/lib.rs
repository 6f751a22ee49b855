//! # newswatch-db
//!
//! PostgreSQL store layer for the newswatch scheduler.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgKeywordStore`] and [`PgJobStore`] implementations of the core
//!   repository traits
//! - Embedded schema migrations
//!
//! Every mutation is a single short transaction; the row-locking primitive
//! (`FOR UPDATE SKIP LOCKED`) is the sole coordination mechanism between
//! concurrent workers.
//!
//! ## Example
//!
//! ```rust,ignore
//! use newswatch_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/newswatch").await?;
//!     db.migrate().await?;
//!
//!     let stats = newswatch_core::JobStore::stats(&db.jobs).await?;
//!     println!("pending: {}", stats.pending);
//!     Ok(())
//! }
//! ```

pub mod jobs;
pub mod keywords;
pub mod pool;

pub use jobs::PgJobStore;
pub use keywords::PgKeywordStore;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

use newswatch_core::Result;

/// Bundle of store implementations sharing one connection pool.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Keyword scheduling-field store.
    pub keywords: PgKeywordStore,
    /// Search job queue store.
    pub jobs: PgJobStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            keywords: PgKeywordStore::new(pool.clone()),
            jobs: PgJobStore::new(pool.clone()),
            pool,
        }
    }

    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(database_url, config).await?;
        Ok(Self::new(pool))
    }

    /// Apply embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| newswatch_core::Error::Internal(format!("Migration failed: {e}")))?;
        Ok(())
    }
}
