//! Keyword store implementation (scheduling fields only).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use newswatch_core::{Error, Keyword, KeywordStore, Result, SchedulingPolicy};

/// PostgreSQL implementation of [`KeywordStore`].
#[derive(Clone)]
pub struct PgKeywordStore {
    pool: Pool<Postgres>,
}

impl PgKeywordStore {
    /// Create a new PgKeywordStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_keyword_row(row: sqlx::postgres::PgRow) -> Keyword {
        Keyword {
            id: row.get("id"),
            term: row.get("term"),
            priority: row.get("priority"),
            last_searched_at: row.get("last_searched_at"),
            next_eligible_at: row.get("next_eligible_at"),
            search_count: row.get("search_count"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl KeywordStore for PgKeywordStore {
    async fn get(&self, keyword_id: Uuid) -> Result<Option<Keyword>> {
        let row = sqlx::query(
            "SELECT id, term, priority, last_searched_at, next_eligible_at, search_count,
                    created_at, updated_at
             FROM keywords WHERE id = $1",
        )
        .bind(keyword_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_keyword_row))
    }

    async fn load_eligible(
        &self,
        policy: &SchedulingPolicy,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Keyword>> {
        // Effective next-eligible time: next_eligible_at wins when set,
        // otherwise last_searched_at + cooldown, with the Unix epoch as the
        // sentinel for never-searched keywords so they are never starved.
        let rows = sqlx::query(
            "SELECT id, term, priority, last_searched_at, next_eligible_at, search_count,
                    created_at, updated_at
             FROM keywords
             WHERE priority >= $1
               AND COALESCE(
                       next_eligible_at,
                       last_searched_at + make_interval(mins => $2),
                       to_timestamp(0)
                   ) <= $3
             ORDER BY priority DESC, COALESCE(last_searched_at, to_timestamp(0)) ASC
             LIMIT $4",
        )
        .bind(policy.min_priority)
        .bind(policy.cooldown_minutes as i32)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_keyword_row).collect())
    }

    async fn set_next_eligible(
        &self,
        keyword_id: Uuid,
        next_eligible_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE keywords SET next_eligible_at = $2, updated_at = now() WHERE id = $1",
        )
        .bind(keyword_id)
        .bind(next_eligible_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::KeywordNotFound(keyword_id));
        }
        Ok(())
    }

    async fn mark_searched(
        &self,
        keyword_id: Uuid,
        now: DateTime<Utc>,
        next_eligible_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE keywords
             SET last_searched_at = $2,
                 next_eligible_at = $3,
                 search_count = search_count + 1,
                 updated_at = $2
             WHERE id = $1",
        )
        .bind(keyword_id)
        .bind(now)
        .bind(next_eligible_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::KeywordNotFound(keyword_id));
        }
        Ok(())
    }
}
