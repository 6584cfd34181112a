//! # Access Whitelist Repository
//!
//! Users listed here get access without an active subscription.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct AccessWhitelistRepository {
    pool: SqlitePool,
}

impl AccessWhitelistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccessWhitelistRepository { pool }
    }

    /// Adds a user. Adding twice keeps the first entry.
    pub async fn add(&self, user_id: &str, note: Option<&str>) -> DbResult<()> {
        debug!(user_id = %user_id, "Whitelisting user");

        sqlx::query(
            r#"
            INSERT INTO access_whitelist (user_id, note, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(note)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn contains(&self, user_id: &str) -> DbResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM access_whitelist WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(found.is_some())
    }

    /// Removes a user; returns whether an entry existed.
    pub async fn remove(&self, user_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM access_whitelist WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
