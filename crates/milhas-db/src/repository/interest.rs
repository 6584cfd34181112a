//! # Interest Config Repository
//!
//! Supplier-scoped credit interest table (`credit_interest_config`), one row
//! per `(supplier_id, installments)`.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use milhas_core::{InterestConfig, Rate};

#[derive(Debug, sqlx::FromRow)]
struct InterestRow {
    id: String,
    supplier_id: String,
    installments: i64,
    interest_rate_bps: i64,
    is_active: bool,
}

impl TryFrom<InterestRow> for InterestConfig {
    type Error = DbError;

    fn try_from(row: InterestRow) -> Result<Self, Self::Error> {
        let installments = u32::try_from(row.installments)
            .map_err(|_| DbError::corrupt("credit_interest_config", &row.id, "negative installments"))?;
        let bps = u32::try_from(row.interest_rate_bps)
            .map_err(|_| DbError::corrupt("credit_interest_config", &row.id, "negative interest rate"))?;

        Ok(InterestConfig {
            id: row.id,
            supplier_id: row.supplier_id,
            installments,
            interest_rate: Rate::from_bps(bps),
            is_active: row.is_active,
        })
    }
}

/// Repository for a supplier's installment interest table.
#[derive(Debug, Clone)]
pub struct InterestConfigRepository {
    pool: SqlitePool,
}

impl InterestConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InterestConfigRepository { pool }
    }

    /// Creates or replaces the rate for an installment count and activates it.
    pub async fn upsert(
        &self,
        supplier_id: &str,
        installments: u32,
        rate: Rate,
    ) -> DbResult<InterestConfig> {
        debug!(supplier_id = %supplier_id, installments, bps = rate.bps(), "Upserting interest config");

        let now = Utc::now();
        let row = sqlx::query_as::<_, InterestRow>(
            r#"
            INSERT INTO credit_interest_config (
                id, supplier_id, installments, interest_rate_bps, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
            ON CONFLICT(supplier_id, installments) DO UPDATE SET
                interest_rate_bps = excluded.interest_rate_bps,
                is_active = 1,
                updated_at = excluded.updated_at
            RETURNING id, supplier_id, installments, interest_rate_bps, is_active
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(supplier_id)
        .bind(installments as i64)
        .bind(rate.bps() as i64)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        InterestConfig::try_from(row)
    }

    /// Active rows for a supplier, ordered by installment count.
    pub async fn list_active(&self, supplier_id: &str) -> DbResult<Vec<InterestConfig>> {
        self.list(supplier_id, true).await
    }

    /// Every row for a supplier, active or not.
    pub async fn list_all(&self, supplier_id: &str) -> DbResult<Vec<InterestConfig>> {
        self.list(supplier_id, false).await
    }

    async fn list(&self, supplier_id: &str, only_active: bool) -> DbResult<Vec<InterestConfig>> {
        let rows = sqlx::query_as::<_, InterestRow>(
            r#"
            SELECT id, supplier_id, installments, interest_rate_bps, is_active
            FROM credit_interest_config
            WHERE supplier_id = ?1 AND (?2 = 0 OR is_active = 1)
            ORDER BY installments
            "#,
        )
        .bind(supplier_id)
        .bind(only_active)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(InterestConfig::try_from).collect()
    }

    /// Deactivates the row for an installment count.
    pub async fn deactivate(&self, supplier_id: &str, installments: u32) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE credit_interest_config
            SET is_active = 0, updated_at = ?3
            WHERE supplier_id = ?1 AND installments = ?2
            "#,
        )
        .bind(supplier_id)
        .bind(installments as i64)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "InterestConfig",
                format!("{supplier_id}/{installments}x"),
            ));
        }
        Ok(())
    }
}
