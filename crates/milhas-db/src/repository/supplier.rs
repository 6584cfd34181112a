//! # Supplier Repository
//!
//! One supplier (tenant) per authenticated user, provisioned on first use.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

/// A stored supplier.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Supplier {
    pub id: String,
    pub user_id: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Returns the supplier id for `user_id`, creating the supplier if needed.
    ///
    /// ## Idempotency
    /// ```text
    /// INSERT ... ON CONFLICT(user_id) DO NOTHING   ← no-op on repeat calls
    /// SELECT id WHERE user_id = ?                  ← always the same id
    /// ```
    /// Concurrent first calls for one user converge on a single row.
    pub async fn ensure_for_user(&self, user_id: &str) -> DbResult<String> {
        let created = sqlx::query(
            r#"
            INSERT INTO suppliers (id, user_id, name, created_at)
            VALUES (?1, ?2, NULL, ?3)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if created > 0 {
            debug!(user_id = %user_id, "Provisioned supplier");
        }

        let id: String = sqlx::query_scalar("SELECT id FROM suppliers WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(id)
    }

    /// Gets the supplier owned by `user_id`, if any.
    pub async fn get_by_user(&self, user_id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT id, user_id, name, created_at FROM suppliers WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }
}
