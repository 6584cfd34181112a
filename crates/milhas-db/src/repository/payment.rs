//! # Payment Repository
//!
//! The append-only payment ledger (`payment_transactions`).
//!
//! ## Ledger and Cache
//! ```text
//! record_locked(payment, decide)        BEGIN IMMEDIATE (write lock held)
//!    ├── SELECT sale                    ┐ read under the lock, so two
//!    ├── SELECT ledger                  ┘ payments never share a stale total
//!    ├── decide(&sale, &ledger)         → PaymentTransition
//!    ├── INSERT payment_transactions    ← source of truth
//!    └── UPDATE sales cache columns     ← paid_amount / status / completed_at
//! COMMIT
//! ```
//! Ledger rows are never updated or deleted here. A second writer blocks on
//! `BEGIN IMMEDIATE` (up to the pool's `busy_timeout`) until the first commits.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::sale::{fetch_sale, write_payment_state};
use milhas_core::payment_state::{PaymentLedger, PaymentSnapshot, PaymentTransition};
use milhas_core::{Money, PaymentMethod, PaymentTransaction, Sale};

/// Takes the database write lock up front instead of on the first write.
const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    sale_id: String,
    amount_cents: i64,
    paid_at: DateTime<Utc>,
    method: PaymentMethod,
    notes: Option<String>,
    recorded_by: String,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for PaymentTransaction {
    fn from(row: PaymentRow) -> Self {
        PaymentTransaction {
            id: row.id,
            sale_id: row.sale_id,
            amount: Money::from_cents(row.amount_cents),
            paid_at: row.paid_at,
            method: row.method,
            notes: row.notes,
            recorded_by: row.recorded_by,
            created_at: row.created_at,
        }
    }
}

/// A sale as read under the write lock, and the payment state written for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCommit {
    /// The sale row before this transaction touched it.
    pub sale: Sale,
    pub transition: PaymentTransition,
    /// Whether the sale's cache columns were rewritten.
    pub cache_written: bool,
}

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Appends a payment without touching the sale's cached fields.
    pub async fn append(&self, payment: &PaymentTransaction) -> DbResult<()> {
        insert_payment(&self.pool, payment).await
    }

    /// Appends `payment` and rewrites the sale's payment cache in one
    /// write-locked transaction.
    ///
    /// `decide` sees the sale and its ledger as they are once the lock is
    /// held and returns the transition to store. An error from `decide`
    /// rolls everything back. `Ok(None)` means the sale does not exist.
    pub async fn record_locked<F, E>(
        &self,
        payment: &PaymentTransaction,
        decide: F,
    ) -> Result<Option<PaymentCommit>, E>
    where
        F: FnOnce(&Sale, &PaymentLedger) -> Result<PaymentTransition, E>,
        E: From<DbError>,
    {
        let mut tx = self.begin_locked().await?;

        let Some(sale) = fetch_sale(&mut *tx, &payment.sale_id).await? else {
            return Ok(None);
        };
        let ledger = PaymentLedger::fold(&fetch_ledger(&mut *tx, &sale.id).await?);
        let transition = decide(&sale, &ledger)?;

        insert_payment(&mut *tx, payment).await?;
        write_payment_state(&mut *tx, &sale.id, &transition).await?;
        tx.commit().await.map_err(DbError::from)?;

        Ok(Some(PaymentCommit {
            sale,
            transition,
            cache_written: true,
        }))
    }

    /// Rebuilds a sale's payment cache from its ledger under the write lock.
    ///
    /// The cache is rewritten only when it disagrees with the ledger.
    /// `Ok(None)` means the sale does not exist.
    pub async fn reconcile_locked(&self, sale_id: &str) -> DbResult<Option<PaymentCommit>> {
        let mut tx = self.begin_locked().await?;

        let Some(sale) = fetch_sale(&mut *tx, sale_id).await? else {
            return Ok(None);
        };
        let ledger = PaymentLedger::fold(&fetch_ledger(&mut *tx, sale_id).await?);
        let transition = ledger.reconcile(&PaymentSnapshot::of_sale(&sale));

        let cache_written = transition.paid_amount != sale.paid_amount
            || transition.status != sale.payment_status
            || transition.completed_at != sale.payment_completed_at;
        if cache_written {
            write_payment_state(&mut *tx, sale_id, &transition).await?;
        }
        tx.commit().await?;

        Ok(Some(PaymentCommit {
            sale,
            transition,
            cache_written,
        }))
    }

    /// Ledger of a sale in payment order.
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<PaymentTransaction>> {
        fetch_ledger(&self.pool, sale_id).await
    }

    /// Sum of the ledger for a sale (zero when empty).
    pub async fn sum_for_sale(&self, sale_id: &str) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM payment_transactions WHERE sale_id = ?1",
        )
        .bind(sale_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(total))
    }
}

impl PaymentRepository {
    async fn begin_locked(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with(BEGIN_IMMEDIATE).await?)
    }
}

async fn fetch_ledger<'e, E>(executor: E, sale_id: &str) -> DbResult<Vec<PaymentTransaction>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, PaymentRow>(
        r#"
        SELECT id, sale_id, amount_cents, paid_at, method, notes, recorded_by, created_at
        FROM payment_transactions
        WHERE sale_id = ?1
        ORDER BY paid_at, created_at
        "#,
    )
    .bind(sale_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(PaymentTransaction::from).collect())
}

async fn insert_payment<'e, E>(executor: E, payment: &PaymentTransaction) -> DbResult<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    debug!(sale_id = %payment.sale_id, amount = %payment.amount, "Recording payment");

    sqlx::query(
        r#"
        INSERT INTO payment_transactions (
            id, sale_id, amount_cents, paid_at, method, notes, recorded_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.sale_id)
    .bind(payment.amount.cents())
    .bind(payment.paid_at)
    .bind(payment.method)
    .bind(&payment.notes)
    .bind(&payment.recorded_by)
    .bind(payment.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::sample_sale;
    use crate::{Database, DbConfig, DbError};
    use chrono::Duration;
    use milhas_core::payment_state::apply_payment;
    use milhas_core::PaymentStatus;
    use uuid::Uuid;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let supplier_id = db.suppliers().ensure_for_user("user-1").await.unwrap();
        let sale = sample_sale(&supplier_id);
        db.sales().insert_sale(&sale).await.unwrap();
        (db, sale.id)
    }

    fn payment(sale_id: &str, cents: i64, paid_at: DateTime<Utc>) -> PaymentTransaction {
        PaymentTransaction {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            amount: Money::from_cents(cents),
            paid_at,
            method: PaymentMethod::Pix,
            notes: None,
            recorded_by: "user-1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_append_list_and_sum() {
        let (db, sale_id) = setup().await;
        let repo = db.payments();
        let t0 = Utc::now();

        assert_eq!(repo.sum_for_sale(&sale_id).await.unwrap(), Money::zero());

        repo.append(&payment(&sale_id, 50_000, t0 + Duration::days(1))).await.unwrap();
        repo.append(&payment(&sale_id, 30_000, t0)).await.unwrap();

        let ledger = repo.list_for_sale(&sale_id).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].amount.cents(), 30_000);
        assert_eq!(repo.sum_for_sale(&sale_id).await.unwrap().cents(), 80_000);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected_by_schema() {
        let (db, sale_id) = setup().await;
        let err = db
            .payments()
            .append(&payment(&sale_id, 0, Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    fn decide_with(
        incoming: Money,
    ) -> impl FnOnce(&Sale, &PaymentLedger) -> Result<PaymentTransition, DbError> {
        move |sale, ledger| {
            let snapshot = PaymentSnapshot {
                paid_amount: ledger.total_paid(),
                ..PaymentSnapshot::of_sale(sale)
            };
            apply_payment(&snapshot, incoming, Utc::now())
                .map_err(|e| DbError::Internal(e.to_string()))
        }
    }

    #[tokio::test]
    async fn test_record_locked_updates_cache_from_ledger() {
        let (db, sale_id) = setup().await;
        let t0 = Utc::now();

        // Written behind the cache's back; the locked read must still see it.
        db.payments().append(&payment(&sale_id, 87_500, t0)).await.unwrap();

        let p = payment(&sale_id, 100_000, t0 + Duration::minutes(1));
        let commit = db
            .payments()
            .record_locked(&p, decide_with(p.amount))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(commit.sale.paid_amount, Money::zero());
        assert!(commit.transition.entered_paid());
        assert!(commit.cache_written);

        let sale = db.sales().get_by_id(&sale_id).await.unwrap().unwrap();
        assert_eq!(sale.paid_amount.cents(), 187_500);
        assert_eq!(sale.payment_status, PaymentStatus::Paid);
        assert_eq!(sale.payment_completed_at, commit.transition.completed_at);
    }

    #[tokio::test]
    async fn test_record_locked_missing_sale_writes_nothing() {
        let (db, _) = setup().await;
        let p = payment("missing", 100, Utc::now());

        let outcome = db.payments().record_locked(&p, decide_with(p.amount)).await.unwrap();

        assert!(outcome.is_none());
        assert!(db.payments().list_for_sale("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_locked_rolls_back_when_decide_fails() {
        let (db, sale_id) = setup().await;
        let p = payment(&sale_id, 100, Utc::now());

        let err = db
            .payments()
            .record_locked(&p, |_, _| Err(DbError::Internal("rejected".into())))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Internal(_)));
        assert!(db.payments().list_for_sale(&sale_id).await.unwrap().is_empty());
        // the lock was released with the rollback
        db.payments().append(&payment(&sale_id, 100, Utc::now())).await.unwrap();
    }

    #[tokio::test]
    async fn test_reconcile_locked_writes_only_on_drift() {
        let (db, sale_id) = setup().await;
        db.payments().append(&payment(&sale_id, 50_000, Utc::now())).await.unwrap();

        let first = db.payments().reconcile_locked(&sale_id).await.unwrap().unwrap();
        assert!(first.cache_written);
        assert_eq!(first.transition.status, PaymentStatus::Partial);

        let second = db.payments().reconcile_locked(&sale_id).await.unwrap().unwrap();
        assert!(!second.cache_written);
        assert_eq!(second.sale.paid_amount.cents(), 50_000);

        assert!(db.payments().reconcile_locked("missing").await.unwrap().is_none());
    }
}
