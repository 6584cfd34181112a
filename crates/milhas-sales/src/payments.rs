//! # Payment Service
//!
//! Records partial payments against a sale.
//!
//! ## Record Flow
//! ```text
//! record_payment(sale_id, NewPayment)
//!    │
//!    ├── amount > 0 ? ───────────────── no ──► InvalidAmount
//!    └── record_locked (BEGIN IMMEDIATE)
//!           ├── load sale ───────────── none ─► SaleNotFound
//!           ├── fold ledger (payment_transactions)    ← source of truth
//!           ├── apply_payment(ledger state, amount)
//!           └── INSERT payment + UPDATE sale cache
//! ```
//!
//! The sale's `paid_amount` / `payment_status` columns are a cache of the
//! ledger; [`PaymentService::reconcile`] rebuilds them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{SalesError, SalesResult};
use crate::traits::IdentityProvider;
use milhas_core::payment_state::{apply_payment, parse_payment_amount, PaymentSnapshot};
use milhas_core::validation::validate_payment_amount;
use milhas_core::{Money, PaymentMethod, PaymentTransaction, PaymentTransition};
use milhas_db::Database;

/// A payment as entered in the payment dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub amount: Money,
    pub method: PaymentMethod,
    /// Defaults to the time of recording.
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewPayment {
    pub fn new(amount: Money, method: PaymentMethod) -> Self {
        NewPayment {
            amount,
            method,
            paid_at: None,
            notes: None,
        }
    }

    /// Builds a payment from the typed amount (`"500,00"`, `"R$ 1.200"`).
    pub fn parse(amount: &str, method: PaymentMethod) -> SalesResult<Self> {
        Ok(Self::new(parse_payment_amount(amount)?, method))
    }

    pub fn paid_at(mut self, paid_at: DateTime<Utc>) -> Self {
        self.paid_at = Some(paid_at);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Result of recording a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment: PaymentTransaction,
    pub transition: PaymentTransition,
    /// Amount still owed after this payment (never negative).
    pub remaining: Money,
}

#[derive(Clone)]
pub struct PaymentService {
    db: Database,
    identity: Arc<dyn IdentityProvider>,
}

impl PaymentService {
    pub fn new(db: Database, identity: Arc<dyn IdentityProvider>) -> Self {
        PaymentService { db, identity }
    }

    /// Appends a payment to the sale's ledger and moves its payment status.
    ///
    /// The sale and ledger are read under the database write lock, so
    /// concurrent payments on one sale apply one after the other.
    pub async fn record_payment(&self, sale_id: &str, payment: NewPayment) -> SalesResult<PaymentReceipt> {
        let user = self
            .identity
            .current_user()
            .await
            .ok_or(SalesError::Unauthenticated)?;

        validate_payment_amount(payment.amount)
            .map_err(|e| SalesError::InvalidAmount(e.to_string()))?;

        let now = Utc::now();
        let record = PaymentTransaction {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            amount: payment.amount,
            paid_at: payment.paid_at.unwrap_or(now),
            method: payment.method,
            notes: payment.notes,
            recorded_by: user.id,
            created_at: now,
        };

        let commit = self
            .db
            .payments()
            .record_locked(&record, |sale, ledger| {
                let current = ledger.reconcile(&PaymentSnapshot::of_sale(sale));
                if current.paid_amount != sale.paid_amount {
                    warn!(
                        sale_id = %sale.id,
                        cached = %sale.paid_amount,
                        ledger = %current.paid_amount,
                        "Cached paid amount differs from ledger"
                    );
                }

                let snapshot = PaymentSnapshot {
                    paid_amount: current.paid_amount,
                    total_amount: sale.total_amount,
                    status: current.status,
                    completed_at: current.completed_at,
                };
                Ok::<_, SalesError>(apply_payment(&snapshot, record.amount, now)?)
            })
            .await?
            .ok_or_else(|| SalesError::SaleNotFound(sale_id.to_string()))?;

        let transition = commit.transition;
        let remaining = (commit.sale.total_amount - transition.paid_amount).non_negative();
        info!(
            sale_id = %sale_id,
            payment_id = %record.id,
            amount = %record.amount,
            total_paid = %transition.paid_amount,
            remaining = %remaining,
            status = %transition.status,
            "Payment recorded"
        );

        Ok(PaymentReceipt {
            payment: record,
            transition,
            remaining,
        })
    }

    /// Rebuilds the sale's cached payment fields from its ledger.
    ///
    /// Writes only when the cache disagrees with the ledger.
    pub async fn reconcile(&self, sale_id: &str) -> SalesResult<PaymentTransition> {
        let commit = self
            .db
            .payments()
            .reconcile_locked(sale_id)
            .await?
            .ok_or_else(|| SalesError::SaleNotFound(sale_id.to_string()))?;

        if commit.cache_written {
            warn!(
                sale_id = %sale_id,
                cached = %commit.sale.paid_amount,
                ledger = %commit.transition.paid_amount,
                status = %commit.transition.status,
                "Reconciled payment cache"
            );
        }

        Ok(commit.transition)
    }

    /// Amount still owed according to the ledger (never negative).
    pub async fn outstanding(&self, sale_id: &str) -> SalesResult<Money> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| SalesError::SaleNotFound(sale_id.to_string()))?;
        let paid = self.db.payments().sum_for_sale(sale_id).await?;

        Ok((sale.total_amount - paid).non_negative())
    }

    /// Ledger of a sale in payment order.
    pub async fn history(&self, sale_id: &str) -> SalesResult<Vec<PaymentTransaction>> {
        Ok(self.db.payments().list_for_sale(sale_id).await?)
    }
}
