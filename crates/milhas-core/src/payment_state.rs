//! # Payment State Machine
//!
//! Derives a sale's payment status from the cumulative paid amount.
//!
//! ## States
//! ```text
//!                 payment (paid < total)
//!      ┌─────────┐ ─────────────────────► ┌─────────┐
//!      │ pending │                        │ partial │ ◄──┐ payment
//!      └────┬────┘                        └────┬────┘ ───┘ (paid < total)
//!           │      payment (paid ≥ total)      │
//!           └──────────────┬───────────────────┘
//!                          ▼
//!                     ┌─────────┐
//!                     │  paid   │  completed_at stamped on entry
//!                     └─────────┘
//! ```
//!
//! Every transition adds a strictly positive amount, so `paid_amount` never
//! decreases here. Refunds are a separate flow.
//!
//! ## Ledger vs Cache
//! The `payment_transactions` table is append-only and is the source of truth.
//! `Sale.paid_amount` / `Sale.payment_status` are a cache that
//! [`PaymentLedger`] can rebuild at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentTransaction, Sale};

// =============================================================================
// Payment Status
// =============================================================================

/// Payment status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Nothing paid yet.
    Pending,
    /// Something paid, but less than the total.
    Partial,
    /// Paid amount reached the total.
    Paid,
}

impl PaymentStatus {
    /// Classifies a paid amount against the sale total.
    ///
    /// `paid == 0` is checked first, so a zero-total sale with nothing paid
    /// stays `Pending`.
    ///
    /// ## Example
    /// ```rust
    /// use milhas_core::money::Money;
    /// use milhas_core::payment_state::PaymentStatus;
    ///
    /// let total = Money::from_cents(10_000);
    /// assert_eq!(PaymentStatus::classify(Money::zero(), total), PaymentStatus::Pending);
    /// assert_eq!(PaymentStatus::classify(Money::from_cents(1), total), PaymentStatus::Partial);
    /// assert_eq!(PaymentStatus::classify(total, total), PaymentStatus::Paid);
    /// ```
    pub fn classify(paid: Money, total: Money) -> Self {
        if paid.is_zero() {
            PaymentStatus::Pending
        } else if paid < total {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Paid
        }
    }

    /// Storage tag for this status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Snapshot & Transition
// =============================================================================

/// The payment-relevant fields of a sale before a payment is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSnapshot {
    pub paid_amount: Money,
    pub total_amount: Money,
    pub status: PaymentStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentSnapshot {
    /// Snapshot of a freshly created sale.
    pub fn unpaid(total_amount: Money) -> Self {
        PaymentSnapshot {
            paid_amount: Money::zero(),
            total_amount,
            status: PaymentStatus::Pending,
            completed_at: None,
        }
    }

    pub fn of_sale(sale: &Sale) -> Self {
        PaymentSnapshot {
            paid_amount: sale.paid_amount,
            total_amount: sale.total_amount,
            status: sale.payment_status,
            completed_at: sale.payment_completed_at,
        }
    }
}

/// Outcome of applying a payment (or of rebuilding from the ledger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentTransition {
    pub previous_status: PaymentStatus,
    pub status: PaymentStatus,
    pub paid_amount: Money,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentTransition {
    /// True when this transition moved the sale into `Paid`.
    pub fn entered_paid(&self) -> bool {
        self.previous_status != PaymentStatus::Paid && self.status == PaymentStatus::Paid
    }
}

/// Applies an incoming payment to a sale snapshot.
///
/// ## Errors
/// [`CoreError::InvalidAmount`] when `incoming` is zero or negative.
///
/// ## Completion Timestamp
/// Stamped with `now` only when the status enters `Paid`. Otherwise the
/// snapshot's value is carried over untouched (never cleared).
pub fn apply_payment(
    snapshot: &PaymentSnapshot,
    incoming: Money,
    now: DateTime<Utc>,
) -> CoreResult<PaymentTransition> {
    if !incoming.is_positive() {
        return Err(CoreError::invalid_amount(format!(
            "payment must be greater than zero, got {incoming}"
        )));
    }

    let paid_amount = snapshot.paid_amount + incoming;
    let status = PaymentStatus::classify(paid_amount, snapshot.total_amount);

    let completed_at = if snapshot.status != PaymentStatus::Paid && status == PaymentStatus::Paid {
        Some(now)
    } else {
        snapshot.completed_at
    };

    Ok(PaymentTransition {
        previous_status: snapshot.status,
        status,
        paid_amount,
        completed_at,
    })
}

/// Parses a typed payment amount and rejects anything not strictly positive.
///
/// ## Example
/// ```rust
/// use milhas_core::payment_state::parse_payment_amount;
///
/// assert_eq!(parse_payment_amount("500,00").unwrap().cents(), 50_000);
/// assert!(parse_payment_amount("abc").is_err());
/// assert!(parse_payment_amount("0").is_err());
/// ```
pub fn parse_payment_amount(input: &str) -> CoreResult<Money> {
    let amount = Money::parse_decimal(input)?;
    if !amount.is_positive() {
        return Err(CoreError::invalid_amount(format!(
            "payment must be greater than zero, got {amount}"
        )));
    }
    Ok(amount)
}

// =============================================================================
// Ledger
// =============================================================================

/// Fold over a sale's append-only payment ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentLedger {
    /// `(paid_at, amount)` in payment order.
    entries: Vec<(DateTime<Utc>, Money)>,
    total_paid: Money,
}

impl PaymentLedger {
    /// Builds the ledger from stored transactions (any order).
    pub fn fold(transactions: &[PaymentTransaction]) -> Self {
        let mut entries: Vec<(DateTime<Utc>, Money)> = transactions
            .iter()
            .map(|tx| (tx.paid_at, tx.amount))
            .collect();
        entries.sort_by_key(|(paid_at, _)| *paid_at);

        let total_paid = entries.iter().map(|(_, amount)| *amount).sum();
        PaymentLedger {
            entries,
            total_paid,
        }
    }

    /// Sum of every payment in the ledger.
    pub fn total_paid(&self) -> Money {
        self.total_paid
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When the running total first reached `total`, if it ever did.
    pub fn completed_at(&self, total: Money) -> Option<DateTime<Utc>> {
        let mut running = Money::zero();
        for (paid_at, amount) in &self.entries {
            running += *amount;
            if !running.is_zero() && running >= total {
                return Some(*paid_at);
            }
        }
        None
    }

    /// Rebuilds the cached payment fields of a sale from the ledger.
    ///
    /// An existing completion timestamp is kept; otherwise it is taken from
    /// the payment that crossed the total.
    pub fn reconcile(&self, snapshot: &PaymentSnapshot) -> PaymentTransition {
        let status = PaymentStatus::classify(self.total_paid, snapshot.total_amount);
        let completed_at = match status {
            PaymentStatus::Paid => snapshot
                .completed_at
                .or_else(|| self.completed_at(snapshot.total_amount)),
            _ => snapshot.completed_at,
        };

        PaymentTransition {
            previous_status: snapshot.status,
            status,
            paid_amount: self.total_paid,
            completed_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn tx(amount: i64, paid_at: DateTime<Utc>) -> PaymentTransaction {
        PaymentTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            sale_id: "sale-1".to_string(),
            amount: Money::from_cents(amount),
            paid_at,
            method: PaymentMethod::Pix,
            notes: None,
            recorded_by: "user-1".to_string(),
            created_at: paid_at,
        }
    }

    #[test]
    fn test_classify_thresholds() {
        let total = Money::from_cents(100_000);
        assert_eq!(PaymentStatus::classify(Money::zero(), total), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::classify(Money::from_cents(99_999), total), PaymentStatus::Partial);
        assert_eq!(PaymentStatus::classify(total, total), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::classify(Money::from_cents(150_000), total), PaymentStatus::Paid);
    }

    #[test]
    fn test_classify_zero_total() {
        assert_eq!(PaymentStatus::classify(Money::zero(), Money::zero()), PaymentStatus::Pending);
    }

    #[test]
    fn test_pending_to_partial_to_paid() {
        let snapshot = PaymentSnapshot::unpaid(Money::from_cents(100_000));

        let first = apply_payment(&snapshot, Money::from_cents(40_000), t0()).unwrap();
        assert_eq!(first.previous_status, PaymentStatus::Pending);
        assert_eq!(first.status, PaymentStatus::Partial);
        assert_eq!(first.completed_at, None);
        assert!(!first.entered_paid());

        let snapshot = PaymentSnapshot {
            paid_amount: first.paid_amount,
            status: first.status,
            completed_at: first.completed_at,
            ..snapshot
        };
        let later = t0() + Duration::days(3);
        let second = apply_payment(&snapshot, Money::from_cents(60_000), later).unwrap();
        assert_eq!(second.status, PaymentStatus::Paid);
        assert_eq!(second.paid_amount.cents(), 100_000);
        assert_eq!(second.completed_at, Some(later));
        assert!(second.entered_paid());
    }

    #[test]
    fn test_overpayment_keeps_original_completion() {
        let snapshot = PaymentSnapshot {
            paid_amount: Money::from_cents(100_000),
            total_amount: Money::from_cents(100_000),
            status: PaymentStatus::Paid,
            completed_at: Some(t0()),
        };
        let next = apply_payment(&snapshot, Money::from_cents(500), t0() + Duration::days(1)).unwrap();
        assert_eq!(next.status, PaymentStatus::Paid);
        assert_eq!(next.completed_at, Some(t0()));
        assert!(!next.entered_paid());
    }

    #[test]
    fn test_rejects_non_positive_payment() {
        let snapshot = PaymentSnapshot::unpaid(Money::from_cents(1000));
        for bad in [0, -1, -5000] {
            let err = apply_payment(&snapshot, Money::from_cents(bad), t0()).unwrap_err();
            assert!(matches!(err, CoreError::InvalidAmount { .. }));
        }
    }

    #[test]
    fn test_parse_payment_amount() {
        assert_eq!(parse_payment_amount("R$ 250,75").unwrap().cents(), 25_075);
        assert!(matches!(parse_payment_amount("-3"), Err(CoreError::InvalidAmount { .. })));
        assert!(matches!(parse_payment_amount("dez"), Err(CoreError::InvalidAmount { .. })));
    }

    #[test]
    fn test_ledger_fold_and_reconcile() {
        let ledger = PaymentLedger::fold(&[
            tx(30_000, t0() + Duration::days(2)),
            tx(50_000, t0()),
            tx(20_000, t0() + Duration::days(5)),
        ]);
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.total_paid().cents(), 100_000);
        assert_eq!(
            ledger.completed_at(Money::from_cents(80_000)),
            Some(t0() + Duration::days(2))
        );

        // Cache drifted: says partial with 50k.
        let stale = PaymentSnapshot {
            paid_amount: Money::from_cents(50_000),
            total_amount: Money::from_cents(100_000),
            status: PaymentStatus::Partial,
            completed_at: None,
        };
        let fixed = ledger.reconcile(&stale);
        assert_eq!(fixed.paid_amount.cents(), 100_000);
        assert_eq!(fixed.status, PaymentStatus::Paid);
        assert_eq!(fixed.completed_at, Some(t0() + Duration::days(5)));
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = PaymentLedger::fold(&[]);
        assert!(ledger.is_empty());
        let result = ledger.reconcile(&PaymentSnapshot::unpaid(Money::from_cents(10)));
        assert_eq!(result.status, PaymentStatus::Pending);
        assert_eq!(ledger.completed_at(Money::zero()), None);
    }

    proptest! {
        #[test]
        fn prop_thresholds(paid in 0i64..1_000_000, total in 0i64..1_000_000) {
            let status = PaymentStatus::classify(Money::from_cents(paid), Money::from_cents(total));
            let expected = if paid == 0 {
                PaymentStatus::Pending
            } else if paid < total {
                PaymentStatus::Partial
            } else {
                PaymentStatus::Paid
            };
            prop_assert_eq!(status, expected);
        }

        #[test]
        fn prop_paid_is_monotonic(
            total in 1i64..1_000_000,
            payments in proptest::collection::vec(1i64..200_000, 1..20),
        ) {
            let mut snapshot = PaymentSnapshot::unpaid(Money::from_cents(total));
            let mut seen_paid = false;
            for (i, amount) in payments.into_iter().enumerate() {
                let now = t0() + Duration::minutes(i as i64);
                let next = apply_payment(&snapshot, Money::from_cents(amount), now).unwrap();
                prop_assert!(next.paid_amount > snapshot.paid_amount);
                if seen_paid {
                    prop_assert_eq!(next.status, PaymentStatus::Paid);
                    prop_assert_eq!(next.completed_at, snapshot.completed_at);
                }
                seen_paid |= next.status == PaymentStatus::Paid;
                snapshot = PaymentSnapshot {
                    paid_amount: next.paid_amount,
                    status: next.status,
                    completed_at: next.completed_at,
                    ..snapshot
                };
            }
        }
    }
}
