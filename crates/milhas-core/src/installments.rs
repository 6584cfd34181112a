//! # Installment Engine
//!
//! Turns a supplier's credit interest table into per-installment values for
//! the installment selector.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │  credit_interest_config (active rows)                                  │
//! │     1x → 0%   2x → 0%   3x → 2,99%   6x → 5,99%   12x → 11,99%        │
//! │                               │                                        │
//! │                               ▼                                        │
//! │  quote(table, R$ 1.000,00, 6)                                          │
//! │     rate 5,99% → final R$ 1.059,90 → 6 × R$ 176,65                    │
//! │                                                                        │
//! │  quote(table, R$ 1.000,00, 4)   (no row for 4x)                        │
//! │     rate 0% → final R$ 1.000,00 → 4 × R$ 250,00                       │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{InterestConfig, Rate};

/// Lookup of installment count to interest rate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestTable {
    rates: BTreeMap<u32, Rate>,
}

impl InterestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from stored config rows.
    ///
    /// Inactive rows are skipped. When two active rows share an installment
    /// count the later one wins.
    pub fn from_configs(configs: &[InterestConfig]) -> Self {
        let rates = configs
            .iter()
            .filter(|config| config.is_active)
            .map(|config| (config.installments, config.interest_rate))
            .collect();
        InterestTable { rates }
    }

    /// Adds (or replaces) a row.
    pub fn with_rate(mut self, installments: u32, rate: Rate) -> Self {
        self.rates.insert(installments, rate);
        self
    }

    pub fn rate_for(&self, installments: u32) -> Option<Rate> {
        self.rates.get(&installments).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// One option on the installment selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InstallmentQuote {
    pub installments: u32,
    /// Applied rate; zero when the table has no row or a 0% row.
    pub interest_rate: Rate,
    pub final_price: Money,
    pub installment_value: Money,
}

impl InstallmentQuote {
    /// Interest charged on top of the cash price.
    pub fn interest_amount(&self, total: Money) -> Money {
        self.final_price - total
    }
}

/// Quotes `total` split into `installments` payments.
///
/// ## Panics
/// If `installments` is zero. Callers validate `installments >= 1` first
/// (see [`crate::validation::validate_installments`]).
pub fn quote(table: &InterestTable, total: Money, installments: u32) -> InstallmentQuote {
    let (interest_rate, final_price) = match table.rate_for(installments) {
        Some(rate) if !rate.is_zero() => (rate, total.mul_div(10_000 + rate.bps() as i64, 10_000)),
        _ => (Rate::zero(), total),
    };

    InstallmentQuote {
        installments,
        interest_rate,
        final_price,
        installment_value: final_price.divide_rounded(installments as i64),
    }
}

/// Quotes every count from 1 to `max` inclusive.
pub fn quote_all(table: &InterestTable, total: Money, max: u32) -> Vec<InstallmentQuote> {
    (1..=max).map(|n| quote(table, total, n)).collect()
}
