//! # Pricing Calculator
//!
//! Derives passenger cost, suggested sale price, margin and per-mile figures
//! for a ticket issued with loyalty miles.
//!
//! ## Computation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. cost_per_passenger = miles / 1000 × cost_per_thousand + boarding    │
//! │  2. total_cost         = cost_per_passenger × passengers                │
//! │  3. suggested_price    = margin ∈ (0%, 100%)                            │
//! │                            ? total_cost / (1 - margin)                  │
//! │                            : total_cost              (no markup)        │
//! │  4. final_price        = manual_price > 0 ? manual_price : suggested    │
//! │  5. profit             = final_price - total_cost                       │
//! │     profit_margin      = final_price > 0 ? profit / final × 100 : 0     │
//! │  6. effective cost/mile, price/thousand = 0 when miles == 0             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The calculator never fails: negative money inputs clamp to zero, a
//! passenger count of zero counts as one, and every division is guarded.
//! The figures are advisory; they fill the price fields of the sale form.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::Rate;

/// Inputs typed on the sale form's pricing panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingInput {
    pub miles_used: u64,
    /// Cost paid per 1,000 miles.
    pub cost_per_thousand: Money,
    /// Boarding fee charged per passenger.
    pub boarding_fee: Money,
    pub passengers: u32,
    /// Desired margin over the final price. Outside (0%, 100%) means no markup.
    pub target_margin: Option<Rate>,
    /// Price typed by the operator; overrides the suggestion when positive.
    pub manual_price: Option<Money>,
}

impl Default for PricingInput {
    fn default() -> Self {
        PricingInput {
            miles_used: 0,
            cost_per_thousand: Money::zero(),
            boarding_fee: Money::zero(),
            passengers: 1,
            target_margin: None,
            manual_price: None,
        }
    }
}

/// Result of [`calculate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingBreakdown {
    pub cost_per_passenger: Money,
    pub total_cost: Money,
    pub suggested_price: Money,
    pub final_price: Money,
    pub profit: Money,
    /// Profit as a percentage of the final price (display only).
    pub profit_margin: f64,
    /// Total cost divided by miles used, in reais per mile (display only).
    pub effective_cost_per_mile: f64,
    /// Final price per 1,000 miles.
    pub price_per_thousand: Money,
}

/// Computes the pricing breakdown for a sale.
///
/// ## Example
/// ```rust
/// use milhas_core::money::Money;
/// use milhas_core::pricing::{calculate, PricingInput};
/// use milhas_core::types::Rate;
///
/// let b = calculate(&PricingInput {
///     miles_used: 50_000,
///     cost_per_thousand: Money::from_cents(2900),
///     boarding_fee: Money::from_cents(5000),
///     passengers: 1,
///     target_margin: Some(Rate::from_bps(2000)),
///     manual_price: None,
/// });
///
/// assert_eq!(b.cost_per_passenger.cents(), 150_000);
/// assert_eq!(b.suggested_price.cents(), 187_500);
/// assert_eq!(b.profit.cents(), 37_500);
/// assert_eq!(b.profit_margin, 20.0);
/// ```
pub fn calculate(input: &PricingInput) -> PricingBreakdown {
    let miles = i64::try_from(input.miles_used).unwrap_or(i64::MAX);
    let passengers = input.passengers.max(1);

    let cost_per_passenger = input.cost_per_thousand.non_negative().mul_div(miles, 1000)
        + input.boarding_fee.non_negative();
    let total_cost = cost_per_passenger * passengers;

    let suggested_price = match input.target_margin {
        Some(margin) if margin.bps() > 0 && margin < Rate::FULL => {
            // total / (1 - m) == total × 10000 / (10000 - m_bps)
            total_cost.mul_div(10_000, (Rate::FULL.bps() - margin.bps()) as i64)
        }
        _ => total_cost,
    };

    let final_price = match input.manual_price {
        Some(manual) if manual.is_positive() => manual,
        _ => suggested_price,
    };

    let profit = final_price - total_cost;
    let profit_margin = if final_price.is_positive() {
        (profit.cents() as f64 * 100.0) / final_price.cents() as f64
    } else {
        0.0
    };

    let (effective_cost_per_mile, price_per_thousand) = if miles > 0 {
        (
            total_cost.cents() as f64 / 100.0 / miles as f64,
            final_price.mul_div(1000, miles),
        )
    } else {
        (0.0, Money::zero())
    };

    PricingBreakdown {
        cost_per_passenger,
        total_cost,
        suggested_price,
        final_price,
        profit,
        profit_margin,
        effective_cost_per_mile,
        price_per_thousand,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference_input() -> PricingInput {
        PricingInput {
            miles_used: 50_000,
            cost_per_thousand: Money::from_major_minor(29, 0),
            boarding_fee: Money::from_major_minor(50, 0),
            passengers: 1,
            target_margin: Some(Rate::from_bps(2000)),
            manual_price: None,
        }
    }

    #[test]
    fn test_reference_calculation() {
        let b = calculate(&reference_input());

        assert_eq!(b.cost_per_passenger, Money::from_major_minor(1500, 0));
        assert_eq!(b.total_cost, Money::from_major_minor(1500, 0));
        assert_eq!(b.suggested_price, Money::from_major_minor(1875, 0));
        assert_eq!(b.final_price, Money::from_major_minor(1875, 0));
        assert_eq!(b.profit, Money::from_major_minor(375, 0));
        assert_eq!(b.profit_margin, 20.0);
        assert!((b.effective_cost_per_mile - 0.03).abs() < 1e-12);
        assert_eq!(b.price_per_thousand, Money::from_major_minor(37, 50));
    }

    #[test]
    fn test_multiple_passengers() {
        let b = calculate(&PricingInput {
            passengers: 3,
            ..reference_input()
        });
        assert_eq!(b.cost_per_passenger.cents(), 150_000);
        assert_eq!(b.total_cost.cents(), 450_000);
        assert_eq!(b.suggested_price.cents(), 562_500);
    }

    #[test]
    fn test_margin_outside_open_interval_means_no_markup() {
        for margin in [None, Some(Rate::zero()), Some(Rate::FULL), Some(Rate::from_bps(15_000))] {
            let b = calculate(&PricingInput {
                target_margin: margin,
                ..reference_input()
            });
            assert_eq!(b.suggested_price, b.total_cost, "margin {margin:?}");
            assert_eq!(b.profit, Money::zero());
            assert_eq!(b.profit_margin, 0.0);
        }
    }

    #[test]
    fn test_manual_price_overrides_suggestion() {
        let b = calculate(&PricingInput {
            manual_price: Some(Money::from_major_minor(2000, 0)),
            ..reference_input()
        });
        assert_eq!(b.suggested_price.cents(), 187_500);
        assert_eq!(b.final_price.cents(), 200_000);
        assert_eq!(b.profit.cents(), 50_000);
        assert_eq!(b.profit_margin, 25.0);
    }

    #[test]
    fn test_zero_manual_price_is_ignored() {
        let b = calculate(&PricingInput {
            manual_price: Some(Money::zero()),
            ..reference_input()
        });
        assert_eq!(b.final_price.cents(), 187_500);
    }

    #[test]
    fn test_manual_price_below_cost_yields_negative_margin() {
        let b = calculate(&PricingInput {
            manual_price: Some(Money::from_major_minor(1200, 0)),
            ..reference_input()
        });
        assert_eq!(b.profit.cents(), -30_000);
        assert_eq!(b.profit_margin, -25.0);
    }

    #[test]
    fn test_zero_miles_guards_per_mile_figures() {
        let b = calculate(&PricingInput {
            miles_used: 0,
            ..reference_input()
        });
        assert_eq!(b.cost_per_passenger.cents(), 5000);
        assert_eq!(b.effective_cost_per_mile, 0.0);
        assert_eq!(b.price_per_thousand, Money::zero());
    }

    #[test]
    fn test_everything_zero() {
        let b = calculate(&PricingInput::default());
        assert_eq!(b.final_price, Money::zero());
        assert_eq!(b.profit_margin, 0.0);
        assert_eq!(b.price_per_thousand, Money::zero());
    }

    #[test]
    fn test_invalid_inputs_are_clamped() {
        let b = calculate(&PricingInput {
            miles_used: 10_000,
            cost_per_thousand: Money::from_cents(-2000),
            boarding_fee: Money::from_cents(-100),
            passengers: 0,
            target_margin: None,
            manual_price: Some(Money::from_cents(-5)),
        });
        assert_eq!(b.total_cost, Money::zero());
        assert_eq!(b.final_price, Money::zero());
    }

    #[test]
    fn test_miles_beyond_i64_saturate() {
        let b = calculate(&PricingInput {
            miles_used: u64::MAX,
            cost_per_thousand: Money::from_cents(2900),
            passengers: 2,
            ..PricingInput::default()
        });
        assert_eq!(b.cost_per_passenger, Money::from_cents(i64::MAX));
        assert_eq!(b.total_cost, Money::from_cents(i64::MAX));
        assert_eq!(b.final_price, b.total_cost);
        assert_eq!(b.profit, Money::zero());
    }

    proptest! {
        #[test]
        fn prop_any_input_is_priced_without_panicking(
            miles in any::<u64>(),
            cpm in any::<i64>(),
            fee in any::<i64>(),
            passengers in any::<u32>(),
            margin in 0u32..=10_000,
            manual in proptest::option::of(any::<i64>()),
        ) {
            let b = calculate(&PricingInput {
                miles_used: miles,
                cost_per_thousand: Money::from_cents(cpm),
                boarding_fee: Money::from_cents(fee),
                passengers,
                target_margin: Some(Rate::from_bps(margin)),
                manual_price: manual.map(Money::from_cents),
            });
            prop_assert!(!b.total_cost.is_negative());
            prop_assert!(b.total_cost >= b.cost_per_passenger);
            prop_assert_eq!(b.profit, b.final_price - b.total_cost);
        }

        #[test]
        fn prop_final_price_non_decreasing_in_margin(
            miles in 0u64..1_000_000,
            cpm in 0i64..10_000,
            fee in 0i64..100_000,
            passengers in 1u32..10,
            a in 1u32..10_000,
            b in 1u32..10_000,
        ) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let base = PricingInput {
                miles_used: miles,
                cost_per_thousand: Money::from_cents(cpm),
                boarding_fee: Money::from_cents(fee),
                passengers,
                target_margin: None,
                manual_price: None,
            };
            let at_low = calculate(&PricingInput { target_margin: Some(Rate::from_bps(low)), ..base.clone() });
            let at_high = calculate(&PricingInput { target_margin: Some(Rate::from_bps(high)), ..base });
            prop_assert!(at_low.final_price <= at_high.final_price);
        }

        #[test]
        fn prop_manual_price_always_wins(
            miles in 0u64..1_000_000,
            cpm in 0i64..10_000,
            margin in proptest::option::of(0u32..20_000),
            manual in 1i64..100_000_000,
        ) {
            let b = calculate(&PricingInput {
                miles_used: miles,
                cost_per_thousand: Money::from_cents(cpm),
                target_margin: margin.map(Rate::from_bps),
                manual_price: Some(Money::from_cents(manual)),
                ..PricingInput::default()
            });
            prop_assert_eq!(b.final_price, Money::from_cents(manual));
        }

        #[test]
        fn prop_zero_miles_is_safe(
            cpm in 0i64..10_000,
            fee in 0i64..100_000,
            margin in 0u32..10_000,
        ) {
            let b = calculate(&PricingInput {
                miles_used: 0,
                cost_per_thousand: Money::from_cents(cpm),
                boarding_fee: Money::from_cents(fee),
                target_margin: Some(Rate::from_bps(margin)),
                ..PricingInput::default()
            });
            prop_assert_eq!(b.effective_cost_per_mile, 0.0);
            prop_assert_eq!(b.price_per_thousand, Money::zero());
        }

        #[test]
        fn prop_calculation_is_deterministic(
            miles in 0u64..1_000_000,
            cpm in -100i64..10_000,
            passengers in 0u32..10,
        ) {
            let input = PricingInput {
                miles_used: miles,
                cost_per_thousand: Money::from_cents(cpm),
                passengers,
                ..PricingInput::default()
            };
            prop_assert_eq!(calculate(&input), calculate(&input));
        }
    }
}
