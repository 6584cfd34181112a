//! # Money
//!
//! Centavo-exact amounts for prices, costs, installments and payments.
//!
//! ## Centavos, Not Floats
//! ```text
//! 50.000 miles at R$ 29,00 per thousand, 20% margin:
//!   floats:    50 × 29.0 / (1 - 0.2)   = 1812.4999999999998
//!   centavos:  145000 × 10000 / 8000   = 181250  (R$ 1.812,50)
//! ```
//! Every division rounds half away from zero, explicitly.
//!
//! ## Usage
//! ```rust
//! use milhas_core::money::Money;
//!
//! let fee = Money::from_cents(5000);                 // R$ 50,00
//! let total = fee * 2i64 + Money::from_cents(150);   // R$ 101,50
//! assert_eq!(total.cents(), 10150);
//!
//! let typed = Money::parse_decimal("1.875,50").unwrap();
//! assert_eq!(typed.cents(), 187550);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::Rate;

// =============================================================================
// Rounding
// =============================================================================

/// Integer division rounding half away from zero.
///
/// `den` must be non-zero.
pub(crate) fn round_div(num: i128, den: i128) -> i128 {
    let half = den.abs() / 2;
    if (num < 0) != (den < 0) {
        (num - half * den.signum()) / den
    } else {
        (num + half * den.signum()) / den
    }
}

/// Clamps an i128 intermediate into the centavo range.
fn saturate(value: i128) -> Money {
    Money(i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX }))
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (1/100 of a real).
///
/// ```text
/// cost_per_thousand ──► PricingBreakdown.total_cost ──► suggested_price
/// Sale.total_amount ──► InstallmentQuote.final_price
/// PaymentTransaction.amount ──► Sale.paid_amount ──► PaymentStatus
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Reais plus centavos; the sign of `major` applies to both.
    ///
    /// ```rust
    /// use milhas_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(29, 90).cents(), 2990);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole reais, truncated toward zero.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Centavos below one real, 0-99 regardless of sign.
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Strictly greater than zero. Payment amounts must satisfy this.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Negative values become zero; used to clamp untrusted pricing inputs.
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Computes `self × numerator / denominator`, rounded to the centavo.
    ///
    /// Uses i128 internally so `miles × cost_per_thousand` cannot overflow;
    /// a result outside the i64 range saturates.
    ///
    /// ## Panics
    /// If `denominator` is zero.
    ///
    /// ```rust
    /// use milhas_core::money::Money;
    ///
    /// // 50.000 miles at R$ 29,00 per thousand
    /// let cpm = Money::from_cents(2900);
    /// assert_eq!(cpm.mul_div(50_000, 1000).cents(), 145_000);
    /// ```
    pub fn mul_div(&self, numerator: i64, denominator: i64) -> Money {
        saturate(round_div(
            i128::from(self.0) * i128::from(numerator),
            i128::from(denominator),
        ))
    }

    /// One of `parts` equal shares, rounded to the centavo. The shares need
    /// not add back up to `self`.
    ///
    /// ## Panics
    /// If `parts` is zero.
    ///
    /// ```rust
    /// use milhas_core::money::Money;
    ///
    /// // R$ 100,00 in 3 installments → R$ 33,33 each
    /// assert_eq!(Money::from_cents(10_000).divide_rounded(3).cents(), 3333);
    /// ```
    pub fn divide_rounded(&self, parts: i64) -> Money {
        saturate(round_div(i128::from(self.0), i128::from(parts)))
    }

    /// The share of `self` given by `rate`, e.g. interest or a markup.
    ///
    /// ```rust
    /// use milhas_core::money::Money;
    /// use milhas_core::types::Rate;
    ///
    /// // 5,99% interest on R$ 1.000,00
    /// let interest = Money::from_cents(100_000).apply_rate(Rate::from_bps(599));
    /// assert_eq!(interest.cents(), 5990);
    /// ```
    pub fn apply_rate(&self, rate: Rate) -> Money {
        self.mul_div(rate.bps() as i64, 10_000)
    }

    /// Parses a typed amount in Brazilian or plain decimal notation.
    ///
    /// ## Accepted Forms
    /// ```text
    /// "1875"          → 187500
    /// "1875.5"        → 187550
    /// "1875,50"       → 187550
    /// "1.875,50"      → 187550   ('.' as thousands separator when ',' present)
    /// "R$ 1.875,50"   → 187550
    /// "-10,00"        → -1000
    /// ```
    ///
    /// ## Errors
    /// [`CoreError::InvalidAmount`] for empty input, non-digits, more than two
    /// decimal places or values that overflow i64 centavos.
    pub fn parse_decimal(input: &str) -> CoreResult<Money> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix("R$").unwrap_or(trimmed).trim();

        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };

        if body.is_empty() {
            return Err(CoreError::invalid_amount("amount is empty"));
        }

        let normalized: String = if body.contains(',') {
            body.chars().filter(|c| *c != '.').collect()
        } else {
            body.to_string()
        };
        let separator = if normalized.contains(',') { ',' } else { '.' };

        let mut parts = normalized.splitn(2, separator);
        let whole = parts.next().unwrap_or_default();
        let fraction = parts.next().unwrap_or_default();

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::invalid_amount(format!("'{input}' is not a number")));
        }
        if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::invalid_amount(format!(
                "'{input}' must have at most two decimal places"
            )));
        }

        let overflow = || CoreError::invalid_amount(format!("'{input}' is too large"));

        let reais: i64 = whole.parse().map_err(|_| overflow())?;
        let centavos: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| overflow())? * 10,
            _ => fraction.parse().map_err(|_| overflow())?,
        };

        let cents = reais
            .checked_mul(100)
            .and_then(|c| c.checked_add(centavos))
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Operators
// =============================================================================

/// Shows money as `R$ 1.875,00`.
///
/// ## Note
/// Debug/log formatting only. The frontend owns localized display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let digits = self.reais().abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        write!(f, "{}R$ {},{:02}", sign, grouped, self.cents_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, factor: i64) -> Self {
        Money(self.0.saturating_mul(factor))
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, factor: u32) -> Self {
        self * i64::from(factor)
    }
}

/// Summing a ledger of payments.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_saturates_at_the_bounds() {
        let max = Money::from_cents(i64::MAX);
        let min = Money::from_cents(i64::MIN);

        assert_eq!(max + Money::from_cents(1), max);
        assert_eq!(min - Money::from_cents(1), min);
        assert_eq!(max * 2i64, max);
        assert_eq!(max * 3u32, max);
        assert_eq!(max * -2i64, min);
        assert_eq!(max.mul_div(2900, 1000), max);
        assert_eq!(min.mul_div(2900, 1000), min);
        assert_eq!(min.divide_rounded(-1), max);
    }

    #[test]
    fn test_reais_and_cents_parts() {
        let money = Money::from_cents(187_550);
        assert_eq!(money.cents(), 187_550);
        assert_eq!(money.reais(), 1875);
        assert_eq!(money.cents_part(), 50);
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::from_cents(187_500).to_string(), "R$ 1.875,00");
        assert_eq!(Money::from_cents(500).to_string(), "R$ 5,00");
        assert_eq!(Money::from_cents(-550).to_string(), "-R$ 5,50");
        assert_eq!(Money::from_cents(123_456_789).to_string(), "R$ 1.234.567,89");
        assert_eq!(Money::zero().to_string(), "R$ 0,00");
    }

    #[test]
    fn test_round_div_half_away_from_zero() {
        assert_eq!(round_div(5, 2), 3);
        assert_eq!(round_div(-5, 2), -3);
        assert_eq!(round_div(4, 3), 1);
        assert_eq!(round_div(-4, 3), -1);
        assert_eq!(round_div(0, 7), 0);
    }

    #[test]
    fn test_mul_div_miles_cost() {
        // 12.345 miles at R$ 18,50 per thousand = R$ 228,3825 → R$ 228,38
        let cpm = Money::from_cents(1850);
        assert_eq!(cpm.mul_div(12_345, 1000).cents(), 22_838);
    }

    #[test]
    fn test_divide_rounded() {
        assert_eq!(Money::from_cents(10_000).divide_rounded(3).cents(), 3333);
        assert_eq!(Money::from_cents(20_000).divide_rounded(3).cents(), 6667);
        assert_eq!(Money::from_cents(187_500).divide_rounded(1).cents(), 187_500);
    }

    #[test]
    fn test_apply_rate() {
        let amount = Money::from_cents(187_500);
        assert_eq!(amount.apply_rate(Rate::from_bps(1000)).cents(), 18_750);
        assert_eq!(amount.apply_rate(Rate::zero()).cents(), 0);
    }

    #[test]
    fn test_parse_decimal_accepted_forms() {
        assert_eq!(Money::parse_decimal("1875").unwrap().cents(), 187_500);
        assert_eq!(Money::parse_decimal("1875.5").unwrap().cents(), 187_550);
        assert_eq!(Money::parse_decimal("1875,50").unwrap().cents(), 187_550);
        assert_eq!(Money::parse_decimal("1.875,50").unwrap().cents(), 187_550);
        assert_eq!(Money::parse_decimal("R$ 1.875,50").unwrap().cents(), 187_550);
        assert_eq!(Money::parse_decimal(" 0,05 ").unwrap().cents(), 5);
        assert_eq!(Money::parse_decimal("-10,00").unwrap().cents(), -1000);
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        for bad in ["", "   ", "abc", "12a", "1,2,3", "10.123", "R$", "-", ",50", "1e5"] {
            let err = Money::parse_decimal(bad).unwrap_err();
            assert!(matches!(err, CoreError::InvalidAmount { .. }), "input {bad:?}");
        }
    }

    #[test]
    fn test_parse_decimal_overflow() {
        assert!(Money::parse_decimal("999999999999999999999").is_err());
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let entry = Money::from_cents(1000);
        let parcel = Money::from_cents(500);
        assert_eq!((entry + parcel).cents(), 1500);
        assert_eq!((entry - parcel).cents(), 500);
        assert_eq!((entry * 3i64).cents(), 3000);
        assert_eq!((entry * 2u32).cents(), 2000);

        let mut running = entry;
        running -= parcel;
        running += Money::from_cents(50);
        assert_eq!(running.cents(), 550);

        let ledger = [entry, parcel, Money::from_cents(250)];
        assert_eq!(ledger.iter().sum::<Money>().cents(), 1750);
        assert_eq!(Vec::<Money>::new().into_iter().sum::<Money>(), Money::zero());
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(Money::from_cents(-1).non_negative(), Money::zero());
        assert_eq!(Money::from_cents(42).non_negative().cents(), 42);
    }
}
