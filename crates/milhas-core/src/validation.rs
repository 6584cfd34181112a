//! # Validation Module
//!
//! Business-rule validation for sale forms and payment inputs.
//!
//! ## Where It Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Web form (browser)          empty fields, input masks                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  THIS MODULE                 business rules, before any write           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  SalePipeline / SQLite       NOT NULL, CHECK, foreign keys              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation happens upstream of the pipeline: a form that reaches
//! `SalePipeline::create_sale` is assumed valid.
//!
//! ## Usage
//! ```rust
//! use milhas_core::validation::{validate_installments, validate_airport_code};
//!
//! validate_installments(6).unwrap();
//! validate_airport_code("segments[0].from", "GRU").unwrap();
//! assert!(validate_installments(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{SaleChannel, SaleForm, SegmentForm};
use crate::{MAX_INSTALLMENTS, MAX_PASSENGERS, MAX_SEGMENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest customer name accepted.
pub const MAX_CUSTOMER_NAME_LEN: usize = 200;

// =============================================================================
// Sale Form
// =============================================================================

/// Validates a complete sale form.
///
/// ## Rules
/// - Customer name required, at most 200 characters
/// - 1 to 9 passengers
/// - 1 to 10 segments, each with valid and distinct airport codes
/// - Channel fields present for the selected channel
/// - Total price not negative
/// - CPF, when given, has 11 digits
///
/// Returns the first violation found.
pub fn validate_sale_form(form: &SaleForm) -> ValidationResult<()> {
    validate_customer_name(&form.customer_name)?;

    if let Some(cpf) = form.customer_cpf.as_deref() {
        if !cpf.trim().is_empty() {
            validate_cpf(cpf)?;
        }
    }

    validate_passengers(form.passengers)?;
    validate_channel(&form.channel)?;

    if form.total_price.is_negative() {
        return Err(ValidationError::MustBePositive {
            field: "total_price".to_string(),
        });
    }

    validate_segments(&form.segments)
}

/// Validates the customer name.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "customer_name".to_string(),
        });
    }

    if name.chars().count() > MAX_CUSTOMER_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "customer_name".to_string(),
            max: MAX_CUSTOMER_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a CPF: 11 digits once `.`, `-` and spaces are removed.
///
/// Check digits are not verified; the value is stored opaque.
pub fn validate_cpf(cpf: &str) -> ValidationResult<()> {
    let stripped: String = cpf
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' ' | '/'))
        .collect();

    if stripped.len() != 11 || !stripped.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "customer_cpf".to_string(),
            reason: "must contain 11 digits".to_string(),
        });
    }

    Ok(())
}

pub fn validate_passengers(passengers: i64) -> ValidationResult<()> {
    if !(1..=MAX_PASSENGERS).contains(&passengers) {
        return Err(ValidationError::OutOfRange {
            field: "passengers".to_string(),
            min: 1,
            max: MAX_PASSENGERS,
        });
    }
    Ok(())
}

/// Validates the fields carried by the selected channel.
pub fn validate_channel(channel: &SaleChannel) -> ValidationResult<()> {
    match channel {
        SaleChannel::Internal {
            program_id,
            account_id,
        } => {
            require("program_id", program_id)?;
            require("account_id", account_id)
        }
        SaleChannel::Balcao {
            seller_name,
            cost_per_thousand,
            ..
        } => {
            require("seller_name", seller_name)?;
            if cost_per_thousand.is_negative() {
                return Err(ValidationError::MustBePositive {
                    field: "cost_per_thousand".to_string(),
                });
            }
            Ok(())
        }
    }
}

/// Validates the ordered segment list.
pub fn validate_segments(segments: &[SegmentForm]) -> ValidationResult<()> {
    if segments.is_empty() {
        return Err(ValidationError::Required {
            field: "segments".to_string(),
        });
    }

    if segments.len() > MAX_SEGMENTS {
        return Err(ValidationError::OutOfRange {
            field: "segments".to_string(),
            min: 1,
            max: MAX_SEGMENTS as i64,
        });
    }

    for (index, segment) in segments.iter().enumerate() {
        validate_airport_code(&format!("segments[{index}].from"), &segment.from)?;
        validate_airport_code(&format!("segments[{index}].to"), &segment.to)?;

        if segment.from.trim().eq_ignore_ascii_case(segment.to.trim()) {
            return Err(ValidationError::InvalidFormat {
                field: format!("segments[{index}].to"),
                reason: "destination must differ from origin".to_string(),
            });
        }
    }

    Ok(())
}

/// Validates an IATA airport code (three ASCII letters, any case).
pub fn validate_airport_code(field: &str, code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{code}' is not a 3-letter airport code"),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an installment count (1 to 24).
pub fn validate_installments(installments: u32) -> ValidationResult<()> {
    if installments == 0 || installments > MAX_INSTALLMENTS {
        return Err(ValidationError::OutOfRange {
            field: "installments".to_string(),
            min: 1,
            max: MAX_INSTALLMENTS as i64,
        });
    }
    Ok(())
}

/// Validates a target margin in basis points (0 to 9999).
///
/// The calculator tolerates anything, but the form only offers margins
/// below 100%.
pub fn validate_margin_bps(bps: u32) -> ValidationResult<()> {
    if bps >= 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "target_margin".to_string(),
            min: 0,
            max: 9_999,
        });
    }
    Ok(())
}

/// Validates a payment amount (must be positive).
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

fn require(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
