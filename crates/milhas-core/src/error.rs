//! # Errors
//!
//! [`ValidationError`] describes what is wrong with operator input;
//! [`CoreError`] adds the rule failures that are not about a single field.
//!
//! ```text
//! ValidationError ──► CoreError ──┐
//!                                  ├──► SalesError (milhas-sales) ──► UI
//!          DbError (milhas-db) ────┘
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A payment or money input is not a positive, well-formed amount.
    ///
    /// ## When This Occurs
    /// - Payment dialog submits `0` or a negative value
    /// - Free-text amount is not a number (`"abc"`, `"12,3,4"`)
    /// - Amount has more than two decimal places
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Sale channel tag not recognised (`internal` | `balcao`).
    #[error("Unknown sale channel: {0}")]
    UnknownChannel(String),

    /// Trip type tag not recognised (`one_way` | `round_trip` | `multi_city`).
    #[error("Unknown trip type: {0}")]
    UnknownTripType(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Field validation
// =============================================================================

/// A single rejected field, raised by [`crate::validation`] before a sale
/// form reaches the pipeline. `field` is the form field name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Missing, or blank after trimming.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Passenger, segment and installment counts.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// IATA codes, CPF digits, travel dates.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
