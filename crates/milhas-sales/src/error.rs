//! # Sales Error Types
//!
//! What callers of the service layer see.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sales Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Identity     │  │      Input      │  │      Persistence        │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │ Unauthenticated │  │  Validation     │  │  Persistence (sale)     │ │
//! │  │ ProvisioningFail│  │  InvalidAmount  │  │  SaleNotFound           │ │
//! │  └─────────────────┘  └─────────────────┘  │  Database               │ │
//! │                                            └─────────────────────────┘ │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │     Access      │  │  Configuration  │                              │
//! │  │                 │  │                 │                              │
//! │  │ SubscriptionUn- │  │  Config         │                              │
//! │  │   available     │  │                 │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed segment batch is not an error value: the pipeline logs it with
//! `warn!` and still reports the sale id.

use thiserror::Error;

use milhas_core::{CoreError, ValidationError};
use milhas_db::DbError;

/// Result type alias for service operations.
pub type SalesResult<T> = Result<T, SalesError>;

#[derive(Debug, Error)]
pub enum SalesError {
    // =========================================================================
    // Identity Errors
    // =========================================================================
    /// No active caller identity.
    #[error("Usuário não autenticado")]
    Unauthenticated,

    /// The supplier for the caller could not be resolved.
    #[error("Falha ao provisionar fornecedor: {0}")]
    ProvisioningFailed(String),

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// Sale form rejected before reaching storage.
    #[error("Dados da venda inválidos: {0}")]
    Validation(#[from] ValidationError),

    /// Payment increment is zero, negative or not a number.
    #[error("Valor de pagamento inválido: {0}")]
    InvalidAmount(String),

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// Storage rejected the sale insert. Carries the storage message verbatim.
    #[error("Erro ao criar venda: {0}")]
    Persistence(String),

    /// Referenced sale does not exist.
    #[error("Venda não encontrada: {0}")]
    SaleNotFound(String),

    /// Any other storage failure.
    #[error("Erro de banco de dados: {0}")]
    Database(#[from] DbError),

    // =========================================================================
    // Access Errors
    // =========================================================================
    /// Billing backend could not answer the subscription check.
    #[error("Assinatura indisponível: {0}")]
    SubscriptionUnavailable(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuração inválida: {0}")]
    Config(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for SalesError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidAmount { reason } => SalesError::InvalidAmount(reason),
            CoreError::Validation(v) => SalesError::Validation(v),
            CoreError::UnknownChannel(tag) => SalesError::Validation(ValidationError::InvalidFormat {
                field: "channel".to_string(),
                reason: format!("unknown channel '{tag}'"),
            }),
            CoreError::UnknownTripType(tag) => {
                SalesError::Validation(ValidationError::InvalidFormat {
                    field: "trip_type".to_string(),
                    reason: format!("unknown trip type '{tag}'"),
                })
            }
        }
    }
}

impl From<std::io::Error> for SalesError {
    fn from(err: std::io::Error) -> Self {
        SalesError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for SalesError {
    fn from(err: toml::de::Error) -> Self {
        SalesError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SalesError {
    fn from(err: toml::ser::Error) -> Self {
        SalesError::Config(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SalesError {
    /// Returns true if the operation may succeed when repeated unchanged.
    ///
    /// ## Retryable Errors
    /// - Billing backend unavailable
    /// - Pool exhaustion / dropped database connection
    ///
    /// Identity, input and configuration errors are never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SalesError::SubscriptionUnavailable(_) => true,
            SalesError::Database(err) => err.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_prefix() {
        let err = SalesError::Persistence("CHECK constraint failed: passengers".to_string());
        assert_eq!(
            err.to_string(),
            "Erro ao criar venda: CHECK constraint failed: passengers"
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(SalesError::SubscriptionUnavailable("503".into()).is_retryable());
        assert!(SalesError::Database(DbError::PoolExhausted).is_retryable());

        assert!(!SalesError::Unauthenticated.is_retryable());
        assert!(!SalesError::InvalidAmount("0".into()).is_retryable());
        assert!(!SalesError::Database(DbError::not_found("Sale", "x")).is_retryable());
    }

    #[test]
    fn test_core_error_conversion() {
        let err: SalesError = CoreError::invalid_amount("must be greater than zero").into();
        assert!(matches!(err, SalesError::InvalidAmount(ref r) if r == "must be greater than zero"));

        let err: SalesError = CoreError::UnknownTripType("circle".into()).into();
        assert!(matches!(
            err,
            SalesError::Validation(ValidationError::InvalidFormat { ref field, .. }) if field == "trip_type"
        ));
    }
}
