//! # Database Errors
//!
//! [`DbError`] is what every repository returns. Raw `sqlx` errors are
//! classified once, here, so the service layer can match on constraint
//! failures and decide what is worth retrying.
//!
//! ```text
//! sqlx::Error ──► DbError ──► SalesError (milhas-sales)
//!                   │
//!                   ├── constraint kinds (UNIQUE / FOREIGN KEY / CHECK)
//!                   ├── pool state (timed out / closed)
//!                   └── everything else as text
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    // =========================================================================
    // Lookups
    // =========================================================================
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A persisted row violates an invariant the schema cannot express,
    /// e.g. a balcão sale with no seller.
    #[error("Corrupt {entity} row {id}: {reason}")]
    CorruptRow {
        entity: String,
        id: String,
        reason: String,
    },

    // =========================================================================
    // Constraints
    // =========================================================================
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Segment or payment pointing at a sale that does not exist, or a sale
    /// pointing at an unknown supplier.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    // =========================================================================
    // Pool / schema
    // =========================================================================
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Every connection stayed busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    // =========================================================================
    // Anything else
    // =========================================================================
    /// SQL accepted by the driver but rejected by SQLite (missing table,
    /// bad column, NOT NULL).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn corrupt(entity: impl Into<String>, id: impl Into<String>, reason: impl Into<String>) -> Self {
        DbError::CorruptRow {
            entity: entity.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// True for pool-level failures, where the same statement may succeed
    /// on a later attempt. Constraint and query errors never do.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::PoolExhausted | DbError::ConnectionFailed(_))
    }
}

/// SQLite reports the offending column as `"UNIQUE constraint failed: t.col"`.
fn unique_field(message: &str) -> String {
    message
        .rsplit_once(": ")
        .map(|(_, columns)| columns.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let db_err = match err {
            sqlx::Error::Database(db_err) => db_err,
            sqlx::Error::RowNotFound => return DbError::not_found("Record", "unknown"),
            sqlx::Error::PoolTimedOut => return DbError::PoolExhausted,
            sqlx::Error::PoolClosed => return DbError::ConnectionFailed("Pool is closed".to_string()),
            sqlx::Error::Io(io) => return DbError::ConnectionFailed(io.to_string()),
            other => return DbError::Internal(other.to_string()),
        };

        let message = db_err.message().to_string();
        match db_err.kind() {
            ErrorKind::UniqueViolation => DbError::duplicate(unique_field(&message), "unknown"),
            ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
            ErrorKind::CheckViolation => DbError::CheckViolation { message },
            _ => DbError::QueryFailed(message),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
