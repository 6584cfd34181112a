//! # Collaborator Traits
//!
//! The seams between the sale engine and the systems around it.
//!
//! ```text
//! ┌──────────────────────┐     ┌────────────────────────────────────────┐
//! │ IdentityProvider     │     │ SessionIdentity (in-process)           │
//! │ SupplierProvisioner  │ ◄── │ Database (SQLite supplier upsert)      │
//! │ WhitelistSource      │ ◄── │ Database (access_whitelist table)      │
//! │ SubscriptionBilling  │ ◄── │ external billing backend (host app)    │
//! └──────────────────────┘     └────────────────────────────────────────┘
//! ```
//!
//! All traits are object safe and used behind `Arc<dyn ...>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SalesResult;
use milhas_db::Database;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
    /// Identifies the login session; changes on every login.
    pub session_id: String,
}

/// Answer from the billing backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub active: bool,
    pub plan: Option<String>,
}

/// Source of the current caller identity.
///
/// Queried fresh on every operation; implementations must not hand out a
/// user whose session has ended.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Option<CurrentUser>;
}

/// Idempotent "give me the supplier for this user" operation.
#[async_trait]
pub trait SupplierProvisioner: Send + Sync {
    /// Returns the existing supplier id, creating one on first use.
    ///
    /// `Ok(None)` means the backend answered without an id.
    async fn ensure_supplier_for_user(&self, user_id: &str) -> SalesResult<Option<String>>;
}

#[async_trait]
pub trait WhitelistSource: Send + Sync {
    async fn is_whitelisted(&self, user_id: &str) -> SalesResult<bool>;
}

/// External subscription billing.
///
/// Transient failures should be reported as
/// [`SalesError::SubscriptionUnavailable`](crate::SalesError::SubscriptionUnavailable)
/// so the access gate retries them.
#[async_trait]
pub trait SubscriptionBilling: Send + Sync {
    async fn check_subscription(&self, user_id: &str) -> SalesResult<SubscriptionStatus>;
}

// =============================================================================
// SQLite-backed implementations
// =============================================================================

#[async_trait]
impl SupplierProvisioner for Database {
    async fn ensure_supplier_for_user(&self, user_id: &str) -> SalesResult<Option<String>> {
        let id = self.suppliers().ensure_for_user(user_id).await?;
        Ok(Some(id))
    }
}

#[async_trait]
impl WhitelistSource for Database {
    async fn is_whitelisted(&self, user_id: &str) -> SalesResult<bool> {
        Ok(self.whitelist().contains(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use milhas_db::DbConfig;

    #[tokio::test]
    async fn test_database_provisioner_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first = db.ensure_supplier_for_user("user-1").await.unwrap();
        let second = db.ensure_supplier_for_user("user-1").await.unwrap();

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_database_whitelist_source() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(!db.is_whitelisted("user-1").await.unwrap());

        db.whitelist().add("user-1", None).await.unwrap();
        assert!(db.is_whitelisted("user-1").await.unwrap());
    }
}
