//! # Supplier Gate
//!
//! Answers "which supplier does this caller act as?". Every supplier-scoped
//! read or write goes through [`SupplierGate::resolve`].
//!
//! ```text
//! current_user() ── None ──────────────────────► Unauthenticated
//!      │
//!      ▼
//! ensure_supplier_for_user(user.id)
//!      ├── Err(e) ─────────────────────────────► ProvisioningFailed(e)
//!      ├── Ok(None) / Ok(Some("")) ────────────► ProvisioningFailed
//!      └── Ok(Some(id)) ───────────────────────► SupplierContext
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{SalesError, SalesResult};
use crate::traits::{CurrentUser, IdentityProvider, SupplierProvisioner};

/// The resolved caller and the supplier they act as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierContext {
    pub supplier_id: String,
    pub user: CurrentUser,
}

#[derive(Clone)]
pub struct SupplierGate {
    identity: Arc<dyn IdentityProvider>,
    provisioner: Arc<dyn SupplierProvisioner>,
}

impl SupplierGate {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        provisioner: Arc<dyn SupplierProvisioner>,
    ) -> Self {
        SupplierGate {
            identity,
            provisioner,
        }
    }

    /// Resolves the caller's supplier, provisioning one on first use.
    pub async fn resolve(&self) -> SalesResult<SupplierContext> {
        let user = self
            .identity
            .current_user()
            .await
            .ok_or(SalesError::Unauthenticated)?;

        let supplier_id = match self.provisioner.ensure_supplier_for_user(&user.id).await {
            Ok(Some(id)) if !id.trim().is_empty() => id,
            Ok(_) => {
                warn!(user_id = %user.id, "Provisioning returned no supplier id");
                return Err(SalesError::ProvisioningFailed(
                    "nenhum fornecedor retornado".to_string(),
                ));
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Supplier provisioning failed");
                return Err(SalesError::ProvisioningFailed(e.to_string()));
            }
        };

        debug!(user_id = %user.id, supplier_id = %supplier_id, "Supplier resolved");
        Ok(SupplierContext { supplier_id, user })
    }
}
