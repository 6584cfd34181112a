//! # Quote Service
//!
//! Installment options and interest table maintenance for the caller's
//! supplier. The supplier always comes from [`SupplierGate::resolve`].

use tracing::info;

use crate::error::SalesResult;
use crate::gate::SupplierGate;
use milhas_core::installments::{quote, quote_all, InstallmentQuote, InterestTable};
use milhas_core::validation::validate_installments;
use milhas_core::{InterestConfig, Money, Rate};
use milhas_db::Database;

#[derive(Clone)]
pub struct QuoteService {
    db: Database,
    gate: SupplierGate,
}

impl QuoteService {
    pub fn new(db: Database, gate: SupplierGate) -> Self {
        QuoteService { db, gate }
    }

    /// Options 1..=`max` for the installment selector.
    pub async fn installment_options(&self, total: Money, max: u32) -> SalesResult<Vec<InstallmentQuote>> {
        validate_installments(max)?;
        let table = self.interest_table().await?;
        Ok(quote_all(&table, total, max))
    }

    /// A single option, e.g. the one the customer picked.
    pub async fn installment_quote(&self, total: Money, installments: u32) -> SalesResult<InstallmentQuote> {
        validate_installments(installments)?;
        let table = self.interest_table().await?;
        Ok(quote(&table, total, installments))
    }

    /// Sets (or re-activates) the rate for an installment count.
    pub async fn set_interest_rate(&self, installments: u32, rate: Rate) -> SalesResult<InterestConfig> {
        validate_installments(installments)?;
        let context = self.gate.resolve().await?;

        let config = self
            .db
            .interest_configs()
            .upsert(&context.supplier_id, installments, rate)
            .await?;
        info!(
            supplier_id = %context.supplier_id,
            installments,
            bps = rate.bps(),
            "Interest rate updated"
        );
        Ok(config)
    }

    /// Removes an installment count from the active table.
    pub async fn disable_installments(&self, installments: u32) -> SalesResult<()> {
        let context = self.gate.resolve().await?;
        self.db
            .interest_configs()
            .deactivate(&context.supplier_id, installments)
            .await?;
        Ok(())
    }

    async fn interest_table(&self) -> SalesResult<InterestTable> {
        let context = self.gate.resolve().await?;
        let configs = self.db.interest_configs().list_active(&context.supplier_id).await?;
        Ok(InterestTable::from_configs(&configs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SalesError;
    use crate::identity::SessionIdentity;
    use milhas_db::DbConfig;
    use std::sync::Arc;

    async fn setup() -> (Arc<SessionIdentity>, QuoteService) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let identity = Arc::new(SessionIdentity::new());
        let gate = SupplierGate::new(identity.clone(), Arc::new(db.clone()));
        (identity, QuoteService::new(db, gate))
    }

    #[tokio::test]
    async fn test_options_use_supplier_table() {
        let (identity, service) = setup().await;
        identity.login("user-1", None).await;

        service.set_interest_rate(6, Rate::from_bps(599)).await.unwrap();
        service.set_interest_rate(3, Rate::from_bps(299)).await.unwrap();
        service.disable_installments(3).await.unwrap();

        let total = Money::from_major_minor(1000, 0);
        let options = service.installment_options(total, 6).await.unwrap();

        assert_eq!(options.len(), 6);
        assert_eq!(options[2].final_price, total);
        assert_eq!(options[5].final_price, Money::from_major_minor(1059, 90));
        assert_eq!(options[5].installment_value, Money::from_cents(17_665));
    }

    #[tokio::test]
    async fn test_tables_are_per_supplier() {
        let (identity, service) = setup().await;
        identity.login("user-1", None).await;
        service.set_interest_rate(2, Rate::from_bps(500)).await.unwrap();

        identity.login("user-2", None).await;
        let quote = service
            .installment_quote(Money::from_cents(10_000), 2)
            .await
            .unwrap();

        assert_eq!(quote.interest_rate, Rate::zero());
        assert_eq!(quote.installment_value.cents(), 5_000);
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_counts() {
        let (identity, service) = setup().await;
        identity.login("user-1", None).await;

        for n in [0, 25] {
            let err = service.installment_quote(Money::from_cents(100), n).await.unwrap_err();
            assert!(matches!(err, SalesError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_requires_session() {
        let (_identity, service) = setup().await;
        let err = service.installment_options(Money::from_cents(100), 3).await.unwrap_err();
        assert!(matches!(err, SalesError::Unauthenticated));
    }
}
