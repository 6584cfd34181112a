//! # Sales Engine
//!
//! Wires configuration, storage and the services around one shared
//! [`SessionIdentity`]. Host applications hold one engine for their lifetime.
//!
//! ```rust,ignore
//! let config = EngineConfig::load(None)?;
//! telemetry::init_tracing(Some(&config.logging.filter));
//! let engine = SalesEngine::open(&config, billing).await?;
//!
//! engine.session().login(user_id, email).await;
//! if engine.access().check_access().await?.is_allowed() {
//!     let response = engine.pipeline().submit(&form).await;
//! }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::access::{AccessGate, RetryPolicy};
use crate::config::EngineConfig;
use crate::error::SalesResult;
use crate::gate::SupplierGate;
use crate::identity::SessionIdentity;
use crate::payments::PaymentService;
use crate::pipeline::SalePipeline;
use crate::quotes::QuoteService;
use crate::traits::SubscriptionBilling;
use milhas_db::Database;

pub struct SalesEngine {
    db: Database,
    session: Arc<SessionIdentity>,
    gate: SupplierGate,
    pipeline: SalePipeline,
    payments: PaymentService,
    quotes: QuoteService,
    access: AccessGate,
}

impl SalesEngine {
    /// Opens the database from `config` (running migrations) and builds the
    /// services.
    pub async fn open(
        config: &EngineConfig,
        billing: Arc<dyn SubscriptionBilling>,
    ) -> SalesResult<Self> {
        config.validate()?;
        let db = Database::new(config.db_config()).await?;
        info!(path = %config.database.path.display(), "Sales engine ready");
        Ok(Self::with_database(db, billing, config.retry_policy()))
    }

    pub fn with_database(
        db: Database,
        billing: Arc<dyn SubscriptionBilling>,
        policy: RetryPolicy,
    ) -> Self {
        let session = Arc::new(SessionIdentity::new());
        let provisioner = Arc::new(db.clone());
        let gate = SupplierGate::new(session.clone(), provisioner.clone());

        SalesEngine {
            pipeline: SalePipeline::new(db.clone(), session.clone(), gate.clone()),
            payments: PaymentService::new(db.clone(), session.clone()),
            quotes: QuoteService::new(db.clone(), gate.clone()),
            access: AccessGate::new(session.clone(), provisioner, billing, policy),
            db,
            session,
            gate,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn session(&self) -> &SessionIdentity {
        &self.session
    }

    pub fn gate(&self) -> &SupplierGate {
        &self.gate
    }

    pub fn pipeline(&self) -> &SalePipeline {
        &self.pipeline
    }

    pub fn payments(&self) -> &PaymentService {
        &self.payments
    }

    pub fn quotes(&self) -> &QuoteService {
        &self.quotes
    }

    pub fn access(&self) -> &AccessGate {
        &self.access
    }

    /// Ends the session and forgets cached access answers.
    pub async fn logout(&self) {
        self.session.logout().await;
        self.access.invalidate_cache().await;
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}
