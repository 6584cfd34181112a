//! # milhas-sales: Sale Service Layer for Milhas Desk
//!
//! Everything between the sale form and the database: caller identity,
//! supplier resolution, sale creation, partial payments and access control.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Milhas Desk Services                            │
//! │                                                                         │
//! │  Host app (web / desktop shell)                                        │
//! │       │  SaleForm, NewPayment, login/logout                            │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  milhas-sales (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │  SessionIdentity ──► SupplierGate ──► SalePipeline              │   │
//! │  │        │                   │                                    │   │
//! │  │        │                   └────────► QuoteService              │   │
//! │  │        ├────────────────────────────► PaymentService            │   │
//! │  │        └────────────────────────────► AccessGate ──► billing    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  milhas-db (SQLite) ──► milhas-core (pure rules)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`traits`] - Collaborator seams (identity, provisioning, billing)
//! - [`identity`] - In-process session holder
//! - [`gate`] - Supplier resolution for the current caller
//! - [`pipeline`] - Sale + segment persistence
//! - [`payments`] - Ledger-backed partial payments
//! - [`quotes`] - Installment options from the supplier's interest table
//! - [`access`] - Whitelist cache and subscription retry
//! - [`config`] - TOML + environment configuration
//! - [`telemetry`] - tracing subscriber setup
//! - [`engine`] - Wiring of all of the above

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod identity;
pub mod payments;
pub mod pipeline;
pub mod quotes;
pub mod telemetry;
pub mod traits;

// =============================================================================
// Re-exports
// =============================================================================

pub use access::{AccessDecision, AccessGate, RetryPolicy, WhitelistCache};
pub use config::EngineConfig;
pub use engine::SalesEngine;
pub use error::{SalesError, SalesResult};
pub use gate::{SupplierContext, SupplierGate};
pub use identity::SessionIdentity;
pub use payments::{NewPayment, PaymentReceipt, PaymentService};
pub use pipeline::{CreateSaleResponse, SalePipeline};
pub use quotes::QuoteService;
pub use traits::{
    CurrentUser, IdentityProvider, SubscriptionBilling, SubscriptionStatus, SupplierProvisioner,
    WhitelistSource,
};
