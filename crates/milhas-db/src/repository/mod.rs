//! # Repository Module
//!
//! Database repository implementations for Milhas Desk.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Service (milhas-sales)                                                 │
//! │       │                                                                 │
//! │       │  db.sales().insert_sale(&sale)                                  │
//! │       ▼                                                                 │
//! │  SaleRepository                                                         │
//! │  ├── insert_sale / insert_segments                                      │
//! │  └── get_by_id / get_segments / list_for_supplier                       │
//! │                                                                         │
//! │  PaymentRepository                                                      │
//! │  └── record_locked / reconcile_locked  (BEGIN IMMEDIATE)                │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SupplierRepository`](supplier::SupplierRepository) - Idempotent supplier provisioning
//! - [`SaleRepository`](sale::SaleRepository) - Sales and flight segments
//! - [`InterestConfigRepository`](interest::InterestConfigRepository) - Credit interest tables
//! - [`PaymentRepository`](payment::PaymentRepository) - Append-only payment ledger
//! - [`AccessWhitelistRepository`](whitelist::AccessWhitelistRepository) - Subscription bypass list

pub mod interest;
pub mod payment;
pub mod sale;
pub mod supplier;
pub mod whitelist;
