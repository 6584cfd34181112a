//! # milhas-db: Database Layer for Milhas Desk
//!
//! SQLite storage for the sale engine, accessed with sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Milhas Desk Data Flow                            │
//! │                                                                         │
//! │  SalePipeline / PaymentService (milhas-sales)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    milhas-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │   │   │
//! │  │   │               │    │ SupplierRepo   │   │              │   │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo       │   │ 001_initial_ │   │   │
//! │  │   │ WAL, FK on    │    │ InterestRepo   │   │   schema.sql │   │   │
//! │  │   │               │    │ PaymentRepo    │   │              │   │   │
//! │  │   │               │    │ WhitelistRepo  │   │              │   │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (EngineConfig.database.path)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use milhas_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("milhas.db")).await?;
//! let supplier_id = db.suppliers().ensure_for_user(&user_id).await?;
//! let table = db.interest_configs().list_active(&supplier_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::interest::InterestConfigRepository;
pub use repository::payment::PaymentRepository;
pub use repository::sale::SaleRepository;
pub use repository::supplier::{Supplier, SupplierRepository};
pub use repository::whitelist::AccessWhitelistRepository;
