//! # milhas-core: Pure Business Logic for Milhas Desk
//!
//! This crate holds every rule of the miles-resale back office that can be
//! expressed without touching a database or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Milhas Desk Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web Frontend (sale form)                     │   │
//! │  │   Price fields ──► Installment selector ──► Payment dialog      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 milhas-sales (service layer)                    │   │
//! │  │   SupplierGate, SalePipeline, PaymentService, AccessGate        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ milhas-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────────┐ ┌──────────────┐  │   │
//! │  │   │  money   │ │ pricing  │ │ installments │ │payment_state │  │   │
//! │  │   │  Money   │ │Breakdown │ │ InterestTable│ │PaymentStatus │  │   │
//! │  │   │  Rate    │ │          │ │ Quote        │ │ Transition   │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────────┘ └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  milhas-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, FlightSegment, InterestConfig, ...)
//! - [`money`] - Money type with integer arithmetic (centavos)
//! - [`pricing`] - Cost, suggested price and margin for a miles ticket
//! - [`installments`] - Installment interest from a supplier's rate table
//! - [`payment_state`] - Payment status derivation from paid vs total
//! - [`validation`] - Sale form validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use milhas_core::money::Money;
//! use milhas_core::pricing::{calculate, PricingInput};
//! use milhas_core::types::Rate;
//!
//! let breakdown = calculate(&PricingInput {
//!     miles_used: 50_000,
//!     cost_per_thousand: Money::from_major_minor(29, 0),
//!     boarding_fee: Money::from_major_minor(50, 0),
//!     passengers: 1,
//!     target_margin: Some(Rate::from_bps(2000)),
//!     manual_price: None,
//! });
//!
//! assert_eq!(breakdown.total_cost, Money::from_major_minor(1500, 0));
//! assert_eq!(breakdown.suggested_price, Money::from_major_minor(1875, 0));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod installments;
pub mod money;
pub mod payment_state;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use payment_state::{PaymentStatus, PaymentTransition};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum passengers on a single sale.
///
/// Airlines cap award bookings at 9 seats per reservation.
pub const MAX_PASSENGERS: i64 = 9;

/// Maximum flight segments on a single sale.
pub const MAX_SEGMENTS: usize = 10;

/// Maximum installment count offered on the credit selector.
pub const MAX_INSTALLMENTS: u32 = 24;
