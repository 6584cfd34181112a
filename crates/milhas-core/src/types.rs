//! # Domain Types
//!
//! Core domain types used throughout Milhas Desk.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │      Sale       │ 1 │  FlightSegment  │   │ PaymentTransaction  │   │
//! │  │  ─────────────  │──►│  ─────────────  │   │  ─────────────────  │   │
//! │  │  id (UUID)      │ * │  position 0..n  │   │  sale_id (FK)       │   │
//! │  │  supplier_id    │   │  origin/dest    │   │  amount (append-    │   │
//! │  │  channel ◄──────┼─┐ │  direction      │   │   only ledger)      │   │
//! │  │  total / paid   │ │ └─────────────────┘   └─────────────────────┘   │
//! │  └─────────────────┘ │                                                  │
//! │                      │ ┌─────────────────────────┐ ┌────────────────┐  │
//! │                      └─┤ SaleChannel             │ │ InterestConfig │  │
//! │                        │  Internal { program,    │ │  installments  │  │
//! │                        │            account }    │ │  rate (bps)    │  │
//! │                        │  Balcao { seller, cost }│ │  is_active     │  │
//! │                        └─────────────────────────┘ └────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Channel Exclusivity
//! A sale carries exactly one channel's field set. [`SaleChannel`] is a tagged
//! variant, so "both" or "neither" cannot be represented.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::CoreError;
use crate::money::Money;
use crate::payment_state::PaymentStatus;

// =============================================================================
// Rate
// =============================================================================

/// Percentage represented in basis points (bps).
///
/// Used for target margins and installment interest.
/// 1 basis point = 0.01%, so 2000 bps = 20% and 599 bps = 5,99%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// One hundred percent.
    pub const FULL: Rate = Rate(10_000);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Rounds to the nearest basis point; negative percentages clamp to zero.
    pub fn from_percentage(pct: f64) -> Self {
        Rate((pct * 100.0).round().max(0.0) as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// `5.99` for 599 bps. Display only; arithmetic stays in bps.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

// =============================================================================
// Sale Channel
// =============================================================================

/// How a sale was sourced, as stored in the `channel` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Miles taken from one of the agency's own mileage accounts.
    Internal,
    /// Counter/manual sourcing: miles bought ad hoc from a seller.
    Balcao,
}

impl ChannelKind {
    /// Storage tag for this channel.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Internal => "internal",
            ChannelKind::Balcao => "balcao",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "internal" => Ok(ChannelKind::Internal),
            "balcao" | "balcão" => Ok(ChannelKind::Balcao),
            other => Err(CoreError::UnknownChannel(other.to_string())),
        }
    }
}

/// Channel-specific fields of a sale.
///
/// ```text
/// internal ──► program_id + account_id
/// balcao   ──► seller_name + seller_contact + cost_per_thousand
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SaleChannel {
    Internal {
        /// Loyalty program the miles came from.
        program_id: String,
        /// Mileage account debited for the ticket.
        account_id: String,
    },
    Balcao {
        seller_name: String,
        seller_contact: Option<String>,
        /// Price paid per 1,000 miles.
        cost_per_thousand: Money,
    },
}

impl SaleChannel {
    /// Returns the storage tag for this channel.
    pub fn kind(&self) -> ChannelKind {
        match self {
            SaleChannel::Internal { .. } => ChannelKind::Internal,
            SaleChannel::Balcao { .. } => ChannelKind::Balcao,
        }
    }
}

// =============================================================================
// Trip Type & Segment Direction
// =============================================================================

/// Shape of the itinerary selected on the sale form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    OneWay,
    RoundTrip,
    MultiCity,
}

impl TripType {
    /// Storage tag for this trip type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TripType::OneWay => "one_way",
            TripType::RoundTrip => "round_trip",
            TripType::MultiCity => "multi_city",
        }
    }

    /// Direction tag stamped on every segment of a sale with this trip type.
    pub const fn direction(&self) -> SegmentDirection {
        match self {
            TripType::OneWay => SegmentDirection::OneWay,
            TripType::RoundTrip => SegmentDirection::RoundTrip,
            TripType::MultiCity => SegmentDirection::MultiCity,
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "one_way" | "oneway" => Ok(TripType::OneWay),
            "round_trip" | "roundtrip" => Ok(TripType::RoundTrip),
            "multi_city" | "multicity" => Ok(TripType::MultiCity),
            other => Err(CoreError::UnknownTripType(other.to_string())),
        }
    }
}

/// Direction tag copied uniformly onto all segments of one sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SegmentDirection {
    OneWay,
    RoundTrip,
    MultiCity,
}

impl SegmentDirection {
    /// Storage tag (`oneway` | `roundtrip` | `multicity`).
    pub const fn as_str(&self) -> &'static str {
        match self {
            SegmentDirection::OneWay => "oneway",
            SegmentDirection::RoundTrip => "roundtrip",
            SegmentDirection::MultiCity => "multicity",
        }
    }
}

impl From<TripType> for SegmentDirection {
    fn from(trip: TripType) -> Self {
        trip.direction()
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// Lifecycle status of a sale (independent of payment status).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Just created by the pipeline; tickets not yet issued.
    #[default]
    Draft,
    /// Tickets issued and delivered to the customer.
    Completed,
    /// Sale cancelled.
    Cancelled,
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
    Other,
}

// =============================================================================
// Sale Form (input)
// =============================================================================

/// One flight leg as typed on the sale form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SegmentForm {
    /// Origin airport code (e.g. `GRU`).
    pub from: String,
    /// Destination airport code (e.g. `GIG`).
    pub to: String,
    /// Travel date as typed; empty or unparseable dates are stored as null.
    #[serde(default)]
    pub date: String,
    /// Optional flight / airline identifier.
    #[serde(default)]
    pub flight: Option<String>,
}

/// A channel-discriminated sale form, as submitted by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleForm {
    pub channel: SaleChannel,
    pub customer_name: String,
    /// Opaque (already encrypted upstream) CPF identifier.
    #[serde(default)]
    pub customer_cpf: Option<String>,
    pub passengers: i64,
    pub trip_type: TripType,
    /// Ordered flight legs; order becomes segment `position`.
    pub segments: Vec<SegmentForm>,
    pub total_price: Money,
}

// =============================================================================
// Sale
// =============================================================================

/// Sale aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub supplier_id: String,
    pub channel: SaleChannel,
    pub customer_name: String,
    pub customer_cpf: Option<String>,
    pub passengers: i64,
    pub trip_type: TripType,
    /// `"GRU-GIG, GIG-GRU"` style summary of the segments.
    pub route_text: String,
    pub total_amount: Money,
    /// Cached sum of the payment ledger.
    pub paid_amount: Money,
    pub payment_status: PaymentStatus,
    pub status: SaleStatus,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// When the sale first became fully paid.
    #[ts(as = "Option<String>")]
    pub payment_completed_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Amount still owed (never negative).
    pub fn remaining(&self) -> Money {
        (self.total_amount - self.paid_amount).non_negative()
    }
}

// =============================================================================
// Flight Segment
// =============================================================================

/// One flight leg owned by exactly one sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FlightSegment {
    pub id: String,
    pub sale_id: String,
    /// Zero-based, gapless order within the sale.
    pub position: i64,
    pub origin: String,
    pub destination: String,
    #[ts(as = "Option<String>")]
    pub travel_date: Option<DateTime<Utc>>,
    pub flight_code: Option<String>,
    pub direction: SegmentDirection,
}

// =============================================================================
// Interest Config
// =============================================================================

/// One row of a supplier's credit interest table.
///
/// Unique per `(supplier_id, installments)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InterestConfig {
    pub id: String,
    pub supplier_id: String,
    pub installments: u32,
    pub interest_rate: Rate,
    pub is_active: bool,
}

// =============================================================================
// Payment Transaction
// =============================================================================

/// An append-only record of a partial payment.
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentTransaction {
    pub id: String,
    pub sale_id: String,
    pub amount: Money,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
    pub method: PaymentMethod,
    pub notes: Option<String>,
    pub recorded_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_from_bps() {
        let rate = Rate::from_bps(599);
        assert_eq!(rate.bps(), 599);
        assert!((rate.percentage() - 5.99).abs() < 0.001);
    }

    #[test]
    fn test_rate_from_percentage() {
        assert_eq!(Rate::from_percentage(20.0).bps(), 2000);
        assert_eq!(Rate::from_percentage(2.99).bps(), 299);
        assert_eq!(Rate::from_percentage(-3.0), Rate::zero());
    }

    #[test]
    fn test_trip_type_direction() {
        assert_eq!(TripType::OneWay.direction().as_str(), "oneway");
        assert_eq!(TripType::RoundTrip.direction().as_str(), "roundtrip");
        assert_eq!(TripType::MultiCity.direction().as_str(), "multicity");
    }

    #[test]
    fn test_trip_type_parsing() {
        assert_eq!("round_trip".parse::<TripType>().unwrap(), TripType::RoundTrip);
        assert_eq!("ONE_WAY".parse::<TripType>().unwrap(), TripType::OneWay);
        assert!(matches!(
            "circle".parse::<TripType>(),
            Err(CoreError::UnknownTripType(_))
        ));
    }

    #[test]
    fn test_channel_parsing() {
        assert_eq!("balcao".parse::<ChannelKind>().unwrap(), ChannelKind::Balcao);
        assert_eq!("Internal".parse::<ChannelKind>().unwrap(), ChannelKind::Internal);
        assert!("online".parse::<ChannelKind>().is_err());
    }

    #[test]
    fn test_sale_channel_kind() {
        let internal = SaleChannel::Internal {
            program_id: "smiles".to_string(),
            account_id: "acc-1".to_string(),
        };
        assert_eq!(internal.kind(), ChannelKind::Internal);

        let balcao = SaleChannel::Balcao {
            seller_name: "João".to_string(),
            seller_contact: None,
            cost_per_thousand: Money::from_cents(1750),
        };
        assert_eq!(balcao.kind(), ChannelKind::Balcao);
    }

    #[test]
    fn test_sale_channel_json_shape() {
        let channel = SaleChannel::Balcao {
            seller_name: "Maria".to_string(),
            seller_contact: Some("+55 11 99999-0000".to_string()),
            cost_per_thousand: Money::from_cents(2100),
        };
        let json = serde_json::to_value(&channel).unwrap();
        assert_eq!(json["kind"], "balcao");
        assert_eq!(json["cost_per_thousand"], 2100);

        let back: SaleChannel = serde_json::from_value(json).unwrap();
        assert_eq!(back, channel);
    }

    #[test]
    fn test_sale_status_default() {
        assert_eq!(SaleStatus::default(), SaleStatus::Draft);
    }
}
