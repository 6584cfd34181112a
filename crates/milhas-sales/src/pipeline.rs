//! # Sale Pipeline
//!
//! Turns a validated sale form plus a resolved supplier into a persisted
//! sale and its flight segments.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  submit(form)                                                           │
//! │     │                                                                   │
//! │     ├── validate_sale_form ─────────── Err ──► Validation               │
//! │     ├── SupplierGate::resolve ──────── Err ──► Unauthenticated /        │
//! │     │                                          ProvisioningFailed       │
//! │     ▼                                                                   │
//! │  create_sale(form, supplier_id)                                         │
//! │     ├── A. shape Sale (route_text, status = draft)                      │
//! │     ├── B. INSERT sales ───────────── Err ──► Persistence (abort)       │
//! │     ├── C. build segments (position, direction, parsed date)            │
//! │     └── D. INSERT sale_segments batch ─ Err ──► warn!, still Ok(id)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed segment batch leaves the sale in place without segments so they
//! can be backfilled; the batch itself is all-or-nothing.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{SalesError, SalesResult};
use crate::gate::SupplierGate;
use crate::traits::IdentityProvider;
use milhas_core::validation::validate_sale_form;
use milhas_core::{
    FlightSegment, Money, PaymentStatus, Sale, SaleForm, SaleStatus, SegmentForm, TripType,
};
use milhas_db::Database;

/// Normalized outcome of [`SalePipeline::submit`] for UI consumers.
///
/// `sale_id` is empty when `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleResponse {
    pub sale_id: String,
    pub error: Option<String>,
}

impl CreateSaleResponse {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl From<SalesResult<String>> for CreateSaleResponse {
    fn from(result: SalesResult<String>) -> Self {
        match result {
            Ok(sale_id) => CreateSaleResponse {
                sale_id,
                error: None,
            },
            Err(e) => CreateSaleResponse {
                sale_id: String::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Clone)]
pub struct SalePipeline {
    db: Database,
    identity: Arc<dyn IdentityProvider>,
    gate: SupplierGate,
}

impl SalePipeline {
    pub fn new(db: Database, identity: Arc<dyn IdentityProvider>, gate: SupplierGate) -> Self {
        SalePipeline { db, identity, gate }
    }

    /// Validates the form, resolves the caller's supplier and creates the sale.
    ///
    /// Never fails: every error is folded into the response.
    pub async fn submit(&self, form: &SaleForm) -> CreateSaleResponse {
        let result = self.try_submit(form).await;
        if let Err(e) = &result {
            debug!(error = %e, "Sale submission rejected");
        }
        result.into()
    }

    async fn try_submit(&self, form: &SaleForm) -> SalesResult<String> {
        validate_sale_form(form)?;
        let context = self.gate.resolve().await?;
        self.create_sale(form, &context.supplier_id).await
    }

    /// Persists a sale for `supplier_id` and returns its id.
    ///
    /// The actor is read from the identity provider at call time.
    pub async fn create_sale(&self, form: &SaleForm, supplier_id: &str) -> SalesResult<String> {
        let user = self
            .identity
            .current_user()
            .await
            .ok_or(SalesError::Unauthenticated)?;

        let sale = shape_sale(form, supplier_id, &user.id, Utc::now());

        if let Err(e) = self.db.sales().insert_sale(&sale).await {
            error!(supplier_id = %supplier_id, error = %e, "Sale insert failed");
            return Err(SalesError::Persistence(e.to_string()));
        }

        let segments = build_segments(&sale.id, form.trip_type, &form.segments);
        if let Err(e) = self.db.sales().insert_segments(&segments).await {
            warn!(
                sale_id = %sale.id,
                segments = segments.len(),
                error = %e,
                "Segment batch failed; sale kept without segments"
            );
        }

        info!(
            sale_id = %sale.id,
            supplier_id = %supplier_id,
            channel = %sale.channel.kind(),
            total = %sale.total_amount,
            route = %sale.route_text,
            "Sale created"
        );

        Ok(sale.id)
    }
}

// =============================================================================
// Payload shaping
// =============================================================================

/// Builds the sale row for a form. Status starts at draft, nothing paid.
pub fn shape_sale(form: &SaleForm, supplier_id: &str, actor: &str, now: DateTime<Utc>) -> Sale {
    Sale {
        id: Uuid::new_v4().to_string(),
        supplier_id: supplier_id.to_string(),
        channel: form.channel.clone(),
        customer_name: form.customer_name.trim().to_string(),
        customer_cpf: form
            .customer_cpf
            .as_deref()
            .map(str::trim)
            .filter(|cpf| !cpf.is_empty())
            .map(str::to_string),
        passengers: form.passengers,
        trip_type: form.trip_type,
        route_text: route_text(&form.segments),
        total_amount: form.total_price,
        paid_amount: Money::zero(),
        payment_status: PaymentStatus::Pending,
        status: SaleStatus::Draft,
        created_by: actor.to_string(),
        created_at: now,
        updated_at: now,
        payment_completed_at: None,
    }
}

/// `"GRU-GIG, GIG-GRU"`.
pub fn route_text(segments: &[SegmentForm]) -> String {
    segments
        .iter()
        .map(|s| format!("{}-{}", s.from.trim(), s.to.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One segment per form leg, in form order, all sharing the trip direction.
pub fn build_segments(sale_id: &str, trip_type: TripType, legs: &[SegmentForm]) -> Vec<FlightSegment> {
    let direction = trip_type.direction();

    legs.iter()
        .enumerate()
        .map(|(position, leg)| FlightSegment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            position: position as i64,
            origin: leg.from.trim().to_string(),
            destination: leg.to.trim().to_string(),
            travel_date: parse_travel_date(&leg.date),
            flight_code: leg
                .flight
                .as_deref()
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string),
            direction,
        })
        .collect()
}

/// Parses a travel date as typed on the form.
///
/// Accepts `2025-07-03`, `03/07/2025`, `2025-07-03T14:30` and RFC 3339.
/// Empty or unrecognised input yields `None`.
pub fn parse_travel_date(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
        return Some(dt.and_utc());
    }
    ["%Y-%m-%d", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
