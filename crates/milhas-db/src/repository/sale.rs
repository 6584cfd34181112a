//! # Sale Repository
//!
//! Database operations for sales and their flight segments.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE DRAFT                                                       │
//! │     └── insert_sale() → sales row { status: draft, payment: pending }  │
//! │                                                                         │
//! │  2. ATTACH SEGMENTS                                                    │
//! │     └── insert_segments() → all rows in ONE transaction                │
//! │                                                                         │
//! │  3. PAYMENTS (see payment.rs)                                          │
//! │     └── write_payment_state() → paid_amount / payment_status cache     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Channel Columns
//! [`SaleChannel`] is flattened into nullable columns. A CHECK constraint in
//! the schema guarantees that only one channel's columns are filled.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use milhas_core::payment_state::{PaymentStatus, PaymentTransition};
use milhas_core::{
    ChannelKind, FlightSegment, Money, Sale, SaleChannel, SaleStatus, SegmentDirection, TripType,
};

const SALE_COLUMNS: &str = r#"
    id, supplier_id, channel,
    program_id, account_id,
    seller_name, seller_contact, cost_per_thousand_cents,
    customer_name, customer_cpf, passengers, trip_type, route_text,
    total_amount_cents, paid_amount_cents, payment_status, payment_completed_at,
    status, created_by, created_at, updated_at
"#;

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    supplier_id: String,
    channel: ChannelKind,
    program_id: Option<String>,
    account_id: Option<String>,
    seller_name: Option<String>,
    seller_contact: Option<String>,
    cost_per_thousand_cents: Option<i64>,
    customer_name: String,
    customer_cpf: Option<String>,
    passengers: i64,
    trip_type: TripType,
    route_text: String,
    total_amount_cents: i64,
    paid_amount_cents: i64,
    payment_status: PaymentStatus,
    payment_completed_at: Option<DateTime<Utc>>,
    status: SaleStatus,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        let channel = match row.channel {
            ChannelKind::Internal => match (row.program_id, row.account_id) {
                (Some(program_id), Some(account_id)) => SaleChannel::Internal {
                    program_id,
                    account_id,
                },
                _ => return Err(DbError::corrupt("sale", &row.id, "internal sale without program/account")),
            },
            ChannelKind::Balcao => match (row.seller_name, row.cost_per_thousand_cents) {
                (Some(seller_name), Some(cost)) => SaleChannel::Balcao {
                    seller_name,
                    seller_contact: row.seller_contact,
                    cost_per_thousand: Money::from_cents(cost),
                },
                _ => return Err(DbError::corrupt("sale", &row.id, "balcao sale without seller/cost")),
            },
        };

        Ok(Sale {
            id: row.id,
            supplier_id: row.supplier_id,
            channel,
            customer_name: row.customer_name,
            customer_cpf: row.customer_cpf,
            passengers: row.passengers,
            trip_type: row.trip_type,
            route_text: row.route_text,
            total_amount: Money::from_cents(row.total_amount_cents),
            paid_amount: Money::from_cents(row.paid_amount_cents),
            payment_status: row.payment_status,
            status: row.status,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            payment_completed_at: row.payment_completed_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SegmentRow {
    id: String,
    sale_id: String,
    position: i64,
    origin: String,
    destination: String,
    travel_date: Option<DateTime<Utc>>,
    flight_code: Option<String>,
    direction: SegmentDirection,
}

impl From<SegmentRow> for FlightSegment {
    fn from(row: SegmentRow) -> Self {
        FlightSegment {
            id: row.id,
            sale_id: row.sale_id,
            position: row.position,
            origin: row.origin,
            destination: row.destination,
            travel_date: row.travel_date,
            flight_code: row.flight_code,
            direction: row.direction,
        }
    }
}

/// Channel columns: (program_id, account_id, seller_name, seller_contact, cost_cents).
type ChannelColumns<'a> = (
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
    Option<i64>,
);

fn channel_columns(channel: &SaleChannel) -> ChannelColumns<'_> {
    match channel {
        SaleChannel::Internal {
            program_id,
            account_id,
        } => (Some(program_id), Some(account_id), None, None, None),
        SaleChannel::Balcao {
            seller_name,
            seller_contact,
            cost_per_thousand,
        } => (
            None,
            None,
            Some(seller_name),
            seller_contact.as_deref(),
            Some(cost_per_thousand.cents()),
        ),
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale row.
    ///
    /// A single INSERT, so either the whole row is visible or nothing is.
    pub async fn insert_sale(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, supplier_id = %sale.supplier_id, channel = %sale.channel.kind(), "Inserting sale");

        let (program_id, account_id, seller_name, seller_contact, cost_cents) =
            channel_columns(&sale.channel);

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, supplier_id, channel,
                program_id, account_id,
                seller_name, seller_contact, cost_per_thousand_cents,
                customer_name, customer_cpf, passengers, trip_type, route_text,
                total_amount_cents, paid_amount_cents, payment_status, payment_completed_at,
                status, created_by, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.supplier_id)
        .bind(sale.channel.kind())
        .bind(program_id)
        .bind(account_id)
        .bind(seller_name)
        .bind(seller_contact)
        .bind(cost_cents)
        .bind(&sale.customer_name)
        .bind(&sale.customer_cpf)
        .bind(sale.passengers)
        .bind(sale.trip_type)
        .bind(&sale.route_text)
        .bind(sale.total_amount.cents())
        .bind(sale.paid_amount.cents())
        .bind(sale.payment_status)
        .bind(sale.payment_completed_at)
        .bind(sale.status)
        .bind(&sale.created_by)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a batch of segments in one transaction.
    ///
    /// Either every segment is stored or none is.
    pub async fn insert_segments(&self, segments: &[FlightSegment]) -> DbResult<()> {
        if segments.is_empty() {
            return Ok(());
        }

        debug!(
            sale_id = %segments[0].sale_id,
            count = segments.len(),
            "Inserting segment batch"
        );

        let mut tx = self.pool.begin().await?;

        for segment in segments {
            sqlx::query(
                r#"
                INSERT INTO sale_segments (
                    id, sale_id, position, origin, destination,
                    travel_date, flight_code, direction
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&segment.id)
            .bind(&segment.sale_id)
            .bind(segment.position)
            .bind(&segment.origin)
            .bind(&segment.destination)
            .bind(segment.travel_date)
            .bind(&segment.flight_code)
            .bind(segment.direction)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        fetch_sale(&self.pool, id).await
    }

    /// Gets the segments of a sale, ordered by position.
    pub async fn get_segments(&self, sale_id: &str) -> DbResult<Vec<FlightSegment>> {
        let rows = sqlx::query_as::<_, SegmentRow>(
            r#"
            SELECT id, sale_id, position, origin, destination,
                   travel_date, flight_code, direction
            FROM sale_segments
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FlightSegment::from).collect())
    }

    /// Lists a supplier's sales, newest first.
    pub async fn list_for_supplier(&self, supplier_id: &str, limit: i64) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE supplier_id = ?1 ORDER BY created_at DESC LIMIT ?2"
        ))
        .bind(supplier_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Sale::try_from).collect()
    }

}

/// SELECT of one sale, usable inside a transaction.
pub(crate) async fn fetch_sale<'e, E>(executor: E, id: &str) -> DbResult<Option<Sale>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, SaleRow>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.map(Sale::try_from).transpose()
}

/// UPDATE of the payment cache columns, usable inside a transaction.
pub(crate) async fn write_payment_state<'e, E>(
    executor: E,
    sale_id: &str,
    transition: &PaymentTransition,
) -> DbResult<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    debug!(
        sale_id = %sale_id,
        paid = %transition.paid_amount,
        status = %transition.status,
        "Updating sale payment state"
    );

    let result = sqlx::query(
        r#"
        UPDATE sales SET
            paid_amount_cents = ?2,
            payment_status = ?3,
            payment_completed_at = ?4,
            updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(sale_id)
    .bind(transition.paid_amount.cents())
    .bind(transition.status)
    .bind(transition.completed_at)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", sale_id));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{sample_sale, sample_segments};
    use crate::{Database, DbConfig};

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let supplier_id = db.suppliers().ensure_for_user("user-1").await.unwrap();
        (db, supplier_id)
    }

    #[tokio::test]
    async fn test_insert_and_get_internal_sale() {
        let (db, supplier_id) = setup().await;
        let sale = sample_sale(&supplier_id);

        db.sales().insert_sale(&sale).await.unwrap();
        let loaded = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();

        assert_eq!(loaded.id, sale.id);
        assert_eq!(loaded.channel, sale.channel);
        assert_eq!(loaded.trip_type, TripType::RoundTrip);
        assert_eq!(loaded.total_amount, sale.total_amount);
        assert_eq!(loaded.payment_status, PaymentStatus::Pending);
        assert_eq!(loaded.status, SaleStatus::Draft);
        assert_eq!(loaded.route_text, "GRU-GIG, GIG-GRU");
    }

    #[tokio::test]
    async fn test_balcao_channel_roundtrip() {
        let (db, supplier_id) = setup().await;
        let mut sale = sample_sale(&supplier_id);
        sale.channel = SaleChannel::Balcao {
            seller_name: "Carlos".to_string(),
            seller_contact: Some("carlos@example.com".to_string()),
            cost_per_thousand: Money::from_cents(1850),
        };

        db.sales().insert_sale(&sale).await.unwrap();
        let loaded = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(loaded.channel, sale.channel);
    }

    #[tokio::test]
    async fn test_get_missing_sale() {
        let (db, _) = setup().await;
        assert!(db.sales().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_supplier_is_rejected() {
        let (db, _) = setup().await;
        let sale = sample_sale("no-such-supplier");
        let err = db.sales().insert_sale(&sale).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_segments_ordered_by_position() {
        let (db, supplier_id) = setup().await;
        let sale = sample_sale(&supplier_id);
        db.sales().insert_sale(&sale).await.unwrap();

        let mut segments = sample_segments(&sale.id);
        segments.reverse();
        db.sales().insert_segments(&segments).await.unwrap();

        let loaded = db.sales().get_segments(&sale.id).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].position, 0);
        assert_eq!(loaded[0].origin, "GRU");
        assert_eq!(loaded[1].position, 1);
        assert!(loaded.iter().all(|s| s.direction == SegmentDirection::RoundTrip));
    }

    #[tokio::test]
    async fn test_segment_batch_is_atomic() {
        let (db, supplier_id) = setup().await;
        let sale = sample_sale(&supplier_id);
        db.sales().insert_sale(&sale).await.unwrap();

        let mut segments = sample_segments(&sale.id);
        // same position twice violates UNIQUE(sale_id, position)
        segments[1].position = 0;

        let err = db.sales().insert_segments(&segments).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert!(db.sales().get_segments(&sale.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_for_supplier() {
        let (db, supplier_id) = setup().await;
        let other = db.suppliers().ensure_for_user("user-2").await.unwrap();

        for _ in 0..3 {
            db.sales().insert_sale(&sample_sale(&supplier_id)).await.unwrap();
        }
        db.sales().insert_sale(&sample_sale(&other)).await.unwrap();

        assert_eq!(db.sales().list_for_supplier(&supplier_id, 50).await.unwrap().len(), 3);
        assert_eq!(db.sales().list_for_supplier(&supplier_id, 2).await.unwrap().len(), 2);
        assert_eq!(db.sales().list_for_supplier(&other, 50).await.unwrap().len(), 1);
    }
}
