//! # Seed Data Generator
//!
//! Populates a development database with a supplier, an installment interest
//! table and a demo round-trip sale with one partial payment.
//!
//! ## Usage
//! ```bash
//! cargo run -p milhas-db --bin seed
//!
//! # Specify database path and owning user
//! cargo run -p milhas-db --bin seed -- --db ./data/milhas.db --user dev-user
//! ```

use anyhow::{bail, Context};
use chrono::{Duration, TimeZone, Utc};
use milhas_core::payment_state::{apply_payment, PaymentSnapshot};
use milhas_core::{
    FlightSegment, Money, PaymentMethod, PaymentStatus, PaymentTransaction, Rate, Sale, SaleChannel,
    SaleStatus, TripType,
};
use milhas_db::{Database, DbConfig};
use std::env;
use uuid::Uuid;

/// Installment count → interest in basis points.
const INTEREST_TABLE: &[(u32, u32)] = &[
    (1, 0),
    (2, 0),
    (3, 299),
    (4, 399),
    (5, 499),
    (6, 599),
    (7, 699),
    (8, 799),
    (9, 899),
    (10, 999),
    (11, 1099),
    (12, 1199),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,milhas_db=debug")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./milhas_dev.db");
    let mut user_id = String::from("dev-user");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--user" | "-u" => {
                if i + 1 < args.len() {
                    user_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Milhas Desk Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./milhas_dev.db)");
                println!("  -u, --user <ID>    Owning user id (default: dev-user)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    println!("🌱 Milhas Desk Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!("User:     {}", user_id);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;
    println!("✓ Connected to database, migrations applied");

    let supplier_id = db.suppliers().ensure_for_user(&user_id).await?;
    println!("✓ Supplier {}", supplier_id);

    let existing = db.sales().list_for_supplier(&supplier_id, 1).await?;
    if !existing.is_empty() {
        println!("⚠ Supplier already has sales; skipping seed.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    for (installments, bps) in INTEREST_TABLE {
        db.interest_configs()
            .upsert(&supplier_id, *installments, Rate::from_bps(*bps))
            .await?;
    }
    println!("✓ Interest table 1x..{}x", INTEREST_TABLE.len());

    let now = Utc::now();
    let sale = Sale {
        id: Uuid::new_v4().to_string(),
        supplier_id: supplier_id.clone(),
        channel: SaleChannel::Internal {
            program_id: "smiles".to_string(),
            account_id: "conta-principal".to_string(),
        },
        customer_name: "Maria Oliveira".to_string(),
        customer_cpf: None,
        passengers: 2,
        trip_type: TripType::RoundTrip,
        route_text: "GRU-LIS, LIS-GRU".to_string(),
        total_amount: Money::from_major_minor(7_480, 0),
        paid_amount: Money::zero(),
        payment_status: PaymentStatus::Pending,
        status: SaleStatus::Draft,
        created_by: user_id.clone(),
        created_at: now,
        updated_at: now,
        payment_completed_at: None,
    };
    db.sales().insert_sale(&sale).await?;

    let segments: Vec<FlightSegment> = [("GRU", "LIS", 3), ("LIS", "GRU", 17)]
        .into_iter()
        .enumerate()
        .map(|(position, (origin, destination, day))| FlightSegment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            position: position as i64,
            origin: origin.to_string(),
            destination: destination.to_string(),
            travel_date: Utc.with_ymd_and_hms(2025, 7, day, 0, 0, 0).single(),
            flight_code: Some(format!("TP{}", 100 + position)),
            direction: sale.trip_type.direction(),
        })
        .collect();
    db.sales().insert_segments(&segments).await?;
    println!("✓ Demo sale {} ({})", sale.id, sale.route_text);

    let deposit = PaymentTransaction {
        id: Uuid::new_v4().to_string(),
        sale_id: sale.id.clone(),
        amount: Money::from_major_minor(2_000, 0),
        paid_at: now - Duration::days(1),
        method: PaymentMethod::Pix,
        notes: Some("Sinal".to_string()),
        recorded_by: user_id.clone(),
        created_at: now,
    };
    let commit = db
        .payments()
        .record_locked(&deposit, |sale, ledger| {
            let current = ledger.reconcile(&PaymentSnapshot::of_sale(sale));
            let snapshot = PaymentSnapshot {
                paid_amount: current.paid_amount,
                total_amount: sale.total_amount,
                status: current.status,
                completed_at: current.completed_at,
            };
            Ok::<_, anyhow::Error>(apply_payment(&snapshot, deposit.amount, now)?)
        })
        .await?
        .context("demo sale vanished before its payment was recorded")?;
    let transition = commit.transition;
    println!(
        "✓ Payment {} → status {}",
        deposit.amount, transition.status
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
