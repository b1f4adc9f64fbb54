//! Test utilities for database testing.
//!
//! Sets up in-memory SQLite databases with migrations applied and provides
//! fixture builders that go through the repositories, so stored timestamps
//! use the same representation the service writes.

use anyhow::Result;
use chrono::NaiveDate;
use fleetbook::dates;
use fleetbook::migration::{Migrator, MigratorTrait};
use fleetbook::models::booking::{self, BookingStatus};
use fleetbook::repositories::{BikeRepository, BookingRepository, OrganizationRepository};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Set, Statement};
use std::sync::Arc;
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;

    Migrator::up(&db, None).await?;

    // SQLite does not enforce our Postgres foreign key semantics; disable FK
    // checks so fixtures can be inserted in any order.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = OFF".to_string(),
    ))
    .await?;

    Ok(db)
}

/// Sets up an in-memory SQLite database and returns it Arc-wrapped.
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    let db = setup_test_db().await?;
    Ok(Arc::new(db))
}

/// Creates a test organization and returns its ID.
#[allow(dead_code)]
pub async fn create_test_org(db: &Arc<DatabaseConnection>) -> Result<Uuid> {
    let repo = OrganizationRepository::new(Arc::clone(db));
    let org = repo
        .create("Test Fleet".to_string(), "starter".to_string(), 50)
        .await?;
    Ok(org.id)
}

/// Creates a bike at 500/day and returns its ID.
#[allow(dead_code)]
pub async fn create_test_bike(
    db: &Arc<DatabaseConnection>,
    org_id: Uuid,
    registration: &str,
) -> Result<Uuid> {
    let repo = BikeRepository::new(Arc::clone(db));
    let bike = repo
        .create(&org_id, registration.to_string(), None, 500)
        .await?;
    Ok(bike.id)
}

/// Inserts a booking spanning the given calendar days (inclusive) and
/// returns the persisted row.
#[allow(dead_code)]
pub async fn insert_booking(
    db: &Arc<DatabaseConnection>,
    org_id: Uuid,
    bike_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    status: BookingStatus,
) -> Result<booking::Model> {
    let now = dates::start_of_day(start);
    let active = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        org_id: Set(org_id),
        bike_id: Set(bike_id),
        customer_name: Set("Asha Patel".to_string()),
        phone: Set("9876543210".to_string()),
        start_date: Set(dates::to_fixed(dates::start_of_day(start))),
        end_date: Set(dates::to_fixed(dates::end_of_day(end))),
        status: Set(status),
        total_amount: Set((dates::days_between(start, end) + 1) * 500),
        paid_amount: Set(0),
        security_deposit: Set(None),
        late_fee: Set(None),
        fuel_charge: Set(None),
        damage_charge: Set(None),
        extra_distance_charge: Set(None),
        notes: Set(None),
        delivered_at: Set(None),
        odometer_start: Set(None),
        fuel_level_start: Set(None),
        helmets_given: Set(None),
        existing_damage: Set(None),
        document_refs: Set(None),
        identity_verified: Set(false),
        returned_at: Set(None),
        odometer_end: Set(None),
        fuel_level_end: Set(None),
        helmets_returned: Set(None),
        new_damage: Set(None),
        deleted_at: Set(None),
        created_at: Set(dates::to_fixed(now)),
        updated_at: Set(dates::to_fixed(now)),
    };

    let repo = BookingRepository::new(Arc::clone(db));
    Ok(repo.insert(active).await?)
}

/// Shorthand for building a calendar day in fixtures.
#[allow(dead_code)]
pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
