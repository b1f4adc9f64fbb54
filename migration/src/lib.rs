//! Database migrations for the Fleetbook API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_01_000001_create_organizations;
mod m2025_06_01_000002_create_bikes;
mod m2025_06_01_000003_create_bookings;
mod m2025_06_01_000004_create_payments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_01_000001_create_organizations::Migration),
            Box::new(m2025_06_01_000002_create_bikes::Migration),
            Box::new(m2025_06_01_000003_create_bookings::Migration),
            Box::new(m2025_06_01_000004_create_payments::Migration),
        ]
    }
}
