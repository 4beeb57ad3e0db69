//! Database migrations for the Reefdesk API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_06_01_000001_create_organizations;
mod m2026_06_01_000002_create_customers;
mod m2026_06_01_000003_create_trips;
mod m2026_06_01_000004_create_products;
mod m2026_06_01_000005_create_bookings;
mod m2026_06_01_000006_create_transactions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_06_01_000001_create_organizations::Migration),
            Box::new(m2026_06_01_000002_create_customers::Migration),
            Box::new(m2026_06_01_000003_create_trips::Migration),
            Box::new(m2026_06_01_000004_create_products::Migration),
            Box::new(m2026_06_01_000005_create_bookings::Migration),
            Box::new(m2026_06_01_000006_create_transactions::Migration),
        ]
    }
}
