//! Test utilities for database testing.
//!
//! This module provides utilities for setting up in-memory SQLite databases
//! with migrations applied, plus fixture builders for the ledger entities.

use anyhow::Result;
use chrono::{Duration, Utc};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};
use tokio::sync::mpsc;
use uuid::Uuid;

use reefdesk::events::{DomainEvent, EventBus};
use reefdesk::models::booking::Model as BookingModel;
use reefdesk::models::customer::Model as CustomerModel;
use reefdesk::models::organization::Model as OrganizationModel;
use reefdesk::models::product::Model as ProductModel;
use reefdesk::models::trip::Model as TripModel;
use reefdesk::repositories::booking::CreateBookingRequest;
use reefdesk::repositories::customer::CreateCustomerRequest;
use reefdesk::repositories::organization::CreateOrganizationRequest;
use reefdesk::repositories::product::CreateProductRequest;
use reefdesk::repositories::trip::CreateTripRequest;
use reefdesk::repositories::{
    BookingRepository, CustomerRepository, OrganizationRepository, ProductRepository,
    TripRepository,
};

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Event bus wired to a receiver so tests can observe published events.
#[allow(dead_code)]
pub fn test_event_bus() -> (EventBus, mpsc::Receiver<DomainEvent>) {
    EventBus::new(64)
}

/// Creates a test organization.
pub async fn create_test_organization(
    db: &DatabaseConnection,
    name: &str,
) -> Result<OrganizationModel> {
    Ok(OrganizationRepository::new(db)
        .create_organization(CreateOrganizationRequest {
            name: name.to_string(),
            trial_ends_at: None,
        })
        .await?)
}

/// Creates a tracked-inventory product with the given opening stock.
#[allow(dead_code)]
pub async fn create_test_product(
    db: &DatabaseConnection,
    organization_id: Uuid,
    name: &str,
    stock_quantity: i32,
) -> Result<ProductModel> {
    Ok(ProductRepository::new(db)
        .create_product(
            organization_id,
            CreateProductRequest {
                name: name.to_string(),
                description: None,
                price: Decimal::new(1250, 2),
                stock_quantity,
                low_stock_threshold: 2,
                track_inventory: true,
            },
        )
        .await?)
}

/// Creates a trip departing a week out.
#[allow(dead_code)]
pub async fn create_test_trip(
    db: &DatabaseConnection,
    organization_id: Uuid,
) -> Result<TripModel> {
    Ok(TripRepository::new(db)
        .create_trip(
            organization_id,
            CreateTripRequest {
                name: "Two-Tank Morning Reef".to_string(),
                departs_at: Utc::now() + Duration::days(7),
                capacity: 12,
                price: Decimal::new(12999, 2),
            },
        )
        .await?)
}

/// Creates a customer ready to attach bookings to.
#[allow(dead_code)]
pub async fn create_test_customer(
    db: &DatabaseConnection,
    organization_id: Uuid,
) -> Result<CustomerModel> {
    Ok(CustomerRepository::new(db)
        .create_customer(
            organization_id,
            CreateCustomerRequest {
                first_name: "Ines".to_string(),
                last_name: "Marlow".to_string(),
                email: Some("ines@example.com".to_string()),
                phone: None,
                certification_level: Some("Advanced Open Water".to_string()),
            },
        )
        .await?)
}

/// Creates a pending booking with the given total and nothing paid.
#[allow(dead_code)]
pub async fn create_test_booking(
    db: &DatabaseConnection,
    events: &EventBus,
    organization_id: Uuid,
    total: Decimal,
) -> Result<BookingModel> {
    let trip = create_test_trip(db, organization_id).await?;
    let customer = create_test_customer(db, organization_id).await?;

    Ok(BookingRepository::new(db, events)
        .create_booking(
            organization_id,
            CreateBookingRequest {
                trip_id: trip.id,
                customer_id: customer.id,
                participants: 2,
                subtotal: total,
                discount: Decimal::ZERO,
                tax: Decimal::ZERO,
                total,
                status: None,
                notes: None,
            },
        )
        .await?)
}
