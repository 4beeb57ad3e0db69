//! Tests ensuring organization isolation: a row belonging to another
//! organization is indistinguishable from a missing row, and mutations in
//! one organization never touch another's data.

use anyhow::Result;
use rust_decimal_macros::dec;

use reefdesk::error::LedgerError;
use reefdesk::repositories::{
    BookingRepository, CustomerRepository, ProductRepository, TransactionRepository,
    TripRepository,
};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{
    create_test_booking, create_test_customer, create_test_organization, create_test_product,
    create_test_trip, setup_test_db, test_event_bus,
};

#[tokio::test]
async fn foreign_rows_read_as_not_found_for_every_entity() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, _rx) = test_event_bus();
    let org_a = create_test_organization(&db, "Blue Reef Divers").await?;
    let org_b = create_test_organization(&db, "North Shore Scuba").await?;

    let product = create_test_product(&db, org_b.id, "Tank", 5).await?;
    let trip = create_test_trip(&db, org_b.id).await?;
    let customer = create_test_customer(&db, org_b.id).await?;
    let booking = create_test_booking(&db, &events, org_b.id, dec!(100.00)).await?;

    assert!(
        ProductRepository::new(&db)
            .find_by_id(org_a.id, product.id)
            .await?
            .is_none()
    );
    assert!(
        TripRepository::new(&db)
            .find_by_id(org_a.id, trip.id)
            .await?
            .is_none()
    );
    assert!(
        CustomerRepository::new(&db)
            .find_by_id(org_a.id, customer.id)
            .await?
            .is_none()
    );
    assert!(
        BookingRepository::new(&db, &events)
            .find_by_id(org_a.id, booking.id)
            .await?
            .is_none()
    );
    Ok(())
}

// Scenario: both organizations stock a product named "Tank". Adjusting one
// never moves the other.
#[tokio::test]
async fn stock_adjustments_stay_inside_their_organization() -> Result<()> {
    let db = setup_test_db().await?;
    let org_a = create_test_organization(&db, "Blue Reef Divers").await?;
    let org_b = create_test_organization(&db, "North Shore Scuba").await?;

    let tank_a = create_test_product(&db, org_a.id, "Tank", 5).await?;
    let tank_b = create_test_product(&db, org_b.id, "Tank", 5).await?;

    let repo = ProductRepository::new(&db);
    repo.adjust_stock(org_a.id, tank_a.id, -3).await?;

    assert_eq!(repo.find_by_id(org_a.id, tank_a.id).await?.unwrap().stock_quantity, 2);
    assert_eq!(repo.find_by_id(org_b.id, tank_b.id).await?.unwrap().stock_quantity, 5);

    // Scoped with the wrong organization, the adjustment is a not-found.
    let err = repo.adjust_stock(org_a.id, tank_b.id, -1).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
    assert_eq!(repo.find_by_id(org_b.id, tank_b.id).await?.unwrap().stock_quantity, 5);
    Ok(())
}

#[tokio::test]
async fn payments_cannot_cross_organizations() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, _rx) = test_event_bus();
    let org_a = create_test_organization(&db, "Blue Reef Divers").await?;
    let org_b = create_test_organization(&db, "North Shore Scuba").await?;
    let booking_b = create_test_booking(&db, &events, org_b.id, dec!(100.00)).await?;

    let repo = BookingRepository::new(&db, &events);
    let err = repo
        .record_payment(org_a.id, booking_b.id, dec!(50.00), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));

    let stored = repo.find_by_id(org_b.id, booking_b.id).await?.unwrap();
    assert_eq!(stored.paid_amount, dec!(0.00));
    Ok(())
}

#[tokio::test]
async fn bookings_cannot_reference_foreign_trips_or_customers() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, _rx) = test_event_bus();
    let org_a = create_test_organization(&db, "Blue Reef Divers").await?;
    let org_b = create_test_organization(&db, "North Shore Scuba").await?;

    let trip_b = create_test_trip(&db, org_b.id).await?;
    let customer_a = create_test_customer(&db, org_a.id).await?;

    let repo = BookingRepository::new(&db, &events);
    let err = repo
        .create_booking(
            org_a.id,
            reefdesk::repositories::booking::CreateBookingRequest {
                trip_id: trip_b.id,
                customer_id: customer_a.id,
                participants: 1,
                subtotal: dec!(129.99),
                discount: dec!(0.00),
                tax: dec!(0.00),
                total: dec!(129.99),
                status: None,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
    assert_eq!(err.to_string(), "Trip not found");
    Ok(())
}

#[tokio::test]
async fn listings_only_show_the_callers_rows() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, _rx) = test_event_bus();
    let org_a = create_test_organization(&db, "Blue Reef Divers").await?;
    let org_b = create_test_organization(&db, "North Shore Scuba").await?;

    create_test_product(&db, org_a.id, "Mask", 5).await?;
    create_test_product(&db, org_a.id, "Fins", 5).await?;
    create_test_product(&db, org_b.id, "Mask", 5).await?;
    let booking = create_test_booking(&db, &events, org_a.id, dec!(100.00)).await?;
    BookingRepository::new(&db, &events)
        .record_payment(org_a.id, booking.id, dec!(40.00), None, None)
        .await?;

    let (products_a, _) = ProductRepository::new(&db)
        .list_products(org_a.id, 10, None)
        .await?;
    assert_eq!(products_a.len(), 2);

    let (products_b, _) = ProductRepository::new(&db)
        .list_products(org_b.id, 10, None)
        .await?;
    assert_eq!(products_b.len(), 1);

    let (bookings_b, _) = BookingRepository::new(&db, &events)
        .list_bookings(org_b.id, 10, None)
        .await?;
    assert!(bookings_b.is_empty());

    let (ledger_b, _) = TransactionRepository::new(&db)
        .list_transactions(org_b.id, None, 10, None)
        .await?;
    assert!(ledger_b.is_empty());
    Ok(())
}
