//! Integration tests for the payment ledger: the overpayment guard, the
//! derived payment status, and the audit entries behind each movement.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use reefdesk::error::LedgerError;
use reefdesk::repositories::{BookingRepository, TransactionRepository};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{create_test_booking, create_test_organization, setup_test_db, test_event_bus};

// Scenario: total 300.00. A 100.00 card payment leaves the booking partial;
// a 200.00 cash payment settles it.
#[tokio::test]
async fn partial_then_settling_payment_reaches_paid() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, _rx) = test_event_bus();
    let org = create_test_organization(&db, "Blue Reef Divers").await?;
    let booking = create_test_booking(&db, &events, org.id, dec!(300.00)).await?;

    let repo = BookingRepository::new(&db, &events);

    let (entry, updated) = repo
        .record_payment(org.id, booking.id, dec!(100.00), Some("card".to_string()), None)
        .await?;
    assert_eq!(entry.transaction_type, "payment");
    assert_eq!(entry.amount, dec!(100.00));
    assert_eq!(updated.paid_amount, dec!(100.00));
    assert_eq!(updated.payment_status, "partial");

    let (_, updated) = repo
        .record_payment(org.id, booking.id, dec!(200.00), Some("cash".to_string()), None)
        .await?;
    assert_eq!(updated.paid_amount, dec!(300.00));
    assert_eq!(updated.payment_status, "paid");

    // Both movements are in the audit ledger, tied to the booking.
    let (entries, _) = TransactionRepository::new(&db)
        .list_transactions(org.id, Some(booking.id), 10, None)
        .await?;
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|t| t.transaction_type == "payment"));
    Ok(())
}

// Scenario: total 150.00, nothing paid. A 150.01 payment exceeds the
// remaining balance by a full cent and must be rejected without mutation.
#[tokio::test]
async fn one_cent_overshoot_is_rejected_without_mutation() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, _rx) = test_event_bus();
    let org = create_test_organization(&db, "Blue Reef Divers").await?;
    let booking = create_test_booking(&db, &events, org.id, dec!(150.00)).await?;

    let repo = BookingRepository::new(&db, &events);
    let err = repo
        .record_payment(org.id, booking.id, dec!(150.01), Some("card".to_string()), None)
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("150.01"), "message names the amount: {message}");
    assert!(message.contains("150.00"), "message names the balance: {message}");

    // The details payload keeps the two-decimal scale even though SQLite
    // stores the amounts without it.
    match &err {
        LedgerError::InvariantViolation { details, .. } => {
            let details = details.as_ref().expect("rejection carries details");
            assert_eq!(details["amount"], "150.01");
            assert_eq!(details["remaining_balance"], "150.00");
            assert_eq!(details["total"], "150.00");
            assert_eq!(details["paid_amount"], "0.00");
        }
        other => panic!("expected an invariant violation, got {other:?}"),
    }

    let stored = repo.find_by_id(org.id, booking.id).await?.unwrap();
    assert_eq!(stored.paid_amount, Decimal::ZERO);
    assert_eq!(stored.payment_status, "pending");

    // The rejected payment left no audit entry behind.
    let (entries, _) = TransactionRepository::new(&db)
        .list_transactions(org.id, Some(booking.id), 10, None)
        .await?;
    assert!(entries.is_empty());
    Ok(())
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, _rx) = test_event_bus();
    let org = create_test_organization(&db, "Blue Reef Divers").await?;
    let booking = create_test_booking(&db, &events, org.id, dec!(100.00)).await?;

    let repo = BookingRepository::new(&db, &events);
    for amount in [Decimal::ZERO, dec!(-10.00)] {
        let err = repo
            .record_payment(org.id, booking.id, amount, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(err.to_string(), "Payment amount must be greater than zero");
    }

    let stored = repo.find_by_id(org.id, booking.id).await?.unwrap();
    assert_eq!(stored.paid_amount, Decimal::ZERO);
    Ok(())
}

#[tokio::test]
async fn exact_balance_settles_smaller_stays_partial() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, _rx) = test_event_bus();
    let org = create_test_organization(&db, "Blue Reef Divers").await?;
    let booking = create_test_booking(&db, &events, org.id, dec!(100.00)).await?;

    let repo = BookingRepository::new(&db, &events);

    // One cent short of the balance is still partial.
    let (_, updated) = repo
        .record_payment(org.id, booking.id, dec!(99.99), None, None)
        .await?;
    assert_eq!(updated.payment_status, "partial");

    // The exact remainder settles it.
    let (_, updated) = repo
        .record_payment(org.id, booking.id, dec!(0.01), None, None)
        .await?;
    assert_eq!(updated.paid_amount, dec!(100.00));
    assert_eq!(updated.payment_status, "paid");
    Ok(())
}

#[tokio::test]
async fn paid_amount_never_exceeds_total_beyond_tolerance() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, _rx) = test_event_bus();
    let org = create_test_organization(&db, "Blue Reef Divers").await?;
    let booking = create_test_booking(&db, &events, org.id, dec!(80.00)).await?;

    let repo = BookingRepository::new(&db, &events);
    for amount in [dec!(30.00), dec!(70.00), dec!(50.00), dec!(25.00), dec!(5.00)] {
        let _ = repo.record_payment(org.id, booking.id, amount, None, None).await;
        let stored = repo.find_by_id(org.id, booking.id).await?.unwrap();
        assert!(
            stored.paid_amount <= stored.total + dec!(0.01),
            "paid {} exceeded total {} beyond tolerance",
            stored.paid_amount,
            stored.total
        );
    }
    Ok(())
}

#[tokio::test]
async fn zero_total_booking_starts_pending() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, _rx) = test_event_bus();
    let org = create_test_organization(&db, "Blue Reef Divers").await?;

    // A comped booking owes nothing, but payment status only moves once
    // money is recorded, so it still starts pending.
    let booking = create_test_booking(&db, &events, org.id, dec!(0.00)).await?;
    assert_eq!(booking.total, Decimal::ZERO);
    assert_eq!(booking.payment_status, "pending");
    Ok(())
}

#[tokio::test]
async fn payment_against_unknown_booking_is_not_found() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, _rx) = test_event_bus();
    let org = create_test_organization(&db, "Blue Reef Divers").await?;

    let repo = BookingRepository::new(&db, &events);
    let err = repo
        .record_payment(org.id, Uuid::new_v4(), dec!(10.00), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
    assert_eq!(err.to_string(), "Booking not found");
    Ok(())
}

#[tokio::test]
async fn refunds_lower_paid_amount_and_append_entries() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, _rx) = test_event_bus();
    let org = create_test_organization(&db, "Blue Reef Divers").await?;
    let booking = create_test_booking(&db, &events, org.id, dec!(200.00)).await?;

    let repo = BookingRepository::new(&db, &events);
    repo.record_payment(org.id, booking.id, dec!(200.00), None, None)
        .await?;

    // A refund beyond what was paid is refused.
    let err = repo
        .record_refund(org.id, booking.id, dec!(250.00), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvariantViolation { .. }));

    let (entry, updated) = repo
        .record_refund(
            org.id,
            booking.id,
            dec!(50.00),
            Some("card".to_string()),
            Some("missed departure".to_string()),
        )
        .await?;
    assert_eq!(entry.transaction_type, "refund");
    assert_eq!(updated.paid_amount, dec!(150.00));
    assert_eq!(updated.payment_status, "partial");

    let (entries, _) = TransactionRepository::new(&db)
        .list_transactions(org.id, Some(booking.id), 10, None)
        .await?;
    assert_eq!(entries.len(), 2);
    Ok(())
}

#[tokio::test]
async fn booking_events_fire_on_create_and_status_change() -> Result<()> {
    let db = setup_test_db().await?;
    let (events, mut rx) = test_event_bus();
    let org = create_test_organization(&db, "Blue Reef Divers").await?;
    let booking = create_test_booking(&db, &events, org.id, dec!(100.00)).await?;

    let created = rx.try_recv().expect("creation event published");
    assert_eq!(created.name(), "booking.created");
    assert_eq!(created.booking_id(), booking.id);

    let repo = BookingRepository::new(&db, &events);
    repo.update_status(org.id, booking.id, "confirmed".parse().unwrap())
        .await?;
    let changed = rx.try_recv().expect("status change event published");
    assert_eq!(changed.name(), "booking.status_changed");

    // Re-applying the same status is a quiet success.
    repo.update_status(org.id, booking.id, "confirmed".parse().unwrap())
        .await?;
    assert!(rx.try_recv().is_err());
    Ok(())
}
