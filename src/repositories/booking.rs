//! # Booking Repository
//!
//! Booking lifecycle plus the payment ledger. Payments and refunds run in a
//! database transaction that locks the booking row, appends the audit entry,
//! and recomputes `paid_amount` and `payment_status` together; any early
//! return drops the transaction and rolls the whole step back.

use chrono::{DateTime, Utc};
use metrics::counter;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cursor::{CursorData, encode_cursor};
use crate::error::{LedgerError, is_unique_violation};
use crate::events::{DomainEvent, EventBus};
use crate::models::booking::{
    ActiveModel as BookingActiveModel, Column as BookingColumn, Entity as Booking,
    Model as BookingModel,
};
use crate::models::customer::{Column as CustomerColumn, Entity as Customer};
use crate::models::status::{BookingStatus, PaymentStatus, TransactionType};
use crate::models::transaction::Model as TransactionModel;
use crate::models::trip::{Column as TripColumn, Entity as Trip};
use crate::repositories::transaction::new_entry;

/// Largest acceptable overshoot of `paid_amount` past `total`. Anything
/// below one cent is treated as settled; anything at or above it is an
/// overpayment and the ledger refuses it.
const PAYMENT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Request data for creating a new booking
#[derive(Debug, Clone)]
pub struct CreateBookingRequest {
    pub trip_id: Uuid,
    pub customer_id: Uuid,
    pub participants: i32,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
}

/// Repository for Booking database operations and the payment ledger
pub struct BookingRepository<'a> {
    db: &'a DatabaseConnection,
    events: &'a EventBus,
}

impl<'a> BookingRepository<'a> {
    /// Create a new BookingRepository with the given database connection
    /// and event bus
    pub fn new(db: &'a DatabaseConnection, events: &'a EventBus) -> Self {
        Self { db, events }
    }

    /// Create a booking against a trip and customer in the same organization
    pub async fn create_booking(
        &self,
        organization_id: Uuid,
        request: CreateBookingRequest,
    ) -> Result<BookingModel, LedgerError> {
        if request.participants < 1 {
            return Err(LedgerError::validation(
                "Booking must have at least one participant",
            ));
        }
        for (field, value) in [
            ("subtotal", request.subtotal),
            ("discount", request.discount),
            ("tax", request.tax),
            ("total", request.total),
        ] {
            if value < Decimal::ZERO {
                return Err(LedgerError::validation(format!(
                    "Booking {} cannot be negative",
                    field
                )));
            }
        }

        Trip::find()
            .filter(TripColumn::Id.eq(request.trip_id))
            .filter(TripColumn::OrganizationId.eq(organization_id))
            .one(self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found("Trip"))?;
        Customer::find()
            .filter(CustomerColumn::Id.eq(request.customer_id))
            .filter(CustomerColumn::OrganizationId.eq(organization_id))
            .one(self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found("Customer"))?;

        let status = request.status.unwrap_or(BookingStatus::Pending);
        // Payment status only moves once money is recorded against the
        // ledger, so even a zero-total booking starts out pending.
        let payment_status = PaymentStatus::Pending;

        // Booking numbers are random per day, so a collision is possible and
        // the unique index catches it. One retry is enough in practice.
        let mut attempts = 0;
        let created = loop {
            attempts += 1;
            let now = Utc::now();
            let booking = BookingActiveModel {
                id: Set(Uuid::new_v4()),
                organization_id: Set(organization_id),
                booking_number: Set(generate_booking_number(now)),
                trip_id: Set(request.trip_id),
                customer_id: Set(request.customer_id),
                participants: Set(request.participants),
                subtotal: Set(request.subtotal),
                discount: Set(request.discount),
                tax: Set(request.tax),
                total: Set(request.total),
                paid_amount: Set(Decimal::ZERO),
                status: Set(status.as_str().to_string()),
                payment_status: Set(payment_status.as_str().to_string()),
                notes: Set(request.notes.clone()),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            };

            match booking.insert(self.db).await {
                Ok(model) => break model,
                Err(err) if attempts < 2 && is_unique_violation(&err) => {
                    debug!("Booking number collision, retrying with a fresh number");
                }
                Err(err) => return Err(err.into()),
            }
        };

        info!(
            booking_id = %created.id,
            booking_number = %created.booking_number,
            "Created booking"
        );
        counter!("bookings_created_total").increment(1);
        self.events.publish(DomainEvent::BookingCreated {
            organization_id,
            booking_id: created.id,
            booking_number: created.booking_number.clone(),
        });

        Ok(created)
    }

    /// Find a booking by ID within the organization scope
    pub async fn find_by_id(
        &self,
        organization_id: Uuid,
        booking_id: Uuid,
    ) -> Result<Option<BookingModel>, LedgerError> {
        Ok(Booking::find()
            .filter(BookingColumn::Id.eq(booking_id))
            .filter(BookingColumn::OrganizationId.eq(organization_id))
            .one(self.db)
            .await?)
    }

    /// List bookings newest-first with cursor pagination
    pub async fn list_bookings(
        &self,
        organization_id: Uuid,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<(Vec<BookingModel>, Option<String>), LedgerError> {
        if limit == 0 {
            return Ok((Vec::new(), None));
        }

        let mut query = Booking::find()
            .filter(BookingColumn::OrganizationId.eq(organization_id))
            .order_by_desc(BookingColumn::CreatedAt)
            .order_by_desc(BookingColumn::Id);

        if let Some(cursor) = cursor {
            let condition = Condition::any()
                .add(BookingColumn::CreatedAt.lt(cursor.created_at))
                .add(
                    Condition::all()
                        .add(BookingColumn::CreatedAt.eq(cursor.created_at))
                        .add(BookingColumn::Id.lt(cursor.id)),
                );
            query = query.filter(condition);
        }

        let mut rows = query.limit(limit + 1).all(self.db).await?;

        let next_cursor = if rows.len() as u64 > limit {
            rows.pop();
            rows.last()
                .map(|last| encode_cursor(&last.created_at.with_timezone(&Utc), &last.id))
        } else {
            None
        };

        Ok((rows, next_cursor))
    }

    /// Set the lifecycle status of a booking. Setting the status it already
    /// has succeeds without publishing an event.
    pub async fn update_status(
        &self,
        organization_id: Uuid,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> Result<BookingModel, LedgerError> {
        let booking = self
            .find_by_id(organization_id, booking_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Booking"))?;

        let previous = booking.status.parse::<BookingStatus>().ok();

        let mut model: BookingActiveModel = booking.into();
        model.status = Set(new_status.as_str().to_string());
        model.updated_at = Set(Utc::now().into());
        let updated = model.update(self.db).await?;

        if let Some(previous_status) = previous
            && previous_status != new_status
        {
            let metric_labels = vec![("new_status", new_status.as_str().to_string())];
            counter!("booking_status_changes_total", &metric_labels).increment(1);
            self.events.publish(DomainEvent::BookingStatusChanged {
                organization_id,
                booking_id,
                previous_status,
                new_status,
            });
        }

        Ok(updated)
    }

    /// Record a payment against a booking.
    ///
    /// Appends the audit entry and raises `paid_amount` atomically under a
    /// row lock. A payment that would push `paid_amount` a cent or more past
    /// `total` is rejected with the remaining balance in the error details.
    pub async fn record_payment(
        &self,
        organization_id: Uuid,
        booking_id: Uuid,
        amount: Decimal,
        payment_method: Option<String>,
        notes: Option<String>,
    ) -> Result<(TransactionModel, BookingModel), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::validation(
                "Payment amount must be greater than zero",
            ));
        }

        let txn = self.db.begin().await?;

        let booking = Booking::find()
            .filter(BookingColumn::Id.eq(booking_id))
            .filter(BookingColumn::OrganizationId.eq(organization_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| LedgerError::not_found("Booking"))?;

        let remaining = booking.total - booking.paid_amount;
        if amount - remaining >= PAYMENT_TOLERANCE {
            counter!("payments_rejected_total").increment(1);
            return Err(LedgerError::invariant(
                format!(
                    "Payment of {:.2} exceeds the remaining balance of {:.2}",
                    amount, remaining
                ),
                serde_json::json!({
                    "amount": cents(amount),
                    "remaining_balance": cents(remaining),
                    "total": cents(booking.total),
                    "paid_amount": cents(booking.paid_amount),
                }),
            ));
        }

        let entry = new_entry(
            organization_id,
            Some(booking_id),
            TransactionType::Payment,
            amount,
            payment_method,
            notes,
        )
        .insert(&txn)
        .await?;

        let new_paid = booking.paid_amount + amount;
        let new_payment_status = derive_payment_status(booking.total, new_paid);

        let mut model: BookingActiveModel = booking.into();
        model.paid_amount = Set(new_paid);
        model.payment_status = Set(new_payment_status.as_str().to_string());
        model.updated_at = Set(Utc::now().into());
        let updated = model.update(&txn).await?;

        txn.commit().await?;
        counter!("payments_recorded_total").increment(1);
        info!(
            booking_id = %booking_id,
            amount = %amount,
            payment_status = new_payment_status.as_str(),
            "Recorded payment"
        );

        Ok((entry, updated))
    }

    /// Record a refund against a booking.
    ///
    /// The refund may not exceed what has actually been paid. On success the
    /// audit entry is appended and `paid_amount` lowered in the same
    /// database transaction.
    pub async fn record_refund(
        &self,
        organization_id: Uuid,
        booking_id: Uuid,
        amount: Decimal,
        payment_method: Option<String>,
        notes: Option<String>,
    ) -> Result<(TransactionModel, BookingModel), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::validation(
                "Refund amount must be greater than zero",
            ));
        }

        let txn = self.db.begin().await?;

        let booking = Booking::find()
            .filter(BookingColumn::Id.eq(booking_id))
            .filter(BookingColumn::OrganizationId.eq(organization_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| LedgerError::not_found("Booking"))?;

        if amount > booking.paid_amount {
            counter!("refunds_rejected_total").increment(1);
            return Err(LedgerError::invariant(
                format!(
                    "Refund of {:.2} exceeds the amount paid of {:.2}",
                    amount, booking.paid_amount
                ),
                serde_json::json!({
                    "amount": cents(amount),
                    "paid_amount": cents(booking.paid_amount),
                }),
            ));
        }

        let entry = new_entry(
            organization_id,
            Some(booking_id),
            TransactionType::Refund,
            amount,
            payment_method,
            notes,
        )
        .insert(&txn)
        .await?;

        let new_paid = booking.paid_amount - amount;
        let new_payment_status = derive_payment_status(booking.total, new_paid);

        let mut model: BookingActiveModel = booking.into();
        model.paid_amount = Set(new_paid);
        model.payment_status = Set(new_payment_status.as_str().to_string());
        model.updated_at = Set(Utc::now().into());
        let updated = model.update(&txn).await?;

        txn.commit().await?;
        counter!("refunds_recorded_total").increment(1);
        info!(
            booking_id = %booking_id,
            amount = %amount,
            payment_status = new_payment_status.as_str(),
            "Recorded refund"
        );

        Ok((entry, updated))
    }
}

/// Force a two-decimal scale on money values bound for error payloads.
/// SQLite hands back `100` where Postgres keeps `100.00`, and clients see
/// the serialized string.
fn cents(mut value: Decimal) -> Decimal {
    value.rescale(2);
    value
}

/// A booking is paid once the outstanding balance drops under one cent,
/// partial while any money has arrived, and pending otherwise.
fn derive_payment_status(total: Decimal, paid_amount: Decimal) -> PaymentStatus {
    if total - paid_amount < PAYMENT_TOLERANCE {
        PaymentStatus::Paid
    } else if paid_amount > Decimal::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    }
}

fn generate_booking_number(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("BK-{}-{:04}", now.format("%y%m%d"), suffix)
}
