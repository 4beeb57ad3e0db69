//! # Transaction Repository
//!
//! Read side of the append-only audit ledger. Rows are created by the
//! payment, refund, and sale flows through [`new_entry`], always inside the
//! same database transaction as the balance or stock change they record.
//! There is no update or delete path.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use uuid::Uuid;

use crate::cursor::{CursorData, encode_cursor};
use crate::error::LedgerError;
use crate::models::status::TransactionType;
use crate::models::transaction::{
    ActiveModel as TransactionActiveModel, Column as TransactionColumn, Entity as Transaction,
    Model as TransactionModel,
};

/// Build a ledger row ready to insert. Callers append it inside their own
/// database transaction so the entry commits atomically with the change it
/// records.
pub(crate) fn new_entry(
    organization_id: Uuid,
    booking_id: Option<Uuid>,
    transaction_type: TransactionType,
    amount: Decimal,
    payment_method: Option<String>,
    notes: Option<String>,
) -> TransactionActiveModel {
    TransactionActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(organization_id),
        booking_id: Set(booking_id),
        transaction_type: Set(transaction_type.as_str().to_string()),
        amount: Set(amount),
        payment_method: Set(payment_method),
        notes: Set(notes),
        created_at: Set(Utc::now().into()),
    }
}

/// Repository for reading the transaction ledger
pub struct TransactionRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TransactionRepository<'a> {
    /// Create a new TransactionRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// List ledger entries newest-first, optionally narrowed to one booking
    pub async fn list_transactions(
        &self,
        organization_id: Uuid,
        booking_id: Option<Uuid>,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<(Vec<TransactionModel>, Option<String>), LedgerError> {
        if limit == 0 {
            return Ok((Vec::new(), None));
        }

        let mut query = Transaction::find()
            .filter(TransactionColumn::OrganizationId.eq(organization_id))
            .order_by_desc(TransactionColumn::CreatedAt)
            .order_by_desc(TransactionColumn::Id);

        if let Some(booking_id) = booking_id {
            query = query.filter(TransactionColumn::BookingId.eq(booking_id));
        }

        if let Some(cursor) = cursor {
            let condition = Condition::any()
                .add(TransactionColumn::CreatedAt.lt(cursor.created_at))
                .add(
                    Condition::all()
                        .add(TransactionColumn::CreatedAt.eq(cursor.created_at))
                        .add(TransactionColumn::Id.lt(cursor.id)),
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
}
