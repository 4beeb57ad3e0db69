//! Transaction entity model
//!
//! Append-only audit ledger. Nothing in this crate exposes an update or
//! delete path for these rows.

use super::booking::Entity as Booking;
use super::organization::Entity as Organization;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveModelBehavior;
use uuid::Uuid;

/// Transaction entity, one audit row per payment, sale, or refund
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Organization identifier for multi-tenancy
    pub organization_id: Uuid,

    /// Booking this row settles against; None for standalone POS sales
    pub booking_id: Option<Uuid>,

    /// Kind of ledger entry (payment|sale|refund)
    pub transaction_type: String,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,

    pub payment_method: Option<String>,

    pub notes: Option<String>,

    /// Timestamp when the entry was appended
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Organization",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id"
    )]
    Organization,
    #[sea_orm(
        belongs_to = "Booking",
        from = "Column::BookingId",
        to = "super::booking::Column::Id"
    )]
    Booking,
}

impl Related<Organization> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<Booking> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
