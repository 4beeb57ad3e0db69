//! Booking entity model
//!
//! `paid_amount` and `payment_status` are only ever mutated through the
//! payment ledger operations in `repositories::booking`, which hold the
//! overpayment invariant: `paid_amount` never exceeds `total` by more than
//! one cent.

use super::customer::Entity as Customer;
use super::organization::Entity as Organization;
use super::trip::Entity as Trip;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveModelBehavior;
use uuid::Uuid;

/// Booking entity, a reservation of participant slots on a trip
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    /// Unique identifier for the booking (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Organization identifier for multi-tenancy
    pub organization_id: Uuid,

    /// Human-readable reference, unique per organization (e.g. BK-260601-4821)
    pub booking_number: String,

    pub trip_id: Uuid,

    pub customer_id: Uuid,

    /// Number of participant slots reserved, at least one
    pub participants: i32,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub subtotal: Decimal,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub discount: Decimal,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub tax: Decimal,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total: Decimal,

    /// Cumulative amount received against `total`
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub paid_amount: Decimal,

    /// Lifecycle status (pending|confirmed|cancelled|no_show|completed)
    pub status: String,

    /// Derived payment label (pending|partial|paid)
    pub payment_status: String,

    pub notes: Option<String>,

    /// Timestamp when the booking was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the booking was last updated
    pub updated_at: DateTimeWithTimeZone,
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
        belongs_to = "Trip",
        from = "Column::TripId",
        to = "super::trip::Column::Id"
    )]
    Trip,
    #[sea_orm(
        belongs_to = "Customer",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
}

impl Related<Organization> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<Trip> for Entity {
    fn to() -> RelationDef {
        Relation::Trip.def()
    }
}

impl Related<Customer> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
