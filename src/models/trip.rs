//! Trip entity model

use super::organization::Entity as Organization;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveModelBehavior;
use uuid::Uuid;

/// Trip entity, a scheduled dive excursion bookings attach to
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "trips")]
pub struct Model {
    /// Unique identifier for the trip (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Organization identifier for multi-tenancy
    pub organization_id: Uuid,

    pub name: String,

    /// Scheduled departure time
    pub departs_at: DateTimeWithTimeZone,

    /// Maximum participant slots; informational, not enforced against bookings
    pub capacity: i32,

    /// Per-participant price
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,

    pub is_active: bool,

    /// Timestamp when the trip was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the trip was last updated
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
}

impl Related<Organization> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
