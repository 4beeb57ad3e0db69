//! Product entity model
//!
//! `stock_quantity` is only ever mutated through the stock ledger operations
//! in `repositories::product`; direct field writes would bypass the
//! non-negativity guard.

use super::organization::Entity as Organization;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveModelBehavior;
use uuid::Uuid;

/// Product entity representing a retail or rental item
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Organization identifier for multi-tenancy
    pub organization_id: Uuid,

    pub name: String,

    pub description: Option<String>,

    /// Unit price, two decimal places
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,

    /// On-hand quantity; never negative while `track_inventory` is set
    pub stock_quantity: i32,

    /// Quantity at or below which the product shows up in low-stock listings
    pub low_stock_threshold: i32,

    /// Whether sales and adjustments touch `stock_quantity` at all
    pub track_inventory: bool,

    /// Soft-delete flag; products are never hard-deleted
    pub is_active: bool,

    /// Timestamp when the product was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the product was last updated
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
