//! Customer entity model

use super::organization::Entity as Organization;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveModelBehavior;
use uuid::Uuid;

/// Customer entity, the person a booking is made for
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    /// Unique identifier for the customer (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Organization identifier for multi-tenancy
    pub organization_id: Uuid,

    pub first_name: String,

    pub last_name: String,

    pub email: Option<String>,

    pub phone: Option<String>,

    /// Diving certification level, free-form (e.g. "Open Water", "Rescue")
    pub certification_level: Option<String>,

    /// Timestamp when the customer was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the customer was last updated
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
