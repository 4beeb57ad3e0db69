//! Organization entity model
//!
//! Organizations are the tenant root: every tenant-scoped table carries an
//! `organization_id` foreign key pointing at this one.

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveModelBehavior;
use uuid::Uuid;

/// Organization entity representing one customer business using the platform
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    /// Unique identifier for the organization (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name of the business
    pub name: String,

    /// Subscription status label (trial|active|past_due|cancelled)
    pub subscription_status: String,

    /// When the trial period ends, if the organization is on trial
    pub trial_ends_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the organization was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the organization was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
