//! # Organization Repository
//!
//! Operator-scoped operations on the tenant root entity. Organizations are
//! the one table without an `organization_id` filter; everything else hangs
//! off them.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::organization::{
    ActiveModel as OrganizationActiveModel, Column as OrganizationColumn,
    Entity as Organization, Model as OrganizationModel,
};

/// Request data for creating a new organization
#[derive(Debug, Clone)]
pub struct CreateOrganizationRequest {
    /// Display name for the organization
    pub name: String,
    /// Optional end of the trial period
    pub trial_ends_at: Option<DateTime<Utc>>,
}

/// Repository for Organization database operations
pub struct OrganizationRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> OrganizationRepository<'a> {
    /// Create a new OrganizationRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new organization with `trial` subscription status
    pub async fn create_organization(
        &self,
        request: CreateOrganizationRequest,
    ) -> Result<OrganizationModel, LedgerError> {
        validate_organization_name(&request.name)?;

        let now = Utc::now();
        let organization = OrganizationActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            subscription_status: Set("trial".to_string()),
            trial_ends_at: Set(request.trial_ends_at.map(Into::into)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(organization.insert(self.db).await?)
    }

    /// Get an organization by ID
    pub async fn get_organization_by_id(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<OrganizationModel>, LedgerError> {
        Ok(Organization::find_by_id(organization_id)
            .one(self.db)
            .await?)
    }

    /// List all organizations ordered by creation time
    pub async fn list_organizations(&self) -> Result<Vec<OrganizationModel>, LedgerError> {
        Ok(Organization::find()
            .order_by_asc(OrganizationColumn::CreatedAt)
            .order_by_asc(OrganizationColumn::Id)
            .all(self.db)
            .await?)
    }
}

/// Validate an organization name according to business rules
fn validate_organization_name(name: &str) -> Result<(), LedgerError> {
    if name.trim().is_empty() {
        return Err(LedgerError::validation("Organization name cannot be empty"));
    }

    if name.len() > 255 {
        return Err(LedgerError::validation(
            "Organization name cannot exceed 255 characters",
        ));
    }

    // Letters, numbers, spaces, hyphens, underscores, and the punctuation
    // that shows up in real shop names ("Moe's Dive & Surf").
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c.is_whitespace() || "-_'&.".contains(c))
    {
        return Err(LedgerError::validation(
            "Organization name contains unsupported characters",
        ));
    }

    Ok(())
}
