//! # Customer Repository
//!
//! Organization-scoped CRM records. Just enough surface for bookings to
//! reference a real person and for isolation to be testable.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::cursor::{CursorData, encode_cursor};
use crate::error::LedgerError;
use crate::models::customer::{
    ActiveModel as CustomerActiveModel, Column as CustomerColumn, Entity as Customer,
    Model as CustomerModel,
};

/// Request data for creating a new customer
#[derive(Debug, Clone)]
pub struct CreateCustomerRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub certification_level: Option<String>,
}

/// Repository for Customer database operations
pub struct CustomerRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new CustomerRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a customer inside the organization scope
    pub async fn create_customer(
        &self,
        organization_id: Uuid,
        request: CreateCustomerRequest,
    ) -> Result<CustomerModel, LedgerError> {
        validate_person_name("first name", &request.first_name)?;
        validate_person_name("last name", &request.last_name)?;

        let now = Utc::now();
        let customer = CustomerActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            first_name: Set(request.first_name),
            last_name: Set(request.last_name),
            email: Set(request.email),
            phone: Set(request.phone),
            certification_level: Set(request.certification_level),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(customer.insert(self.db).await?)
    }

    /// Find a customer by ID within the organization scope
    pub async fn find_by_id(
        &self,
        organization_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<CustomerModel>, LedgerError> {
        Ok(Customer::find()
            .filter(CustomerColumn::Id.eq(customer_id))
            .filter(CustomerColumn::OrganizationId.eq(organization_id))
            .one(self.db)
            .await?)
    }

    /// List customers for an organization with cursor pagination, oldest first
    pub async fn list_customers(
        &self,
        organization_id: Uuid,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<(Vec<CustomerModel>, Option<String>), LedgerError> {
        if limit == 0 {
            return Ok((Vec::new(), None));
        }

        let mut query = Customer::find()
            .filter(CustomerColumn::OrganizationId.eq(organization_id))
            .order_by_asc(CustomerColumn::CreatedAt)
            .order_by_asc(CustomerColumn::Id);

        if let Some(cursor) = cursor {
            let condition = Condition::any()
                .add(CustomerColumn::CreatedAt.gt(cursor.created_at))
                .add(
                    Condition::all()
                        .add(CustomerColumn::CreatedAt.eq(cursor.created_at))
                        .add(CustomerColumn::Id.gt(cursor.id)),
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

fn validate_person_name(field: &str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::validation(format!(
            "Customer {} cannot be empty",
            field
        )));
    }
    if value.len() > 255 {
        return Err(LedgerError::validation(format!(
            "Customer {} cannot exceed 255 characters",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup() -> (DatabaseConnection, Uuid) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let organization_id = Uuid::new_v4();
        let organization = crate::models::organization::ActiveModel {
            id: Set(organization_id),
            name: Set("Test Shop".to_string()),
            subscription_status: Set("trial".to_string()),
            trial_ends_at: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(Utc::now().into()),
        };
        organization.insert(&db).await.unwrap();

        (db, organization_id)
    }

    fn diver(first: &str, last: &str) -> CreateCustomerRequest {
        CreateCustomerRequest {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: None,
            phone: None,
            certification_level: Some("Open Water".to_string()),
        }
    }

    #[tokio::test]
    async fn create_and_find_in_scope() {
        let (db, organization_id) = setup().await;
        let repo = CustomerRepository::new(&db);

        let created = repo
            .create_customer(organization_id, diver("Ana", "Reyes"))
            .await
            .unwrap();

        let found = repo
            .find_by_id(organization_id, created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.first_name, "Ana");
        assert_eq!(found.certification_level.as_deref(), Some("Open Water"));
    }

    #[tokio::test]
    async fn find_outside_scope_is_none() {
        let (db, organization_id) = setup().await;
        let repo = CustomerRepository::new(&db);

        let created = repo
            .create_customer(organization_id, diver("Ben", "Tran"))
            .await
            .unwrap();

        let foreign_scope = repo.find_by_id(Uuid::new_v4(), created.id).await.unwrap();
        assert!(foreign_scope.is_none());
    }

    #[tokio::test]
    async fn empty_names_are_rejected() {
        let (db, organization_id) = setup().await;
        let repo = CustomerRepository::new(&db);

        let result = repo
            .create_customer(organization_id, diver("  ", "Reyes"))
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }
}
