//! # Trip Repository
//!
//! Organization-scoped dive trip records. Capacity is stored as data only;
//! nothing here checks it against booked participants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::cursor::{CursorData, encode_cursor};
use crate::error::LedgerError;
use crate::models::trip::{
    ActiveModel as TripActiveModel, Column as TripColumn, Entity as Trip, Model as TripModel,
};

/// Request data for creating a new trip
#[derive(Debug, Clone)]
pub struct CreateTripRequest {
    pub name: String,
    pub departs_at: DateTime<Utc>,
    pub capacity: i32,
    pub price: Decimal,
}

/// Repository for Trip database operations
pub struct TripRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TripRepository<'a> {
    /// Create a new TripRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a trip inside the organization scope
    pub async fn create_trip(
        &self,
        organization_id: Uuid,
        request: CreateTripRequest,
    ) -> Result<TripModel, LedgerError> {
        if request.name.trim().is_empty() {
            return Err(LedgerError::validation("Trip name cannot be empty"));
        }
        if request.name.len() > 255 {
            return Err(LedgerError::validation(
                "Trip name cannot exceed 255 characters",
            ));
        }
        if request.capacity < 1 {
            return Err(LedgerError::validation("Trip capacity must be at least 1"));
        }
        if request.price < Decimal::ZERO {
            return Err(LedgerError::validation("Trip price cannot be negative"));
        }

        let now = Utc::now();
        let trip = TripActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            name: Set(request.name),
            departs_at: Set(request.departs_at.into()),
            capacity: Set(request.capacity),
            price: Set(request.price),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(trip.insert(self.db).await?)
    }

    /// Find a trip by ID within the organization scope
    pub async fn find_by_id(
        &self,
        organization_id: Uuid,
        trip_id: Uuid,
    ) -> Result<Option<TripModel>, LedgerError> {
        Ok(Trip::find()
            .filter(TripColumn::Id.eq(trip_id))
            .filter(TripColumn::OrganizationId.eq(organization_id))
            .one(self.db)
            .await?)
    }

    /// List trips for an organization with cursor pagination, oldest first
    pub async fn list_trips(
        &self,
        organization_id: Uuid,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<(Vec<TripModel>, Option<String>), LedgerError> {
        if limit == 0 {
            return Ok((Vec::new(), None));
        }

        let mut query = Trip::find()
            .filter(TripColumn::OrganizationId.eq(organization_id))
            .order_by_asc(TripColumn::CreatedAt)
            .order_by_asc(TripColumn::Id);

        if let Some(cursor) = cursor {
            let condition = Condition::any()
                .add(TripColumn::CreatedAt.gt(cursor.created_at))
                .add(
                    Condition::all()
                        .add(TripColumn::CreatedAt.eq(cursor.created_at))
                        .add(TripColumn::Id.gt(cursor.id)),
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
