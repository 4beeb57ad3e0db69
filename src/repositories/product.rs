//! # Product Repository
//!
//! Organization-scoped product catalog plus the stock ledger. Every stock
//! mutation flows through [`ProductRepository::adjust_stock`] or the sale
//! flow; both apply the decrement as a conditional UPDATE so a concurrent
//! writer can never drive `stock_quantity` negative.

use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::prelude::*;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::cursor::{CursorData, encode_cursor};
use crate::error::LedgerError;
use crate::models::product::{
    ActiveModel as ProductActiveModel, Column as ProductColumn, Entity as Product,
    Model as ProductModel,
};

/// Request data for creating a new product
#[derive(Debug, Clone)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    pub track_inventory: bool,
}

/// Partial update for a product; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub track_inventory: Option<bool>,
}

/// Outcome of a successful (or no-op) stock adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: Uuid,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub delta: i32,
}

/// Repository for Product database operations and the stock ledger
pub struct ProductRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ProductRepository<'a> {
    /// Create a new ProductRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a product inside the organization scope
    pub async fn create_product(
        &self,
        organization_id: Uuid,
        request: CreateProductRequest,
    ) -> Result<ProductModel, LedgerError> {
        validate_product_name(&request.name)?;
        if request.price < Decimal::ZERO {
            return Err(LedgerError::validation("Product price cannot be negative"));
        }
        if request.stock_quantity < 0 {
            return Err(LedgerError::validation(
                "Product stock quantity cannot be negative",
            ));
        }
        if request.low_stock_threshold < 0 {
            return Err(LedgerError::validation(
                "Product low stock threshold cannot be negative",
            ));
        }

        let now = Utc::now();
        let product = ProductActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            name: Set(request.name),
            description: Set(request.description),
            price: Set(request.price),
            stock_quantity: Set(request.stock_quantity),
            low_stock_threshold: Set(request.low_stock_threshold),
            track_inventory: Set(request.track_inventory),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(product.insert(self.db).await?)
    }

    /// Find a product by ID within the organization scope.
    ///
    /// Soft-deleted products still resolve here; listings hide them.
    pub async fn find_by_id(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<ProductModel>, LedgerError> {
        Ok(Product::find()
            .filter(ProductColumn::Id.eq(product_id))
            .filter(ProductColumn::OrganizationId.eq(organization_id))
            .one(self.db)
            .await?)
    }

    /// List active products for an organization with cursor pagination
    pub async fn list_products(
        &self,
        organization_id: Uuid,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<(Vec<ProductModel>, Option<String>), LedgerError> {
        if limit == 0 {
            return Ok((Vec::new(), None));
        }

        let mut query = Product::find()
            .filter(ProductColumn::OrganizationId.eq(organization_id))
            .filter(ProductColumn::IsActive.eq(true))
            .order_by_asc(ProductColumn::CreatedAt)
            .order_by_asc(ProductColumn::Id);

        if let Some(cursor) = cursor {
            let condition = Condition::any()
                .add(ProductColumn::CreatedAt.gt(cursor.created_at))
                .add(
                    Condition::all()
                        .add(ProductColumn::CreatedAt.eq(cursor.created_at))
                        .add(ProductColumn::Id.gt(cursor.id)),
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

    /// List active, tracked products at or below their low-stock threshold,
    /// most depleted first
    pub async fn list_low_stock(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<ProductModel>, LedgerError> {
        Ok(Product::find()
            .filter(ProductColumn::OrganizationId.eq(organization_id))
            .filter(ProductColumn::IsActive.eq(true))
            .filter(ProductColumn::TrackInventory.eq(true))
            .filter(
                Expr::col(ProductColumn::StockQuantity)
                    .lte(Expr::col(ProductColumn::LowStockThreshold)),
            )
            .order_by_asc(ProductColumn::StockQuantity)
            .order_by_asc(ProductColumn::Name)
            .all(self.db)
            .await?)
    }

    /// Update mutable fields on a product within the organization scope
    pub async fn update_product(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
        update: UpdateProductRequest,
    ) -> Result<ProductModel, LedgerError> {
        let existing = self
            .find_by_id(organization_id, product_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product"))?;

        if let Some(name) = &update.name {
            validate_product_name(name)?;
        }
        if let Some(price) = update.price
            && price < Decimal::ZERO
        {
            return Err(LedgerError::validation("Product price cannot be negative"));
        }
        if let Some(stock_quantity) = update.stock_quantity
            && stock_quantity < 0
        {
            return Err(LedgerError::validation(
                "Product stock quantity cannot be negative",
            ));
        }
        if let Some(threshold) = update.low_stock_threshold
            && threshold < 0
        {
            return Err(LedgerError::validation(
                "Product low stock threshold cannot be negative",
            ));
        }

        let mut model: ProductActiveModel = existing.into();
        if let Some(name) = update.name {
            model.name = Set(name);
        }
        if let Some(description) = update.description {
            model.description = Set(Some(description));
        }
        if let Some(price) = update.price {
            model.price = Set(price);
        }
        if let Some(stock_quantity) = update.stock_quantity {
            model.stock_quantity = Set(stock_quantity);
        }
        if let Some(threshold) = update.low_stock_threshold {
            model.low_stock_threshold = Set(threshold);
        }
        if let Some(track_inventory) = update.track_inventory {
            model.track_inventory = Set(track_inventory);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(self.db).await?)
    }

    /// Soft-delete a product. The row stays behind for transaction history;
    /// it just stops resolving in listings and sales.
    pub async fn deactivate_product(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductModel, LedgerError> {
        let existing = self
            .find_by_id(organization_id, product_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product"))?;

        let mut model: ProductActiveModel = existing.into();
        model.is_active = Set(false);
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(self.db).await?)
    }

    /// Apply a signed stock adjustment to one product.
    ///
    /// The row is read under an exclusive lock and the mutation is a single
    /// conditional UPDATE; zero rows affected means a concurrent writer got
    /// there first, which is reported the same way as the guard firing.
    /// `delta = 0` verifies the product resolves and returns a no-op success.
    pub async fn adjust_stock(
        &self,
        organization_id: Uuid,
        product_id: Uuid,
        delta: i32,
    ) -> Result<StockAdjustment, LedgerError> {
        let txn = self.db.begin().await?;

        let product = Product::find()
            .filter(ProductColumn::Id.eq(product_id))
            .filter(ProductColumn::OrganizationId.eq(organization_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product"))?;

        let previous_quantity = product.stock_quantity;
        // Widen before adding: delta comes straight off the wire and
        // `stock + i32::MAX` must not wrap.
        let new_quantity = i64::from(previous_quantity) + i64::from(delta);

        if delta == 0 {
            debug!(product_id = %product_id, "Zero-delta stock adjustment, nothing to do");
            return Ok(StockAdjustment {
                product_id,
                previous_quantity,
                new_quantity: previous_quantity,
                delta,
            });
        }

        if new_quantity < 0 {
            counter!("stock_adjustments_rejected_total").increment(1);
            return Err(negative_stock_rejection(
                delta,
                new_quantity,
                previous_quantity,
            ));
        }

        if new_quantity > i64::from(i32::MAX) {
            return Err(LedgerError::validation(format!(
                "Cannot adjust stock by {}: resulting stock would exceed the maximum of {}",
                delta,
                i32::MAX
            )));
        }
        let new_quantity = new_quantity as i32;

        let update_result = Product::update_many()
            .col_expr(
                ProductColumn::StockQuantity,
                Expr::value(Expr::col(ProductColumn::StockQuantity).add(delta)),
            )
            .col_expr(ProductColumn::UpdatedAt, Expr::value(Utc::now()))
            .filter(ProductColumn::Id.eq(product_id))
            .filter(ProductColumn::OrganizationId.eq(organization_id))
            .filter(ProductColumn::StockQuantity.gte(-i64::from(delta)))
            .exec(&txn)
            .await?;

        if update_result.rows_affected == 0 {
            // A concurrent writer drained the stock between our read and the
            // conditional UPDATE.
            counter!("stock_adjustments_rejected_total").increment(1);
            return Err(negative_stock_rejection(
                delta,
                i64::from(new_quantity),
                previous_quantity,
            ));
        }

        txn.commit().await?;
        counter!("stock_adjustments_applied_total").increment(1);

        Ok(StockAdjustment {
            product_id,
            previous_quantity,
            new_quantity,
            delta,
        })
    }
}

fn validate_product_name(name: &str) -> Result<(), LedgerError> {
    if name.trim().is_empty() {
        return Err(LedgerError::validation("Product name cannot be empty"));
    }
    if name.len() > 255 {
        return Err(LedgerError::validation(
            "Product name cannot exceed 255 characters",
        ));
    }
    Ok(())
}

fn negative_stock_rejection(delta: i32, new_quantity: i64, current: i32) -> LedgerError {
    LedgerError::invariant(
        format!(
            "Cannot adjust stock by {}: would result in negative stock ({}). Current stock is {}",
            delta, new_quantity, current
        ),
        serde_json::json!({
            "delta": delta,
            "current_stock": current,
            "resulting_stock": new_quantity,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_stock_rejection_names_all_three_quantities() {
        let err = negative_stock_rejection(-3, -1, 2);
        let message = err.to_string();
        assert_eq!(
            message,
            "Cannot adjust stock by -3: would result in negative stock (-1). Current stock is 2"
        );

        match err {
            LedgerError::InvariantViolation { details, .. } => {
                let details = details.unwrap();
                assert_eq!(details["delta"], -3);
                assert_eq!(details["current_stock"], 2);
                assert_eq!(details["resulting_stock"], -1);
            }
            other => panic!("expected invariant violation, got {:?}", other),
        }
    }

    #[test]
    fn product_name_validation() {
        assert!(validate_product_name("Dive Mask").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"x".repeat(256)).is_err());
    }
}
