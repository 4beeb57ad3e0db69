//! # Sale Repository
//!
//! Point-of-sale counter sales. Each sale is one database transaction that
//! locks the product rows in sorted ID order, then applies stock decrements
//! as conditional UPDATEs and appends a single aggregated ledger entry.

use std::collections::HashMap;

use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::prelude::*;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect,
    TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
use crate::models::status::TransactionType;
use crate::models::transaction::Model as TransactionModel;
use crate::repositories::transaction::new_entry;

/// One line of a sale request
#[derive(Debug, Clone, Copy)]
pub struct SaleItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// One priced line of a completed sale. Stock quantities are `None` for
/// products that do not track inventory.
#[derive(Debug, Clone)]
pub struct SaleLineResult {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub previous_quantity: Option<i32>,
    pub new_quantity: Option<i32>,
}

/// Repository for point-of-sale operations
pub struct SaleRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SaleRepository<'a> {
    /// Create a new SaleRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Record a counter sale.
    ///
    /// Either every line succeeds, stock is decremented, and one sale entry
    /// lands in the ledger, or nothing changes. A line that asks for more of
    /// a tracked product than the locked row holds (counting earlier lines
    /// of the same sale) rejects the whole sale.
    pub async fn record_sale(
        &self,
        organization_id: Uuid,
        items: Vec<SaleItem>,
        payment_method: Option<String>,
        notes: Option<String>,
    ) -> Result<(TransactionModel, Vec<SaleLineResult>), LedgerError> {
        if items.is_empty() {
            return Err(LedgerError::validation("Sale must contain at least one item"));
        }
        for item in &items {
            if item.quantity < 1 {
                return Err(LedgerError::validation(
                    "Sale item quantity must be at least 1",
                ));
            }
        }

        let txn = self.db.begin().await?;

        // Lock rows in a stable order so concurrent sales cannot deadlock.
        let mut unique_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
        unique_ids.sort();
        unique_ids.dedup();

        let mut products: HashMap<Uuid, ProductModel> = HashMap::with_capacity(unique_ids.len());
        for product_id in &unique_ids {
            let product = Product::find()
                .filter(ProductColumn::Id.eq(*product_id))
                .filter(ProductColumn::OrganizationId.eq(organization_id))
                .filter(ProductColumn::IsActive.eq(true))
                .lock_exclusive()
                .one(&txn)
                .await?
                .ok_or_else(|| LedgerError::not_found("Product"))?;
            products.insert(*product_id, product);
        }

        let mut amount = Decimal::ZERO;
        let mut lines = Vec::with_capacity(items.len());
        let mut working: HashMap<Uuid, i32> = HashMap::new();

        for item in &items {
            let product = products
                .get(&item.product_id)
                .ok_or_else(|| LedgerError::not_found("Product"))?;
            let line_total = product.price * Decimal::from(item.quantity);
            amount += line_total;

            let (previous_quantity, new_quantity) = if product.track_inventory {
                let remaining = working
                    .entry(item.product_id)
                    .or_insert(product.stock_quantity);
                if *remaining < item.quantity {
                    counter!("sales_rejected_total").increment(1);
                    return Err(insufficient_stock(product, item.quantity, *remaining));
                }
                let previous = *remaining;
                *remaining -= item.quantity;
                (Some(previous), Some(previous - item.quantity))
            } else {
                (None, None)
            };

            lines.push(SaleLineResult {
                product_id: item.product_id,
                name: product.name.clone(),
                quantity: item.quantity,
                unit_price: product.price,
                line_total,
                previous_quantity,
                new_quantity,
            });
        }

        for product_id in &unique_ids {
            let Some(product) = products.get(product_id) else {
                continue;
            };
            if !product.track_inventory {
                continue;
            }
            let Some(remaining) = working.get(product_id) else {
                continue;
            };
            let decrement = product.stock_quantity - remaining;
            if decrement <= 0 {
                continue;
            }

            let update_result = Product::update_many()
                .col_expr(
                    ProductColumn::StockQuantity,
                    Expr::value(Expr::col(ProductColumn::StockQuantity).sub(decrement)),
                )
                .col_expr(ProductColumn::UpdatedAt, Expr::value(Utc::now()))
                .filter(ProductColumn::Id.eq(*product_id))
                .filter(ProductColumn::OrganizationId.eq(organization_id))
                .filter(ProductColumn::StockQuantity.gte(decrement))
                .exec(&txn)
                .await?;

            if update_result.rows_affected == 0 {
                // The row is locked, so only the WHERE guard can zero this out.
                counter!("sales_rejected_total").increment(1);
                return Err(insufficient_stock(product, decrement, product.stock_quantity));
            }
        }

        let entry = new_entry(
            organization_id,
            None,
            TransactionType::Sale,
            amount,
            payment_method,
            notes,
        )
        .insert(&txn)
        .await?;

        txn.commit().await?;
        counter!("sales_recorded_total").increment(1);
        info!(
            transaction_id = %entry.id,
            amount = %amount,
            lines = lines.len(),
            "Recorded sale"
        );

        Ok((entry, lines))
    }
}

fn insufficient_stock(product: &ProductModel, requested: i32, available: i32) -> LedgerError {
    LedgerError::invariant(
        format!(
            "Insufficient stock for {}: requested {}, available {}",
            product.name, requested, available
        ),
        serde_json::json!({
            "product_id": product.id,
            "requested": requested,
            "available": available,
        }),
    )
}
