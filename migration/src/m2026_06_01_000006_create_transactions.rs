//! Migration to create the transactions table.
//!
//! Transactions are the append-only audit ledger: payments, POS sales, and
//! refunds. Rows are never updated or deleted by the application.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Transactions::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::BookingId).uuid().null())
                    .col(ColumnDef::new(Transactions::TransactionType).text().not_null())
                    .col(
                        ColumnDef::new(Transactions::Amount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::PaymentMethod).text().null())
                    .col(ColumnDef::new(Transactions::Notes).text().null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_organization_id")
                            .from(Transactions::Table, Transactions::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_booking_id")
                            .from(Transactions::Table, Transactions::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_organization_id")
                    .table(Transactions::Table)
                    .col(Transactions::OrganizationId)
                    .to_owned(),
            )
            .await?;

        // Keyset pagination reads transactions newest-first per organization
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_org_created_at")
                    .table(Transactions::Table)
                    .col(Transactions::OrganizationId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_transactions_org_created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_transactions_organization_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    OrganizationId,
    BookingId,
    TransactionType,
    Amount,
    PaymentMethod,
    Notes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Bookings {
    Table,
    Id,
}
