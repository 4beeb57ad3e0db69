//! Migration to create the bookings table.
//!
//! Booking numbers are unique per organization, not globally, so the unique
//! index is composite on (organization_id, booking_number).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Bookings::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::BookingNumber).text().not_null())
                    .col(ColumnDef::new(Bookings::TripId).uuid().not_null())
                    .col(ColumnDef::new(Bookings::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(Bookings::Participants).integer().not_null())
                    .col(
                        ColumnDef::new(Bookings::Subtotal)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::Discount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::Tax)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::Total)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::PaidAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Bookings::PaymentStatus)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Bookings::Notes).text().null())
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Bookings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_organization_id")
                            .from(Bookings::Table, Bookings::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_trip_id")
                            .from(Bookings::Table, Bookings::TripId)
                            .to(Trips::Table, Trips::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_customer_id")
                            .from(Bookings::Table, Bookings::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite unique index backing per-organization booking numbers
        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_org_booking_number")
                    .table(Bookings::Table)
                    .col(Bookings::OrganizationId)
                    .col(Bookings::BookingNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_organization_id")
                    .table(Bookings::Table)
                    .col(Bookings::OrganizationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_bookings_org_booking_number")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_bookings_organization_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Bookings {
    Table,
    Id,
    OrganizationId,
    BookingNumber,
    TripId,
    CustomerId,
    Participants,
    Subtotal,
    Discount,
    Tax,
    Total,
    PaidAmount,
    Status,
    PaymentStatus,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Trips {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
}
