//! Migration to create the trips table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Trips::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Trips::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Trips::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Trips::Name).text().not_null())
                    .col(
                        ColumnDef::new(Trips::DepartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Trips::Capacity).integer().not_null())
                    .col(
                        ColumnDef::new(Trips::Price)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Trips::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Trips::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Trips::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trips_organization_id")
                            .from(Trips::Table, Trips::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trips_organization_id")
                    .table(Trips::Table)
                    .col(Trips::OrganizationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_trips_organization_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Trips::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Trips {
    Table,
    Id,
    OrganizationId,
    Name,
    DepartsAt,
    Capacity,
    Price,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
}
