//! Migration to create the bikes table.
//!
//! Bikes are organization-scoped rentable units. The status column is a
//! derived cache maintained by the status synchronizer; registration numbers
//! are unique per organization.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bikes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bikes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Bikes::OrgId).uuid().not_null())
                    .col(ColumnDef::new(Bikes::RegistrationNumber).text().not_null())
                    .col(ColumnDef::new(Bikes::Model).text().null())
                    .col(
                        ColumnDef::new(Bikes::DailyRate)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bikes::Status)
                            .text()
                            .not_null()
                            .default("available"),
                    )
                    .col(
                        ColumnDef::new(Bikes::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Bikes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Bikes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bikes_org_id")
                            .from(Bikes::Table, Bikes::OrgId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Registration numbers are unique within an organization only.
        manager
            .create_index(
                Index::create()
                    .name("idx_bikes_org_registration")
                    .table(Bikes::Table)
                    .col(Bikes::OrgId)
                    .col(Bikes::RegistrationNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bikes_org_status")
                    .table(Bikes::Table)
                    .col(Bikes::OrgId)
                    .col(Bikes::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_bikes_org_registration")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_bikes_org_status").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Bikes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Bikes {
    Table,
    Id,
    OrgId,
    RegistrationNumber,
    Model,
    DailyRate,
    Status,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
}
