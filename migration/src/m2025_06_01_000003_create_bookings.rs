//! Migration to create the bookings table.
//!
//! Bookings reserve one bike for a contiguous date range. Date columns hold
//! day-boundary normalized timestamps; the (org, bike, range) index backs the
//! overlap and availability queries.

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
                    .col(ColumnDef::new(Bookings::OrgId).uuid().not_null())
                    .col(ColumnDef::new(Bookings::BikeId).uuid().not_null())
                    .col(ColumnDef::new(Bookings::CustomerName).text().not_null())
                    .col(ColumnDef::new(Bookings::Phone).text().not_null())
                    .col(
                        ColumnDef::new(Bookings::StartDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::EndDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .text()
                            .not_null()
                            .default("upcoming"),
                    )
                    .col(
                        ColumnDef::new(Bookings::TotalAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::PaidAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::SecurityDeposit)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(Bookings::LateFee).big_integer().null())
                    .col(ColumnDef::new(Bookings::FuelCharge).big_integer().null())
                    .col(ColumnDef::new(Bookings::DamageCharge).big_integer().null())
                    .col(
                        ColumnDef::new(Bookings::ExtraDistanceCharge)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(Bookings::Notes).text().null())
                    .col(
                        ColumnDef::new(Bookings::DeliveredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Bookings::OdometerStart).big_integer().null())
                    .col(ColumnDef::new(Bookings::FuelLevelStart).text().null())
                    .col(ColumnDef::new(Bookings::HelmetsGiven).integer().null())
                    .col(ColumnDef::new(Bookings::ExistingDamage).text().null())
                    .col(ColumnDef::new(Bookings::DocumentRefs).json().null())
                    .col(
                        ColumnDef::new(Bookings::IdentityVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Bookings::ReturnedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Bookings::OdometerEnd).big_integer().null())
                    .col(ColumnDef::new(Bookings::FuelLevelEnd).text().null())
                    .col(ColumnDef::new(Bookings::HelmetsReturned).integer().null())
                    .col(ColumnDef::new(Bookings::NewDamage).text().null())
                    .col(
                        ColumnDef::new(Bookings::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
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
                            .name("fk_bookings_org_id")
                            .from(Bookings::Table, Bookings::OrgId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_bike_id")
                            .from(Bookings::Table, Bookings::BikeId)
                            .to(Bikes::Table, Bikes::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_org_status")
                    .table(Bookings::Table)
                    .col(Bookings::OrgId)
                    .col(Bookings::Status)
                    .to_owned(),
            )
            .await?;

        // Backs overlap detection and availability projection.
        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_org_bike_range")
                    .table(Bookings::Table)
                    .col(Bookings::OrgId)
                    .col(Bookings::BikeId)
                    .col(Bookings::StartDate)
                    .col(Bookings::EndDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_bookings_org_status").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_bookings_org_bike_range")
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
    OrgId,
    BikeId,
    CustomerName,
    Phone,
    StartDate,
    EndDate,
    Status,
    TotalAmount,
    PaidAmount,
    SecurityDeposit,
    LateFee,
    FuelCharge,
    DamageCharge,
    ExtraDistanceCharge,
    Notes,
    DeliveredAt,
    OdometerStart,
    FuelLevelStart,
    HelmetsGiven,
    ExistingDamage,
    DocumentRefs,
    IdentityVerified,
    ReturnedAt,
    OdometerEnd,
    FuelLevelEnd,
    HelmetsReturned,
    NewDamage,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Bikes {
    Table,
    Id,
}
