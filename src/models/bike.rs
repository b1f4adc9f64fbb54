//! Bike entity model
//!
//! This module contains the SeaORM entity model for the bikes table. A bike's
//! status column is a derived cache: it must always equal the value the status
//! synchronizer would compute, except for the manual MAINTENANCE override.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::organization::Entity as Organization;

/// Operational status of a bike.
///
/// AVAILABLE and RENTED are derived from booking occupancy; MAINTENANCE is an
/// operator override that reconciliation never clears.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BikeStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "rented")]
    Rented,
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
}

/// Bike entity representing an organization-scoped rentable unit
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bikes")]
pub struct Model {
    /// Unique identifier for the bike (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Organization identifier for multi-tenancy
    pub org_id: Uuid,

    /// Registration number, unique per organization
    pub registration_number: String,

    /// Optional manufacturer/model label
    pub model: Option<String>,

    /// Daily rental rate in minor currency units
    pub daily_rate: i64,

    /// Derived operational status (cached)
    pub status: BikeStatus,

    /// Soft-delete timestamp; deleted bikes are excluded from all queries
    pub deleted_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the bike was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the bike was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Organization",
        from = "Column::OrgId",
        to = "super::organization::Column::Id"
    )]
    Organization,
}

impl Related<Organization> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
