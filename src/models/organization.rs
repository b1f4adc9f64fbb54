//! Organization entity model
//!
//! This module contains the SeaORM entity model for the organizations table,
//! the tenant boundary that owns all bikes and bookings.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Organization entity representing the tenant isolation boundary
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    /// Unique identifier for the organization (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name for the organization
    pub name: String,

    /// Subscription plan tier
    pub plan_tier: String,

    /// Maximum number of active bikes the plan allows
    pub bike_quota: i32,

    /// Timestamp when the organization was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
