//! Booking entity model
//!
//! This module contains the SeaORM entity model for the bookings table: a
//! reservation of one bike for a contiguous, day-boundary-normalized date
//! range, carrying delivery and return checkpoint data.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::bike::Entity as Bike;
use super::organization::Entity as Organization;

/// Lifecycle status of a booking. RETURNED and CANCELLED are terminal.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[sea_orm(string_value = "upcoming")]
    Upcoming,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "returned")]
    Returned,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl BookingStatus {
    /// RETURNED and CANCELLED bookings never occupy a bike again.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Returned | BookingStatus::Cancelled)
    }

    /// Statuses that participate in overlap and occupancy checks.
    pub fn non_terminal() -> [BookingStatus; 2] {
        [BookingStatus::Upcoming, BookingStatus::Active]
    }
}

/// Fuel level recorded at delivery and return checkpoints.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelLevel {
    #[sea_orm(string_value = "full")]
    Full,
    #[sea_orm(string_value = "three_quarter")]
    ThreeQuarter,
    #[sea_orm(string_value = "half")]
    Half,
    #[sea_orm(string_value = "quarter")]
    Quarter,
    #[sea_orm(string_value = "low")]
    Low,
}

/// Booking entity representing a reservation of one bike for a date range
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    /// Unique identifier for the booking (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Organization identifier for multi-tenancy
    pub org_id: Uuid,

    /// Bike being reserved
    pub bike_id: Uuid,

    /// Customer display name
    pub customer_name: String,

    /// Customer contact phone
    pub phone: String,

    /// Range start, normalized to 00:00:00 UTC of the start day
    pub start_date: DateTimeWithTimeZone,

    /// Range end, normalized to 23:59:59 UTC of the end day; rewritten to the
    /// actual return instant at settlement
    pub end_date: DateTimeWithTimeZone,

    /// Lifecycle status
    pub status: BookingStatus,

    /// Agreed total in minor currency units, grows with settlement charges
    pub total_amount: i64,

    /// Money received so far in minor currency units
    pub paid_amount: i64,

    /// Refundable deposit taken at delivery
    pub security_deposit: Option<i64>,

    /// Overdue fee recorded at settlement
    pub late_fee: Option<i64>,

    /// Fuel charge recorded at settlement
    pub fuel_charge: Option<i64>,

    /// Damage charge recorded at settlement
    pub damage_charge: Option<i64>,

    /// Extra-distance charge recorded at settlement
    pub extra_distance_charge: Option<i64>,

    /// Free-text notes; settlement fines notes are appended, never overwrite
    pub notes: Option<String>,

    /// Delivery checkpoint: handover timestamp
    pub delivered_at: Option<DateTimeWithTimeZone>,

    /// Delivery checkpoint: odometer reading at handover
    pub odometer_start: Option<i64>,

    /// Delivery checkpoint: fuel level at handover
    pub fuel_level_start: Option<FuelLevel>,

    /// Delivery checkpoint: helmets handed over
    pub helmets_given: Option<i32>,

    /// Delivery checkpoint: pre-existing damage note
    pub existing_damage: Option<String>,

    /// Delivery checkpoint: photo/document reference strings, stored as a
    /// JSON array. Files themselves live outside the service.
    pub document_refs: Option<Json>,

    /// Delivery checkpoint: customer identity verified
    pub identity_verified: bool,

    /// Return checkpoint: actual return timestamp
    pub returned_at: Option<DateTimeWithTimeZone>,

    /// Return checkpoint: odometer reading at return
    pub odometer_end: Option<i64>,

    /// Return checkpoint: fuel level at return
    pub fuel_level_end: Option<FuelLevel>,

    /// Return checkpoint: helmets returned
    pub helmets_returned: Option<i32>,

    /// Return checkpoint: new damage note
    pub new_damage: Option<String>,

    /// Soft-delete timestamp
    pub deleted_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the booking was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the booking was last updated
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// A settlement has been recorded once any settlement charge is present.
    /// Cancellation and soft delete are blocked from that point on.
    pub fn has_settlement(&self) -> bool {
        self.late_fee.is_some()
            || self.fuel_charge.is_some()
            || self.damage_charge.is_some()
            || self.extra_distance_charge.is_some()
            || self.returned_at.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Organization",
        from = "Column::OrgId",
        to = "super::organization::Column::Id"
    )]
    Organization,
    #[sea_orm(
        belongs_to = "Bike",
        from = "Column::BikeId",
        to = "super::bike::Column::Id"
    )]
    Bike,
}

impl Related<Organization> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<Bike> for Entity {
    fn to() -> RelationDef {
        Relation::Bike.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
