//! Shared response envelope and resource DTOs for the HTTP surface.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dates;
use crate::models::bike::{self, BikeStatus};
use crate::models::booking::{self, BookingStatus, FuelLevel};
use crate::models::organization;
use crate::models::payment::{self, PaymentMethod};

/// Standard API response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response metadata
    pub meta: ResponseMeta,
}

/// Response metadata
#[derive(Debug, Serialize, ToSchema)]
pub struct ResponseMeta {
    /// Unique request identifier for tracing
    #[schema(example = "req-1705319400-abc123def")]
    pub request_id: String,
    /// Response timestamp (ISO 8601)
    #[schema(example = "2025-01-15T10:30:00Z")]
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta {
                request_id: crate::telemetry::current_trace_id()
                    .unwrap_or_else(|| format!("req-{}", &Uuid::new_v4().to_string()[..8])),
                timestamp: Utc::now().to_rfc3339(),
            },
        }
    }
}

/// Organization resource representation
#[derive(Debug, Serialize, ToSchema)]
pub struct OrganizationDto {
    pub id: Uuid,
    #[schema(example = "City Wheels Rentals")]
    pub name: String,
    #[schema(example = "starter")]
    pub plan_tier: String,
    pub bike_quota: i32,
    pub created_at: String,
}

impl From<organization::Model> for OrganizationDto {
    fn from(model: organization::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            plan_tier: model.plan_tier,
            bike_quota: model.bike_quota,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Bike resource representation
#[derive(Debug, Serialize, ToSchema)]
pub struct BikeDto {
    pub id: Uuid,
    #[schema(example = "KA-01-HJ-1234")]
    pub registration_number: String,
    #[schema(example = "Honda Activa 6G")]
    pub model: Option<String>,
    /// Daily rate in minor currency units
    #[schema(example = 500)]
    pub daily_rate: i64,
    pub status: BikeStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<bike::Model> for BikeDto {
    fn from(model: bike::Model) -> Self {
        Self {
            id: model.id,
            registration_number: model.registration_number,
            model: model.model,
            daily_rate: model.daily_rate,
            status: model.status,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Booking resource representation
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingDto {
    pub id: Uuid,
    pub bike_id: Uuid,
    #[schema(example = "Asha Patel")]
    pub customer_name: String,
    #[schema(example = "9876543210")]
    pub phone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub total_amount: i64,
    pub paid_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_deposit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub late_fee: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_charge: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_charge: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_distance_charge: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odometer_start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_level_start: Option<FuelLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helmets_given: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_damage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_refs: Option<Vec<String>>,
    pub identity_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odometer_end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_level_end: Option<FuelLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helmets_returned: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_damage: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<booking::Model> for BookingDto {
    fn from(model: booking::Model) -> Self {
        Self {
            id: model.id,
            bike_id: model.bike_id,
            customer_name: model.customer_name,
            phone: model.phone,
            start_date: dates::to_utc(model.start_date).date_naive(),
            end_date: dates::to_utc(model.end_date).date_naive(),
            status: model.status,
            total_amount: model.total_amount,
            paid_amount: model.paid_amount,
            security_deposit: model.security_deposit,
            late_fee: model.late_fee,
            fuel_charge: model.fuel_charge,
            damage_charge: model.damage_charge,
            extra_distance_charge: model.extra_distance_charge,
            notes: model.notes,
            delivered_at: model.delivered_at.map(|t| t.to_rfc3339()),
            odometer_start: model.odometer_start,
            fuel_level_start: model.fuel_level_start,
            helmets_given: model.helmets_given,
            existing_damage: model.existing_damage,
            document_refs: model
                .document_refs
                .and_then(|refs| serde_json::from_value(refs).ok()),
            identity_verified: model.identity_verified,
            returned_at: model.returned_at.map(|t| t.to_rfc3339()),
            odometer_end: model.odometer_end,
            fuel_level_end: model.fuel_level_end,
            helmets_returned: model.helmets_returned,
            new_damage: model.new_damage,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Payment resource representation
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentDto {
    pub id: Uuid,
    pub booking_id: Uuid,
    /// Amount received in minor currency units
    #[schema(example = 2500)]
    pub amount: i64,
    pub method: PaymentMethod,
    pub recorded_at: String,
}

impl From<payment::Model> for PaymentDto {
    fn from(model: payment::Model) -> Self {
        Self {
            id: model.id,
            booking_id: model.booking_id,
            amount: model.amount,
            method: model.method,
            recorded_at: model.recorded_at.to_rfc3339(),
        }
    }
}

/// Query parameters accepted by the availability endpoint
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct AvailabilityQuery {
    /// Day to project availability for; defaults to today
    pub as_of: Option<NaiveDate>,
}

/// Query parameters accepted by the bike list endpoint
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct BikeListQuery {
    /// Restrict to bikes currently in this status
    pub status: Option<BikeStatus>,
}

/// Query parameters accepted by the booking list endpoint
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct BookingListQuery {
    /// Restrict to bookings in this status
    pub status: Option<BookingStatus>,
    /// Restrict to bookings of this bike
    pub bike_id: Option<Uuid>,
}
