//! # Error Handling
//!
//! This module provides unified error handling for the Fleetbook API,
//! implementing a consistent problem+json response format with trace ID
//! propagation, plus the booking-domain error taxonomy.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::telemetry;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Extract current trace ID from the active tracing span (falls back to generated correlation ID)
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                // Fallback: generate a correlation ID for basic client-server log correlation
                Some(format!("corr-{}", &Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    if let Some(code) = db_error.code() {
        let code_str = code.as_ref();
        if code_str == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code_str) {
            return true;
        }
    }

    false
}

/// Summary of the booking that blocks a requested date range.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConflictingBooking {
    /// Identifier of the blocking booking
    pub booking_id: Uuid,
    /// Customer holding the blocking booking
    pub customer_name: String,
    /// Blocking range start day
    pub start_date: NaiveDate,
    /// Blocking range end day
    pub end_date: NaiveDate,
}

/// Booking-domain errors. All lifecycle preconditions and conflicts are
/// values of this enum; handlers convert them into [`ApiError`] responses.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("requested dates overlap an existing booking")]
    BookingOverlap {
        conflict: ConflictingBooking,
        next_available: Option<NaiveDate>,
    },
    #[error("start date {0} is in the past")]
    PastDate(NaiveDate),
    #[error("end date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("bike is in maintenance")]
    BikeInMaintenance,
    #[error("bike is currently rented")]
    BikeRented,
    #[error("delivery checkpoint already recorded")]
    AlreadyDelivered,
    #[error("operation not permitted in status {0:?}")]
    InvalidStatus(crate::models::booking::BookingStatus),
    #[error("bike has non-terminal bookings")]
    ActiveBookingsExist { booking_count: u64 },
    #[error("settlement already recorded; booking can no longer be cancelled")]
    SettlementRecorded,
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        details: serde_json::Value,
    },
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

impl BookingError {
    /// Convenience constructor for field validation failures.
    pub fn validation(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(error: BookingError) -> Self {
        match error {
            BookingError::BookingOverlap {
                conflict,
                next_available,
            } => ApiError::new(
                StatusCode::CONFLICT,
                "BOOKING_OVERLAP",
                "Requested dates overlap an existing booking",
            )
            .with_details(json!({
                "conflicting_booking": conflict,
                "next_available_date": next_available,
            })),
            BookingError::PastDate(date) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "PAST_DATE",
                "Booking start date cannot be in the past",
            )
            .with_details(json!({ "start_date": date })),
            BookingError::InvalidDateRange { start, end } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_DATE_RANGE",
                "Booking end date must not be before its start date",
            )
            .with_details(json!({ "start_date": start, "end_date": end })),
            BookingError::BikeInMaintenance => ApiError::new(
                StatusCode::CONFLICT,
                "BIKE_IN_MAINTENANCE",
                "Bike is under maintenance and cannot be booked",
            ),
            BookingError::BikeRented => ApiError::new(
                StatusCode::CONFLICT,
                "BIKE_RENTED",
                "Bike is currently occupied by a booking",
            ),
            BookingError::AlreadyDelivered => ApiError::new(
                StatusCode::CONFLICT,
                "ALREADY_DELIVERED",
                "Delivery checkpoint was already recorded for this booking",
            ),
            BookingError::InvalidStatus(status) => ApiError::new(
                StatusCode::CONFLICT,
                "INVALID_STATUS",
                "Operation is not permitted in the booking's current status",
            )
            .with_details(json!({ "status": status })),
            BookingError::ActiveBookingsExist { booking_count } => ApiError::new(
                StatusCode::CONFLICT,
                "ACTIVE_BOOKINGS_EXIST",
                "Bike still has non-terminal bookings",
            )
            .with_details(json!({ "booking_count": booking_count })),
            BookingError::SettlementRecorded => ApiError::new(
                StatusCode::CONFLICT,
                "SETTLEMENT_RECORDED",
                "Settlement already recorded; booking can no longer be cancelled",
            ),
            BookingError::NotFound { entity } => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("{} not found", entity),
            ),
            BookingError::Validation { message, details } => validation_error(&message, details),
            BookingError::Db(db_err) => db_err.into(),
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        // Log the full error for debugging
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            other => {
                tracing::error!("Database error: {:?}", other);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

/// Create an unauthorized error (401) with explicit trace_id
pub fn unauthorized_with_trace_id(message: Option<&str>, trace_id: String) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    let mut error = ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg);
    error.trace_id = Some(trace_id.into_boxed_str());
    error
}

/// Create a not-found error scoped to an entity name. Cross-tenant lookups
/// resolve to this same error so that existence never leaks across tenants.
pub fn not_found(entity: &str) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        &format!("{} not found", entity),
    )
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}
