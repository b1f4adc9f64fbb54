//! # Bikes API Handlers
//!
//! Fleet management surface: registration, listing, the maintenance toggle,
//! availability projection, and soft deletion. Every handler is scoped to the
//! caller's organization; a bike in another org is simply not found.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{OperatorAuth, OrgExtension};
use crate::availability::{self, AvailabilityProjection};
use crate::dates;
use crate::error::{ApiError, BookingError, not_found, validation_error};
use crate::handlers::types::{ApiResponse, AvailabilityQuery, BikeDto, BikeListQuery};
use crate::models::bike::BikeStatus;
use crate::repositories::{BikeRepository, OrganizationRepository};
use crate::server::AppState;
use crate::status_sync;

/// Request payload for registering a bike
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBikeRequest {
    /// Registration number, unique within the organization
    #[schema(example = "KA-01-HJ-1234")]
    pub registration_number: String,
    /// Manufacturer/model label
    #[schema(example = "Honda Activa 6G")]
    pub model: Option<String>,
    /// Daily rental rate in minor currency units
    #[schema(example = 500)]
    pub daily_rate: i64,
}

/// Request payload for the operator status toggle
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetBikeStatusRequest {
    /// Requested status; MAINTENANCE is refused while the bike is occupied
    pub status: BikeStatus,
}

/// Register a new bike
#[utoipa::path(
    post,
    path = "/api/v1/bikes",
    security(("bearer_auth" = [])),
    params(crate::auth::OrgHeader),
    request_body = CreateBikeRequest,
    responses(
        (status = 201, description = "Bike registered", body = ApiResponse<BikeDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 409, description = "Registration number already in use, or quota reached", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "bikes"
)]
pub async fn create_bike(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrgExtension(org): OrgExtension,
    Json(request): Json<CreateBikeRequest>,
) -> Result<
    (
        StatusCode,
        [(&'static str, String); 1],
        Json<ApiResponse<BikeDto>>,
    ),
    ApiError,
> {
    let registration = request.registration_number.trim();
    if registration.is_empty() {
        return Err(validation_error(
            "Registration number is required",
            serde_json::json!({ "registration_number": "Must not be empty" }),
        ));
    }
    if request.daily_rate < 0 {
        return Err(validation_error(
            "Daily rate must not be negative",
            serde_json::json!({ "daily_rate": "Must be zero or positive" }),
        ));
    }

    let db = Arc::new(state.db.clone());
    let org_repo = OrganizationRepository::new(Arc::clone(&db));
    let organization = org_repo
        .find_by_id(&org.0)
        .await?
        .ok_or_else(|| not_found("Organization"))?;

    let fleet_size = org_repo.bike_count(&org.0).await?;
    if fleet_size >= organization.bike_quota as u64 {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "CONFLICT",
            "Bike quota for this organization has been reached",
        )
        .with_details(serde_json::json!({
            "bike_quota": organization.bike_quota,
            "registered": fleet_size,
        })));
    }

    // A duplicate registration number trips the unique index and surfaces
    // as a 409 through the DbErr mapping.
    let bike = BikeRepository::new(db)
        .create(
            &org.0,
            registration.to_string(),
            request.model,
            request.daily_rate,
        )
        .await?;

    let location = format!("/api/v1/bikes/{}", bike.id);
    Ok((
        StatusCode::CREATED,
        [("Location", location)],
        Json(ApiResponse::new(bike.into())),
    ))
}

/// List the organization's bikes
#[utoipa::path(
    get,
    path = "/api/v1/bikes",
    security(("bearer_auth" = [])),
    params(BikeListQuery, crate::auth::OrgHeader),
    responses(
        (status = 200, description = "Bikes retrieved", body = ApiResponse<Vec<BikeDto>>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "bikes"
)]
pub async fn list_bikes(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrgExtension(org): OrgExtension,
    Query(query): Query<BikeListQuery>,
) -> Result<Json<ApiResponse<Vec<BikeDto>>>, ApiError> {
    let repo = BikeRepository::new(Arc::new(state.db.clone()));
    let bikes = repo.list(&org.0, query.status).await?;

    Ok(Json(ApiResponse::new(
        bikes.into_iter().map(BikeDto::from).collect(),
    )))
}

/// Get a bike by ID
#[utoipa::path(
    get,
    path = "/api/v1/bikes/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Bike UUID"), crate::auth::OrgHeader),
    responses(
        (status = 200, description = "Bike retrieved", body = ApiResponse<BikeDto>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Bike not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "bikes"
)]
pub async fn get_bike(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrgExtension(org): OrgExtension,
    Path(bike_id): Path<Uuid>,
) -> Result<Json<ApiResponse<BikeDto>>, ApiError> {
    let repo = BikeRepository::new(Arc::new(state.db.clone()));
    let bike = repo
        .find_by_id(&org.0, &bike_id)
        .await?
        .ok_or_else(|| not_found("Bike"))?;

    Ok(Json(ApiResponse::new(bike.into())))
}

/// Toggle a bike's operator-facing status
#[utoipa::path(
    put,
    path = "/api/v1/bikes/{id}/status",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Bike UUID"), crate::auth::OrgHeader),
    request_body = SetBikeStatusRequest,
    responses(
        (status = 200, description = "Status applied", body = ApiResponse<BikeDto>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Bike not found", body = ApiError),
        (status = 409, description = "Bike is occupied by a booking", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "bikes"
)]
pub async fn set_bike_status(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrgExtension(org): OrgExtension,
    Path(bike_id): Path<Uuid>,
    Json(request): Json<SetBikeStatusRequest>,
) -> Result<Json<ApiResponse<BikeDto>>, ApiError> {
    let repo = BikeRepository::new(Arc::new(state.db.clone()));
    let bike = repo
        .find_by_id(&org.0, &bike_id)
        .await?
        .ok_or_else(|| not_found("Bike"))?;

    let updated = status_sync::set_operator_status(&state.db, bike, request.status, Utc::now())
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::new(updated.into())))
}

/// Project a bike's availability
#[utoipa::path(
    get,
    path = "/api/v1/bikes/{id}/availability",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Bike UUID"),
        AvailabilityQuery,
        crate::auth::OrgHeader
    ),
    responses(
        (status = 200, description = "Availability projected", body = ApiResponse<AvailabilityProjection>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Bike not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "bikes"
)]
pub async fn get_bike_availability(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrgExtension(org): OrgExtension,
    Path(bike_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<ApiResponse<AvailabilityProjection>>, ApiError> {
    let repo = BikeRepository::new(Arc::new(state.db.clone()));
    repo.find_by_id(&org.0, &bike_id)
        .await?
        .ok_or_else(|| not_found("Bike"))?;

    let as_of = query
        .as_of
        .map(dates::start_of_day)
        .unwrap_or_else(Utc::now);

    let open = availability::load_open_bookings(&state.db, &org.0, &bike_id).await?;
    let projection = availability::project(&open, as_of);

    Ok(Json(ApiResponse::new(projection)))
}

/// Soft-delete a bike
#[utoipa::path(
    delete,
    path = "/api/v1/bikes/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Bike UUID"), crate::auth::OrgHeader),
    responses(
        (status = 204, description = "Bike deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Bike not found", body = ApiError),
        (status = 409, description = "Bike still has non-terminal bookings", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "bikes"
)]
pub async fn delete_bike(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrgExtension(org): OrgExtension,
    Path(bike_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = BikeRepository::new(Arc::new(state.db.clone()));
    repo.find_by_id(&org.0, &bike_id)
        .await?
        .ok_or_else(|| not_found("Bike"))?;

    let open = repo.open_booking_count(&org.0, &bike_id).await?;
    if open > 0 {
        return Err(BookingError::ActiveBookingsExist {
            booking_count: open,
        }
        .into());
    }

    repo.soft_delete(&org.0, &bike_id)
        .await?
        .ok_or_else(|| not_found("Bike"))?;

    Ok(StatusCode::NO_CONTENT)
}
