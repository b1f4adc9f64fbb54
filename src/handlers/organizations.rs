//! # Organizations API Handlers
//!
//! Organizations are the tenant boundary: every bike and booking belongs to
//! exactly one. Creation is the signup surface; reads are scoped to the
//! caller's own org so existence never leaks across tenants.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{OperatorAuth, OrgExtension};
use crate::error::{ApiError, not_found, validation_error};
use crate::handlers::types::{ApiResponse, OrganizationDto};
use crate::repositories::OrganizationRepository;
use crate::server::AppState;

const DEFAULT_PLAN_TIER: &str = "starter";
const DEFAULT_BIKE_QUOTA: i32 = 50;

/// Request payload for creating an organization
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrganizationRequest {
    /// Display name for the organization (required, max 255 characters)
    #[schema(example = "City Wheels Rentals")]
    pub name: String,
    /// Plan tier; defaults to "starter"
    pub plan_tier: Option<String>,
    /// Maximum number of bikes the fleet may register
    pub bike_quota: Option<i32>,
}

/// Create a new organization
#[utoipa::path(
    post,
    path = "/api/v1/organizations",
    security(("bearer_auth" = [])),
    request_body = CreateOrganizationRequest,
    responses(
        (status = 201, description = "Organization created", body = ApiResponse<OrganizationDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "organizations"
)]
pub async fn create_organization(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Json(request): Json<CreateOrganizationRequest>,
) -> Result<
    (
        StatusCode,
        [(&'static str, String); 1],
        Json<ApiResponse<OrganizationDto>>,
    ),
    ApiError,
> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(validation_error(
            "Organization name is required",
            serde_json::json!({ "name": "Must not be empty" }),
        ));
    }
    if name.len() > 255 {
        return Err(validation_error(
            "Organization name exceeds maximum length",
            serde_json::json!({ "name": "Must not exceed 255 characters" }),
        ));
    }
    let quota = request.bike_quota.unwrap_or(DEFAULT_BIKE_QUOTA);
    if quota <= 0 {
        return Err(validation_error(
            "Bike quota must be positive",
            serde_json::json!({ "bike_quota": "Must be greater than zero" }),
        ));
    }

    let repo = OrganizationRepository::new(Arc::new(state.db.clone()));
    let org = repo
        .create(
            name.to_string(),
            request
                .plan_tier
                .unwrap_or_else(|| DEFAULT_PLAN_TIER.to_string()),
            quota,
        )
        .await?;

    let location = format!("/api/v1/organizations/{}", org.id);
    Ok((
        StatusCode::CREATED,
        [("Location", location)],
        Json(ApiResponse::new(org.into())),
    ))
}

/// Get the caller's organization by ID
#[utoipa::path(
    get,
    path = "/api/v1/organizations/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Organization UUID"), crate::auth::OrgHeader),
    responses(
        (status = 200, description = "Organization retrieved", body = ApiResponse<OrganizationDto>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Organization not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "organizations"
)]
pub async fn get_organization(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrgExtension(org): OrgExtension,
    Path(org_id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrganizationDto>>, ApiError> {
    // A caller may only read its own organization.
    if org_id != org.0 {
        return Err(not_found("Organization"));
    }

    let repo = OrganizationRepository::new(Arc::new(state.db.clone()));
    let model = repo
        .find_by_id(&org_id)
        .await?
        .ok_or_else(|| not_found("Organization"))?;

    Ok(Json(ApiResponse::new(model.into())))
}
