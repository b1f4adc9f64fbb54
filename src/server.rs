//! # Server Configuration
//!
//! This module contains the router assembly and server startup for the
//! Fleetbook API.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::handlers;
use crate::telemetry::{self, TraceContext};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
}

/// Generates a trace ID for the request, exposes it to handlers through
/// task-local storage and request extensions, and echoes it back in the
/// X-Trace-Id response header.
async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = request
        .headers()
        .get("X-Trace-Id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let context = TraceContext {
        trace_id: trace_id.clone(),
    };
    request.extensions_mut().insert(context.clone());

    let mut response = telemetry::with_trace_context(context, next.run(request)).await;

    if let Ok(value) = trace_id.parse() {
        response.headers_mut().insert("X-Trace-Id", value);
    }
    response
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/organizations",
            post(handlers::organizations::create_organization),
        )
        .route(
            "/organizations/{id}",
            get(handlers::organizations::get_organization),
        )
        .route(
            "/bikes",
            post(handlers::bikes::create_bike).get(handlers::bikes::list_bikes),
        )
        .route(
            "/bikes/{id}",
            get(handlers::bikes::get_bike).delete(handlers::bikes::delete_bike),
        )
        .route("/bikes/{id}/status", put(handlers::bikes::set_bike_status))
        .route(
            "/bikes/{id}/availability",
            get(handlers::bikes::get_bike_availability),
        )
        .route(
            "/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
        )
        .route(
            "/bookings/{id}",
            get(handlers::bookings::get_booking)
                .patch(handlers::bookings::update_booking)
                .delete(handlers::bookings::delete_booking),
        )
        .route(
            "/bookings/{id}/deliver",
            post(handlers::bookings::deliver_booking),
        )
        .route(
            "/bookings/{id}/return",
            post(handlers::bookings::return_booking),
        )
        .route(
            "/bookings/{id}/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/bookings/{id}/payments",
            get(handlers::bookings::list_booking_payments),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::health))
        .nest("/api/v1", api)
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration, shutting down cleanly
/// when `shutdown` is cancelled.
pub async fn run_server(
    config: Arc<AppConfig>,
    db: DatabaseConnection,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let state = AppState {
        config: Arc::clone(&config),
        db,
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::organizations::create_organization,
        crate::handlers::organizations::get_organization,
        crate::handlers::bikes::create_bike,
        crate::handlers::bikes::list_bikes,
        crate::handlers::bikes::get_bike,
        crate::handlers::bikes::set_bike_status,
        crate::handlers::bikes::get_bike_availability,
        crate::handlers::bikes::delete_bike,
        crate::handlers::bookings::create_booking,
        crate::handlers::bookings::list_bookings,
        crate::handlers::bookings::get_booking,
        crate::handlers::bookings::list_booking_payments,
        crate::handlers::bookings::update_booking,
        crate::handlers::bookings::deliver_booking,
        crate::handlers::bookings::return_booking,
        crate::handlers::bookings::cancel_booking,
        crate::handlers::bookings::delete_booking,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::bike::BikeStatus,
            crate::models::booking::BookingStatus,
            crate::models::booking::FuelLevel,
            crate::models::payment::PaymentMethod,
            crate::error::ApiError,
            crate::error::ConflictingBooking,
            crate::availability::AvailabilityProjection,
            crate::availability::BlockingBooking,
            crate::settlement::Settlement,
            crate::lifecycle::BookingPatch,
            crate::lifecycle::DeliveryInput,
            crate::handlers::HealthResponse,
            crate::handlers::types::OrganizationDto,
            crate::handlers::types::BikeDto,
            crate::handlers::types::BookingDto,
            crate::handlers::types::PaymentDto,
            crate::handlers::organizations::CreateOrganizationRequest,
            crate::handlers::bikes::CreateBikeRequest,
            crate::handlers::bikes::SetBikeStatusRequest,
            crate::handlers::bookings::CreateBookingRequest,
            crate::handlers::bookings::ReturnBookingRequest,
            crate::handlers::bookings::ReturnBookingResponse,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Fleetbook API",
        description = "Multi-tenant rental fleet booking and availability API",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
