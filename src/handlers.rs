use crate::config::Config;
use crate::contact::{ContactRelay, REQUIRED_FIELDS_MESSAGE, SUCCESS_MESSAGE};
use crate::errors::AppError;
use crate::models::*;
use crate::places::PlaceSearchService;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted request body. Contact forms are small.
pub const MAX_BODY_BYTES: usize = 64 * 1024;
/// Requests a single client IP may send back to back.
pub const RATE_LIMIT_BURST: u32 = 10;
/// One request of the burst is replenished every 200ms (5 per second).
const RATE_LIMIT_REPLENISH_MS: u64 = 200;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Contact form relay over the configured mail transport.
    pub contact_relay: ContactRelay,
    /// Place search over the configured geocoding provider.
    pub places: PlaceSearchService,
}

/// The whole application: `/health` plus the `/api` routes behind the
/// body limit and the per-IP rate limiter.
pub fn app(state: Arc<AppState>) -> Result<Router, AppError> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(RATE_LIMIT_REPLENISH_MS)
            .burst_size(RATE_LIMIT_BURST)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| {
                AppError::InternalError("Invalid rate limiter configuration".to_string())
            })?,
    );

    let protected_routes = api_routes().layer(
        ServiceBuilder::new()
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    Ok(Router::new()
        .route("/health", get(health))
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}

/// Routes under `/api`, without the limits `app` layers on top.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/send-email", post(send_email))
        .route("/api/places/search", get(search_places))
        .route("/api/places/map", get(map_places))
        .route("/api/places/:id", get(get_place))
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rolaju-api",
            "version": env!("CARGO_PKG_VERSION"),
            "placeProvider": state.places.provider_name(),
        })),
    )
}

/// POST /api/send-email
///
/// Relays a contact form submission to the operator mailbox and, when
/// `copiaEmail` is set, a copy to the submitter.
///
/// # Returns
///
/// * `200 { message }` when every send succeeded.
/// * `400 { error }` for a malformed body, missing fields or a bad email.
/// * `500 { error }` when any send failed.
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> Result<Json<SendEmailResponse>, AppError> {
    let Json(submission) = payload.map_err(|rejection| {
        tracing::warn!("Rejected contact form body: {}", rejection.body_text());
        AppError::BadRequest(REQUIRED_FIELDS_MESSAGE.to_string())
    })?;

    tracing::info!(
        "POST /api/send-email - copy requested: {}",
        submission.request_copy.unwrap_or(false)
    );

    state.contact_relay.relay(&submission).await?;

    Ok(Json(SendEmailResponse {
        message: SUCCESS_MESSAGE.to_string(),
    }))
}

/// GET /api/places/search?q=
///
/// Always answers 200. `status` tells an empty result apart from an
/// unavailable provider; `places` is empty in both cases.
pub async fn search_places(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    tracing::info!("GET /api/places/search - q: {:?}", params.q);

    let outcome = state.places.search_outcome(&params.q).await;
    if outcome == SearchOutcome::Empty {
        tracing::info!("Nenhum resultado encontrado");
    }

    Json(SearchResponse::from(outcome))
}

/// GET /api/places/:id
pub async fn get_place(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PlaceRecord>, AppError> {
    tracing::info!("GET /api/places/{}", id);

    state
        .places
        .lookup(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Place {} not found", id)))
}

/// GET /api/places/map
///
/// Places for the map view across the metropolitan cities, grouped by category.
pub async fn map_places(State(state): State<Arc<AppState>>) -> Json<AggregatePlaces> {
    tracing::info!("GET /api/places/map");

    let aggregate = state.places.aggregate_places().await;
    tracing::info!(
        "Map listing ready: {} places in {} groups",
        aggregate.places.len(),
        aggregate.groups.len()
    );

    Json(aggregate)
}
