use axum::{http::StatusCode, middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    error::{AppResult, RecommendError},
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    models::MediaKind,
    services::RecommendationService,
};

pub mod recommendations;
pub mod titles;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecommendationService>,
}

impl AppState {
    pub fn new(service: RecommendationService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recommendations", get(recommendations::recommend))
        .route("/titles/resolve", get(titles::resolve))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Parses an optional `kind` parameter, defaulting to anime
fn parse_kind(raw: Option<&str>) -> AppResult<MediaKind> {
    match raw.map(str::trim).filter(|k| !k.is_empty()) {
        None => Ok(MediaKind::Anime),
        Some(kind) => kind
            .parse()
            .map_err(|e: String| RecommendError::InvalidInput(e).into()),
    }
}
