pub mod access;
pub mod catalog;
pub mod health;
pub mod usage;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing::Span;

use streamgate_gateway::ContentGateway;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The gateway instance.
    pub gateway: Arc<ContentGateway>,
}

/// Build the Axum router with all API routes and middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health & metrics
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        // Session registration
        .route("/v1/access", post(access::register_access))
        // Catalog reads
        .route("/v1/catalog/profile", get(catalog::profile))
        .route("/v1/catalog/{media}/categories", get(catalog::categories))
        .route("/v1/catalog/{media}/items", get(catalog::items))
        .route("/v1/catalog/{media}/items/{id}", get(catalog::item_detail))
        .route("/v1/catalog/{media}/guide/{channel}", get(catalog::guide))
        .route(
            "/v1/catalog/{media}/streams/{id}/url",
            get(catalog::playback_url),
        )
        // Usage reporting
        .route("/v1/tenants/{code}/usage", get(usage::usage))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
}

/// Request span carrying only the path. Catalog credentials travel in the
/// query string and must stay out of the logs.
fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "http.request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version()
    )
}
