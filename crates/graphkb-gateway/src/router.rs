//! HTTP router configuration

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::GatewayState;

/// Create the gateway router.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/graph/schema", put(handlers::put_schema))
        .route(
            "/api/graph/assets",
            put(handlers::put_assets).delete(handlers::delete_assets),
        )
        .route(
            "/api/graph/relations",
            put(handlers::put_relations).delete(handlers::delete_relations),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
