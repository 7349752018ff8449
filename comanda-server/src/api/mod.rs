//! HTTP API
//!
//! - [`health`]: liveness
//! - [`print_jobs`]: print job queue and event stream
//! - [`printers`]: printer registry administration
//! - [`orders`]: on-demand order reconciliation

pub mod health;
pub mod orders;
pub mod print_jobs;
pub mod printers;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(print_jobs::router())
        .merge(printers::router())
        .merge(orders::router())
}

/// Build the application with middleware and state
pub fn build_app(state: ServerState) -> Router {
    build_router()
        .layer(
            ServiceBuilder::new()
                // Outermost: request tracing
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
