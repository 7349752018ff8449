//! Print Job API Module
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/print-jobs | GET | list, `?status=&order_item_id=` |
//! | /api/print-jobs | POST | enqueue |
//! | /api/print-jobs/status-summary | GET | counts by status |
//! | /api/print-jobs/clear-completed | POST | delete PRINTED and CANCELLED jobs |
//! | /api/print-jobs/events | GET | `PrintEvent` stream (SSE) |
//! | /api/print-jobs/{id} | GET | single job |
//! | /api/print-jobs/{id}/retry | POST | FAILED -> PENDING |
//! | /api/print-jobs/{id}/cancel | POST | {PENDING, FAILED} -> CANCELLED |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/print-jobs", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/status-summary", get(handler::status_summary))
        .route("/clear-completed", post(handler::clear_completed))
        .route("/events", get(handler::events))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/retry", post(handler::retry))
        .route("/{id}/cancel", post(handler::cancel))
}
