//! Order API Module
//!
//! Orders are owned by the order service; this API only triggers
//! reconciliation of print outcomes onto them.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};

use crate::core::ServerState;
use crate::printing::SyncReport;
use crate::utils::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/orders/{id}/sync", post(sync_order))
}

/// POST /api/orders/{id}/sync - run one reconciliation pass
async fn sync_order(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<SyncReport>> {
    Ok(Json(state.synchronizer.reconcile(id).await?))
}
