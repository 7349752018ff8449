//! Print Job API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde::Serialize;
use shared::models::{PrintJob, PrintJobCreate, PrintJobQuery, PrintJobSummary};
use tokio::sync::broadcast::error::RecvError;

use crate::core::ServerState;
use crate::utils::AppResult;

#[derive(Debug, Serialize)]
pub struct ClearCompletedResponse {
    pub deleted: usize,
}

/// GET /api/print-jobs
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<PrintJobQuery>,
) -> AppResult<Json<Vec<PrintJob>>> {
    Ok(Json(state.queue.list(&query)?))
}

/// POST /api/print-jobs
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<PrintJobCreate>,
) -> AppResult<Json<PrintJob>> {
    Ok(Json(state.queue.enqueue(payload)?))
}

/// GET /api/print-jobs/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PrintJob>> {
    Ok(Json(state.queue.get(id)?))
}

/// POST /api/print-jobs/{id}/retry
pub async fn retry(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PrintJob>> {
    Ok(Json(state.queue.retry(id)?))
}

/// POST /api/print-jobs/{id}/cancel
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PrintJob>> {
    Ok(Json(state.queue.cancel(id)?))
}

/// GET /api/print-jobs/status-summary
pub async fn status_summary(State(state): State<ServerState>) -> AppResult<Json<PrintJobSummary>> {
    Ok(Json(state.queue.summary()?))
}

/// POST /api/print-jobs/clear-completed
pub async fn clear_completed(
    State(state): State<ServerState>,
) -> AppResult<Json<ClearCompletedResponse>> {
    let deleted = state.queue.clear_completed()?;
    Ok(Json(ClearCompletedResponse { deleted }))
}

/// GET /api/print-jobs/events
///
/// Slow consumers skip missed events rather than closing the stream.
pub async fn events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.events.subscribe();
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((Event::default().json_data(&event), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Print event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
