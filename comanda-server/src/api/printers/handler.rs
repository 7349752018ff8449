//! Printer API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{
    ConnectionTestResult, PrinterDevice, PrinterDeviceCreate, PrinterDeviceUpdate,
};

use crate::core::ServerState;
use crate::utils::AppResult;

/// GET /api/printers
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<PrinterDevice>>> {
    Ok(Json(state.registry.list()?))
}

/// GET /api/printers/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PrinterDevice>> {
    Ok(Json(state.registry.get(id)?))
}

/// POST /api/printers
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<PrinterDeviceCreate>,
) -> AppResult<Json<PrinterDevice>> {
    Ok(Json(state.registry.create(payload)?))
}

/// PUT /api/printers/{id}
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<PrinterDeviceUpdate>,
) -> AppResult<Json<PrinterDevice>> {
    Ok(Json(state.registry.update(id, payload)?))
}

/// DELETE /api/printers/{id}
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    state.registry.delete(id)?;
    Ok(Json(true))
}

/// POST /api/printers/{id}/test-connection
pub async fn test_connection(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ConnectionTestResult>> {
    Ok(Json(state.registry.test_connection(id).await?))
}

/// POST /api/printers/{id}/activate
pub async fn activate(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PrinterDevice>> {
    Ok(Json(state.registry.activate(id)?))
}

/// POST /api/printers/{id}/deactivate
pub async fn deactivate(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PrinterDevice>> {
    Ok(Json(state.registry.deactivate(id)?))
}
