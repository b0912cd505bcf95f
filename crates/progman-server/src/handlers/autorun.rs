//! Autorun handlers.

use axum::extract::State;
use axum::Json;

use progman_core::ProgramId;

use crate::error::ApiError;
use crate::schema::autorun::{AutorunResponse, ExecuteAutorunResponse, SetAutorunRequest};
use crate::state::AppState;

/// `GET /autorun`
pub async fn get_autorun(State(state): State<AppState>) -> Result<Json<AutorunResponse>, ApiError> {
    let manager = state.manager.lock().await;
    Ok(Json(manager.autorun()?.into()))
}

/// `PUT /autorun`
pub async fn set_autorun(
    State(state): State<AppState>,
    Json(req): Json<SetAutorunRequest>,
) -> Result<Json<AutorunResponse>, ApiError> {
    let id = ProgramId::parse(&req.program_id)?;
    let mut manager = state.manager.lock().await;
    manager.set_autorun(&id, req.mode)?;
    Ok(Json(manager.autorun()?.into()))
}

/// Starts the autorun program in its configured mode.
///
/// `POST /autorun/execute`
pub async fn execute_autorun(
    State(state): State<AppState>,
) -> Result<Json<ExecuteAutorunResponse>, ApiError> {
    let mut manager = state.manager.lock().await;
    let mode = manager.execute_autorun().await?;
    Ok(Json(ExecuteAutorunResponse { mode }))
}
