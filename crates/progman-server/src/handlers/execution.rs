//! Execution control handlers.

use axum::extract::{Path, State};
use axum::Json;

use progman_core::ProgramId;

use crate::error::ApiError;
use crate::schema::common::ApiResponse;
use crate::schema::execution::{ExecuteCodeRequest, ExecutionStatusResponse, StopResponse};
use crate::state::AppState;

/// Runs a stored program. Returns once it has started.
///
/// `POST /programs/{id}/execute`
pub async fn execute_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = ProgramId::parse(&id)?;
    let mut manager = state.manager.lock().await;
    manager.execute_from_id(&id).await?;
    Ok(Json(ApiResponse::empty()))
}

/// Runs an unsaved script body. Returns once it has started.
///
/// `POST /execution/code`
pub async fn execute_code(
    State(state): State<AppState>,
    Json(req): Json<ExecuteCodeRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let mut manager = state.manager.lock().await;
    manager.execute_from_code(&req.code).await?;
    Ok(Json(ApiResponse::empty()))
}

/// Requests termination of the running session.
///
/// `POST /execution/stop`
pub async fn stop_execution(State(state): State<AppState>) -> Json<StopResponse> {
    let mut manager = state.manager.lock().await;
    Json(StopResponse {
        stopped: manager.stop_execution(),
    })
}

/// Current or last session: state, exit status, output.
///
/// `GET /execution`
pub async fn execution_status(State(state): State<AppState>) -> Json<ExecutionStatusResponse> {
    let manager = state.manager.lock().await;
    Json(manager.execution_status().into())
}
