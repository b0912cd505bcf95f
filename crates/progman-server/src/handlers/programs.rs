//! Program management handlers (list, create, get, update, delete).

use axum::extract::{Path, State};
use axum::Json;

use progman_core::{Program, ProgramId};

use crate::error::ApiError;
use crate::schema::common::ApiResponse;
use crate::schema::programs::{
    CreateProgramRequest, CreateProgramResponse, ProgramListResponse, ProgramSummaryView,
    UpdateProgramRequest,
};
use crate::state::AppState;

/// Lists all programs, without their bodies.
///
/// `GET /programs`
pub async fn list_programs(
    State(state): State<AppState>,
) -> Result<Json<ProgramListResponse>, ApiError> {
    let manager = state.manager.lock().await;
    let programs = manager.programs().iter().map(ProgramSummaryView::from).collect();
    Ok(Json(ProgramListResponse { programs }))
}

/// Creates a new program.
///
/// `POST /programs`
pub async fn create_program(
    State(state): State<AppState>,
    Json(req): Json<CreateProgramRequest>,
) -> Result<Json<CreateProgramResponse>, ApiError> {
    let mut manager = state.manager.lock().await;
    let id = manager.create(req.into())?;
    Ok(Json(CreateProgramResponse { id }))
}

/// Fetches one program with its bodies.
///
/// `GET /programs/{id}`
pub async fn get_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Program>, ApiError> {
    let id = ProgramId::parse(&id)?;
    let manager = state.manager.lock().await;
    Ok(Json(manager.get(&id)?))
}

/// Replaces a program's contents.
///
/// `PUT /programs/{id}`
pub async fn update_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProgramRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = ProgramId::parse(&id)?;
    let mut manager = state.manager.lock().await;
    manager.update(&id, req.into())?;
    Ok(Json(ApiResponse::empty()))
}

/// Deletes a program by ID.
///
/// `DELETE /programs/{id}`
pub async fn delete_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = ProgramId::parse(&id)?;
    let mut manager = state.manager.lock().await;
    manager.delete(&id)?;
    Ok(Json(ApiResponse::empty()))
}
