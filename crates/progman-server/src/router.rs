//! Router assembly for the progman HTTP API.
//!
//! [`build_router`] wires all handler functions to their routes with
//! CORS and tracing middleware layers.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the complete axum router with all API routes.
///
/// Routes use axum 0.8 `/{param}` path syntax.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Program management
        .route(
            "/programs",
            get(handlers::programs::list_programs).post(handlers::programs::create_program),
        )
        .route(
            "/programs/{id}",
            get(handlers::programs::get_program)
                .put(handlers::programs::update_program)
                .delete(handlers::programs::delete_program),
        )
        // Execution
        .route(
            "/programs/{id}/execute",
            post(handlers::execution::execute_program),
        )
        .route("/execution", get(handlers::execution::execution_status))
        .route("/execution/code", post(handlers::execution::execute_code))
        .route("/execution/stop", post(handlers::execution::stop_execution))
        // Autorun
        .route(
            "/autorun",
            get(handlers::autorun::get_autorun).put(handlers::autorun::set_autorun),
        )
        .route("/autorun/execute", post(handlers::autorun::execute_autorun))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
