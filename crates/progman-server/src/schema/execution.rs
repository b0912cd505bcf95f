//! Execution control request/response types.

use serde::{Deserialize, Serialize};

use progman_runner::ExecutionSnapshot;

/// Request to run an unsaved script body.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteCodeRequest {
    pub code: String,
}

/// Current or last execution session.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionStatusResponse {
    /// One of idle, starting, running, succeeded, failed, stopped.
    pub state: String,
    pub is_running: bool,
    pub is_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<i32>,
    pub output: String,
}

impl From<ExecutionSnapshot> for ExecutionStatusResponse {
    fn from(s: ExecutionSnapshot) -> Self {
        ExecutionStatusResponse {
            state: s.state.as_str().to_string(),
            is_running: s.is_running(),
            is_success: s.is_success(),
            exit_status: s.exit_status,
            output: s.output,
        }
    }
}

/// Response from a stop request.
#[derive(Debug, Clone, Serialize)]
pub struct StopResponse {
    /// False when nothing was running.
    pub stopped: bool,
}
