//! Autorun request/response types.

use serde::{Deserialize, Serialize};

use progman_core::{AutorunMode, AutorunSettings, ProgramId};

/// Request to set the autorun program.
#[derive(Debug, Clone, Deserialize)]
pub struct SetAutorunRequest {
    pub program_id: String,
    pub mode: AutorunMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutorunResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<ProgramId>,
    pub mode: AutorunMode,
}

impl From<AutorunSettings> for AutorunResponse {
    fn from(s: AutorunSettings) -> Self {
        AutorunResponse {
            program_id: s.program_id,
            mode: s.mode,
        }
    }
}

/// Response from starting the autorun program.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteAutorunResponse {
    pub mode: AutorunMode,
}
