//! Program management request/response types.

use serde::{Deserialize, Serialize};

use progman_core::{NewProgram, Program, ProgramId, ProgramUpdate};

/// Request to create a new program.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProgramRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub script_body: String,
    /// Omitted or empty means the program has no visual body.
    #[serde(default)]
    pub visual_body: Option<String>,
}

impl From<CreateProgramRequest> for NewProgram {
    fn from(req: CreateProgramRequest) -> Self {
        NewProgram {
            name: req.name,
            description: req.description,
            script_body: req.script_body,
            visual_body: req.visual_body,
        }
    }
}

/// Request to replace a program's contents. Same shape as creation.
pub type UpdateProgramRequest = CreateProgramRequest;

impl From<CreateProgramRequest> for ProgramUpdate {
    fn from(req: CreateProgramRequest) -> Self {
        NewProgram::from(req).into()
    }
}

/// Response from creating a program.
#[derive(Debug, Clone, Serialize)]
pub struct CreateProgramResponse {
    /// The assigned program identifier.
    pub id: ProgramId,
}

/// Response for listing all programs.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramListResponse {
    pub programs: Vec<ProgramSummaryView>,
}

/// Summary view of a program for listing, without bodies.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramSummaryView {
    pub id: ProgramId,
    pub name: String,
    pub description: String,
    pub saved_at: String,
    pub has_visual: bool,
}

impl From<&Program> for ProgramSummaryView {
    fn from(p: &Program) -> Self {
        ProgramSummaryView {
            id: p.id.clone(),
            name: p.name.clone(),
            description: p.description.clone(),
            saved_at: p.saved_at.to_rfc3339(),
            has_visual: p.has_visual,
        }
    }
}
