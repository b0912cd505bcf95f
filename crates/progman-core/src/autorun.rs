//! Autorun settings: which program the robot launches on request, and how.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::ProgramId;

/// How the autorun program is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutorunMode {
    #[default]
    Disabled,
    /// Run the program once.
    OneShot,
    /// Restart the program each time it completes, until stopped.
    Loop,
}

impl AutorunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AutorunMode::Disabled => "disabled",
            AutorunMode::OneShot => "one_shot",
            AutorunMode::Loop => "loop",
        }
    }
}

impl fmt::Display for AutorunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutorunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(AutorunMode::Disabled),
            "one_shot" => Ok(AutorunMode::OneShot),
            "loop" => Ok(AutorunMode::Loop),
            other => Err(format!("unknown autorun mode: {other}")),
        }
    }
}

/// Persisted autorun configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutorunSettings {
    pub program_id: Option<ProgramId>,
    pub mode: AutorunMode,
}

impl AutorunSettings {
    /// The program to launch, if autorun is enabled and targets one.
    pub fn target(&self) -> Option<&ProgramId> {
        match self.mode {
            AutorunMode::Disabled => None,
            AutorunMode::OneShot | AutorunMode::Loop => self.program_id.as_ref(),
        }
    }
}
