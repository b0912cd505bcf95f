//! Program identity.
//!
//! A [`ProgramId`] doubles as the file stem of the program's body files, so
//! every id must be usable as a single path component. Ids minted by the
//! manager are UUID v4 strings; ids adopted from files found on disk keep
//! whatever stem the file had.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Opaque, immutable identifier of a stored program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProgramId(String);

impl ProgramId {
    /// Mints a fresh random identifier.
    pub fn generate() -> Self {
        ProgramId(Uuid::new_v4().to_string())
    }

    /// Validates `raw` as a program identifier.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let reason = if raw.is_empty() {
            Some("empty")
        } else if raw == "." || raw == ".." {
            Some("relative path component")
        } else if raw.starts_with('.') {
            Some("hidden file stem")
        } else if raw.contains(['/', '\\', '\0']) {
            Some("contains a path separator")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(CoreError::InvalidProgramId {
                id: raw.to_string(),
                reason,
            }),
            None => Ok(ProgramId(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProgramId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProgramId::parse(s)
    }
}

impl TryFrom<String> for ProgramId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ProgramId::parse(&value)
    }
}

impl From<ProgramId> for String {
    fn from(id: ProgramId) -> Self {
        id.0
    }
}

impl AsRef<str> for ProgramId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
