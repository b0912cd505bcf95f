//! Program records and the merged program view.
//!
//! A program is split across two stores: the descriptive fields live in a
//! [`ProgramRecord`] held by the metadata store, the bodies live as files.
//! [`Program`] is the merged view handed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::ProgramId;

/// Description used for records synthesized for files found without one.
pub const ADOPTED_DESCRIPTION: &str = "Unknown program";

/// The metadata half of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRecord {
    pub id: ProgramId,
    pub name: String,
    pub description: String,
    /// Timestamp of the last metadata write.
    pub saved_at: DateTime<Utc>,
    /// True iff a visual body exists for this id.
    pub has_visual: bool,
}

/// A program with its bodies attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    pub description: String,
    pub saved_at: DateTime<Utc>,
    pub has_visual: bool,
    pub script_body: String,
    /// Present iff `has_visual`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_body: Option<String>,
}

impl Program {
    /// Merges a record with its bodies.
    ///
    /// The visual body is dropped when the record says there is none, so the
    /// `has_visual` / `visual_body` pairing always agrees.
    pub fn assemble(record: ProgramRecord, script_body: String, visual_body: Option<String>) -> Self {
        let visual_body = if record.has_visual { visual_body } else { None };
        Program {
            has_visual: record.has_visual && visual_body.is_some(),
            id: record.id,
            name: record.name,
            description: record.description,
            saved_at: record.saved_at,
            script_body,
            visual_body,
        }
    }
}

/// Caller input for creating a program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProgram {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub script_body: String,
    #[serde(default)]
    pub visual_body: Option<String>,
}

impl NewProgram {
    pub fn new(name: impl Into<String>, description: impl Into<String>, script_body: impl Into<String>) -> Self {
        NewProgram {
            name: name.into(),
            description: description.into(),
            script_body: script_body.into(),
            visual_body: None,
        }
    }

    pub fn with_visual(mut self, visual_body: impl Into<String>) -> Self {
        self.visual_body = Some(visual_body.into());
        self
    }

    /// The visual body, treating an empty string as absent.
    pub fn visual(&self) -> Option<&str> {
        non_empty(self.visual_body.as_deref())
    }
}

/// Caller input for replacing an existing program's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramUpdate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub script_body: String,
    #[serde(default)]
    pub visual_body: Option<String>,
}

impl ProgramUpdate {
    /// The visual body, treating an empty string as absent.
    pub fn visual(&self) -> Option<&str> {
        non_empty(self.visual_body.as_deref())
    }
}

impl From<NewProgram> for ProgramUpdate {
    fn from(p: NewProgram) -> Self {
        ProgramUpdate {
            name: p.name,
            description: p.description,
            script_body: p.script_body,
            visual_body: p.visual_body,
        }
    }
}

fn non_empty(body: Option<&str>) -> Option<&str> {
    body.filter(|b| !b.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(has_visual: bool) -> ProgramRecord {
        ProgramRecord {
            id: ProgramId::parse("p1").unwrap(),
            name: "p1".into(),
            description: String::new(),
            saved_at: Utc::now(),
            has_visual,
        }
    }

    #[test]
    fn assemble_drops_visual_body_when_record_has_none() {
        let program = Program::assemble(record(false), "print(1)".into(), Some("<xml/>".into()));
        assert!(!program.has_visual);
        assert_eq!(program.visual_body, None);
    }

    #[test]
    fn assemble_downgrades_flag_without_body() {
        let program = Program::assemble(record(true), "print(1)".into(), None);
        assert!(!program.has_visual);
    }

    #[test]
    fn empty_visual_counts_as_absent() {
        let p = NewProgram::new("a", "b", "c").with_visual("");
        assert_eq!(p.visual(), None);
        let p = NewProgram::new("a", "b", "c").with_visual("<xml/>");
        assert_eq!(p.visual(), Some("<xml/>"));
    }

    #[test]
    fn program_json_omits_missing_visual() {
        let program = Program::assemble(record(false), "print(1)".into(), None);
        let json = serde_json::to_value(&program).unwrap();
        assert_eq!(json["id"], "p1");
        assert_eq!(json["has_visual"], false);
        assert!(json.get("visual_body").is_none());
    }
}
