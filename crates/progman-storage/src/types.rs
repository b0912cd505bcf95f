//! Write payloads for the metadata store.

use progman_core::ProgramId;

/// A record to insert. `saved_at` is stamped by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub id: ProgramId,
    pub name: String,
    pub description: String,
    pub has_visual: bool,
}

/// A partial update; `None` fields are left unchanged. `saved_at` is always
/// refreshed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub has_visual: Option<bool>,
}

impl RecordUpdate {
    /// An update that only changes the visual flag.
    pub fn visual(has_visual: bool) -> Self {
        RecordUpdate {
            has_visual: Some(has_visual),
            ..Default::default()
        }
    }
}
