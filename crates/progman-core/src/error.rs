//! Core error types for progman-core.

use thiserror::Error;

/// Errors produced while building core values from untrusted input.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A program identifier that cannot be used as a file stem.
    #[error("invalid program id: '{id}' ({reason})")]
    InvalidProgramId { id: String, reason: &'static str },
}
