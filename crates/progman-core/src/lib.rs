//! Core data model for the robot program repository.
//!
//! Holds the types shared by every other crate: program identity, the
//! metadata record, the merged program view, autorun settings, the pure
//! reconciliation planner, and the in-memory program index.

pub mod autorun;
pub mod error;
pub mod id;
pub mod index;
pub mod program;
pub mod reconcile;

// Re-export commonly used types
pub use autorun::{AutorunMode, AutorunSettings};
pub use error::CoreError;
pub use id::ProgramId;
pub use index::ProgramIndex;
pub use program::{NewProgram, Program, ProgramRecord, ProgramUpdate};
pub use reconcile::{plan_repairs, RecordState, Repair, StoreSnapshot};
