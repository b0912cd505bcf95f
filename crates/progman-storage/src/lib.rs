//! Storage backends for robot programs.
//!
//! A program is persisted in two places: its descriptive fields in a
//! [`MetadataStore`], and its bodies as one file per program in a
//! [`ProgramFileStore`] (one instance for script bodies, one for visual
//! bodies). Keeping the two in agreement is the manager's job; this crate
//! only provides the primitives.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: write payloads for the metadata store
//! - [`traits`]: MetadataStore trait definition
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: SQL migrations and connection setup
//! - [`sqlite`]: SqliteStore implementation
//! - [`files`]: ProgramFileStore and scoped temporary bodies

pub mod error;
pub mod files;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use files::{BodyKind, ProgramFileStore, TemporaryBody};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::MetadataStore;
pub use types::{NewRecord, RecordUpdate};
