//! The [`MetadataStore`] trait defining the contract for program metadata.
//!
//! The store holds only the non-body fields of a program. Each call is
//! expected to be durable and atomic on its own; there are no multi-call
//! transactions. All backends (InMemoryStore, SqliteStore) implement this
//! trait so the manager can be built over either.

use progman_core::{AutorunSettings, ProgramId, ProgramRecord};

use crate::error::StorageError;
use crate::types::{NewRecord, RecordUpdate};

/// The storage contract for program metadata.
///
/// The trait is synchronous: the manager serializes access behind a single
/// lock, and every call is a small local write.
pub trait MetadataStore: Send {
    /// Inserts a new record, stamping `saved_at`.
    ///
    /// Fails with [`StorageError::ProgramExists`] if the id is taken.
    fn insert(&mut self, record: &NewRecord) -> Result<ProgramRecord, StorageError>;

    /// Applies a partial update, refreshing `saved_at`.
    fn update(&mut self, id: &ProgramId, update: &RecordUpdate) -> Result<ProgramRecord, StorageError>;

    /// Deletes a record. If autorun targets it, autorun is reset.
    fn delete(&mut self, id: &ProgramId) -> Result<(), StorageError>;

    /// Fetches one record.
    fn get_by_id(&self, id: &ProgramId) -> Result<ProgramRecord, StorageError>;

    /// Lists every record, ordered by `saved_at` then id.
    fn get_all(&self) -> Result<Vec<ProgramRecord>, StorageError>;

    fn exists(&self, id: &ProgramId) -> Result<bool, StorageError>;

    /// Current autorun settings.
    fn autorun(&self) -> Result<AutorunSettings, StorageError>;

    /// Replaces the autorun settings.
    ///
    /// Fails with [`StorageError::ProgramNotFound`] if the settings name a
    /// program that has no record.
    fn set_autorun(&mut self, settings: &AutorunSettings) -> Result<(), StorageError>;
}
