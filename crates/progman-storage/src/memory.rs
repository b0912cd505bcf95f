//! In-memory implementation of [`MetadataStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests and ephemeral use.
//! It keeps the same semantics as the SQLite backend, including the autorun
//! reset on delete.

use std::collections::HashMap;

use chrono::Utc;

use progman_core::{AutorunSettings, ProgramId, ProgramRecord};

use crate::error::StorageError;
use crate::traits::MetadataStore;
use crate::types::{NewRecord, RecordUpdate};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: HashMap<ProgramId, ProgramRecord>,
    autorun: AutorunSettings,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn get_stored_mut(&mut self, id: &ProgramId) -> Result<&mut ProgramRecord, StorageError> {
        self.records
            .get_mut(id)
            .ok_or_else(|| StorageError::ProgramNotFound(id.to_string()))
    }
}

impl MetadataStore for InMemoryStore {
    fn insert(&mut self, record: &NewRecord) -> Result<ProgramRecord, StorageError> {
        if self.records.contains_key(&record.id) {
            return Err(StorageError::ProgramExists(record.id.to_string()));
        }
        let stored = ProgramRecord {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            saved_at: Utc::now(),
            has_visual: record.has_visual,
        };
        self.records.insert(record.id.clone(), stored.clone());
        Ok(stored)
    }

    fn update(&mut self, id: &ProgramId, update: &RecordUpdate) -> Result<ProgramRecord, StorageError> {
        let stored = self.get_stored_mut(id)?;
        if let Some(name) = &update.name {
            stored.name = name.clone();
        }
        if let Some(description) = &update.description {
            stored.description = description.clone();
        }
        if let Some(has_visual) = update.has_visual {
            stored.has_visual = has_visual;
        }
        stored.saved_at = Utc::now();
        Ok(stored.clone())
    }

    fn delete(&mut self, id: &ProgramId) -> Result<(), StorageError> {
        self.records
            .remove(id)
            .ok_or_else(|| StorageError::ProgramNotFound(id.to_string()))?;
        if self.autorun.program_id.as_ref() == Some(id) {
            self.autorun = AutorunSettings::default();
        }
        Ok(())
    }

    fn get_by_id(&self, id: &ProgramId) -> Result<ProgramRecord, StorageError> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::ProgramNotFound(id.to_string()))
    }

    fn get_all(&self) -> Result<Vec<ProgramRecord>, StorageError> {
        let mut records: Vec<ProgramRecord> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.saved_at.cmp(&b.saved_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    fn exists(&self, id: &ProgramId) -> Result<bool, StorageError> {
        Ok(self.records.contains_key(id))
    }

    fn autorun(&self) -> Result<AutorunSettings, StorageError> {
        Ok(self.autorun.clone())
    }

    fn set_autorun(&mut self, settings: &AutorunSettings) -> Result<(), StorageError> {
        if let Some(id) = &settings.program_id {
            if !self.records.contains_key(id) {
                return Err(StorageError::ProgramNotFound(id.to_string()));
            }
        }
        self.autorun = settings.clone();
        Ok(())
    }
}
