//! SQLite implementation of [`MetadataStore`].
//!
//! [`SqliteStore`] persists program metadata in a SQLite database with WAL
//! mode and automatic schema migrations. Every write is a single statement or
//! a transaction, so each call is atomic on its own.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use progman_core::{AutorunMode, AutorunSettings, ProgramId, ProgramRecord};

use crate::error::StorageError;
use crate::traits::MetadataStore;
use crate::types::{NewRecord, RecordUpdate};

const SELECT_RECORD: &str = "SELECT id, name, description, saved_at, has_visual FROM programs";

/// Raw column values of one `programs` row, before id validation.
type RawRecord = (String, String, String, DateTime<Utc>, bool);

/// SQLite-backed implementation of [`MetadataStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    }

    fn into_record(raw: RawRecord) -> Result<ProgramRecord, StorageError> {
        let (id, name, description, saved_at, has_visual) = raw;
        let id = ProgramId::parse(&id).map_err(|e| StorageError::Corrupt {
            reason: e.to_string(),
        })?;
        Ok(ProgramRecord {
            id,
            name,
            description,
            saved_at,
            has_visual,
        })
    }

    fn fetch(conn: &Connection, id: &ProgramId) -> Result<ProgramRecord, StorageError> {
        let raw = conn
            .query_row(
                &format!("{SELECT_RECORD} WHERE id = ?1"),
                params![id.as_str()],
                Self::read_raw,
            )
            .optional()?
            .ok_or_else(|| StorageError::ProgramNotFound(id.to_string()))?;
        Self::into_record(raw)
    }

    fn record_exists(conn: &Connection, id: &ProgramId) -> Result<bool, StorageError> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM programs WHERE id = ?1)",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl MetadataStore for SqliteStore {
    fn insert(&mut self, record: &NewRecord) -> Result<ProgramRecord, StorageError> {
        let tx = self.conn.transaction()?;
        if Self::record_exists(&tx, &record.id)? {
            return Err(StorageError::ProgramExists(record.id.to_string()));
        }
        tx.execute(
            "INSERT INTO programs (id, name, description, saved_at, has_visual)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id.as_str(),
                record.name,
                record.description,
                Utc::now(),
                record.has_visual,
            ],
        )?;
        let stored = Self::fetch(&tx, &record.id)?;
        tx.commit()?;
        Ok(stored)
    }

    fn update(&mut self, id: &ProgramId, update: &RecordUpdate) -> Result<ProgramRecord, StorageError> {
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE programs SET
                 name = COALESCE(?2, name),
                 description = COALESCE(?3, description),
                 has_visual = COALESCE(?4, has_visual),
                 saved_at = ?5
             WHERE id = ?1",
            params![
                id.as_str(),
                update.name,
                update.description,
                update.has_visual,
                Utc::now(),
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::ProgramNotFound(id.to_string()));
        }
        let stored = Self::fetch(&tx, id)?;
        tx.commit()?;
        Ok(stored)
    }

    fn delete(&mut self, id: &ProgramId) -> Result<(), StorageError> {
        // The reset_autorun_on_program_delete trigger clears autorun first.
        let changed = self
            .conn
            .execute("DELETE FROM programs WHERE id = ?1", params![id.as_str()])?;
        if changed == 0 {
            return Err(StorageError::ProgramNotFound(id.to_string()));
        }
        Ok(())
    }

    fn get_by_id(&self, id: &ProgramId) -> Result<ProgramRecord, StorageError> {
        Self::fetch(&self.conn, id)
    }

    fn get_all(&self) -> Result<Vec<ProgramRecord>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{SELECT_RECORD} ORDER BY saved_at ASC, id ASC"))?;
        let rows = stmt.query_map([], Self::read_raw)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::into_record(row?)?);
        }
        Ok(records)
    }

    fn exists(&self, id: &ProgramId) -> Result<bool, StorageError> {
        Self::record_exists(&self.conn, id)
    }

    fn autorun(&self) -> Result<AutorunSettings, StorageError> {
        let (program_id, mode): (Option<String>, String) = self.conn.query_row(
            "SELECT program_id, mode FROM autorun WHERE slot = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let program_id = program_id
            .map(|raw| ProgramId::parse(&raw))
            .transpose()
            .map_err(|e| StorageError::Corrupt {
                reason: e.to_string(),
            })?;
        let mode = mode
            .parse::<AutorunMode>()
            .map_err(|reason| StorageError::Corrupt { reason })?;

        Ok(AutorunSettings { program_id, mode })
    }

    fn set_autorun(&mut self, settings: &AutorunSettings) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        if let Some(id) = &settings.program_id {
            if !Self::record_exists(&tx, id)? {
                return Err(StorageError::ProgramNotFound(id.to_string()));
            }
        }
        tx.execute(
            "UPDATE autorun SET program_id = ?1, mode = ?2 WHERE slot = 1",
            params![
                settings.program_id.as_ref().map(ProgramId::as_str),
                settings.mode.as_str(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(id: &str) -> NewRecord {
        NewRecord {
            id: ProgramId::parse(id).unwrap(),
            name: format!("{id} name"),
            description: "stored in sqlite".to_string(),
            has_visual: false,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = SqliteStore::in_memory().unwrap();
        let inserted = store.insert(&new_record("p1")).unwrap();

        let fetched = store.get_by_id(&inserted.id).unwrap();
        assert_eq!(fetched, inserted);
        assert_eq!(fetched.description, "stored in sqlite");
        assert!(store.exists(&inserted.id).unwrap());
    }

    #[test]
    fn test_insert_duplicate_fails() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.insert(&new_record("p1")).unwrap();
        assert!(matches!(
            store.insert(&new_record("p1")),
            Err(StorageError::ProgramExists(_))
        ));
    }

    #[test]
    fn test_update_keeps_unset_fields() {
        let mut store = SqliteStore::in_memory().unwrap();
        let inserted = store.insert(&new_record("p1")).unwrap();

        let updated = store
            .update(
                &inserted.id,
                &RecordUpdate {
                    name: Some("renamed".to_string()),
                    has_visual: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.description, "stored in sqlite");
        assert!(updated.has_visual);
        assert!(updated.saved_at >= inserted.saved_at);
    }

    #[test]
    fn test_update_and_delete_missing() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = ProgramId::parse("ghost").unwrap();
        assert!(matches!(
            store.update(&id, &RecordUpdate::visual(false)),
            Err(StorageError::ProgramNotFound(_))
        ));
        assert!(matches!(store.delete(&id), Err(StorageError::ProgramNotFound(_))));
    }

    #[test]
    fn test_get_all_lists_every_record() {
        let mut store = SqliteStore::in_memory().unwrap();
        for id in ["alpha", "beta", "gamma"] {
            store.insert(&new_record(id)).unwrap();
        }

        let mut ids: Vec<String> = store
            .get_all()
            .unwrap()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_autorun_defaults_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progman.db");

        {
            let mut store = SqliteStore::new(&path).unwrap();
            assert_eq!(store.autorun().unwrap(), AutorunSettings::default());
            let record = store.insert(&new_record("auto")).unwrap();
            store
                .set_autorun(&AutorunSettings {
                    program_id: Some(record.id),
                    mode: AutorunMode::Loop,
                })
                .unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        let settings = store.autorun().unwrap();
        assert_eq!(settings.mode, AutorunMode::Loop);
        assert_eq!(settings.program_id.unwrap().as_str(), "auto");
    }

    #[test]
    fn test_delete_resets_autorun() {
        let mut store = SqliteStore::in_memory().unwrap();
        let record = store.insert(&new_record("auto")).unwrap();
        store
            .set_autorun(&AutorunSettings {
                program_id: Some(record.id.clone()),
                mode: AutorunMode::OneShot,
            })
            .unwrap();

        store.delete(&record.id).unwrap();
        assert_eq!(store.autorun().unwrap(), AutorunSettings::default());
        assert!(!store.exists(&record.id).unwrap());
    }

    #[test]
    fn test_autorun_requires_existing_program() {
        let mut store = SqliteStore::in_memory().unwrap();
        let result = store.set_autorun(&AutorunSettings {
            program_id: Some(ProgramId::parse("missing").unwrap()),
            mode: AutorunMode::OneShot,
        });
        assert!(matches!(result, Err(StorageError::ProgramNotFound(_))));
    }
}
