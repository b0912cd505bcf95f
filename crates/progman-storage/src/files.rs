//! File-per-program body storage.
//!
//! A [`ProgramFileStore`] maps a program id to `<root>/<id>.<extension>`.
//! Two instances are used: one for script bodies, one for visual bodies.
//! Keeping bodies as plain files lets an operator inspect or recover them
//! with ordinary tools; the price is that the file listing and the metadata
//! store can drift apart, which the manager repairs at startup.
//!
//! Writes land in `<root>/.scratch` first and are renamed into place, so a
//! crash never leaves a truncated body under a program id. The same scratch
//! directory holds [`TemporaryBody`] files, which live outside the id space.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile, TempPath};
use tracing::{debug, warn};

use progman_core::ProgramId;

use crate::error::StorageError;

const SCRATCH_DIR: &str = ".scratch";

/// Which body a file store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    /// The executable source.
    Script,
    /// The block-based representation paired with a script.
    Visual,
}

impl BodyKind {
    /// Default file extension for this kind of body.
    pub fn default_extension(self) -> &'static str {
        match self {
            BodyKind::Script => "py",
            BodyKind::Visual => "xml",
        }
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyKind::Script => f.write_str("script"),
            BodyKind::Visual => f.write_str("visual"),
        }
    }
}

/// Body storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct ProgramFileStore {
    kind: BodyKind,
    root: PathBuf,
    scratch: PathBuf,
    extension: String,
}

impl ProgramFileStore {
    /// Opens a store using the default extension for `kind`.
    pub fn open(kind: BodyKind, root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::open_with_extension(kind, root, kind.default_extension())
    }

    /// Opens a store whose bodies carry `extension` (without the dot).
    ///
    /// Creates the root and scratch directories if missing and removes any
    /// scratch files left behind by a previous process.
    pub fn open_with_extension(
        kind: BodyKind,
        root: impl Into<PathBuf>,
        extension: &str,
    ) -> Result<Self, StorageError> {
        let root = root.into();
        let scratch = root.join(SCRATCH_DIR);
        fs::create_dir_all(&scratch).map_err(|e| StorageError::io(&scratch, e))?;

        let store = ProgramFileStore {
            kind,
            root,
            scratch,
            extension: extension.trim_start_matches('.').to_string(),
        };
        let swept = store.sweep_scratch()?;
        if swept > 0 {
            warn!(kind = %kind, count = swept, "removed leftover scratch files");
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the body file for `id`, whether or not it exists.
    pub fn path_of(&self, id: &ProgramId) -> PathBuf {
        self.root.join(format!("{}.{}", id, self.extension))
    }

    /// Writes a new body. Fails if one already exists.
    pub fn create(&self, id: &ProgramId, body: &str) -> Result<(), StorageError> {
        if self.exists(id) {
            return Err(StorageError::BodyExists {
                kind: self.kind,
                id: id.to_string(),
            });
        }
        self.write_atomic(&self.path_of(id), body)
    }

    /// Replaces the body, creating it if missing.
    pub fn edit(&self, id: &ProgramId, body: &str) -> Result<(), StorageError> {
        self.write_atomic(&self.path_of(id), body)
    }

    pub fn remove(&self, id: &ProgramId) -> Result<(), StorageError> {
        let path = self.path_of(id);
        fs::remove_file(&path).map_err(|e| self.map_missing(id, &path, e))
    }

    /// Reads a body as text.
    ///
    /// Bodies may be placed or edited by hand, so bytes that are not valid
    /// UTF-8 are replaced with U+FFFD rather than failing the read.
    pub fn read(&self, id: &ProgramId) -> Result<String, StorageError> {
        let path = self.path_of(id);
        let bytes = fs::read(&path).map_err(|e| self.map_missing(id, &path, e))?;
        match String::from_utf8(bytes) {
            Ok(body) => Ok(body),
            Err(err) => {
                warn!(kind = %self.kind, id = %id, "body is not valid UTF-8, decoding lossily");
                Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
            }
        }
    }

    pub fn exists(&self, id: &ProgramId) -> bool {
        self.path_of(id).is_file()
    }

    /// Ids of every body in the store, sorted.
    ///
    /// Only regular files with this store's extension and a valid id stem
    /// count; everything else in the directory is ignored.
    pub fn list_ids(&self) -> Result<Vec<ProgramId>, StorageError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StorageError::io(&self.root, e))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.root, e))?;
            let path = entry.path();
            let is_file = entry
                .file_type()
                .map_err(|e| StorageError::io(&path, e))?
                .is_file();
            if !is_file || path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match ProgramId::parse(stem) {
                Ok(id) => ids.push(id),
                Err(err) => debug!(path = %path.display(), %err, "skipping file"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Writes `body` to a fresh file outside the id space.
    ///
    /// The file exists for as long as the returned [`TemporaryBody`] is
    /// alive and is removed when it is dropped, whatever the reason.
    pub fn scoped_temporary(&self, body: &str) -> Result<TemporaryBody, StorageError> {
        let mut file = self.scratch_file("run-")?;
        file.write_all(body.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| StorageError::io(file.path(), e))?;

        let path = file.into_temp_path();
        debug!(path = %path.display(), "created temporary body");
        Ok(TemporaryBody { path: Some(path) })
    }

    /// Removes every file in the scratch directory. Returns how many.
    pub fn sweep_scratch(&self) -> Result<usize, StorageError> {
        let entries = fs::read_dir(&self.scratch).map_err(|e| StorageError::io(&self.scratch, e))?;
        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(|e| StorageError::io(&self.scratch, e))?.path();
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn scratch_file(&self, prefix: &str) -> Result<NamedTempFile, StorageError> {
        Builder::new()
            .prefix(prefix)
            .suffix(&format!(".{}", self.extension))
            .tempfile_in(&self.scratch)
            .map_err(|e| StorageError::io(&self.scratch, e))
    }

    fn write_atomic(&self, target: &Path, body: &str) -> Result<(), StorageError> {
        let mut file = self.scratch_file("write-")?;
        file.write_all(body.as_bytes())
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| StorageError::io(file.path(), e))?;
        file.persist(target)
            .map_err(|e| StorageError::io(target, e.error))?;
        Ok(())
    }

    fn map_missing(&self, id: &ProgramId, path: &Path, err: io::Error) -> StorageError {
        if err.kind() == io::ErrorKind::NotFound {
            StorageError::BodyNotFound {
                kind: self.kind,
                id: id.to_string(),
            }
        } else {
            StorageError::io(path, err)
        }
    }
}

/// A body file that is deleted when this value is dropped.
///
/// Hand it to whatever executes the file and keep it alive until execution
/// has fully ended.
#[derive(Debug)]
pub struct TemporaryBody {
    path: Option<TempPath>,
}

impl TemporaryBody {
    pub fn path(&self) -> &Path {
        // Only `drop` takes the path out.
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for TemporaryBody {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.display().to_string();
            match path.close() {
                Ok(()) => debug!(path = %shown, "removed temporary body"),
                Err(err) => warn!(path = %shown, %err, "failed to remove temporary body"),
            }
        }
    }
}
