//! Application state with a shared [`ProgramManager`].
//!
//! [`AppState`] wraps the manager in `Arc<tokio::sync::Mutex<>>` for use with
//! axum handlers. The manager owns a `rusqlite::Connection`, which is `!Sync`,
//! so an `RwLock` is not an option; handlers await the async mutex instead
//! of blocking the runtime.

use std::sync::Arc;

use progman_runner::RunnerConfig;
use progman_storage::InMemoryStore;

use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::service::ProgramManager;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// The shared program manager (async Mutex, non-blocking await).
    pub manager: Arc<tokio::sync::Mutex<ProgramManager>>,
}

impl AppState {
    /// Opens a manager backed by the SQLite database and programs directory
    /// named in `config`.
    pub fn new(config: &ManagerConfig) -> Result<Self, ManagerError> {
        Ok(Self::from_manager(ProgramManager::open(config)?))
    }

    /// A manager with in-memory metadata and bodies under `programs_dir`
    /// (for testing).
    pub fn in_memory(
        programs_dir: impl Into<std::path::PathBuf>,
        runner: RunnerConfig,
    ) -> Result<Self, ManagerError> {
        let manager =
            ProgramManager::with_store(Box::new(InMemoryStore::new()), programs_dir, runner)?;
        Ok(Self::from_manager(manager))
    }

    pub fn from_manager(manager: ProgramManager) -> Self {
        AppState {
            manager: Arc::new(tokio::sync::Mutex::new(manager)),
        }
    }
}
