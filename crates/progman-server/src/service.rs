//! ProgramManager: the single coordinator between callers and the metadata
//! store, the two body file stores, and the script runner.
//!
//! All business logic flows through [`ProgramManager`]. HTTP handlers and the
//! CLI are thin wrappers that delegate to these methods.
//!
//! Mutations write in a fixed order: metadata first, then the script body,
//! then the visual body, then the in-memory index. A failure part way through
//! is not rolled back; the next startup reconciliation repairs it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use progman_core::program::ADOPTED_DESCRIPTION;
use progman_core::{
    plan_repairs, AutorunMode, AutorunSettings, NewProgram, Program, ProgramId, ProgramIndex,
    ProgramRecord, ProgramUpdate, RecordState, Repair, StoreSnapshot,
};
use progman_runner::{ExecutionSnapshot, RunState, RunnerConfig, RunnerError, ScriptRunner, ScriptSource};
use progman_storage::{
    BodyKind, MetadataStore, NewRecord, ProgramFileStore, RecordUpdate, SqliteStore, StorageError,
};

use crate::config::{ManagerConfig, SCRIPT_DIR, VISUAL_DIR};
use crate::error::ManagerError;

/// Pause between two iterations of a looping autorun program.
pub const AUTORUN_RESTART_DELAY: Duration = Duration::from_millis(500);

/// The program repository and its execution slot.
///
/// Not `Sync`: callers share it behind an async mutex and take `&mut self`
/// for anything that awaits.
pub struct ProgramManager {
    metadata: Box<dyn MetadataStore>,
    scripts: ProgramFileStore,
    visuals: ProgramFileStore,
    index: ProgramIndex,
    runner: Arc<ScriptRunner>,
    autorun_loop: Option<CancellationToken>,
}

impl ProgramManager {
    /// Opens the SQLite metadata store and the file stores named by `config`,
    /// then reconciles them.
    pub fn open(config: &ManagerConfig) -> Result<Self, ManagerError> {
        let metadata = SqliteStore::new(&config.db_path)?;
        Self::with_store(
            Box::new(metadata),
            config.programs_dir.clone(),
            config.runner.clone(),
        )
    }

    /// Builds a manager over any metadata store, then reconciles.
    pub fn with_store(
        metadata: Box<dyn MetadataStore>,
        programs_dir: impl Into<PathBuf>,
        runner: RunnerConfig,
    ) -> Result<Self, ManagerError> {
        let programs_dir = programs_dir.into();
        let scripts = ProgramFileStore::open(BodyKind::Script, programs_dir.join(SCRIPT_DIR))?;
        let visuals = ProgramFileStore::open(BodyKind::Visual, programs_dir.join(VISUAL_DIR))?;

        let mut manager = ProgramManager {
            metadata,
            scripts,
            visuals,
            index: ProgramIndex::new(),
            runner: Arc::new(ScriptRunner::new(runner)),
            autorun_loop: None,
        };
        manager.reconcile()?;
        info!(
            programs = manager.index.len(),
            dir = %programs_dir.display(),
            "program manager ready"
        );
        Ok(manager)
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    /// Repairs drift between the metadata store and the file stores, then
    /// rebuilds the index. Returns the repairs applied, each also logged.
    ///
    /// A second call with no mutation in between returns nothing.
    pub fn reconcile(&mut self) -> Result<Vec<Repair>, ManagerError> {
        let snapshot = self.store_snapshot()?;
        let repairs = plan_repairs(&snapshot);
        for repair in &repairs {
            warn!("{repair}");
            self.apply_repair(repair)?;
        }
        if repairs.is_empty() {
            debug!("metadata and body files agree");
        }
        self.rebuild_index()?;
        Ok(repairs)
    }

    fn store_snapshot(&self) -> Result<StoreSnapshot, ManagerError> {
        let records = self
            .metadata
            .get_all()?
            .into_iter()
            .map(|r| (r.id, RecordState { has_visual: r.has_visual }))
            .collect();
        Ok(StoreSnapshot {
            records,
            script_ids: self.scripts.list_ids()?.into_iter().collect(),
            visual_ids: self.visuals.list_ids()?.into_iter().collect(),
            autorun_program: self.metadata.autorun()?.program_id,
        })
    }

    fn apply_repair(&mut self, repair: &Repair) -> Result<(), ManagerError> {
        match repair {
            Repair::DropRecord { id } => self.metadata.delete(id)?,
            Repair::ClearVisualFlag { id } => {
                self.metadata.update(id, &RecordUpdate::visual(false))?;
            }
            Repair::AdoptScript { id, has_visual } => {
                self.metadata.insert(&NewRecord {
                    id: id.clone(),
                    name: id.to_string(),
                    description: ADOPTED_DESCRIPTION.to_string(),
                    has_visual: *has_visual,
                })?;
            }
            Repair::ClearAutorun { .. } => {
                self.metadata.set_autorun(&AutorunSettings::default())?;
            }
        }
        Ok(())
    }

    /// Reloads the index from the stores. A program whose body cannot be
    /// read is left out of the index and logged; the rest still load.
    fn rebuild_index(&mut self) -> Result<(), ManagerError> {
        let mut programs = Vec::new();
        for record in self.metadata.get_all()? {
            let id = record.id.clone();
            match self.assemble(record) {
                Ok(program) => programs.push(program),
                Err(err) => warn!(id = %id, %err, "skipping unreadable program"),
            }
        }
        self.index.rebuild(programs);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Program CRUD
    // -----------------------------------------------------------------------

    /// Stores a new program under a fresh id and returns the id.
    pub fn create(&mut self, program: NewProgram) -> Result<ProgramId, ManagerError> {
        validate_name(&program.name)?;
        let id = ProgramId::generate();
        let visual = program.visual().map(str::to_owned);

        let record = self.metadata.insert(&NewRecord {
            id: id.clone(),
            name: program.name,
            description: program.description,
            has_visual: visual.is_some(),
        })?;
        self.scripts.create(&id, &program.script_body)?;
        if let Some(body) = &visual {
            self.visuals.create(&id, body)?;
        }

        info!(id = %id, name = %record.name, has_visual = record.has_visual, "program created");
        self.index
            .upsert(Program::assemble(record, program.script_body, visual));
        Ok(id)
    }

    /// Replaces every field of an existing program.
    ///
    /// An absent or empty visual body removes the program's visual body.
    pub fn update(&mut self, id: &ProgramId, update: ProgramUpdate) -> Result<(), ManagerError> {
        if !self.metadata.exists(id)? {
            return Err(ManagerError::NotFound(id.clone()));
        }
        validate_name(&update.name)?;
        let visual = update.visual().map(str::to_owned);

        let record = self.metadata.update(
            id,
            &RecordUpdate {
                name: Some(update.name),
                description: Some(update.description),
                has_visual: Some(visual.is_some()),
            },
        )?;
        self.scripts.edit(id, &update.script_body)?;
        match &visual {
            Some(body) => self.visuals.edit(id, body)?,
            None if self.visuals.exists(id) => self.visuals.remove(id)?,
            None => {}
        }

        info!(id = %id, has_visual = record.has_visual, "program updated");
        self.index
            .upsert(Program::assemble(record, update.script_body, visual));
        Ok(())
    }

    /// Deletes a program and its bodies.
    ///
    /// A session already running this program keeps running; it executes a
    /// private copy of the body.
    pub fn delete(&mut self, id: &ProgramId) -> Result<(), ManagerError> {
        let record = self.metadata.get_by_id(id)?;
        self.metadata.delete(id)?;

        let removed = self.remove_bodies(id, record.has_visual);
        self.index.remove(id);
        removed?;

        info!(id = %id, name = %record.name, "program deleted");
        Ok(())
    }

    fn remove_bodies(&self, id: &ProgramId, has_visual: bool) -> Result<(), ManagerError> {
        ignore_missing(self.scripts.remove(id))?;
        if has_visual || self.visuals.exists(id) {
            ignore_missing(self.visuals.remove(id))?;
        }
        Ok(())
    }

    /// Reads a program from the stores.
    pub fn get(&self, id: &ProgramId) -> Result<Program, ManagerError> {
        let record = self.metadata.get_by_id(id)?;
        self.assemble(record)
    }

    /// Every program, from the index.
    pub fn list(&self) -> Vec<Program> {
        self.index.to_vec()
    }

    /// The in-memory index itself.
    pub fn programs(&self) -> &ProgramIndex {
        &self.index
    }

    /// True only if both the metadata and the script body exist.
    pub fn exists(&self, id: &ProgramId) -> Result<bool, ManagerError> {
        Ok(self.metadata.exists(id)? && self.scripts.exists(id))
    }

    pub fn script_store(&self) -> &ProgramFileStore {
        &self.scripts
    }

    pub fn visual_store(&self) -> &ProgramFileStore {
        &self.visuals
    }

    fn assemble(&self, record: ProgramRecord) -> Result<Program, ManagerError> {
        let script = self.scripts.read(&record.id)?;
        let visual = if record.has_visual {
            Some(self.visuals.read(&record.id)?)
        } else {
            None
        };
        Ok(Program::assemble(record, script, visual))
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Runs a stored program.
    ///
    /// The body is copied into a temporary body first, so editing or deleting
    /// the program while it runs does not affect the session.
    pub async fn execute_from_id(&mut self, id: &ProgramId) -> Result<(), ManagerError> {
        if !self.exists(id)? {
            return Err(ManagerError::NotFound(id.clone()));
        }
        let source = lease_script(&self.scripts, id)?;
        let runner = Arc::clone(&self.runner);
        runner.start(source).await?;
        info!(id = %id, "executing program");
        Ok(())
    }

    /// Runs an unsaved script body.
    pub async fn execute_from_code(&mut self, body: &str) -> Result<(), ManagerError> {
        let temporary = self.scripts.scoped_temporary(body)?;
        let source = ScriptSource::leased(temporary.path().to_path_buf(), temporary);
        let runner = Arc::clone(&self.runner);
        runner.start(source).await?;
        info!(bytes = body.len(), "executing code");
        Ok(())
    }

    /// Stops the running session and any autorun loop.
    ///
    /// Returns without waiting for the process to exit. False when there was
    /// nothing to stop.
    pub fn stop_execution(&mut self) -> bool {
        let looping = match self.autorun_loop.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        };
        self.runner.stop() || looping
    }

    pub fn execution_output(&self) -> String {
        self.runner.output()
    }

    pub fn execution_is_running(&self) -> bool {
        self.runner.is_running()
    }

    /// True when the last session exited with status 0.
    pub fn execution_is_success(&self) -> bool {
        self.runner.exit_status() == Some(0)
    }

    pub fn execution_status(&self) -> ExecutionSnapshot {
        self.runner.snapshot()
    }

    /// A handle on the runner, for waiting on a session without holding the
    /// manager.
    pub fn runner(&self) -> Arc<ScriptRunner> {
        Arc::clone(&self.runner)
    }

    // -----------------------------------------------------------------------
    // Autorun
    // -----------------------------------------------------------------------

    pub fn autorun(&self) -> Result<AutorunSettings, ManagerError> {
        Ok(self.metadata.autorun()?)
    }

    /// Makes `id` the autorun program.
    pub fn set_autorun(&mut self, id: &ProgramId, mode: AutorunMode) -> Result<(), ManagerError> {
        if !self.exists(id)? {
            return Err(ManagerError::NotFound(id.clone()));
        }
        self.metadata.set_autorun(&AutorunSettings {
            program_id: Some(id.clone()),
            mode,
        })?;
        info!(id = %id, mode = %mode, "autorun set");
        Ok(())
    }

    /// Starts the autorun program according to its mode.
    ///
    /// In [`AutorunMode::Loop`] the program is restarted after every
    /// completion until [`stop_execution`](Self::stop_execution).
    pub async fn execute_autorun(&mut self) -> Result<AutorunMode, ManagerError> {
        let settings = self.metadata.autorun()?;
        let Some(id) = settings.target().cloned() else {
            return Err(ManagerError::AutorunNotConfigured);
        };

        self.execute_from_id(&id).await?;
        if settings.mode == AutorunMode::Loop {
            if let Some(previous) = self.autorun_loop.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            self.autorun_loop = Some(token.clone());
            tokio::spawn(autorun_loop(
                Arc::clone(&self.runner),
                self.scripts.clone(),
                id,
                token,
            ));
        }
        Ok(settings.mode)
    }
}

impl Drop for ProgramManager {
    fn drop(&mut self) {
        if let Some(token) = self.autorun_loop.take() {
            token.cancel();
        }
    }
}

async fn autorun_loop(
    runner: Arc<ScriptRunner>,
    scripts: ProgramFileStore,
    id: ProgramId,
    token: CancellationToken,
) {
    let mut iteration: u64 = 1;
    loop {
        let finished = tokio::select! {
            _ = token.cancelled() => break,
            state = runner.wait_until_finished() => state,
        };
        if finished == RunState::Stopped {
            break;
        }
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(AUTORUN_RESTART_DELAY) => {}
        }

        let source = match lease_script(&scripts, &id) {
            Ok(source) => source,
            Err(err) => {
                warn!(id = %id, %err, "autorun program unavailable, ending loop");
                break;
            }
        };
        match runner.start(source).await {
            Ok(()) if token.is_cancelled() => {
                runner.stop();
                break;
            }
            Ok(()) => {
                iteration += 1;
                debug!(id = %id, iteration, "autorun program restarted");
            }
            Err(RunnerError::AlreadyRunning) => {
                info!(id = %id, "execution slot taken, ending autorun loop");
                break;
            }
            Err(err) => {
                warn!(id = %id, %err, "autorun restart failed, ending loop");
                break;
            }
        }
    }
    debug!(id = %id, iteration, "autorun loop ended");
}

/// Copies the stored script into a temporary body and wraps it for the runner.
fn lease_script(scripts: &ProgramFileStore, id: &ProgramId) -> Result<ScriptSource, StorageError> {
    let body = scripts.read(id)?;
    let temporary = scripts.scoped_temporary(&body)?;
    Ok(ScriptSource::leased(temporary.path().to_path_buf(), temporary))
}

fn validate_name(name: &str) -> Result<(), ManagerError> {
    if name.trim().is_empty() {
        return Err(ManagerError::InvalidInput(
            "program name must not be blank".to_string(),
        ));
    }
    Ok(())
}

fn ignore_missing(result: Result<(), StorageError>) -> Result<(), StorageError> {
    match result {
        Err(StorageError::BodyNotFound { kind, id }) => {
            debug!(%kind, %id, "body already gone");
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use progman_storage::InMemoryStore;

    use super::*;

    fn manager_in(dir: &Path) -> ProgramManager {
        ProgramManager::with_store(
            Box::new(InMemoryStore::new()),
            dir,
            RunnerConfig::new("sh").stop_grace(Duration::from_millis(500)),
        )
        .unwrap()
    }

    fn scratch_files(manager: &ProgramManager) -> usize {
        fs::read_dir(manager.script_store().root().join(".scratch"))
            .unwrap()
            .count()
    }

    #[test]
    fn create_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());

        let id = manager
            .create(NewProgram::new("wave", "waves the arm", "print('hello')\n"))
            .unwrap();
        let program = manager.get(&id).unwrap();

        assert_eq!(program.name, "wave");
        assert_eq!(program.description, "waves the arm");
        assert_eq!(program.script_body, "print('hello')\n");
        assert!(!program.has_visual);
        assert_eq!(program.visual_body, None);
        assert_eq!(manager.list(), vec![program]);
    }

    #[test]
    fn empty_visual_body_means_no_visual() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());

        let id = manager
            .create(NewProgram::new("p", "", "pass").with_visual(""))
            .unwrap();
        assert!(!manager.get(&id).unwrap().has_visual);
        assert!(!manager.visual_store().exists(&id));
    }

    #[test]
    fn exists_follows_create_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());

        let id = manager
            .create(NewProgram::new("pick", "", "pass").with_visual("<xml/>"))
            .unwrap();
        assert!(manager.exists(&id).unwrap());
        assert!(manager.visual_store().exists(&id));

        manager.delete(&id).unwrap();
        assert!(!manager.exists(&id).unwrap());
        assert!(!manager.visual_store().exists(&id));
        assert!(manager.programs().is_empty());
    }

    #[test]
    fn update_replaces_fields_and_drops_visual() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        let id = manager
            .create(NewProgram::new("old", "", "pass").with_visual("<xml/>"))
            .unwrap();

        manager
            .update(
                &id,
                ProgramUpdate {
                    name: "new".to_string(),
                    description: "edited".to_string(),
                    script_body: "print(2)".to_string(),
                    visual_body: None,
                },
            )
            .unwrap();

        let program = manager.get(&id).unwrap();
        assert_eq!(program.name, "new");
        assert_eq!(program.script_body, "print(2)");
        assert!(!program.has_visual);
        assert!(!manager.visual_store().exists(&id));
        assert_eq!(manager.programs().get(&id), Some(&program));
    }

    #[test]
    fn missing_programs_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        let ghost = ProgramId::parse("ghost").unwrap();

        assert!(matches!(manager.get(&ghost), Err(ManagerError::NotFound(_))));
        assert!(matches!(manager.delete(&ghost), Err(ManagerError::NotFound(_))));
        assert!(matches!(
            manager.update(&ghost, NewProgram::new("x", "", "pass").into()),
            Err(ManagerError::NotFound(_))
        ));
        assert!(matches!(
            manager.set_autorun(&ghost, AutorunMode::OneShot),
            Err(ManagerError::NotFound(_))
        ));
    }

    #[test]
    fn blank_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        assert!(matches!(
            manager.create(NewProgram::new("  ", "", "pass")),
            Err(ManagerError::InvalidInput(_))
        ));
        assert!(manager.script_store().list_ids().unwrap().is_empty());
    }

    #[test]
    fn reconcile_adopts_orphan_script() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        let orphan = ProgramId::parse("dropped-in").unwrap();
        fs::write(manager.script_store().path_of(&orphan), "print('found')").unwrap();
        fs::write(manager.visual_store().path_of(&orphan), "<xml/>").unwrap();

        let repairs = manager.reconcile().unwrap();
        assert_eq!(
            repairs,
            vec![Repair::AdoptScript {
                id: orphan.clone(),
                has_visual: true
            }]
        );

        let program = manager.get(&orphan).unwrap();
        assert_eq!(program.name, "dropped-in");
        assert_eq!(program.description, "Unknown program");
        assert_eq!(program.visual_body.as_deref(), Some("<xml/>"));
        assert!(manager.programs().contains(&orphan));

        assert!(manager.reconcile().unwrap().is_empty());
    }

    #[test]
    fn startup_adopts_orphan_with_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join(SCRIPT_DIR);
        fs::create_dir_all(&scripts).unwrap();
        fs::write(scripts.join("legacy.py"), b"# caf\xe9\nprint('x')\n").unwrap();

        let manager = manager_in(dir.path());
        let legacy = ProgramId::parse("legacy").unwrap();
        assert!(manager.exists(&legacy).unwrap());
        assert!(manager.programs().contains(&legacy));
        assert_eq!(
            manager.get(&legacy).unwrap().script_body,
            "# caf\u{FFFD}\nprint('x')\n"
        );
    }

    #[test]
    fn invalid_utf8_edit_does_not_hide_other_programs() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        let healthy = manager.create(NewProgram::new("healthy", "", "echo ok")).unwrap();
        let edited = manager.create(NewProgram::new("edited", "", "echo old")).unwrap();
        fs::write(manager.script_store().path_of(&edited), b"echo \xff\xfe\n").unwrap();

        assert!(manager.reconcile().unwrap().is_empty());
        assert_eq!(manager.programs().len(), 2);
        assert_eq!(manager.get(&healthy).unwrap().script_body, "echo ok");
        assert!(manager.get(&edited).unwrap().script_body.contains('\u{FFFD}'));
    }

    #[test]
    fn reconcile_clears_dangling_visual_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        let id = manager
            .create(NewProgram::new("p", "", "pass").with_visual("<xml/>"))
            .unwrap();
        fs::remove_file(manager.visual_store().path_of(&id)).unwrap();

        let repairs = manager.reconcile().unwrap();
        assert_eq!(repairs, vec![Repair::ClearVisualFlag { id: id.clone() }]);

        let program = manager.get(&id).unwrap();
        assert!(!program.has_visual);
        assert_eq!(program.script_body, "pass");
        assert!(manager.reconcile().unwrap().is_empty());
    }

    #[test]
    fn reconcile_drops_record_without_script() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        let id = manager.create(NewProgram::new("p", "", "pass")).unwrap();
        manager.set_autorun(&id, AutorunMode::Loop).unwrap();
        fs::remove_file(manager.script_store().path_of(&id)).unwrap();

        let repairs = manager.reconcile().unwrap();
        assert_eq!(repairs[0], Repair::DropRecord { id: id.clone() });
        assert!(!manager.exists(&id).unwrap());
        assert!(manager.programs().is_empty());
        assert_eq!(manager.autorun().unwrap(), AutorunSettings::default());
    }

    #[test]
    fn sqlite_backed_manager_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = ManagerConfig::new(dir.path().join("progman.db"), dir.path().join("programs"))
            .runner(RunnerConfig::new("sh"));

        let id = {
            let mut manager = ProgramManager::open(&config).unwrap();
            manager.create(NewProgram::new("kept", "", "echo kept")).unwrap()
        };

        let mut manager = ProgramManager::open(&config).unwrap();
        assert!(manager.reconcile().unwrap().is_empty());
        assert_eq!(manager.get(&id).unwrap().name, "kept");
        assert_eq!(manager.programs().len(), 1);
    }

    #[tokio::test]
    async fn execute_from_code_collects_output_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());

        manager.execute_from_code("echo robot ready").await.unwrap();
        manager.runner().wait_until_finished().await;

        assert!(manager.execution_is_success());
        assert!(!manager.execution_is_running());
        assert_eq!(manager.execution_output(), "robot ready\n");
        assert_eq!(scratch_files(&manager), 0);
    }

    #[tokio::test]
    async fn second_execution_is_rejected_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());

        manager.execute_from_code("sleep 30").await.unwrap();
        assert!(matches!(
            manager.execute_from_code("echo too late").await,
            Err(ManagerError::AlreadyRunning)
        ));
        // The rejected body's temporary file is already gone.
        assert_eq!(scratch_files(&manager), 1);

        assert!(manager.stop_execution());
        let state = manager.runner().wait_until_finished().await;
        assert_eq!(state, RunState::Stopped);
        assert!(!manager.execution_is_running());
        assert!(!manager.execution_is_success());
        assert_eq!(scratch_files(&manager), 0);
    }

    #[tokio::test]
    async fn running_program_is_immune_to_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        let id = manager
            .create(NewProgram::new("slow", "", "sleep 0.3\necho finished"))
            .unwrap();

        manager.execute_from_id(&id).await.unwrap();
        manager.delete(&id).unwrap();
        manager.runner().wait_until_finished().await;

        assert!(manager.execution_is_success());
        assert_eq!(manager.execution_output(), "finished\n");
    }

    #[tokio::test]
    async fn execute_missing_program_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        let ghost = ProgramId::parse("ghost").unwrap();
        assert!(matches!(
            manager.execute_from_id(&ghost).await,
            Err(ManagerError::NotFound(_))
        ));
        assert_eq!(manager.execution_status().state, RunState::Idle);
    }

    #[tokio::test]
    async fn script_removed_after_startup_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        let id = manager.create(NewProgram::new("gone", "", "echo gone")).unwrap();
        assert!(manager.exists(&id).unwrap());

        fs::remove_file(manager.script_store().path_of(&id)).unwrap();

        assert!(!manager.exists(&id).unwrap());
        assert!(matches!(
            manager.execute_from_id(&id).await,
            Err(ManagerError::NotFound(_))
        ));
        assert_eq!(manager.execution_status().state, RunState::Idle);
    }

    #[tokio::test]
    async fn autorun_requires_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        assert!(matches!(
            manager.execute_autorun().await,
            Err(ManagerError::AutorunNotConfigured)
        ));

        let id = manager.create(NewProgram::new("p", "", "echo once")).unwrap();
        manager.set_autorun(&id, AutorunMode::Disabled).unwrap();
        assert!(matches!(
            manager.execute_autorun().await,
            Err(ManagerError::AutorunNotConfigured)
        ));
    }

    #[tokio::test]
    async fn one_shot_autorun_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        let id = manager.create(NewProgram::new("p", "", "echo once")).unwrap();
        manager.set_autorun(&id, AutorunMode::OneShot).unwrap();

        assert_eq!(manager.execute_autorun().await.unwrap(), AutorunMode::OneShot);
        manager.runner().wait_until_finished().await;
        assert_eq!(manager.execution_output(), "once\n");
        assert!(manager.autorun_loop.is_none());
    }

    #[tokio::test]
    async fn loop_autorun_restarts_until_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("runs");
        let mut manager = manager_in(dir.path());
        let id = manager
            .create(NewProgram::new(
                "loop",
                "",
                format!("echo run >> '{}'", counter.display()),
            ))
            .unwrap();
        manager.set_autorun(&id, AutorunMode::Loop).unwrap();
        manager.execute_autorun().await.unwrap();

        let runs = || {
            fs::read_to_string(&counter)
                .map(|s| s.lines().count())
                .unwrap_or(0)
        };
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while runs() < 3 {
            assert!(tokio::time::Instant::now() < deadline, "loop did not restart");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert!(manager.stop_execution());
        manager.runner().wait_until_finished().await;
        tokio::time::sleep(AUTORUN_RESTART_DELAY * 3).await;
        let settled = runs();
        tokio::time::sleep(AUTORUN_RESTART_DELAY * 2).await;
        assert_eq!(runs(), settled);
    }

    #[tokio::test]
    async fn deleting_autorun_program_resets_autorun() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        let id = manager.create(NewProgram::new("p", "", "true")).unwrap();
        manager.set_autorun(&id, AutorunMode::OneShot).unwrap();
        assert_eq!(manager.autorun().unwrap().target(), Some(&id));

        manager.delete(&id).unwrap();
        assert_eq!(manager.autorun().unwrap(), AutorunSettings::default());
    }
}
