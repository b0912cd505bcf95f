//! The execution slot and its supervisor task.
//!
//! State machine:
//!
//! ```text
//! Idle -> Starting -> Running -> { Succeeded | Failed | Stopped }
//!            \-> Failed (launch failure)
//! ```
//!
//! A terminal state is left by the next `start`. Only `Starting` and
//! `Running` reject a new start, so "already running" is a rejected
//! transition under the session lock, never a racy flag check.
//!
//! Each start bumps a generation counter. The supervisor and output pumps
//! of a session only ever write into the session of their own generation.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::output::OutputBuffer;
use crate::process;

/// Exit status recorded when the child could not be launched at all, and
/// when it was ended by a signal.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = -1;

/// How long output pumps may keep draining once the child has exited.
/// A grandchild holding the pipes open must not wedge the session.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle of the execution slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Starting,
    Running,
    Succeeded,
    Failed,
    Stopped,
}

impl RunState {
    /// True while a session occupies the slot.
    pub fn is_active(self) -> bool {
        matches!(self, RunState::Starting | RunState::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Starting => "starting",
            RunState::Running => "running",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
            RunState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The body file to execute, plus whatever must stay alive while it runs.
///
/// The lease is dropped only after the child has been reaped, on every exit
/// path. Passing a temporary-file guard as the lease keeps the file on disk
/// for exactly the lifetime of the process reading it.
pub struct ScriptSource {
    path: PathBuf,
    lease: Option<Box<dyn Any + Send>>,
}

impl ScriptSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        ScriptSource {
            path: path.into(),
            lease: None,
        }
    }

    pub fn leased(path: impl Into<PathBuf>, lease: impl Any + Send) -> Self {
        ScriptSource {
            path: path.into(),
            lease: Some(Box::new(lease)),
        }
    }

    pub fn script_path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for ScriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptSource")
            .field("path", &self.path)
            .field("leased", &self.lease.is_some())
            .finish()
    }
}

/// Everything observable about the current or last session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSnapshot {
    pub state: RunState,
    pub exit_status: Option<i32>,
    pub output: String,
}

impl ExecutionSnapshot {
    pub fn is_running(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_success(&self) -> bool {
        self.exit_status == Some(0)
    }
}

struct Session {
    generation: u64,
    state: RunState,
    exit_status: Option<i32>,
    output: OutputBuffer,
    stop: Option<oneshot::Sender<()>>,
}

struct Shared {
    session: Mutex<Session>,
    state_tx: watch::Sender<RunState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_running(&self, generation: u64) {
        let mut session = self.lock();
        if session.generation == generation && session.state == RunState::Starting {
            session.state = RunState::Running;
            self.state_tx.send_replace(RunState::Running);
        }
    }

    fn append(&self, generation: u64, chunk: &[u8]) {
        let mut session = self.lock();
        if session.generation == generation {
            session.output.push(chunk);
        }
    }

    fn finish(&self, generation: u64, state: RunState, exit_status: i32) {
        let mut session = self.lock();
        if session.generation != generation {
            return;
        }
        session.state = state;
        session.exit_status = Some(exit_status);
        session.stop = None;
        self.state_tx.send_replace(state);
    }
}

/// Owns the single execution slot.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct ScriptRunner {
    config: RunnerConfig,
    shared: Arc<Shared>,
}

impl ScriptRunner {
    pub fn new(config: RunnerConfig) -> Self {
        let (state_tx, _) = watch::channel(RunState::Idle);
        ScriptRunner {
            shared: Arc::new(Shared {
                session: Mutex::new(Session {
                    generation: 0,
                    state: RunState::Idle,
                    exit_status: None,
                    output: OutputBuffer::new(config.max_output_bytes),
                    stop: None,
                }),
                state_tx,
            }),
            config,
        }
    }

    /// Launches `source` and returns once the child is observably running.
    ///
    /// Execution continues in the background after this returns. Fails with
    /// [`RunnerError::AlreadyRunning`] while another session is active, and
    /// with [`RunnerError::LaunchFailure`] if the child could not be spawned;
    /// in that case the session is left `Failed` with
    /// [`LAUNCH_FAILURE_EXIT_CODE`].
    pub async fn start(&self, source: ScriptSource) -> Result<(), RunnerError> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let generation = {
            let mut session = self.shared.lock();
            if session.state.is_active() {
                return Err(RunnerError::AlreadyRunning);
            }
            session.generation += 1;
            session.state = RunState::Starting;
            session.exit_status = None;
            session.output.clear();
            session.stop = Some(stop_tx);
            self.shared.state_tx.send_replace(RunState::Starting);
            session.generation
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        let supervisor = Supervisor {
            shared: Arc::clone(&self.shared),
            generation,
            command: self.command_for(source.script_path()),
            stop_grace: self.config.stop_grace,
        };
        tokio::spawn(supervisor.run(source, ready_tx, stop_rx));

        match ready_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(RunnerError::LaunchFailure(reason)),
            Err(_) => Err(RunnerError::LaunchFailure(
                "supervisor ended before the program started".to_string(),
            )),
        }
    }

    /// Requests termination of the active session.
    ///
    /// Returns immediately; the session turns `Stopped` once the child has
    /// been reaped. Returns false when there is nothing to stop or a stop is
    /// already pending.
    pub fn stop(&self) -> bool {
        let mut session = self.shared.lock();
        if !session.state.is_active() {
            return false;
        }
        match session.stop.take() {
            Some(stop) => {
                info!(generation = session.generation, "stop requested");
                let _ = stop.send(());
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> RunState {
        self.shared.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    /// `None` before any session has ended.
    pub fn exit_status(&self) -> Option<i32> {
        self.shared.lock().exit_status
    }

    /// Everything the session has produced so far.
    pub fn output(&self) -> String {
        self.shared.lock().output.text()
    }

    pub fn snapshot(&self) -> ExecutionSnapshot {
        let session = self.shared.lock();
        ExecutionSnapshot {
            state: session.state,
            exit_status: session.exit_status,
            output: session.output.text(),
        }
    }

    /// Receives every state transition.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.shared.state_tx.subscribe()
    }

    /// Resolves once no session is active, returning the state it ended in.
    pub async fn wait_until_finished(&self) -> RunState {
        let mut rx = self.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            if !state.is_active() {
                return state;
            }
            if rx.changed().await.is_err() {
                return self.state();
            }
        }
    }

    fn command_for(&self, script: &Path) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg(script)
            .envs(self.config.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_directory {
            cmd.current_dir(dir);
        }
        process::isolate(&mut cmd);
        cmd
    }
}

enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    StopRequested,
}

struct Supervisor {
    shared: Arc<Shared>,
    generation: u64,
    command: Command,
    stop_grace: Duration,
}

impl Supervisor {
    async fn run(
        mut self,
        source: ScriptSource,
        ready: oneshot::Sender<Result<(), String>>,
        stop_rx: oneshot::Receiver<()>,
    ) {
        let mut child = match self.command.spawn() {
            Ok(child) => child,
            Err(err) => {
                let reason = format!("{}: {err}", source.script_path().display());
                warn!(generation = self.generation, %reason, "program failed to launch");
                drop(source);
                self.shared
                    .finish(self.generation, RunState::Failed, LAUNCH_FAILURE_EXIT_CODE);
                let _ = ready.send(Err(reason));
                return;
            }
        };

        info!(
            generation = self.generation,
            pid = child.id(),
            path = %source.script_path().display(),
            "program started"
        );
        let pumps = [
            child.stdout.take().map(|out| self.pump(out)),
            child.stderr.take().map(|err| self.pump(err)),
        ];
        self.shared.mark_running(self.generation);
        let _ = ready.send(Ok(()));

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            Ok(()) = stop_rx => Outcome::StopRequested,
        };

        let (state, exit_status) = match outcome {
            Outcome::Exited(Ok(status)) => {
                let code = status.code().unwrap_or(LAUNCH_FAILURE_EXIT_CODE);
                let state = if status.success() {
                    RunState::Succeeded
                } else {
                    RunState::Failed
                };
                (state, code)
            }
            Outcome::Exited(Err(err)) => {
                warn!(generation = self.generation, %err, "lost track of program");
                (RunState::Failed, LAUNCH_FAILURE_EXIT_CODE)
            }
            Outcome::StopRequested => {
                let code = match process::terminate(&mut child, self.stop_grace).await {
                    Ok(status) => status.code().unwrap_or(LAUNCH_FAILURE_EXIT_CODE),
                    Err(err) => {
                        warn!(generation = self.generation, %err, "failed to terminate program");
                        LAUNCH_FAILURE_EXIT_CODE
                    }
                };
                // A script that traps the signal and exits cleanly was still stopped.
                let code = if code == 0 { LAUNCH_FAILURE_EXIT_CODE } else { code };
                (RunState::Stopped, code)
            }
        };

        for pump in pumps.into_iter().flatten() {
            drain(pump).await;
        }

        // The body must outlive the process; release it before announcing
        // the end so observers never see a finished session with its file
        // still on disk.
        drop(source);
        info!(generation = self.generation, state = %state, exit_status, "program finished");
        self.shared.finish(self.generation, state, exit_status);
    }

    fn pump<R>(&self, mut reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let generation = self.generation;
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => shared.append(generation, &buf[..n]),
                    Err(err) => {
                        debug!(generation, %err, "output stream closed");
                        break;
                    }
                }
            }
        })
    }
}

async fn drain(mut pump: JoinHandle<()>) {
    if tokio::time::timeout(DRAIN_TIMEOUT, &mut pump).await.is_err() {
        debug!("output still open after exit, detaching");
        pump.abort();
    }
}
