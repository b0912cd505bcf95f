//! How the runner turns a body file into a process.

use std::path::PathBuf;
use std::time::Duration;

/// Maximum output kept per session (10 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Time a stopped script gets to exit after SIGTERM before it is killed.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(3);

/// Interpreter invocation used for every session.
///
/// The body path is appended after `args`.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub working_directory: Option<PathBuf>,
    pub max_output_bytes: usize,
    pub stop_grace: Duration,
}

impl RunnerConfig {
    /// Runs bodies as `<program> <path>` with no extra arguments.
    pub fn new(program: impl Into<String>) -> Self {
        RunnerConfig {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_directory: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Unbuffered Python 3, so output shows up while the script runs.
    pub fn python(interpreter: impl Into<String>) -> Self {
        RunnerConfig::new(interpreter)
            .arg("-u")
            .env("PYTHONUNBUFFERED", "1")
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = limit;
        self
    }

    pub fn stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig::python("python3")
    }
}
