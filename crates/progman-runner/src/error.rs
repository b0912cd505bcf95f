//! Runner error types.

use thiserror::Error;

/// Errors returned by [`ScriptRunner::start`](crate::ScriptRunner::start).
#[derive(Debug, Error)]
pub enum RunnerError {
    /// A session is already starting or running.
    #[error("a program is already running")]
    AlreadyRunning,

    /// The child process could not be launched.
    #[error("failed to launch program: {0}")]
    LaunchFailure(String),
}
