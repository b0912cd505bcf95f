//! Single-slot script execution.
//!
//! [`ScriptRunner`] runs at most one script body at a time in a child
//! process, supervised by a background task. Callers get a synchronous
//! "did it start" answer from [`ScriptRunner::start`] while the script itself
//! keeps running unsupervised; its output, state, and exit status stay
//! readable throughout and after.

pub mod config;
pub mod error;
pub mod output;
pub mod process;
pub mod runner;

pub use config::RunnerConfig;
pub use error::RunnerError;
pub use runner::{ExecutionSnapshot, RunState, ScriptRunner, ScriptSource, LAUNCH_FAILURE_EXIT_CODE};
