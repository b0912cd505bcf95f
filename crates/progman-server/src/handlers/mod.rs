//! HTTP handler modules for the progman API.
//!
//! Each sub-module implements thin handlers that parse requests, acquire the
//! manager lock, delegate to [`ProgramManager`](crate::service::ProgramManager),
//! and return JSON responses. No business logic lives in handlers.

pub mod autorun;
pub mod execution;
pub mod programs;
