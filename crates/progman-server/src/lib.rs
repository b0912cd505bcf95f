//! Robot program repository and execution manager.
//!
//! [`service::ProgramManager`] owns program CRUD over a metadata store and two
//! body file stores, the startup reconciliation between them, and the single
//! execution slot. The rest of this crate is a thin HTTP/JSON shim over it.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod schema;
pub mod service;
pub mod state;
