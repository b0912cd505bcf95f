//! Manager and server configuration.
//!
//! Read from environment variables:
//! - `PROGMAN_DB_PATH`: SQLite database file path (default: "progman.db")
//! - `PROGMAN_PROGRAMS_DIR`: root of the body file stores (default: "programs")
//! - `PROGMAN_PORT`: server listen port (default: "3000")
//! - `PROGMAN_INTERPRETER`: Python interpreter used to run scripts (default: "python3")

use std::path::PathBuf;

use progman_runner::RunnerConfig;

pub const DEFAULT_DB_PATH: &str = "progman.db";
pub const DEFAULT_PROGRAMS_DIR: &str = "programs";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Subdirectory of the programs dir holding script bodies.
pub const SCRIPT_DIR: &str = "python3";
/// Subdirectory of the programs dir holding visual bodies.
pub const VISUAL_DIR: &str = "blockly";

/// Everything a [`ProgramManager`](crate::service::ProgramManager) needs to open.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub db_path: PathBuf,
    pub programs_dir: PathBuf,
    pub runner: RunnerConfig,
}

impl ManagerConfig {
    pub fn new(db_path: impl Into<PathBuf>, programs_dir: impl Into<PathBuf>) -> Self {
        ManagerConfig {
            db_path: db_path.into(),
            programs_dir: programs_dir.into(),
            runner: RunnerConfig::python(DEFAULT_INTERPRETER),
        }
    }

    pub fn interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.runner = RunnerConfig::python(interpreter);
        self
    }

    pub fn runner(mut self, runner: RunnerConfig) -> Self {
        self.runner = runner;
        self
    }

    pub fn script_dir(&self) -> PathBuf {
        self.programs_dir.join(SCRIPT_DIR)
    }

    pub fn visual_dir(&self) -> PathBuf {
        self.programs_dir.join(VISUAL_DIR)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig::new(DEFAULT_DB_PATH, DEFAULT_PROGRAMS_DIR)
    }
}

/// Configuration of the HTTP server binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub manager: ManagerConfig,
    pub port: u16,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let db_path = lookup("PROGMAN_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let programs_dir =
            lookup("PROGMAN_PROGRAMS_DIR").unwrap_or_else(|| DEFAULT_PROGRAMS_DIR.to_string());
        let interpreter =
            lookup("PROGMAN_INTERPRETER").unwrap_or_else(|| DEFAULT_INTERPRETER.to_string());
        let port = match lookup("PROGMAN_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| format!("invalid PROGMAN_PORT {raw:?}: {e}"))?,
            None => DEFAULT_PORT,
        };

        Ok(ServerConfig {
            manager: ManagerConfig::new(db_path, programs_dir).interpreter(interpreter),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.manager.db_path, PathBuf::from("progman.db"));
        assert_eq!(config.manager.script_dir(), PathBuf::from("programs/python3"));
        assert_eq!(config.manager.visual_dir(), PathBuf::from("programs/blockly"));
        assert_eq!(config.manager.runner.program, "python3");
    }

    #[test]
    fn env_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PROGMAN_DB_PATH", "/var/lib/progman/db.sqlite"),
            ("PROGMAN_PROGRAMS_DIR", "/srv/programs"),
            ("PROGMAN_PORT", "8080"),
            ("PROGMAN_INTERPRETER", "/usr/bin/python3.11"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.manager.programs_dir, PathBuf::from("/srv/programs"));
        assert_eq!(config.manager.runner.program, "/usr/bin/python3.11");
        assert_eq!(config.manager.runner.args, ["-u"]);
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(ServerConfig::from_lookup(lookup(&[("PROGMAN_PORT", "http")])).is_err());
    }
}
