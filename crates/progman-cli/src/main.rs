//! Robot program repository CLI.
//!
//! Provides the `progman` binary for operating on a program repository
//! directly, without the HTTP server. Uses the same `ProgramManager` as the
//! server, so startup reconciliation and write ordering are identical from
//! both entry points.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use progman_core::{NewProgram, ProgramId};
use progman_server::config::{ManagerConfig, DEFAULT_DB_PATH, DEFAULT_INTERPRETER, DEFAULT_PROGRAMS_DIR};
use progman_server::error::ManagerError;
use progman_server::service::ProgramManager;

/// Robot program repository tools.
#[derive(Parser)]
#[command(name = "progman", about = "Robot program repository tools")]
struct Cli {
    /// Path to the metadata database file.
    #[arg(long, env = "PROGMAN_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db: PathBuf,

    /// Root directory of the program body files.
    #[arg(long, env = "PROGMAN_PROGRAMS_DIR", default_value = DEFAULT_PROGRAMS_DIR)]
    programs_dir: PathBuf,

    /// Python interpreter used to run programs.
    #[arg(long, env = "PROGMAN_INTERPRETER", default_value = DEFAULT_INTERPRETER)]
    interpreter: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List every program.
    List,

    /// Print one program, bodies included, as JSON.
    Show {
        /// Program ID.
        id: String,
    },

    /// Store a new program and print its ID.
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// File holding the script body.
        #[arg(short, long)]
        script: PathBuf,

        /// File holding the visual body.
        #[arg(short, long)]
        visual: Option<PathBuf>,
    },

    /// Delete a program and its bodies.
    Delete {
        /// Program ID.
        id: String,
    },

    /// Run a stored program and wait for it to finish.
    Run {
        /// Program ID.
        id: String,
    },

    /// Run a script file without storing it.
    RunFile {
        /// Script file.
        path: PathBuf,
    },

    /// Repair drift between metadata and body files, and report what changed.
    Reconcile,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ManagerConfig::new(&cli.db, &cli.programs_dir).interpreter(&cli.interpreter);

    let mut manager = match ProgramManager::open(&config) {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("Error: failed to open repository '{}': {}", cli.programs_dir.display(), e);
            process::exit(3);
        }
    };

    let exit_code = match run_command(&mut manager, cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            match e {
                ManagerError::NotFound(_) | ManagerError::InvalidInput(_) => 1,
                ManagerError::AlreadyRunning | ManagerError::AutorunNotConfigured => 2,
                ManagerError::Storage(_) | ManagerError::LaunchFailure(_) => 3,
            }
        }
    };
    process::exit(exit_code);
}

/// Executes one subcommand. Returns the process exit code.
async fn run_command(manager: &mut ProgramManager, command: Commands) -> Result<i32, ManagerError> {
    match command {
        Commands::List => {
            for program in manager.list() {
                println!(
                    "{}\t{}\t{}{}",
                    program.id,
                    program.saved_at.format("%Y-%m-%d %H:%M:%S"),
                    program.name,
                    if program.has_visual { "\t[visual]" } else { "" },
                );
            }
            Ok(0)
        }
        Commands::Show { id } => {
            let program = manager.get(&ProgramId::parse(&id)?)?;
            let json = serde_json::to_string_pretty(&program)
                .map_err(|e| ManagerError::InvalidInput(e.to_string()))?;
            println!("{json}");
            Ok(0)
        }
        Commands::Create {
            name,
            description,
            script,
            visual,
        } => {
            let mut program = NewProgram::new(name, description, read_file(&script)?);
            if let Some(path) = visual {
                program = program.with_visual(read_file(&path)?);
            }
            println!("{}", manager.create(program)?);
            Ok(0)
        }
        Commands::Delete { id } => {
            manager.delete(&ProgramId::parse(&id)?)?;
            Ok(0)
        }
        Commands::Run { id } => {
            manager.execute_from_id(&ProgramId::parse(&id)?).await?;
            Ok(wait_and_report(manager).await)
        }
        Commands::RunFile { path } => {
            let body = read_file(&path)?;
            manager.execute_from_code(&body).await?;
            Ok(wait_and_report(manager).await)
        }
        Commands::Reconcile => {
            let repairs = manager.reconcile()?;
            if repairs.is_empty() {
                println!("nothing to repair");
            }
            for repair in repairs {
                println!("{repair}");
            }
            Ok(0)
        }
    }
}

/// Waits for the session to end, stopping it on Ctrl-C, then prints its
/// output and returns its exit status.
async fn wait_and_report(manager: &mut ProgramManager) -> i32 {
    let runner = manager.runner();
    tokio::select! {
        _ = runner.wait_until_finished() => {}
        _ = tokio::signal::ctrl_c() => {
            manager.stop_execution();
            runner.wait_until_finished().await;
        }
    }

    let status = manager.execution_status();
    print!("{}", status.output);
    eprintln!("[{}]", status.state);
    match status.exit_status {
        Some(code) if code >= 0 => code,
        _ => 1,
    }
}

fn read_file(path: &Path) -> Result<String, ManagerError> {
    fs::read_to_string(path)
        .map_err(|e| ManagerError::InvalidInput(format!("cannot read {}: {}", path.display(), e)))
}
