//! Child process isolation and termination.
//!
//! On unix each script runs in its own process group, so stopping it also
//! reaches anything the script spawned. Termination sends SIGTERM to the
//! group, waits a grace period, then sends SIGKILL.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::debug;

/// Puts the future child in a process group of its own.
pub fn isolate(cmd: &mut Command) {
    #[cfg(unix)]
    cmd.process_group(0);
    #[cfg(not(unix))]
    let _ = cmd;
}

/// Stops `child` and reaps it.
#[cfg(unix)]
pub async fn terminate(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    let Some(pid) = child.id() else {
        // Already reaped.
        return child.wait().await;
    };
    signal_group(pid, libc::SIGTERM);
    if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
        return status;
    }
    debug!(pid, "grace period elapsed, killing process group");
    signal_group(pid, libc::SIGKILL);
    child.wait().await
}

/// Stops `child` and reaps it.
#[cfg(not(unix))]
pub async fn terminate(child: &mut Child, _grace: Duration) -> io::Result<ExitStatus> {
    child.start_kill()?;
    child.wait().await
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions; a stale group id
    // only yields ESRCH.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc != 0 {
        debug!(pid, signal, err = %io::Error::last_os_error(), "signal not delivered");
    }
}
