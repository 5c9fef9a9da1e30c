//! Implements the `stop` command against the PID marker.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use lotto_config::RuntimePaths;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{info, warn};

use super::errors::StopError;
use super::files::{read_pid, remove_if_present};
use super::probe::process_alive;
use super::{PROCESS_TARGET, SHUTDOWN_TIMEOUT};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Stops the server recorded in the runtime directory.
///
/// The PID marker is removed before the termination request is sent, so a
/// concurrent `start` never mistakes it for a live instance. Returns the PID
/// of the stopped process.
///
/// # Errors
///
/// Returns [`StopError::NotRunning`] when no live process is recorded (a
/// stale marker is cleaned up first), [`StopError::ShutdownTimeout`] when the
/// process outlives [`SHUTDOWN_TIMEOUT`], and other variants for filesystem or
/// signalling failures.
pub fn stop_server(paths: &RuntimePaths) -> Result<u32, StopError> {
    let not_running = || StopError::NotRunning {
        pid_path: paths.pid_path().to_path_buf(),
    };
    let pid = read_pid(paths.pid_path()).ok_or_else(not_running)?;
    if !process_alive(pid).map_err(|source| StopError::CheckProcess { pid, source })? {
        warn!(
            target: PROCESS_TARGET,
            pid,
            "pid marker names a dead process; removing stale files"
        );
        remove(paths.pid_path())?;
        remove(paths.lock_path())?;
        return Err(not_running());
    }

    remove(paths.pid_path())?;
    signal_terminate(pid)?;
    info!(
        target: PROCESS_TARGET,
        pid,
        "termination requested"
    );
    wait_for_exit(pid, SHUTDOWN_TIMEOUT)?;
    info!(
        target: PROCESS_TARGET,
        pid,
        "server stopped"
    );
    Ok(pid)
}

fn remove(path: &Path) -> Result<(), StopError> {
    remove_if_present(path).map_err(|source| StopError::Cleanup {
        path: path.to_path_buf(),
        source,
    })
}

fn signal_terminate(pid: u32) -> Result<(), StopError> {
    let raw = i32::try_from(pid).map_err(|_| StopError::SignalFailed {
        pid,
        source: Errno::EINVAL,
    })?;
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        // Exited between the probe and the signal.
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(source) => Err(StopError::SignalFailed { pid, source }),
    }
}

fn wait_for_exit(pid: u32, timeout: Duration) -> Result<(), StopError> {
    let deadline = Instant::now() + timeout;
    loop {
        if !process_alive(pid).map_err(|source| StopError::CheckProcess { pid, source })? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(StopError::ShutdownTimeout { pid, timeout });
        }
        thread::sleep(POLL_INTERVAL);
    }
}
