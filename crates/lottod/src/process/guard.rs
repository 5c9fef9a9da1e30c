use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{info, warn};

use lotto_config::RuntimePaths;

use super::errors::LaunchError;
use super::files::{atomic_write, read_pid, remove_if_present};
use super::probe::process_alive;
use super::{PROCESS_TARGET, STARTUP_GRACE};

/// Singleton guard over the runtime directory.
///
/// Holds the lock file for the lifetime of the server. Dropping the guard
/// removes the lock while it is still the one this guard created, and removes
/// the PID marker and health snapshot only while the marker names this
/// process.
#[derive(Debug)]
pub(super) struct ProcessGuard {
    paths: RuntimePaths,
    lock: LockIdentity,
    pid: Option<u32>,
}

impl ProcessGuard {
    pub(super) fn acquire(paths: RuntimePaths) -> Result<Self, LaunchError> {
        let lock = acquire_lock(&paths)?;
        let guard = Self {
            lock: LockIdentity::of(&lock),
            paths,
            pid: None,
        };
        guard.refuse_live_marker()?;
        Ok(guard)
    }

    pub(super) fn write_pid(&mut self, pid: u32) -> Result<(), LaunchError> {
        let path = self.paths.pid_path();
        atomic_write(path, format!("{pid}\n").as_bytes()).map_err(|source| {
            LaunchError::PidWrite {
                path: path.to_path_buf(),
                source,
            }
        })?;
        self.pid = Some(pid);
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %path.display(),
            "pid file written"
        );
        Ok(())
    }

    pub(super) fn write_health(&self, status: HealthState) -> Result<(), LaunchError> {
        let pid = self.pid.ok_or(LaunchError::MissingPid)?;
        let path = self.paths.health_path();
        let snapshot = HealthSnapshot::new(status, pid)?;
        let mut payload = serde_json::to_vec(&snapshot)?;
        payload.push(b'\n');
        atomic_write(path, &payload).map_err(|source| LaunchError::HealthWrite {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            target: PROCESS_TARGET,
            status = snapshot.status,
            file = %path.display(),
            "health snapshot updated"
        );
        Ok(())
    }

    pub(super) fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    /// A PID marker without a lock still counts when its process is alive.
    fn refuse_live_marker(&self) -> Result<(), LaunchError> {
        let Some(pid) = read_pid(self.paths.pid_path()) else {
            return Ok(());
        };
        let alive = process_alive(pid).map_err(|source| LaunchError::CheckProcess { pid, source })?;
        if alive && pid != std::process::id() {
            info!(
                target: PROCESS_TARGET,
                pid,
                "refusing to start: pid marker names a live process"
            );
            return Err(LaunchError::AlreadyRunning { pid });
        }
        Ok(())
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if self.lock.matches(self.paths.lock_path()) {
            remove_logged(self.paths.lock_path(), "lock");
        }
        if self.pid.is_none() {
            return;
        }
        // A successor that already published its marker owns both files.
        if read_pid(self.paths.pid_path()) == self.pid {
            remove_logged(self.paths.pid_path(), "pid");
            remove_logged(self.paths.health_path(), "health");
        }
    }
}

fn remove_logged(path: &Path, kind: &str) {
    if let Err(error) = remove_if_present(path) {
        warn!(
            target: PROCESS_TARGET,
            file = %path.display(),
            kind,
            error = %error,
            "failed to remove runtime file"
        );
    }
}

/// Identifies the lock file this guard created, so a guard never removes a
/// lock claimed by a later instance after its own was cleaned up as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LockIdentity(Option<(u64, u64)>);

impl LockIdentity {
    fn of(file: &File) -> Self {
        Self(file.metadata().ok().as_ref().and_then(identity))
    }

    fn matches(self, path: &Path) -> bool {
        match self.0 {
            Some(expected) => fs::metadata(path)
                .ok()
                .as_ref()
                .and_then(identity)
                .is_some_and(|found| found == expected),
            None => true,
        }
    }
}

#[cfg(unix)]
fn identity(metadata: &fs::Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn identity(_metadata: &fs::Metadata) -> Option<(u64, u64)> {
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum HealthState {
    Starting,
    Running,
    Stopping,
}

impl HealthState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthSnapshot<'a> {
    status: &'a str,
    pid: u32,
    timestamp: u64,
}

impl HealthSnapshot<'_> {
    fn new(state: HealthState, pid: u32) -> Result<Self, LaunchError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|source| LaunchError::Clock { source })?
            .as_secs();
        Ok(Self {
            status: state.as_str(),
            pid,
            timestamp,
        })
    }
}

fn acquire_lock(paths: &RuntimePaths) -> Result<File, LaunchError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    match options.open(paths.lock_path()) {
        Ok(file) => {
            info!(
                target: PROCESS_TARGET,
                file = %paths.lock_path().display(),
                "acquired server lock"
            );
            Ok(file)
        }
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => handle_existing_lock(paths),
        Err(source) => Err(LaunchError::LockCreate {
            path: paths.lock_path().to_path_buf(),
            source,
        }),
    }
}

fn handle_existing_lock(paths: &RuntimePaths) -> Result<File, LaunchError> {
    match read_pid(paths.pid_path()) {
        Some(pid) => {
            let alive =
                process_alive(pid).map_err(|source| LaunchError::CheckProcess { pid, source })?;
            if alive {
                info!(
                    target: PROCESS_TARGET,
                    pid,
                    "refusing to start: existing server alive"
                );
                return Err(LaunchError::AlreadyRunning { pid });
            }
            warn!(
                target: PROCESS_TARGET,
                pid,
                "existing server not detected; cleaning stale files"
            );
        }
        None if lock_is_fresh(paths.lock_path()) => {
            return Err(LaunchError::StartupInProgress {
                lock: paths.lock_path().to_path_buf(),
                pid: paths.pid_path().to_path_buf(),
            });
        }
        None => {
            warn!(
                target: PROCESS_TARGET,
                file = %paths.lock_path().display(),
                "lock file has no pid marker; treating as stale"
            );
        }
    }
    remove_stale(paths.lock_path())?;
    remove_stale(paths.pid_path())?;
    acquire_lock(paths)
}

fn lock_is_fresh(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age < STARTUP_GRACE)
}

fn remove_stale(path: &Path) -> Result<(), LaunchError> {
    remove_if_present(path).map_err(|source| LaunchError::Cleanup {
        path: path.to_path_buf(),
        source,
    })
}
