//! Detaches the server from its controlling terminal.

use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use daemonize_me::Daemon;
use lotto_config::RuntimePaths;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

const NULL_DEVICE: &str = "/dev/null";
/// Runtime artefacts created after detaching are private to the owner.
const DAEMON_UMASK: u16 = 0o077;

/// Abstraction over daemonisation strategies.
pub trait Daemonizer: Send + Sync {
    /// Detaches the process into the background. Returns in the final
    /// daemon process only, so the caller records that process's PID.
    fn daemonize(&self, paths: &RuntimePaths) -> Result<(), DaemonizeError>;
}

/// Errors surfaced by the daemonisation backend.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// The null device could not be opened for the standard streams.
    #[error("failed to open '{path}' for daemon output: {source}")]
    NullDevice {
        /// Device path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// System-level daemonisation failed.
    #[error("failed to detach server process: {0}")]
    System(#[from] daemonize_me::DaemonError),
}

/// How the detached server process is set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DaemonSettings {
    pub(crate) work_dir: PathBuf,
    pub(crate) umask: u16,
    pub(crate) output: PathBuf,
}

impl DaemonSettings {
    /// The server runs inside its runtime directory and writes nothing to the
    /// inherited terminal; everything it reports goes to the log file.
    pub(crate) fn for_runtime(paths: &RuntimePaths) -> Self {
        Self {
            work_dir: paths.runtime_dir().to_path_buf(),
            umask: DAEMON_UMASK,
            output: PathBuf::from(NULL_DEVICE),
        }
    }

    fn open_output(&self) -> Result<File, DaemonizeError> {
        open_write(&self.output)
    }
}

fn open_write(path: &Path) -> Result<File, DaemonizeError> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|source| DaemonizeError::NullDevice {
            path: path.to_path_buf(),
            source,
        })
}

/// Daemoniser backed by `daemonize-me`: double fork and a new session, then
/// the settings from [`DaemonSettings::for_runtime`].
#[derive(Debug, Default)]
pub struct SystemDaemonizer;

impl SystemDaemonizer {
    /// Builds a new system daemoniser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Daemonizer for SystemDaemonizer {
    fn daemonize(&self, paths: &RuntimePaths) -> Result<(), DaemonizeError> {
        let settings = DaemonSettings::for_runtime(paths);
        let stdout = settings.open_output()?;
        let stderr = settings.open_output()?;
        info!(
            target: PROCESS_TARGET,
            work_dir = %settings.work_dir.display(),
            umask = format_args!("{:04o}", settings.umask),
            "daemonising into background"
        );
        Daemon::new()
            .work_dir(&settings.work_dir)
            .umask(settings.umask)
            .stdout(stdout)
            .stderr(stderr)
            .name(OsStr::new(env!("CARGO_PKG_NAME")))
            .start()?;
        info!(
            target: PROCESS_TARGET,
            pid = std::process::id(),
            "server process detached"
        );
        Ok(())
    }
}
