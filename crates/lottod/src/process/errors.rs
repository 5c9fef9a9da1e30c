//! Defines the error surface for starting and stopping the server.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, SystemTimeError};

use nix::errno::Errno;
use thiserror::Error;

use lotto_config::RuntimePathsError;

use crate::transport::ListenerError;

use super::daemonizer::DaemonizeError;
use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the server process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Runtime paths could not be prepared.
    #[error(transparent)]
    RuntimePaths(#[from] RuntimePathsError),
    /// Something already accepts connections on the configured endpoint.
    #[error("address {addr} is already in use")]
    AddressInUse {
        /// Endpoint address that answered the probe.
        addr: SocketAddr,
    },
    /// Lock file creation failed.
    #[error("failed to create lock file '{path}': {source}")]
    LockCreate {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A running server already holds the lock.
    #[error("server already running with pid {pid}")]
    AlreadyRunning {
        /// PID recorded in the existing PID marker.
        pid: u32,
    },
    /// Another launch is still initialising the runtime artefacts.
    #[error("server launch already in progress (lock: '{lock}', pid: '{pid}')")]
    StartupInProgress {
        /// Lock file guarding the active launch.
        lock: PathBuf,
        /// PID marker expected from the active launch.
        pid: PathBuf,
    },
    /// Removing a stale runtime artefact failed.
    #[error("failed to remove stale file '{path}': {source}")]
    Cleanup {
        /// Path of the artefact that could not be removed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the PID marker failed.
    #[error("failed to write pid file '{path}': {source}")]
    PidWrite {
        /// PID marker path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the health snapshot failed.
    #[error("failed to write health snapshot '{path}': {source}")]
    HealthWrite {
        /// Health file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialising the health snapshot failed.
    #[error("failed to serialise health snapshot: {source}")]
    HealthSerialise {
        /// Underlying serialisation error.
        #[from]
        source: serde_json::Error,
    },
    /// Obtaining the current timestamp failed.
    #[error("failed to read system time: {source}")]
    Clock {
        /// Underlying system time error.
        #[source]
        source: SystemTimeError,
    },
    /// Probing an existing PID failed.
    #[error("failed to check existing process {pid}: {source}")]
    CheckProcess {
        /// PID that failed to probe.
        pid: u32,
        /// Underlying OS error.
        source: Errno,
    },
    /// Health updates were attempted before writing the PID marker.
    #[error("pid must be written before updating health state")]
    MissingPid,
    /// Daemonisation failed.
    #[error("failed to daemonise: {source}")]
    Daemonize {
        /// Underlying daemonisation error.
        #[from]
        source: DaemonizeError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[from]
        source: ShutdownError,
    },
    /// The socket listener failed.
    #[error("socket listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[from]
        source: ListenerError,
    },
}

/// Errors surfaced by the stop command.
#[derive(Debug, Error)]
pub enum StopError {
    /// Runtime paths could not be prepared.
    #[error(transparent)]
    RuntimePaths(#[from] RuntimePathsError),
    /// No live server is recorded in the PID marker.
    #[error("server is not running (no live process in '{pid_path}')")]
    NotRunning {
        /// PID marker consulted.
        pid_path: PathBuf,
    },
    /// Removing the PID marker or a stale lock failed.
    #[error("failed to remove '{path}': {source}")]
    Cleanup {
        /// Artefact that could not be removed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Probing the recorded PID failed.
    #[error("failed to check process {pid}: {source}")]
    CheckProcess {
        /// PID that failed to probe.
        pid: u32,
        /// Underlying OS error.
        source: Errno,
    },
    /// Delivering the termination request failed.
    #[error("failed to signal process {pid}: {source}")]
    SignalFailed {
        /// PID that was signalled.
        pid: u32,
        /// Underlying OS error.
        source: Errno,
    },
    /// The process did not exit within the timeout.
    #[error("server process {pid} did not exit within {timeout:?}")]
    ShutdownTimeout {
        /// PID that was signalled.
        pid: u32,
        /// Time waited.
        timeout: Duration,
    },
}
