//! Derives runtime artefact paths shared by the start and stop commands.
//!
//! The runtime directory houses the daemon lock, PID marker, health snapshot,
//! and (by default) the rotating log file. Both lifecycle commands need to
//! agree on the directory layout so `stop` can find the marker written by
//! `start`.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ServerConfig;
use crate::defaults::RUNTIME_NAMESPACE;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

/// Canonical paths for runtime artefacts written by the daemon.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    runtime_dir: PathBuf,
    lock_path: PathBuf,
    pid_path: PathBuf,
    health_path: PathBuf,
    log_path: PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the shared configuration, creating the
    /// runtime directory when needed.
    ///
    /// Every returned path is absolute so it survives the working directory
    /// change performed during daemonisation.
    pub fn from_config(config: &ServerConfig) -> Result<Self, RuntimePathsError> {
        let requested = config
            .runtime_dir
            .clone()
            .unwrap_or_else(default_runtime_directory);
        fs::create_dir_all(&requested).map_err(|source| RuntimePathsError::RuntimeDirectory {
            path: requested.clone(),
            source,
        })?;
        let runtime_dir =
            fs::canonicalize(&requested).map_err(|source| RuntimePathsError::RuntimeDirectory {
                path: requested.clone(),
                source,
            })?;
        let log_path = match &config.log_file {
            Some(path) => absolute(path)?,
            None => runtime_dir.join("lottod.log"),
        };
        Ok(Self {
            lock_path: runtime_dir.join("lottod.lock"),
            pid_path: runtime_dir.join("lottod.pid"),
            health_path: runtime_dir.join("lottod.health"),
            log_path,
            runtime_dir,
        })
    }

    /// Directory holding runtime artefacts.
    pub fn runtime_dir(&self) -> &Path {
        self.runtime_dir.as_path()
    }

    /// Path to the lock file guarding singleton startup.
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// Path to the PID marker.
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }

    /// Path to the health snapshot.
    pub fn health_path(&self) -> &Path {
        self.health_path.as_path()
    }

    /// Path to the live log file.
    pub fn log_path(&self) -> &Path {
        self.log_path.as_path()
    }
}

fn absolute(path: &Path) -> Result<PathBuf, RuntimePathsError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().map_err(|source| RuntimePathsError::WorkingDirectory { source })?;
    Ok(cwd.join(path))
}

fn default_runtime_directory() -> PathBuf {
    #[cfg(unix)]
    {
        if let Some(mut dir) = runtime_dir() {
            dir.push(RUNTIME_NAMESPACE);
            return dir;
        }
        let mut dir = env::temp_dir();
        dir.push(RUNTIME_NAMESPACE);
        // SAFETY: `geteuid` has no preconditions and cannot fail.
        dir.push(format!("uid-{}", unsafe { geteuid() }));
        dir
    }

    #[cfg(not(unix))]
    {
        let mut dir = env::temp_dir();
        dir.push(RUNTIME_NAMESPACE);
        dir
    }
}

/// Errors raised while deriving daemon runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// Creating or resolving the runtime directory failed.
    #[error("failed to prepare runtime directory '{path}': {source}")]
    RuntimeDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The current directory was needed to absolutise a relative path.
    #[error("failed to read the current directory: {source}")]
    WorkingDirectory {
        #[source]
        source: io::Error,
    },
}
