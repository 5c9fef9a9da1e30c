//! Shared configuration for the lottery ticket service.
//!
//! [`ServerConfig`] is a `clap` argument group flattened into the `lottod`
//! parser. Every option can also be supplied through a `LOTTOD_*` environment
//! variable; command-line flags take precedence over the environment, which in
//! turn overrides the compiled defaults in [`defaults`].

pub mod defaults;
mod logging;
mod runtime;
mod socket;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

pub use defaults::{
    DEFAULT_BACKLOG, DEFAULT_HOST, DEFAULT_IO_TIMEOUT_SECS, DEFAULT_LOG_BACKUPS,
    DEFAULT_LOG_FILTER, DEFAULT_LOG_MAX_BYTES, DEFAULT_PORT,
};
pub use logging::{LogFormat, LogFormatParseError, LogSettings};
pub use runtime::{RuntimePaths, RuntimePathsError};
pub use socket::{EndpointParseError, ListenEndpoint};

/// Server configuration resolved from flags, environment, and defaults.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ServerConfig {
    /// Address the server binds to.
    #[arg(short = 'H', long, env = "LOTTOD_HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    /// TCP port the server listens on.
    #[arg(short, long, env = "LOTTOD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Pending-connection queue depth passed to `listen(2)`.
    #[arg(
        long,
        env = "LOTTOD_BACKLOG",
        default_value_t = DEFAULT_BACKLOG,
        value_parser = clap::value_parser!(i32).range(1..)
    )]
    pub backlog: i32,
    /// Directory for the lock, PID marker, health snapshot, and default log.
    #[arg(long, env = "LOTTOD_RUNTIME_DIR", value_name = "DIR")]
    pub runtime_dir: Option<PathBuf>,
    /// Log file path; defaults to `lottod.log` inside the runtime directory.
    #[arg(long, env = "LOTTOD_LOG_FILE", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
    /// Size in bytes at which the log file is rotated.
    #[arg(long, env = "LOTTOD_LOG_MAX_BYTES", default_value_t = DEFAULT_LOG_MAX_BYTES)]
    pub log_max_bytes: u64,
    /// Number of rotated log segments to keep.
    #[arg(long, env = "LOTTOD_LOG_BACKUPS", default_value_t = DEFAULT_LOG_BACKUPS)]
    pub log_backups: usize,
    /// `tracing` filter directive, for example `info` or `lottod=debug`.
    #[arg(long, env = "LOTTOD_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
    /// Log line format.
    #[arg(long, env = "LOTTOD_LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
    /// Read and write deadline for client connections, in seconds.
    #[arg(
        long,
        env = "LOTTOD_IO_TIMEOUT_SECS",
        default_value_t = DEFAULT_IO_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub io_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            runtime_dir: None,
            log_file: None,
            log_max_bytes: DEFAULT_LOG_MAX_BYTES,
            log_backups: DEFAULT_LOG_BACKUPS,
            log_filter: defaults::default_log_filter().to_owned(),
            log_format: defaults::default_log_format(),
            io_timeout_secs: DEFAULT_IO_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    /// Endpoint the acceptor binds to.
    #[must_use]
    pub fn endpoint(&self) -> ListenEndpoint {
        ListenEndpoint::new(self.host.clone(), self.port)
    }

    /// Deadline applied to each client read and write.
    #[must_use]
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    /// Log stream settings resolved against the runtime paths.
    #[must_use]
    pub fn log_settings(&self, paths: &RuntimePaths) -> LogSettings {
        LogSettings {
            file: paths.log_path().to_path_buf(),
            max_bytes: self.log_max_bytes,
            backups: self.log_backups,
            filter: self.log_filter.clone(),
            format: self.log_format,
        }
    }
}
