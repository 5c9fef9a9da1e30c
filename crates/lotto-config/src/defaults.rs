use crate::logging::LogFormat;

/// Default host the server binds to (IPv6 loopback).
pub const DEFAULT_HOST: &str = "::1";

/// Default TCP port for the ticket service.
pub const DEFAULT_PORT: u16 = 8888;

/// Default depth of the pending-connection queue.
pub const DEFAULT_BACKLOG: i32 = 5;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Size in bytes at which the log file is rotated.
pub const DEFAULT_LOG_MAX_BYTES: u64 = 1_000_000;

/// Number of rotated log segments retained next to the live file.
pub const DEFAULT_LOG_BACKUPS: usize = 3;

/// Read and write deadline applied to every client connection, in seconds.
pub const DEFAULT_IO_TIMEOUT_SECS: u64 = 30;

/// Name of the directory created beneath the platform runtime directory.
pub const RUNTIME_NAMESPACE: &str = "lottod";

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
