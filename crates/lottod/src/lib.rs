//! Lottery ticket server.
//!
//! `lottod` listens on a TCP endpoint and answers one `"<kind>,<quantity>"`
//! request per connection with a block of generated tickets. The crate is
//! organised around the path a connection takes through the server:
//!
//! - [`transport`] owns the listening socket. A non-blocking accept loop hands
//!   every connection to a dedicated worker thread, and a reaper thread
//!   observes each worker's exit exactly once.
//! - [`codec`] parses the request line and renders the response payload.
//! - The process layer turns the server into a daemon guarded by a lock file
//!   and PID marker, and implements the `start` and `stop` commands.
//!
//! Structured telemetry is written through `tracing` to a size-rotated log
//! file; foreground runs mirror it to stderr.

mod cli;
pub mod codec;
mod health;
mod process;
mod telemetry;
pub mod transport;

pub use cli::{AppError, Cli, Command, StartArgs, StopArgs, run};
pub use health::{LifecycleReporter, StructuredLifecycleReporter};
pub use process::{LaunchError, LaunchMode, StopError, run_server, stop_server};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
