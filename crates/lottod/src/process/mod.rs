//! Daemon lifecycle: singleton guard, daemonisation, start and stop.
//!
//! `start` claims a lock file, optionally detaches into the background,
//! records the PID marker, and serves until a termination signal arrives.
//! `stop` reads the marker, removes it, and asks the recorded process to
//! terminate. Mutual exclusion between the two rests on the lock file and a
//! liveness probe, so it is best-effort across a concurrent stop and start.

use std::time::Duration;

pub(crate) mod daemonizer;
mod errors;
mod files;
mod guard;
pub(crate) mod launch;
mod probe;
pub(crate) mod shutdown;
mod stop;

pub use errors::{LaunchError, StopError};
pub use launch::{LaunchMode, run_server};
pub use stop::stop_server;

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
/// Time `stop` waits for the server process to exit.
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
/// Time in-flight workers get to finish after a shutdown request before reads
/// still waiting on idle clients are cut. Must stay below [`SHUTDOWN_TIMEOUT`].
pub(crate) const DRAIN_GRACE: Duration = Duration::from_secs(5);
/// Age below which a lock without a PID marker belongs to a launch in progress.
pub(crate) const STARTUP_GRACE: Duration = Duration::from_secs(5);
pub(crate) const FOREGROUND_ENV_VAR: &str = "LOTTOD_FOREGROUND";
