//! Connection acceptance, per-connection workers, and worker reaping.
//!
//! [`SocketListener`] binds the endpoint and runs a non-blocking accept loop
//! on a background thread. Each accepted stream moves into a freshly spawned
//! worker thread that owns it exclusively. Workers report their exit through
//! a bounded completion channel drained by a reaper thread, which joins every
//! worker exactly once.

mod dispatch;
mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;
mod reaper;
#[cfg(test)]
mod test_utils;

pub use self::dispatch::{WorkerId, WorkerStats};
pub use self::errors::ListenerError;
pub use self::handler::{ConnectionHandler, TicketConnectionHandler};
pub use self::listener::{ListenerHandle, SocketListener};
pub use self::reaper::ReaperReport;
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, PanickingHandler, wait_until};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
