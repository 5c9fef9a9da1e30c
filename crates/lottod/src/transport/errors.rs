//! Error types for socket listener operations.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced while binding or running the socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The endpoint host could not be resolved.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// Another socket already claims the endpoint.
    #[error("address {addr} is already in use")]
    AddressInUse {
        /// Address that could not be bound.
        addr: SocketAddr,
    },
    /// Creating, configuring, or binding the socket failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    Bind {
        /// Address being bound.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Establishing the pending-connection queue failed.
    #[error("failed to listen on {addr} with backlog {backlog}: {source}")]
    Listen {
        /// Bound address.
        addr: SocketAddr,
        /// Requested queue depth.
        backlog: i32,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Switching the listener to non-blocking mode failed.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The listening socket itself failed; the accept loop stopped.
    #[error("listening socket failed: {source}")]
    Accept {
        /// Error reported by `accept(2)`.
        #[source]
        source: io::Error,
    },
    /// A background thread could not be spawned.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        /// Thread role.
        name: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The accept loop thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
    /// The reaper thread panicked.
    #[error("reaper thread panicked")]
    ReaperPanic,
}
