//! Hands accepted connections to dedicated worker threads.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::mpsc::SyncSender;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::{ConnectionHandler, LISTENER_TARGET};

/// Monotonic identifier assigned to each worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a worker thread ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerOutcome {
    Completed,
    Panicked,
}

/// Messages consumed by the reaper.
pub(crate) enum WorkerEvent {
    Spawned {
        id: WorkerId,
        handle: JoinHandle<()>,
    },
    Exited {
        id: WorkerId,
        outcome: WorkerOutcome,
    },
}

/// Counters shared between the dispatcher and the reaper.
#[derive(Debug, Default)]
pub struct WorkerStats {
    dispatched: AtomicU64,
    reaped: AtomicU64,
}

impl WorkerStats {
    /// Workers spawned so far.
    #[must_use]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Workers whose exit has been observed and joined.
    #[must_use]
    pub fn reaped(&self) -> u64 {
        self.reaped.load(Ordering::SeqCst)
    }

    /// Workers spawned but not yet reaped.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.dispatched().saturating_sub(self.reaped())
    }

    pub(crate) fn record_reaped(&self) {
        self.reaped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Duplicates of the streams owned by live workers.
///
/// The worker remains the only reader and writer. The duplicate lets a
/// draining server end a read that is still waiting on an idle client.
#[derive(Debug, Default)]
pub(crate) struct ConnectionRegistry {
    streams: Mutex<HashMap<WorkerId, TcpStream>>,
}

impl ConnectionRegistry {
    fn insert(&self, id: WorkerId, stream: TcpStream) {
        self.streams().insert(id, stream);
    }

    fn remove(&self, id: WorkerId) {
        self.streams().remove(&id);
    }

    /// Shuts down the read half of every registered connection. Pending reads
    /// see end-of-stream; responses already being written are unaffected.
    pub(crate) fn close_reads(&self) -> usize {
        let streams = self.streams();
        for (id, stream) in streams.iter() {
            match stream.shutdown(Shutdown::Read) {
                Err(error) if error.kind() != io::ErrorKind::NotConnected => {
                    warn!(
                        target: LISTENER_TARGET,
                        worker = %id,
                        error = %error,
                        "failed to close connection read half"
                    );
                }
                _ => {}
            }
        }
        streams.len()
    }

    fn streams(&self) -> MutexGuard<'_, HashMap<WorkerId, TcpStream>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Spawns one worker per accepted connection.
pub(crate) struct Dispatcher {
    next_id: u64,
    events: SyncSender<WorkerEvent>,
    handler: Arc<dyn ConnectionHandler>,
    stats: Arc<WorkerStats>,
    connections: Arc<ConnectionRegistry>,
}

impl Dispatcher {
    pub(crate) fn new(
        events: SyncSender<WorkerEvent>,
        handler: Arc<dyn ConnectionHandler>,
        stats: Arc<WorkerStats>,
        connections: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            next_id: 0,
            events,
            handler,
            stats,
            connections,
        }
    }

    pub(crate) fn in_flight(&self) -> u64 {
        self.stats.in_flight()
    }

    /// Moves `stream` into a new worker thread.
    ///
    /// On success the caller no longer holds the connection. When the thread
    /// cannot be spawned the stream is dropped, closing the connection.
    pub(crate) fn dispatch(&mut self, stream: TcpStream, peer: SocketAddr) -> io::Result<WorkerId> {
        self.next_id += 1;
        let id = WorkerId(self.next_id);
        let handler = Arc::clone(&self.handler);
        let events = self.events.clone();
        let connections = Arc::clone(&self.connections);
        match stream.try_clone() {
            Ok(duplicate) => self.connections.insert(id, duplicate),
            Err(error) => warn!(
                target: LISTENER_TARGET,
                worker = %id,
                error = %error,
                "connection cannot be interrupted while draining"
            ),
        }
        self.stats.dispatched.fetch_add(1, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name(format!("lottod-worker-{id}"))
            .spawn(move || {
                let _exit = ExitNotifier {
                    id,
                    events,
                    connections,
                };
                handler.handle(stream);
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(error) => {
                // The closure was dropped unrun: no exit event will follow.
                self.connections.remove(id);
                self.stats.dispatched.fetch_sub(1, Ordering::SeqCst);
                return Err(error);
            }
        };
        debug!(
            target: LISTENER_TARGET,
            worker = %id,
            peer = %peer,
            "worker dispatched"
        );
        if self.events.send(WorkerEvent::Spawned { id, handle }).is_err() {
            warn!(
                target: LISTENER_TARGET,
                worker = %id,
                "reaper unavailable; worker will be detached"
            );
        }
        Ok(id)
    }
}

/// Reports the worker's exit when dropped, including during unwinding.
struct ExitNotifier {
    id: WorkerId,
    events: SyncSender<WorkerEvent>,
    connections: Arc<ConnectionRegistry>,
}

impl Drop for ExitNotifier {
    fn drop(&mut self) {
        self.connections.remove(self.id);
        let outcome = if thread::panicking() {
            WorkerOutcome::Panicked
        } else {
            WorkerOutcome::Completed
        };
        let event = WorkerEvent::Exited {
            id: self.id,
            outcome,
        };
        if self.events.send(event).is_err() {
            warn!(
                target: LISTENER_TARGET,
                worker = %self.id,
                "reaper unavailable; exit not recorded"
            );
        }
    }
}
