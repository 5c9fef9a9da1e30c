//! Listener implementation for the ticket service socket.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::mpsc::sync_channel;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lotto_config::ListenEndpoint;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{error, info, warn};

use super::dispatch::{ConnectionRegistry, Dispatcher, WorkerStats};
use super::reaper::{self, ReaperReport};
use super::{ConnectionHandler, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const EVENT_QUEUE_DEPTH: usize = 64;
const DRAIN_POLL: Duration = Duration::from_millis(25);

/// Listener bound to the configured TCP endpoint.
#[derive(Debug)]
pub struct SocketListener {
    endpoint: ListenEndpoint,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl SocketListener {
    /// Binds `endpoint` with address reuse enabled and a `backlog`-deep
    /// pending-connection queue.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::AddressInUse`] when another socket already
    /// claims the endpoint, or another variant when the socket cannot be set up.
    pub fn bind(endpoint: &ListenEndpoint, backlog: i32) -> Result<Self, ListenerError> {
        let addr = endpoint.resolve().map_err(|source| ListenerError::Resolve {
            host: endpoint.host.clone(),
            port: endpoint.port,
            source,
        })?;
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|source| ListenerError::Bind { addr, source })?;
        // Lets a restarted server rebind while the old socket drains TIME_WAIT.
        socket
            .set_reuse_address(true)
            .map_err(|source| ListenerError::Bind { addr, source })?;
        socket.bind(&addr.into()).map_err(|source| {
            if source.kind() == io::ErrorKind::AddrInUse {
                ListenerError::AddressInUse { addr }
            } else {
                ListenerError::Bind { addr, source }
            }
        })?;
        socket
            .listen(backlog)
            .map_err(|source| ListenerError::Listen {
                addr,
                backlog,
                source,
            })?;
        socket
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let listener: TcpListener = socket.into();
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind { addr, source })?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
            local_addr,
        })
    }

    /// Address actually bound, including an OS-assigned port.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[cfg(test)]
    pub(crate) fn duplicate_socket(&self) -> io::Result<TcpListener> {
        self.listener.try_clone()
    }

    /// Starts the accept loop and the reaper on background threads.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Spawn`] when either thread cannot be created.
    pub fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.start_supervised(handler, || {})
    }

    /// Like [`start`](Self::start), but calls `on_failure` on the acceptor
    /// thread when the listening socket fails and the accept loop gives up.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Spawn`] when either thread cannot be created.
    pub fn start_supervised<F>(
        self,
        handler: Arc<dyn ConnectionHandler>,
        on_failure: F,
    ) -> Result<ListenerHandle, ListenerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(WorkerStats::default());
        let connections = Arc::new(ConnectionRegistry::default());
        let (events, completions) = sync_channel(EVENT_QUEUE_DEPTH);
        let reaper = reaper::spawn(completions, Arc::clone(&stats)).map_err(|source| {
            ListenerError::Spawn {
                name: "reaper",
                source,
            }
        })?;
        let dispatcher = Dispatcher::new(
            events,
            handler,
            Arc::clone(&stats),
            Arc::clone(&connections),
        );
        let local_addr = self.local_addr;
        let shutdown_flag = Arc::clone(&shutdown);
        let acceptor = thread::Builder::new()
            .name("lottod-acceptor".to_owned())
            .spawn(move || {
                let result = run_accept_loop(self, &shutdown_flag, dispatcher);
                if result.is_err() {
                    on_failure();
                }
                result
            })
            .map_err(|source| ListenerError::Spawn {
                name: "acceptor",
                source,
            })?;
        Ok(ListenerHandle {
            shutdown,
            acceptor: Some(acceptor),
            reaper: Some(reaper),
            stats,
            connections,
            local_addr,
        })
    }
}

/// Handle to the background accept loop and reaper.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<Result<(), ListenerError>>>,
    reaper: Option<JoinHandle<ReaperReport>>,
    stats: Arc<WorkerStats>,
    connections: Arc<ConnectionRegistry>,
    local_addr: SocketAddr,
}

impl ListenerHandle {
    /// Asks the accept loop to stop. In-flight workers are left to finish.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Live worker counters.
    #[must_use]
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the accept loop to exit and then for every in-flight worker
    /// to be reaped.
    ///
    /// # Errors
    ///
    /// Returns the fatal accept error that stopped the loop, or a panic
    /// indication for either background thread.
    pub fn join(mut self) -> Result<ReaperReport, ListenerError> {
        let accepted = self.join_acceptor();
        let report = self.join_reaper()?;
        accepted.map(|()| report)
    }

    /// Like [`join`](Self::join), but once `grace` has elapsed the read half of
    /// every connection still in flight is shut down, so workers waiting on
    /// idle clients finish instead of running out their I/O deadline.
    ///
    /// # Errors
    ///
    /// As for [`join`](Self::join).
    pub fn join_within(mut self, grace: Duration) -> Result<ReaperReport, ListenerError> {
        let accepted = self.join_acceptor();
        let deadline = Instant::now() + grace;
        if let Some(reaper) = &self.reaper {
            while !reaper.is_finished() && Instant::now() < deadline {
                thread::sleep(DRAIN_POLL);
            }
            if !reaper.is_finished() {
                let interrupted = self.connections.close_reads();
                info!(
                    target: LISTENER_TARGET,
                    interrupted,
                    "drain grace elapsed; closing idle connections"
                );
            }
        }
        let report = self.join_reaper()?;
        accepted.map(|()| report)
    }

    fn join_acceptor(&mut self) -> Result<(), ListenerError> {
        match self.acceptor.take() {
            Some(handle) => handle.join().unwrap_or(Err(ListenerError::ThreadPanic)),
            None => Ok(()),
        }
    }

    fn join_reaper(&mut self) -> Result<ReaperReport, ListenerError> {
        match self.reaper.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ReaperPanic),
            None => Ok(ReaperReport::default()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: SocketListener,
    shutdown: &AtomicBool,
    mut dispatcher: Dispatcher,
) -> Result<(), ListenerError> {
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        addr = %listener.local_addr,
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match listener.listener.accept() {
            Ok((stream, peer)) => {
                last_error = None;
                if let Err(error) = stream.set_nonblocking(false) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        peer = %peer,
                        "failed to configure accepted stream"
                    );
                    continue;
                }
                if let Err(error) = dispatcher.dispatch(stream, peer) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        peer = %peer,
                        "failed to spawn worker"
                    );
                }
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) if is_listener_failure(&error) => {
                error!(
                    target: LISTENER_TARGET,
                    error = %error,
                    "listening socket failed"
                );
                return Err(ListenerError::Accept { source: error });
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        in_flight = dispatcher.in_flight(),
        "socket listener closed"
    );
    Ok(())
}

/// Errors that mean the listening descriptor itself is unusable.
fn is_listener_failure(error: &io::Error) -> bool {
    #[cfg(unix)]
    {
        matches!(
            error.raw_os_error(),
            Some(libc::EBADF | libc::EINVAL | libc::ENOTSOCK)
        )
    }
    #[cfg(not(unix))]
    {
        let _ = error;
        false
    }
}
