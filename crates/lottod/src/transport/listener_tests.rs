//! Tests for the socket listener, dispatcher, and reaper working together.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use lotto_config::ListenEndpoint;
use lotto_tickets::SeededGenerator;
use rstest::{fixture, rstest};

use super::listener::SocketListener;
use super::{
    ConnectionHandler, CountingHandler, ListenerError, PanickingHandler, TicketConnectionHandler,
    wait_until,
};

#[fixture]
fn tcp_endpoint() -> ListenEndpoint {
    ListenEndpoint::new("127.0.0.1", 0)
}

#[rstest]
fn tcp_listener_accepts_connections(tcp_endpoint: ListenEndpoint) {
    let listener = SocketListener::bind(&tcp_endpoint, 5).expect("bind tcp listener");
    let addr = listener.local_addr();
    let (count, handler) = CountingHandler::new();
    let handler: Arc<dyn ConnectionHandler> = handler;
    let handle = listener.start(handler).expect("start listener");

    TcpStream::connect(addr).expect("connect first client");
    TcpStream::connect(addr).expect("connect second client");

    assert!(
        wait_until(|| count.load(Ordering::SeqCst) >= 2),
        "expected two connections"
    );
    handle.shutdown();
    let report = handle.join().expect("join listener");
    assert_eq!(report.reaped, 2);
    assert_eq!(report.panicked, 0);
}

#[rstest]
fn occupied_endpoint_reports_address_in_use() {
    let occupied = TcpListener::bind(("127.0.0.1", 0)).expect("reserve port");
    let port = occupied.local_addr().expect("reserved addr").port();
    let endpoint = ListenEndpoint::new("127.0.0.1", port);
    let error = SocketListener::bind(&endpoint, 5).expect_err("bind should fail");
    assert!(
        matches!(error, ListenerError::AddressInUse { .. }),
        "unexpected error: {error}"
    );
}

#[rstest]
fn panicking_worker_is_still_reaped(tcp_endpoint: ListenEndpoint) {
    let listener = SocketListener::bind(&tcp_endpoint, 5).expect("bind tcp listener");
    let addr = listener.local_addr();
    let handle = listener
        .start(Arc::new(PanickingHandler))
        .expect("start listener");
    let stats = handle.stats();

    TcpStream::connect(addr).expect("connect client");
    assert!(wait_until(|| stats.reaped() == 1), "worker was not reaped");

    handle.shutdown();
    let report = handle.join().expect("join listener");
    assert_eq!(report.panicked, 1);
    assert_eq!(stats.in_flight(), 0);
}

#[rstest]
fn concurrent_clients_get_independent_responses(tcp_endpoint: ListenEndpoint) {
    const CLIENTS: usize = 16;
    let listener = SocketListener::bind(&tcp_endpoint, 32).expect("bind tcp listener");
    let addr = listener.local_addr();
    let handler = TicketConnectionHandler::new(SeededGenerator::seeded(3), Duration::from_secs(2));
    let handle = listener.start(Arc::new(handler)).expect("start listener");

    let clients: Vec<_> = (0..CLIENTS)
        .map(|_| {
            thread::spawn(move || {
                let mut stream = TcpStream::connect(addr).expect("connect client");
                stream.write_all(b"max,2\n").expect("write request");
                let mut response = String::new();
                stream.read_to_string(&mut response).expect("read response");
                response
            })
        })
        .collect();
    for client in clients {
        let response = client.join().expect("client thread");
        assert_eq!(response.lines().count(), 2, "response: {response}");
    }

    handle.shutdown();
    let stats = handle.stats();
    let report = handle.join().expect("join listener");
    assert_eq!(report.reaped, u64::try_from(CLIENTS).expect("small count"));
    assert_eq!(stats.dispatched(), stats.reaped());
    assert_eq!(stats.in_flight(), 0);
}

#[rstest]
fn shutdown_waits_for_in_flight_workers(tcp_endpoint: ListenEndpoint) {
    let listener = SocketListener::bind(&tcp_endpoint, 5).expect("bind tcp listener");
    let addr = listener.local_addr();
    let handler = TicketConnectionHandler::new(SeededGenerator::seeded(5), Duration::from_secs(2));
    let handle = listener.start(Arc::new(handler)).expect("start listener");
    let stats = handle.stats();

    // The worker blocks in its read until the request arrives after shutdown.
    let mut client = TcpStream::connect(addr).expect("connect client");
    assert!(wait_until(|| stats.dispatched() == 1), "worker not dispatched");
    handle.shutdown();
    let joiner = thread::spawn(move || handle.join_within(Duration::from_secs(5)));

    client.write_all(b"daily,1\n").expect("write request");
    let mut response = String::new();
    client.read_to_string(&mut response).expect("read response");
    assert!(response.starts_with("1. "), "response: {response}");

    let report = joiner
        .join()
        .expect("joiner thread")
        .expect("listener joins cleanly");
    assert_eq!(report.reaped, 1);
}

#[rstest]
fn drain_grace_releases_idle_clients(tcp_endpoint: ListenEndpoint) {
    let listener = SocketListener::bind(&tcp_endpoint, 5).expect("bind tcp listener");
    let addr = listener.local_addr();
    let handler = TicketConnectionHandler::new(SeededGenerator::seeded(7), Duration::from_secs(60));
    let handle = listener.start(Arc::new(handler)).expect("start listener");
    let stats = handle.stats();

    let mut idle = TcpStream::connect(addr).expect("connect idle client");
    assert!(wait_until(|| stats.dispatched() == 1), "worker not dispatched");
    handle.shutdown();
    let started = Instant::now();
    let report = handle
        .join_within(Duration::from_millis(100))
        .expect("listener drains cleanly");

    assert!(
        started.elapsed() < Duration::from_secs(10),
        "drain waited on the idle client"
    );
    assert_eq!(report.reaped, 1);
    assert_eq!(stats.in_flight(), 0);
    let mut response = Vec::new();
    idle.read_to_end(&mut response).expect("read to end");
    assert!(response.is_empty(), "idle client should get no payload");
}

#[cfg(target_os = "linux")]
#[rstest]
fn failed_listening_socket_stops_the_loop_and_notifies(tcp_endpoint: ListenEndpoint) {
    use std::net::Shutdown;
    use std::sync::mpsc;

    use socket2::SockRef;

    let listener = SocketListener::bind(&tcp_endpoint, 5).expect("bind tcp listener");
    let duplicate = listener
        .duplicate_socket()
        .expect("duplicate listening socket");
    let (_count, handler) = CountingHandler::new();
    let handler: Arc<dyn ConnectionHandler> = handler;
    let (failed_tx, failed_rx) = mpsc::channel();
    let handle = listener
        .start_supervised(handler, move || {
            failed_tx.send(()).expect("report listener failure");
        })
        .expect("start listener");

    // A listening socket that is shut down stops accepting with EINVAL.
    SockRef::from(&duplicate)
        .shutdown(Shutdown::Both)
        .expect("shut down listening socket");

    failed_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("failure callback should run");
    let error = handle.join().expect_err("listener failure should surface");
    assert!(
        matches!(error, ListenerError::Accept { .. }),
        "unexpected error: {error}"
    );
}
