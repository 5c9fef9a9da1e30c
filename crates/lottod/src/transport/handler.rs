//! Per-connection request handling.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use lotto_tickets::{ThreadRandomGenerator, TicketGenerator};
use tracing::{debug, warn};

use crate::codec::{self, MAX_REQUEST_BYTES};

use super::LISTENER_TARGET;

/// Handles accepted socket connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection and closes it. Implementations should avoid
    /// panicking; a panic is contained to the worker thread.
    fn handle(&self, stream: TcpStream);
}

/// Serves one ticket request per connection.
#[derive(Debug)]
pub struct TicketConnectionHandler<G = ThreadRandomGenerator> {
    generator: G,
    io_timeout: Duration,
}

impl<G> TicketConnectionHandler<G> {
    /// Builds a handler with the given generator and per-call I/O deadline.
    pub fn new(generator: G, io_timeout: Duration) -> Self {
        Self {
            generator,
            io_timeout,
        }
    }
}

impl<G: TicketGenerator + 'static> ConnectionHandler for TicketConnectionHandler<G> {
    fn handle(&self, mut stream: TcpStream) {
        if let Err(error) = self.serve(&mut stream) {
            warn!(
                target: LISTENER_TARGET,
                error = %error,
                "connection handler error"
            );
        }
    }
}

impl<G: TicketGenerator> TicketConnectionHandler<G> {
    fn serve(&self, stream: &mut TcpStream) -> io::Result<()> {
        stream.set_read_timeout(Some(self.io_timeout))?;
        stream.set_write_timeout(Some(self.io_timeout))?;

        let mut buffer = [0_u8; MAX_REQUEST_BYTES];
        let read = read_with_retry(stream, &mut buffer)?;
        let Some(request) = buffer.get(..read).filter(|bytes| !bytes.is_empty()) else {
            debug!(
                target: LISTENER_TARGET,
                "client closed before sending a request"
            );
            return Ok(());
        };

        let response = codec::respond(request, &self.generator);
        if response.is_error() {
            debug!(
                target: LISTENER_TARGET,
                response = %response.encode().trim_end(),
                "request rejected"
            );
        }
        stream.write_all(response.encode().as_bytes())?;
        stream.flush()?;
        match stream.shutdown(Shutdown::Write) {
            Err(error) if error.kind() != io::ErrorKind::NotConnected => Err(error),
            _ => Ok(()),
        }
    }
}

fn read_with_retry(stream: &mut TcpStream, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buffer) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use lotto_tickets::SeededGenerator;
    use rstest::rstest;

    use super::*;

    fn exchange(request: &[u8]) -> String {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept connection");
            TicketConnectionHandler::new(SeededGenerator::seeded(9), Duration::from_secs(2))
                .handle(stream);
        });

        let mut client = TcpStream::connect(addr).expect("connect client");
        client.write_all(request).expect("write request");
        let mut response = String::new();
        client
            .read_to_string(&mut response)
            .expect("read until server closes");
        server.join().expect("join server");
        response
    }

    #[test]
    fn responds_with_numbered_tickets() {
        let response = exchange(b"max,3\n");
        let prefixes: Vec<_> = response
            .lines()
            .map(|line| line.split_once(". ").map(|(index, _)| index.to_owned()))
            .collect();
        assert_eq!(
            prefixes,
            vec![Some("1".to_owned()), Some("2".to_owned()), Some("3".to_owned())]
        );
    }

    #[test]
    fn request_without_newline_is_accepted() {
        let response = exchange(b"daily,1");
        assert!(response.starts_with("1. "), "response: {response}");
    }

    #[rstest]
    #[case(b"bogus,1\n".as_slice(), "unknown ticket kind")]
    #[case(b"max,-1\n".as_slice(), "at least 1")]
    fn invalid_requests_receive_error_line(#[case] request: &[u8], #[case] fragment: &str) {
        let response = exchange(request);
        assert!(response.starts_with("Error: "), "response: {response}");
        assert!(response.contains(fragment), "response: {response}");
        assert_eq!(response.lines().count(), 1);
    }

    #[test]
    fn oversized_request_is_rejected() {
        let request = vec![b'x'; MAX_REQUEST_BYTES];
        let response = exchange(&request);
        assert!(response.starts_with("Error: "), "response: {response}");
        assert_eq!(response.lines().count(), 1);
    }

    #[test]
    fn client_closing_early_gets_no_payload() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept connection");
            TicketConnectionHandler::new(SeededGenerator::seeded(1), Duration::from_secs(2))
                .handle(stream);
        });
        let client = TcpStream::connect(addr).expect("connect client");
        client.shutdown(Shutdown::Write).expect("half-close client");
        let mut response = Vec::new();
        let mut reader = client;
        reader.read_to_end(&mut response).expect("read to end");
        assert!(response.is_empty());
        server.join().expect("join server");
    }
}
