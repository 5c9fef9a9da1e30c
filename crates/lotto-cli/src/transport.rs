//! One-shot TCP exchange with the ticket server.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use lotto_config::ListenEndpoint;

use crate::errors::AppError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends `line` and reads the response until the server closes the stream.
pub(crate) fn exchange(endpoint: &ListenEndpoint, line: &str) -> Result<String, AppError> {
    let endpoint_display = endpoint.to_string();
    let address = endpoint.resolve().map_err(|source| AppError::Resolve {
        endpoint: endpoint_display.clone(),
        source,
    })?;
    let mut stream = TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT).map_err(|source| {
        if source.kind() == io::ErrorKind::ConnectionRefused {
            AppError::ConnectionRefused {
                endpoint: endpoint_display,
            }
        } else {
            AppError::Connect {
                endpoint: endpoint_display,
                source,
            }
        }
    })?;
    stream
        .set_read_timeout(Some(RESPONSE_TIMEOUT))
        .map_err(AppError::ReadResponse)?;

    stream
        .write_all(format!("{line}\n").as_bytes())
        .and_then(|()| stream.flush())
        .map_err(AppError::SendRequest)?;
    // Signals end of request; the server answers after a single read anyway.
    match stream.shutdown(Shutdown::Write) {
        Err(error) if error.kind() != io::ErrorKind::NotConnected => {
            return Err(AppError::SendRequest(error));
        }
        _ => {}
    }

    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .map_err(AppError::ReadResponse)?;
    if response.is_empty() {
        return Err(AppError::EmptyResponse);
    }
    Ok(response)
}
