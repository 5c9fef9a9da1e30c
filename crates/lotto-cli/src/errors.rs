//! Error types for the client runtime.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to resolve server address {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("connection refused by {endpoint}; make sure the server is running")]
    ConnectionRefused { endpoint: String },
    #[error("failed to connect to server at {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[error("failed to send request to server: {0}")]
    SendRequest(io::Error),
    #[error("failed to read response from server: {0}")]
    ReadResponse(io::Error),
    #[error("server returned an empty response")]
    EmptyResponse,
    #[error("server rejected the request: {0}")]
    Rejected(String),
    #[error("failed to record tickets in '{path}': {source}")]
    Record { path: PathBuf, source: io::Error },
    #[error("failed to write output: {0}")]
    Output(io::Error),
    #[error("request thread panicked")]
    RequestPanicked,
}
