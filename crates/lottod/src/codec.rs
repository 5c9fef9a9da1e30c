//! Request parsing and response rendering for the ticket protocol.
//!
//! A client sends a single line `"<kind>,<quantity>"` and receives either one
//! `"<index>. <numbers>"` line per ticket or a single `"Error: <message>"`
//! line. Framing is one bounded read: the bytes up to the first newline (or
//! the whole read when no newline arrived) form the request.

use std::fmt;
use std::str::{self, FromStr};

use lotto_tickets::{MAX_TICKETS_PER_REQUEST, Ticket, TicketError, TicketGenerator, TicketKind};
use thiserror::Error;

/// Largest request accepted in a single read, in bytes.
pub const MAX_REQUEST_BYTES: usize = 1024;

/// A validated ticket request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketRequest {
    /// Lottery to draw tickets for.
    pub kind: TicketKind,
    /// Number of tickets, between one and [`MAX_TICKETS_PER_REQUEST`].
    pub quantity: u32,
}

/// Reasons a request is rejected before or during generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Nothing but whitespace was received.
    #[error("empty request; expected <kind>,<quantity>")]
    Empty,
    /// The line carried no comma.
    #[error("malformed request '{0}'; expected <kind>,<quantity>")]
    MissingDelimiter(String),
    /// The kind is not a known lottery.
    #[error("unknown ticket kind '{0}' (expected max, 6/49, or daily)")]
    UnknownKind(String),
    /// The quantity is not an integer.
    #[error("invalid quantity '{0}'; expected a whole number")]
    InvalidQuantity(String),
    /// The quantity is zero or negative.
    #[error("quantity must be at least 1, got {0}")]
    NonPositiveQuantity(i64),
    /// The quantity exceeds the per-request ceiling.
    #[error("too many tickets requested ({requested}); the limit is {limit}")]
    TooManyTickets {
        /// Requested quantity.
        requested: i64,
        /// Maximum accepted quantity.
        limit: u32,
    },
    /// The request filled the read buffer without a line terminator.
    #[error("request exceeds {limit} bytes")]
    Oversized {
        /// Size of the read buffer.
        limit: usize,
    },
    /// The request was not valid UTF-8.
    #[error("request is not valid UTF-8 text")]
    InvalidUtf8,
    /// The ticket generator rejected the request.
    #[error(transparent)]
    Generation(#[from] TicketError),
}

impl FromStr for TicketRequest {
    type Err = RequestError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let line = input.trim();
        if line.is_empty() {
            return Err(RequestError::Empty);
        }
        let (kind, quantity) = line
            .split_once(',')
            .ok_or_else(|| RequestError::MissingDelimiter(line.to_owned()))?;
        let kind = kind.parse::<TicketKind>().map_err(|error| match error {
            TicketError::UnknownKind(kind) => RequestError::UnknownKind(kind),
            other => RequestError::Generation(other),
        })?;
        let quantity = parse_quantity(quantity.trim())?;
        Ok(Self { kind, quantity })
    }
}

fn parse_quantity(text: &str) -> Result<u32, RequestError> {
    let requested = text
        .parse::<i64>()
        .map_err(|_| RequestError::InvalidQuantity(text.to_owned()))?;
    if requested < 1 {
        return Err(RequestError::NonPositiveQuantity(requested));
    }
    let too_many = RequestError::TooManyTickets {
        requested,
        limit: MAX_TICKETS_PER_REQUEST,
    };
    match u32::try_from(requested) {
        Ok(quantity) if quantity <= MAX_TICKETS_PER_REQUEST => Ok(quantity),
        _ => Err(too_many),
    }
}

/// Extracts the request line from the bytes of a single read.
///
/// # Errors
///
/// Returns [`RequestError::Oversized`] when the read filled the whole buffer
/// without a newline.
pub fn frame(bytes: &[u8]) -> Result<&[u8], RequestError> {
    match bytes.iter().position(|byte| *byte == b'\n') {
        Some(end) => Ok(bytes.get(..end).unwrap_or(bytes)),
        None if bytes.len() >= MAX_REQUEST_BYTES => Err(RequestError::Oversized {
            limit: MAX_REQUEST_BYTES,
        }),
        None => Ok(bytes),
    }
}

/// Frames, decodes, and parses a request.
///
/// # Errors
///
/// Returns the first framing, encoding, or validation failure.
pub fn decode(bytes: &[u8]) -> Result<TicketRequest, RequestError> {
    let line = frame(bytes)?;
    let text = str::from_utf8(line).map_err(|_| RequestError::InvalidUtf8)?;
    text.parse()
}

/// Outcome of a request, ready to be written back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketResponse {
    /// Generated tickets, in request order.
    Tickets(Vec<Ticket>),
    /// A single human readable failure.
    Error(String),
}

impl TicketResponse {
    /// Renders the wire payload.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Returns `true` for the error variant.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for TicketResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tickets(tickets) => {
                for (index, ticket) in tickets.iter().enumerate() {
                    writeln!(f, "{}. {ticket}", index + 1)?;
                }
                Ok(())
            }
            Self::Error(message) => writeln!(f, "Error: {message}"),
        }
    }
}

impl From<RequestError> for TicketResponse {
    fn from(error: RequestError) -> Self {
        Self::Error(error.to_string())
    }
}

/// Answers the raw bytes of one request. Never panics on malformed input.
pub fn respond<G>(bytes: &[u8], generator: &G) -> TicketResponse
where
    G: TicketGenerator + ?Sized,
{
    let outcome = decode(bytes).and_then(|request| {
        generator
            .generate(request.kind, request.quantity)
            .map_err(RequestError::from)
    });
    match outcome {
        Ok(tickets) => TicketResponse::Tickets(tickets),
        Err(error) => error.into(),
    }
}
