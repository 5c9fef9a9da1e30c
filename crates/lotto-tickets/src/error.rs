//! Errors raised while generating tickets.

use thiserror::Error;

/// Failures reported by [`crate::TicketGenerator`] and lottery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    /// The ticket kind is not one of the built-in lotteries.
    #[error("unknown ticket kind '{0}' (expected max, 6/49, or daily)")]
    UnknownKind(String),
    /// Quantity was zero or negative.
    #[error("invalid quantity {0}: at least one ticket must be requested")]
    InvalidQuantity(i64),
    /// Quantity exceeded the per-request ceiling.
    #[error("too many tickets requested ({requested}); the limit is {limit}")]
    TooManyTickets {
        /// Number of tickets requested.
        requested: i64,
        /// Maximum accepted per request.
        limit: u32,
    },
    /// A lottery asked for more numbers than its pool holds.
    #[error("cannot draw {draw} numbers from a pool of {pool}")]
    DrawExceedsPool {
        /// Numbers per ticket.
        draw: usize,
        /// Size of the number pool.
        pool: usize,
    },
    /// A lottery asked for zero numbers per ticket.
    #[error("a ticket must contain at least one number")]
    EmptyDraw,
}
