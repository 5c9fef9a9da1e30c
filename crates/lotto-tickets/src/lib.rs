//! Lottery ticket generation.
//!
//! A ticket is a bounded random sample drawn without replacement from the
//! number pool of a lottery. Three lotteries are built in:
//!
//! - **LOTTO MAX** (`max`): 7 numbers from 1 to 50
//! - **LOTTO 6/49** (`6/49` or `649`): 6 numbers from 1 to 49
//! - **DAILY GRAND** (`daily` or `grand`): 5 numbers from 1 to 49
//!
//! # Example
//!
//! ```
//! use lotto_tickets::{TicketGenerator, TicketKind, ThreadRandomGenerator};
//!
//! let tickets = ThreadRandomGenerator.generate(TicketKind::SixFortyNine, 2)?;
//! assert_eq!(tickets.len(), 2);
//! assert!(tickets.iter().all(|ticket| ticket.numbers().len() == 6));
//! # Ok::<(), lotto_tickets::TicketError>(())
//! ```

mod error;
mod generator;
mod kind;
mod lottery;
mod ticket;

pub use error::TicketError;
pub use generator::{SeededGenerator, ThreadRandomGenerator, TicketGenerator, generate_from_str};
pub use kind::TicketKind;
pub use lottery::LotteryConfig;
pub use ticket::Ticket;

/// Largest number of tickets a single request may ask for.
pub const MAX_TICKETS_PER_REQUEST: u32 = 100;
