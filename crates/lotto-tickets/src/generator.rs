//! Random ticket generators.
//!
//! [`ThreadRandomGenerator`] samples from the thread-local RNG and is what the
//! server uses. [`SeededGenerator`] wraps any owned RNG behind a mutex so tests
//! can reproduce a sequence of tickets from a fixed seed.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::error::TicketError;
use crate::kind::TicketKind;
use crate::lottery::LotteryConfig;
use crate::ticket::Ticket;
use crate::MAX_TICKETS_PER_REQUEST;

/// Produces tickets for a lottery.
///
/// Implementors supply [`TicketGenerator::draw`]; quantity validation and the
/// per-request ceiling are shared.
pub trait TicketGenerator: Send + Sync {
    /// Draws a single ticket for `config`.
    fn draw(&self, config: &LotteryConfig) -> Ticket;

    /// Generates `quantity` independent tickets of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidQuantity`] for a zero quantity and
    /// [`TicketError::TooManyTickets`] above [`MAX_TICKETS_PER_REQUEST`].
    fn generate(&self, kind: TicketKind, quantity: u32) -> Result<Vec<Ticket>, TicketError> {
        if quantity == 0 {
            return Err(TicketError::InvalidQuantity(0));
        }
        if quantity > MAX_TICKETS_PER_REQUEST {
            return Err(TicketError::TooManyTickets {
                requested: i64::from(quantity),
                limit: MAX_TICKETS_PER_REQUEST,
            });
        }
        let config = kind.config();
        Ok((0..quantity).map(|_| self.draw(&config)).collect())
    }
}

/// Generator backed by `rand::rng()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandomGenerator;

impl TicketGenerator for ThreadRandomGenerator {
    fn draw(&self, config: &LotteryConfig) -> Ticket {
        sample(&mut rand::rng(), config)
    }
}

/// Generator backed by an owned RNG, shared between threads through a mutex.
#[derive(Debug)]
pub struct SeededGenerator<R = StdRng> {
    rng: Mutex<R>,
}

impl<R: Rng + Send> SeededGenerator<R> {
    /// Wraps an existing RNG.
    pub fn from_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl SeededGenerator<StdRng> {
    /// Builds a deterministic generator from a 64-bit seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> TicketGenerator for SeededGenerator<R> {
    fn draw(&self, config: &LotteryConfig) -> Ticket {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        sample(&mut *rng, config)
    }
}

/// Generates tickets from a textual kind and a signed quantity.
///
/// This is the loosely typed entry point used when the kind and quantity come
/// straight from user input.
///
/// # Errors
///
/// Returns [`TicketError::UnknownKind`] for an unrecognised kind,
/// [`TicketError::InvalidQuantity`] for a quantity below one, and
/// [`TicketError::TooManyTickets`] above [`MAX_TICKETS_PER_REQUEST`].
pub fn generate_from_str(kind: &str, quantity: i64) -> Result<Vec<Ticket>, TicketError> {
    let kind: TicketKind = kind.parse()?;
    if quantity < 1 {
        return Err(TicketError::InvalidQuantity(quantity));
    }
    let quantity = u32::try_from(quantity).map_err(|_| TicketError::TooManyTickets {
        requested: quantity,
        limit: MAX_TICKETS_PER_REQUEST,
    })?;
    ThreadRandomGenerator.generate(kind, quantity)
}

fn sample<R: Rng + ?Sized>(rng: &mut R, config: &LotteryConfig) -> Ticket {
    let start = *config.pool().start();
    // `LotteryConfig` guarantees draw <= pool_len, and every offset below
    // pool_len fits in the u32 pool range.
    let numbers = index::sample(rng, config.pool_len(), config.draw())
        .into_iter()
        .filter_map(|offset| u32::try_from(offset).ok())
        .map(|offset| start + offset)
        .collect();
    Ticket::new(numbers)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn generator() -> SeededGenerator {
        SeededGenerator::seeded(0x5eed)
    }

    #[rstest]
    #[case(TicketKind::Max, 3)]
    #[case(TicketKind::SixFortyNine, 2)]
    #[case(TicketKind::DailyGrand, 5)]
    fn tickets_are_distinct_sorted_and_in_bounds(
        generator: SeededGenerator,
        #[case] kind: TicketKind,
        #[case] quantity: u32,
    ) {
        let config = kind.config();
        let tickets = generator.generate(kind, quantity).expect("generate tickets");
        assert_eq!(tickets.len(), usize::try_from(quantity).expect("small quantity"));
        for ticket in tickets {
            let numbers = ticket.numbers();
            assert_eq!(numbers.len(), config.draw());
            let unique: HashSet<_> = numbers.iter().collect();
            assert_eq!(unique.len(), numbers.len(), "duplicates in {ticket}");
            assert!(numbers.windows(2).all(|pair| pair[0] < pair[1]));
            assert!(numbers.iter().all(|n| config.pool().contains(n)));
        }
    }

    #[test]
    fn same_seed_reproduces_tickets() {
        let first = SeededGenerator::seeded(7)
            .generate(TicketKind::Max, 4)
            .expect("first run");
        let second = SeededGenerator::seeded(7)
            .generate(TicketKind::Max, 4)
            .expect("second run");
        assert_eq!(first, second);
    }

    #[test]
    fn whole_pool_draw_covers_every_number() {
        let config = LotteryConfig::new("all", 10..=14, 5).expect("valid config");
        let ticket = SeededGenerator::seeded(1).draw(&config);
        assert_eq!(ticket.numbers(), &[10, 11, 12, 13, 14]);
    }

    #[rstest]
    fn zero_quantity_is_rejected(generator: SeededGenerator) {
        assert_eq!(
            generator.generate(TicketKind::Max, 0),
            Err(TicketError::InvalidQuantity(0))
        );
    }

    #[rstest]
    fn quantity_above_ceiling_is_rejected(generator: SeededGenerator) {
        let error = generator
            .generate(TicketKind::Max, MAX_TICKETS_PER_REQUEST + 1)
            .expect_err("ceiling enforced");
        assert!(matches!(error, TicketError::TooManyTickets { .. }));
    }

    #[rstest]
    #[case("bogus", 1)]
    #[case("max", 0)]
    #[case("max", -3)]
    #[case("max", i64::MAX)]
    fn string_entry_point_rejects_bad_input(#[case] kind: &str, #[case] quantity: i64) {
        assert!(generate_from_str(kind, quantity).is_err());
    }

    #[test]
    fn string_entry_point_generates_tickets() {
        let tickets = generate_from_str("649", 2).expect("generate 6/49");
        assert_eq!(tickets.len(), 2);
        assert!(tickets.iter().all(|ticket| ticket.numbers().len() == 6));
    }
}
