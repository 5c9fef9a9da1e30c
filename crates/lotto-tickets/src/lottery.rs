//! Lottery configurations: a number pool and a draw count.

use std::ops::RangeInclusive;

use crate::error::TicketError;

/// Pool of candidate numbers and how many are drawn per ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotteryConfig {
    name: String,
    pool: RangeInclusive<u32>,
    draw: usize,
}

impl LotteryConfig {
    /// Validates and builds a lottery configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::EmptyDraw`] when `draw` is zero and
    /// [`TicketError::DrawExceedsPool`] when the pool holds fewer than `draw`
    /// numbers.
    pub fn new(
        name: impl Into<String>,
        pool: RangeInclusive<u32>,
        draw: usize,
    ) -> Result<Self, TicketError> {
        if draw == 0 {
            return Err(TicketError::EmptyDraw);
        }
        let pool_len = pool_len(&pool);
        if draw > pool_len {
            return Err(TicketError::DrawExceedsPool {
                draw,
                pool: pool_len,
            });
        }
        Ok(Self {
            name: name.into(),
            pool,
            draw,
        })
    }

    pub(crate) fn builtin(name: &str, pool: RangeInclusive<u32>, draw: usize) -> Self {
        Self {
            name: name.to_owned(),
            pool,
            draw,
        }
    }

    /// Human readable lottery name, for example `LOTTO MAX`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inclusive range of numbers that may appear on a ticket.
    #[must_use]
    pub fn pool(&self) -> &RangeInclusive<u32> {
        &self.pool
    }

    /// Number of distinct numbers on each ticket.
    #[must_use]
    pub fn draw(&self) -> usize {
        self.draw
    }

    /// Count of numbers in the pool.
    #[must_use]
    pub fn pool_len(&self) -> usize {
        pool_len(&self.pool)
    }
}

fn pool_len(pool: &RangeInclusive<u32>) -> usize {
    if pool.is_empty() {
        return 0;
    }
    let span = u64::from(*pool.end()) - u64::from(*pool.start()) + 1;
    usize::try_from(span).unwrap_or(usize::MAX)
}
