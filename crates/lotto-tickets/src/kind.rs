//! Ticket kinds accepted on the wire.

use std::fmt;
use std::str::FromStr;

use crate::error::TicketError;
use crate::lottery::LotteryConfig;

/// Built-in lotteries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketKind {
    /// LOTTO MAX.
    Max,
    /// LOTTO 6/49.
    SixFortyNine,
    /// DAILY GRAND.
    DailyGrand,
}

impl TicketKind {
    /// Every built-in kind, in display order.
    pub const ALL: [Self; 3] = [Self::Max, Self::SixFortyNine, Self::DailyGrand];

    /// Canonical identifier used in requests and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::SixFortyNine => "6/49",
            Self::DailyGrand => "daily",
        }
    }

    /// Pool and draw count for this lottery.
    #[must_use]
    pub fn config(self) -> LotteryConfig {
        match self {
            Self::Max => LotteryConfig::builtin("LOTTO MAX", 1..=50, 7),
            Self::SixFortyNine => LotteryConfig::builtin("LOTTO 6/49", 1..=49, 6),
            Self::DailyGrand => LotteryConfig::builtin("DAILY GRAND", 1..=49, 5),
        }
    }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketKind {
    type Err = TicketError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalised = input.trim().to_ascii_lowercase();
        match normalised.as_str() {
            "max" => Ok(Self::Max),
            "6/49" | "649" => Ok(Self::SixFortyNine),
            "daily" | "grand" => Ok(Self::DailyGrand),
            _ => Err(TicketError::UnknownKind(input.trim().to_owned())),
        }
    }
}
