use std::fmt;

/// One generated ticket: distinct numbers in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticket(Vec<u32>);

impl Ticket {
    /// Builds a ticket, sorting the numbers ascending.
    #[must_use]
    pub fn new(mut numbers: Vec<u32>) -> Self {
        numbers.sort_unstable();
        Self(numbers)
    }

    /// Numbers on the ticket.
    #[must_use]
    pub fn numbers(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut numbers = self.0.iter();
        if let Some(first) = numbers.next() {
            write!(f, "{first}")?;
        }
        for number in numbers {
            write!(f, ", {number}")?;
        }
        Ok(())
    }
}
