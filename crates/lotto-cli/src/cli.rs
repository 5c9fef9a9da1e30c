use std::path::PathBuf;

use clap::Parser;
use lotto_config::{DEFAULT_HOST, DEFAULT_PORT, ListenEndpoint};

/// Default file that identified responses are appended to.
pub(crate) const DEFAULT_OUTPUT: &str = "GeneratedTickets.txt";

/// Requests lottery tickets from a running `lottod`.
#[derive(Debug, Parser)]
#[command(name = "lotto", version, about)]
pub(crate) struct Cli {
    /// Server address.
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    pub(crate) host: String,
    /// Server port.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub(crate) port: u16,
    /// Ticket kind: `max`, `6/49`, or `daily`.
    #[arg(short = 't', long, visible_alias = "ticket")]
    pub(crate) kind: String,
    /// Tickets per request.
    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    pub(crate) quantity: i64,
    /// Label recorded with each response in the output file.
    #[arg(short, long)]
    pub(crate) identifier: Option<String>,
    /// Number of requests issued concurrently (at most 256).
    #[arg(
        short = 'n',
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..=256)
    )]
    pub(crate) requests: u16,
    /// File that identified responses are appended to.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub(crate) output: PathBuf,
}

impl Cli {
    pub(crate) fn endpoint(&self) -> ListenEndpoint {
        ListenEndpoint::new(self.host.clone(), self.port)
    }

    /// The request line sent to the server, without its terminator.
    pub(crate) fn request_line(&self) -> String {
        format!("{},{}", self.kind, self.quantity)
    }

    /// Identifier for the request at `index` (1-based), suffixed when more
    /// than one request is issued.
    pub(crate) fn identifier_for(&self, index: u16) -> Option<String> {
        self.identifier.as_ref().map(|identifier| {
            if self.requests > 1 {
                format!("{identifier}_{index}")
            } else {
                identifier.clone()
            }
        })
    }
}
