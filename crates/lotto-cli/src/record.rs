//! Appends identified responses to the tickets file.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

const HEADER: &str = "Generated Tickets:\n";

/// One identified response destined for the tickets file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TicketRecord {
    pub(crate) identifier: String,
    pub(crate) kind: String,
    pub(crate) response: String,
}

/// Appends `records` to `path`, writing the header when the file is new or
/// empty.
pub(crate) fn append(path: &Path, records: &[TicketRecord]) -> io::Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut buffer = String::new();
    if file.metadata()?.len() == 0 {
        buffer.push_str(HEADER);
    }
    for record in records {
        buffer.push_str(&format!(
            "Identifier: {}\nTicket Type: {}\n{}\n",
            record.identifier,
            record.kind,
            record.response.trim_end()
        ));
    }
    file.write_all(buffer.as_bytes())?;
    file.flush()
}
