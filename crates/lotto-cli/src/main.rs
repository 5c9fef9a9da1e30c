//! CLI entrypoint for the lottery ticket client.
//!
//! The binary delegates to [`lotto_cli::run`], which parses arguments, sends
//! the ticket requests, and records the responses.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    lotto_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
