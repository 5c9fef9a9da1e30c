//! Entry point for the `lottod` lottery ticket server.
//!
//! Parsing and orchestration live in the library; the binary only maps the
//! outcome onto a process exit status.

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = lottod::Cli::parse();
    match lottod::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("lottod: {error}");
            ExitCode::FAILURE
        }
    }
}
