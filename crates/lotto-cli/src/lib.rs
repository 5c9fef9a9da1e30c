//! Client for the lottery ticket server.
//!
//! `lotto` sends one `"<kind>,<quantity>"` line per request to `lottod`, prints
//! each response, and, when an identifier is given, appends the responses to a
//! tickets file. Several requests can be issued at once; each runs on its own
//! thread and owns its own connection.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::thread;

use clap::Parser;
use clap::error::ErrorKind;

mod cli;
mod errors;
mod record;
mod transport;

use cli::Cli;
use errors::AppError;
use record::TicketRecord;

/// Runs the client using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if is_informational(&error) => {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            let _ = write!(stderr, "{}", AppError::CliUsage(error));
            return ExitCode::from(2);
        }
    };
    match execute(&cli, stdout, stderr) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            let _ = writeln!(stderr, "lotto: {error}");
            ExitCode::FAILURE
        }
    }
}

fn is_informational(error: &clap::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
    )
}

/// Issues every request and reports the outcomes. Returns whether all
/// requests produced tickets.
fn execute<W: Write, E: Write>(
    cli: &Cli,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<bool, AppError> {
    let outcomes = issue_requests(cli)?;
    let mut records = Vec::new();
    let mut all_succeeded = true;
    for (index, outcome) in (1..).zip(outcomes) {
        match outcome {
            Ok(response) => {
                write!(stdout, "{response}").map_err(AppError::Output)?;
                if let Some(identifier) = cli.identifier_for(index) {
                    records.push(TicketRecord {
                        identifier,
                        kind: cli.kind.clone(),
                        response,
                    });
                }
            }
            Err(error) => {
                all_succeeded = false;
                writeln!(stderr, "lotto: {error}").map_err(AppError::Output)?;
            }
        }
    }
    stdout.flush().map_err(AppError::Output)?;
    record::append(&cli.output, &records).map_err(|source| AppError::Record {
        path: cli.output.clone(),
        source,
    })?;
    Ok(all_succeeded)
}

/// Runs one request per thread and collects the responses in request order.
fn issue_requests(cli: &Cli) -> Result<Vec<Result<String, AppError>>, AppError> {
    let endpoint = cli.endpoint();
    let line = cli.request_line();
    thread::scope(|scope| {
        let handles: Vec<_> = (0..cli.requests)
            .map(|_| scope.spawn(|| request(&endpoint, &line)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| AppError::RequestPanicked))
            .collect()
    })
}

fn request(endpoint: &lotto_config::ListenEndpoint, line: &str) -> Result<String, AppError> {
    let response = transport::exchange(endpoint, line)?;
    match response.strip_prefix("Error: ") {
        Some(message) => Err(AppError::Rejected(message.trim_end().to_owned())),
        None => Ok(response),
    }
}
