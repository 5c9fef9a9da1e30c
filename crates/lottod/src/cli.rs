//! Command-line surface of the `lottod` binary.

use clap::{Args, Parser, Subcommand};
use lotto_config::{RuntimePaths, RuntimePathsError, ServerConfig};
use thiserror::Error;

use crate::process::{LaunchError, LaunchMode, StopError, run_server, stop_server};
use crate::telemetry::{self, TelemetryError};

/// Lottery ticket server.
#[derive(Debug, Parser)]
#[command(name = "lottod", version, about)]
pub struct Cli {
    /// Lifecycle command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Server lifecycle commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the server, in the background unless `--foreground` is given.
    Start(StartArgs),
    /// Stop the server recorded in the runtime directory.
    Stop(StopArgs),
}

/// Arguments for `lottod start`.
#[derive(Debug, Args)]
pub struct StartArgs {
    /// Stay attached to the terminal instead of daemonising.
    #[arg(long)]
    pub foreground: bool,
    /// Shared server configuration.
    #[command(flatten)]
    pub config: ServerConfig,
}

/// Arguments for `lottod stop`.
#[derive(Debug, Args)]
pub struct StopArgs {
    /// Shared server configuration; only the runtime directory is consulted.
    #[command(flatten)]
    pub config: ServerConfig,
}

/// Errors surfaced to the operator by the `lottod` binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Runtime paths could not be prepared.
    #[error(transparent)]
    Paths(#[from] RuntimePathsError),
    /// Telemetry could not be initialised.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The server failed to start or terminated with an error.
    #[error(transparent)]
    Launch(#[from] LaunchError),
    /// The stop command failed.
    #[error(transparent)]
    Stop(#[from] StopError),
}

/// Runs the parsed command to completion.
///
/// # Errors
///
/// Returns an [`AppError`] wrapping whichever stage failed; `start` against a
/// live instance and `stop` without one both fail.
pub fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Start(args) => start(args),
        Command::Stop(args) => stop(&args),
    }
}

fn start(args: StartArgs) -> Result<(), AppError> {
    let mode = LaunchMode::detect(args.foreground);
    let paths = RuntimePaths::from_config(&args.config)?;
    telemetry::initialise(&args.config.log_settings(&paths), mode)?;
    run_server(args.config, mode)?;
    Ok(())
}

fn stop(args: &StopArgs) -> Result<(), AppError> {
    let paths = RuntimePaths::from_config(&args.config)?;
    telemetry::initialise(&args.config.log_settings(&paths), LaunchMode::Foreground)?;
    stop_server(&paths)?;
    Ok(())
}
