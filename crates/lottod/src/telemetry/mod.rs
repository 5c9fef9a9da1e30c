//! Structured telemetry initialisation for the server.

mod rotation;

use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use lotto_config::{LogFormat, LogSettings};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter, writer::MakeWriterExt};

use crate::process::LaunchMode;

use rotation::RotatingFile;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to open the log file.
    #[error("failed to open log file '{path}': {source}")]
    LogFile {
        /// Log file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Events go to the rotating log file named in `settings`; foreground runs
/// also copy them to stderr. Repeated calls return a fresh handle without
/// touching the global state again.
pub fn initialise(
    settings: &LogSettings,
    mode: LaunchMode,
) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(settings, mode))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(settings: &LogSettings, mode: LaunchMode) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&settings.filter)
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    let writer = make_writer(settings, mode)?;

    let builder = |filter: EnvFilter, writer: BoxMakeWriter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_names(true)
            .with_writer(writer)
            // The file sink must stay free of colour codes.
            .with_ansi(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match settings.format {
        LogFormat::Json => Box::new(
            builder(filter, writer)
                .json()
                .flatten_event(true)
                .finish(),
        ),
        LogFormat::Compact => Box::new(builder(filter, writer).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

fn make_writer(settings: &LogSettings, mode: LaunchMode) -> Result<BoxMakeWriter, TelemetryError> {
    let mut file = RotatingFile::new(&settings.file, settings.max_bytes, settings.backups);
    file.probe().map_err(|source| TelemetryError::LogFile {
        path: settings.file.clone(),
        source,
    })?;
    let file = Mutex::new(file);
    Ok(match mode {
        LaunchMode::Foreground => BoxMakeWriter::new(file.and(io::stderr)),
        LaunchMode::Background => BoxMakeWriter::new(file),
    })
}
