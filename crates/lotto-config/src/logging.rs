use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported logging output formats.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    EnumString,
    Display,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Human-readable single line output.
    #[default]
    Compact,
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Resolved settings for the rotating log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Live log file; rotated segments are written alongside it.
    pub file: PathBuf,
    /// Size in bytes after which the live file is rotated.
    pub max_bytes: u64,
    /// Number of rotated segments kept (`file.1` .. `file.N`).
    pub backups: usize,
    /// `tracing` filter directive.
    pub filter: String,
    /// Output format for each line.
    pub format: LogFormat,
}
