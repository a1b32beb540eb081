//! Error types for the exporter.
//!
//! All fallible operations in this crate return [`Result<T>`], which uses
//! the [`Error`] enum for error variants.

use std::path::PathBuf;

/// Errors that can occur while loading configuration, parsing DHCP files,
/// or serving metrics.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network or generic file system I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A DHCP configuration, lease, or pattern file could not be read.
    ///
    /// Fails the current poll cycle; the poll loop's failure policy decides
    /// whether the process exits or retries on the next interval.
    #[error("Failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization/deserialization error (exporter config file).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error (`stats --json` output).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The pattern text is not a valid regular expression.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// The pattern compiled but cannot extract records, e.g. it has fewer
    /// capture groups than the record kind requires.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Invalid exporter configuration.
    ///
    /// Returned by [`Config::validate`](crate::Config::validate).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metric registration, gathering, or encoding error.
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// A specialized Result type for exporter operations.
pub type Result<T> = std::result::Result<T, Error>;
