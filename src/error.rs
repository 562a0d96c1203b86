use std::path::PathBuf;

use thiserror::Error;

/// Errors that can abort a benchmark run.
///
/// Individual request failures are never reported through this type; they are
/// counted in the stage results instead.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Invalid or inconsistent configuration, detected before any traffic is sent
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configuration file could not be read
    #[error("Failed to read configuration file {}: {source}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has mistyped fields
    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// A worker task could not be joined
    #[error("Worker error: {0}")]
    Worker(String),

    /// The reporting sink failed
    #[error("Report error: {0}")]
    Report(String),
}

/// Result type alias using BenchError
pub type Result<T> = std::result::Result<T, BenchError>;

impl BenchError {
    pub fn config(msg: impl Into<String>) -> Self {
        BenchError::Config(msg.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(
            self,
            BenchError::Config(_) | BenchError::ConfigFile { .. } | BenchError::ConfigParse(_)
        )
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::Report(err.to_string())
    }
}
