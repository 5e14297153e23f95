use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WindefError>;

#[derive(Error, Debug)]
pub enum WindefError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scan failed: {0}")]
    ScanFailed(String),

    #[error("Scan timed out after {}s", .0.as_secs())]
    ScanTimeout(Duration),

    #[error("Sink error ({sink}): {message}")]
    Sink { sink: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl WindefError {
    pub fn sink(sink: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Sink {
            sink: sink.into(),
            message: message.to_string(),
        }
    }

    /// Timeouts count as scan failures.
    pub fn is_scan_failure(&self) -> bool {
        matches!(self, Self::ScanFailed(_) | Self::ScanTimeout(_))
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            _ => 1,
        }
    }
}
