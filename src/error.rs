//! Error types for media-tool

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for media-tool operations
#[derive(Debug, Error)]
pub enum MediaToolError {
    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid config values: {}", .0.join(", "))]
    InvalidPreferences(Vec<String>),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("{tool} exited with {}: {log}", exit_label(.code))]
    ProcessFailed {
        tool: String,
        code: Option<i32>,
        log: String,
    },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Generic error: {0}")]
    Generic(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

impl MediaToolError {
    /// Check if error means a required external tool is missing or broken
    pub fn is_environment(&self) -> bool {
        matches!(self, MediaToolError::Environment(_))
    }

    /// Check if error is a validation failure for a single item
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MediaToolError::UnsupportedFormat(_)
                | MediaToolError::FileNotFound(_)
                | MediaToolError::InvalidPreferences(_)
                | MediaToolError::InvalidLogLevel(_)
                | MediaToolError::InvalidUrl(_)
        )
    }

    /// Check if error came from a non-zero exit of an external tool
    pub fn is_process_failure(&self) -> bool {
        matches!(self, MediaToolError::ProcessFailed { .. })
    }
}
