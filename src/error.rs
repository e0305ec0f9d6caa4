//! Error types for the vulnlens pipeline

use std::process::ExitCode;

use thiserror::Error;

/// Errors surfaced by pipeline stages
///
/// Per-entity failures (one unparseable file, one failed summary) are logged and
/// absorbed by the stage that hit them; only errors that leave a stage without its
/// required input reach the caller.
#[derive(Debug, Error)]
pub enum VulnLensError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Parse failure: {message}")]
    ParseFailure { message: String },

    #[error("Scanner failure: {message}")]
    ScannerFailure { message: String },

    #[error("Model request failed ({service}): {message}")]
    ModelRequest { service: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl VulnLensError {
    /// Wrap a serde_json error with the file or payload it came from
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Build a model request error for the named service
    pub fn model(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelRequest {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::FileNotFound { .. } => ExitCode::from(2),
            Self::Config { .. } => ExitCode::from(3),
            Self::ScannerFailure { .. } => ExitCode::from(4),
            Self::ModelRequest { .. } => ExitCode::from(5),
            Self::Io(_) | Self::Json { .. } | Self::ParseFailure { .. } => ExitCode::from(1),
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, VulnLensError>;
