//! Error types for sqlpod.

use thiserror::Error;

/// Main error type for all pod operations.
#[derive(Debug, Error)]
pub enum PodError {
    /// I/O error on the stdin/stdout streams.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while reading or writing a transit payload.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The outer bencode envelope was malformed.
    #[error("{0}")]
    EnvelopeDecode(String),

    /// The transit `args` payload did not have an accepted shape.
    #[error("{0}")]
    ArgDecode(String),

    /// The executor could not open a handle for the target.
    #[error("cannot open database {target:?}: {source}")]
    TargetOpen {
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The executor rejected or failed a statement.
    #[error("{0}")]
    Execution(String),

    /// A result could not be serialized back to transit.
    #[error("{0}")]
    ResultEncode(String),

    /// Unrecognized envelope `op`.
    #[error("Unknown op {0}")]
    UnknownOp(String),

    /// Unrecognized invoke `var`.
    #[error("Unknown var {0}")]
    UnknownVar(String),

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),
}

impl PodError {
    /// Keyword name reported in the `ex-data` of an error response.
    pub fn kind(&self) -> &'static str {
        match self {
            PodError::Io(_) => "io",
            PodError::Json(_) | PodError::ArgDecode(_) => "arg-decode",
            PodError::EnvelopeDecode(_) => "envelope-decode",
            PodError::TargetOpen { .. } => "target-open",
            PodError::Execution(_) => "execution",
            PodError::ResultEncode(_) => "result-encode",
            PodError::UnknownOp(_) => "unknown-op",
            PodError::UnknownVar(_) => "unknown-var",
            PodError::Config(_) => "config",
        }
    }
}

/// Result type alias using PodError.
pub type Result<T> = std::result::Result<T, PodError>;
