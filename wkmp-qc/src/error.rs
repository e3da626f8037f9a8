//! Error types for wkmp-qc
//!
//! Validation outcomes are data, not errors. These cover configuration and
//! replay-script loading only.

use thiserror::Error;

/// Main error type for wkmp-qc
#[derive(Error, Debug)]
pub enum Error {
    /// Shared WKMP error (config discovery, TOML/JSON parsing, I/O)
    #[error(transparent)]
    Common(#[from] wkmp_common::Error),

    /// Replay script is structurally valid JSON but not a usable script
    #[error("Invalid replay script: {0}")]
    Script(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Replay script JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type using wkmp-qc Error
pub type Result<T> = std::result::Result<T, Error>;
