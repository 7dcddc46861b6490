//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings in {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("Setting '{key}' in {origin} requires a single string, integer or boolean value")]
    InvalidValue { origin: String, key: String },
}
