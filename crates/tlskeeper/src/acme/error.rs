//! Error types for certificate state and partition storage.

use std::path::PathBuf;

use thiserror::Error;
use tlskeeper_common::AppName;
use tlskeeper_config::{keys, ConfigError};

use super::storage::PartitionKey;

/// Errors from the partition store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Partition {key} does not exist for app '{app}'")]
    UnknownPartition { app: AppName, key: PartitionKey },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors for a single application's certificate operations.
///
/// Every variant is terminal for the application being processed and
/// nothing is retried here. Fleet-wide callers skip the application and
/// carry on with the rest.
#[derive(Error, Debug)]
pub enum AcmeError {
    #[error(
        "No contact email configured for app '{app}'. \
         Set `{key} \"you@example.com\"` in the global or app settings.kdl",
        key = keys::EMAIL
    )]
    MissingContactEmail { app: AppName },

    #[error("No certificate installed for app '{app}'")]
    CertificateMissing { app: AppName },

    #[error("Certificate parsing error: {0}")]
    CertificateParse(String),

    #[error("Configuration unreadable: {0}")]
    ConfigurationUnreadable(#[from] ConfigError),

    #[error("Partition write error: {0}")]
    PartitionWrite(#[from] StorageError),

    #[error("Invalid value '{value}' for setting '{key}'")]
    InvalidSetting { key: String, value: String },

    #[error("Application registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Unknown application '{app}'")]
    UnknownApplication { app: AppName },
}
