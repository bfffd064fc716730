//! Storage-specific error type wrapping filesystem and JSON errors.

use std::path::PathBuf;

use sensorhub_domain::error::SensorHubError;

/// Errors originating from the JSON file store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The store file exists but could not be read.
    #[error("failed to read `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file does not hold a valid definition list.
    #[error("failed to parse `{}`", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The definitions could not be encoded.
    #[error("failed to encode sensor definitions")]
    Encode(#[source] serde_json::Error),

    /// The temporary file could not be created or written.
    #[error("failed to write into `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The temporary file could not replace the store file.
    #[error("failed to replace `{}`", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },

    /// The blocking filesystem task did not complete.
    #[error("storage task aborted")]
    Task(#[from] tokio::task::JoinError),
}

impl From<StorageError> for SensorHubError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Read { .. } | StorageError::Parse { .. } => {
                Self::StoreCorrupt(Box::new(err))
            }
            StorageError::Encode(_)
            | StorageError::Write { .. }
            | StorageError::Persist { .. }
            | StorageError::Task(_) => Self::StorePersist(Box::new(err)),
        }
    }
}
