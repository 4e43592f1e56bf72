use std::io::Error as IoError;
use thiserror::Error;
use uuid::Uuid;
use crate::file_watcher::FileWatcherError;

#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("document {0} not found")]
    NotFound(Uuid),

    #[error("document too large")]
    TooBig,

    #[error("invalid collection \"{0}\"")]
    InvalidCollection(String),

    #[error(transparent)]
    FileWatcher(#[from] FileWatcherError),
}
