use std::io::Error as IoError;
use thiserror::Error;
use crate::file_watcher::FileWatcherError;
use crate::identity::IdentityError;
use crate::storage::document_store::DocumentStoreError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error("stored notes are malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("file too large")]
    TooBig,

    #[error("note not found")]
    NoteNotFound,

    #[error("no identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("storage is not loaded yet")]
    NotLoaded,

    #[error(transparent)]
    Documents(#[from] DocumentStoreError),

    #[error(transparent)]
    FileWatcher(#[from] FileWatcherError),
}
