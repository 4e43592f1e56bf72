//! Per-document collections the remote storage strategy writes to.

mod directory;
mod errors;
mod memory;

use std::cmp::Reverse;
use std::fmt;
use std::fmt::{Display, Formatter};
use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;
use crate::data::UserId;
use crate::storage::record::{normalize, NoteRecord, RecordPatch};
pub use directory::{DirectoryDocumentStore, DirectoryDocumentStoreImpl};
pub use errors::DocumentStoreError;
pub use memory::MemoryDocumentStore;

/// `users/{owner}/notes`
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CollectionPath {
    owner: UserId,
}

impl CollectionPath {
    pub fn user_notes(owner: UserId) -> Self {
        CollectionPath { owner }
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "users/{}/notes", self.owner)
    }
}

pub type RecordSnapshots = BoxStream<'static, Result<Vec<NoteRecord>, DocumentStoreError>>;

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Creates the document or replaces it whole.
    async fn set_document(
        &self,
        collection: &CollectionPath,
        record: &NoteRecord,
    ) -> Result<(), DocumentStoreError>;

    /// Fails with [`DocumentStoreError::NotFound`] if there is no such
    /// document.
    async fn update_document(
        &self,
        collection: &CollectionPath,
        id: Uuid,
        patch: &RecordPatch,
    ) -> Result<(), DocumentStoreError>;

    /// Deleting a missing document succeeds.
    async fn delete_document(
        &self,
        collection: &CollectionPath,
        id: Uuid,
    ) -> Result<(), DocumentStoreError>;

    /// Newest `updatedAt` first.
    async fn query(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<NoteRecord>, DocumentStoreError>;

    /// The current snapshot, then a new one after every change, ordered
    /// like [`DocumentStore::query`].
    async fn subscribe(
        &self,
        collection: &CollectionPath,
    ) -> Result<RecordSnapshots, DocumentStoreError>;
}

fn sort_newest_first(records: &mut [NoteRecord]) {
    records.sort_by_key(|r| Reverse(normalize(r.updated_at)));
}
