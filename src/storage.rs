//! Persistence of the note collection.
//!
//! Both strategies expose the same port to the store: a full load, targeted
//! create/update/delete writes and a stream of snapshots for changes made by
//! other sessions.

mod errors;
pub mod document_store;
mod io_trait;
mod local;
pub mod record;
mod remote;

use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;
use crate::data::{ListOrder, Note, NoteVersion, UserId};
use crate::timestamp::Timestamp;
pub use errors::StorageError;
pub use io_trait::{ProductionStorageIo, ReadFile, StorageIo};
pub use local::{LocalNoteStorage, LocalNoteStorageImpl};
pub use remote::RemoteNoteStorage;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoadedNotes {
    Found(Vec<Note>),
    /// Nothing was ever stored.
    Absent,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StorageEvent {
    /// The whole collection as another session left it.
    Snapshot(Vec<Note>),
}

/// Fields of a note touched by one accepted update.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Only present when the update produced a new version.
    pub versions: Option<Vec<NoteVersion>>,
    pub updated_at: Timestamp,
}

impl NoteChanges {
    pub fn apply(&self, note: &mut Note) {
        if let Some(ref title) = self.title {
            note.title.clone_from(title);
        }
        if let Some(ref content) = self.content {
            note.content.clone_from(content);
        }
        if let Some(ref versions) = self.versions {
            note.versions.clone_from(versions);
        }
        note.updated_at = self.updated_at;
    }
}

#[async_trait]
pub trait NoteStorage: Send + Sync + 'static {
    async fn load_all(&self) -> Result<LoadedNotes, StorageError>;

    async fn create(&self, note: &Note) -> Result<(), StorageError>;

    async fn update(
        &self,
        id: Uuid,
        changes: &NoteChanges,
    ) -> Result<(), StorageError>;

    async fn delete(&self, id: Uuid) -> Result<(), StorageError>;

    /// Takes `notes` as the stored collection after [`NoteStorage::load_all`]
    /// failed, so later writes build on them. Writes nothing by itself.
    async fn seed(&self, _notes: &[Note]) {}

    /// Only valid after a successful [`NoteStorage::load_all`].
    async fn subscribe(
        &self,
    ) -> Result<BoxStream<'static, StorageEvent>, StorageError>;

    fn list_order(&self) -> ListOrder;

    fn owner(&self) -> Option<UserId> {
        None
    }
}
