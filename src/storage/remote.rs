
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{future, StreamExt};
use log::{debug, error, info};
use tokio::sync::OnceCell;
use uuid::Uuid;
use crate::data::{ListOrder, Note, UserId};
use crate::identity::{resolve_user, IdentityProvider};
use crate::storage::document_store::{CollectionPath, DocumentStore};
use crate::storage::record::{NoteRecord, RecordPatch, TimestampStyle};
use crate::storage::{LoadedNotes, NoteChanges, NoteStorage, StorageError, StorageEvent};

const TIMESTAMP_STYLE: TimestampStyle = TimestampStyle::Native;

/// Every note is its own document in the signed-in user's collection.
pub struct RemoteNoteStorage<D: DocumentStore, I: IdentityProvider> {
    documents: D,
    identity: I,
    collection: OnceCell<CollectionPath>,
}

impl<D: DocumentStore, I: IdentityProvider> RemoteNoteStorage<D, I> {
    pub fn new(documents: D, identity: I) -> Self {
        RemoteNoteStorage {
            documents,
            identity,
            collection: OnceCell::new(),
        }
    }

    fn collection(&self) -> Result<&CollectionPath, StorageError> {
        self.collection.get().ok_or(StorageError::NotLoaded)
    }
}

#[async_trait]
impl<D: DocumentStore, I: IdentityProvider> NoteStorage for RemoteNoteStorage<D, I> {
    async fn load_all(&self) -> Result<LoadedNotes, StorageError> {
        let collection = self.collection
            .get_or_try_init(|| async {
                let user = resolve_user(&self.identity).await?;
                info!("using the note collection of {user}");
                Ok::<_, StorageError>(CollectionPath::user_notes(user))
            })
            .await?;
        let notes: Vec<Note> = self.documents
            .query(collection)
            .await?
            .into_iter()
            .map(Note::from)
            .collect();
        debug!("loaded {} notes from {collection}", notes.len());
        Ok(LoadedNotes::Found(notes))
    }

    async fn create(&self, note: &Note) -> Result<(), StorageError> {
        self.documents
            .set_document(
                self.collection()?,
                &NoteRecord::new(note, TIMESTAMP_STYLE),
            )
            .await?;
        Ok(())
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &NoteChanges,
    ) -> Result<(), StorageError> {
        self.documents
            .update_document(
                self.collection()?,
                id,
                &RecordPatch::new(changes, TIMESTAMP_STYLE),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        self.documents
            .delete_document(self.collection()?, id)
            .await?;
        Ok(())
    }

    async fn subscribe(
        &self,
    ) -> Result<BoxStream<'static, StorageEvent>, StorageError> {
        let snapshots = self.documents
            .subscribe(self.collection()?)
            .await?;
        Ok(
            snapshots
                .filter_map(|snapshot| future::ready(
                    match snapshot {
                        Ok(records) => Some(
                            StorageEvent::Snapshot(
                                records.into_iter().map(Note::from).collect()
                            )
                        ),
                        Err(e) => {
                            error!("note subscription failed: {e}");
                            None
                        },
                    }
                ))
                .boxed()
        )
    }

    fn list_order(&self) -> ListOrder {
        ListOrder::UpdatedDescending
    }

    fn owner(&self) -> Option<UserId> {
        self.collection.get().map(|c| c.owner().clone())
    }
}
