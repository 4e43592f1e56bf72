use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use futures::StreamExt;
use log::trace;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use uuid::Uuid;
use crate::storage::document_store::{sort_newest_first, CollectionPath, DocumentStore, DocumentStoreError, RecordSnapshots};
use crate::storage::record::{NoteRecord, RecordPatch};

/// A document database living in this process.
///
/// Every clone is another session on the same data: writes made through one
/// clone show up in the subscriptions of all of them.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<Mutex<HashMap<CollectionPath, Collection>>>,
}

struct Collection {
    documents: HashMap<Uuid, NoteRecord>,
    snapshots: watch::Sender<Vec<NoteRecord>>,
}

impl Collection {
    fn new() -> Self {
        Collection {
            documents: HashMap::new(),
            snapshots: watch::Sender::new(Vec::new()),
        }
    }

    fn snapshot(&self) -> Vec<NoteRecord> {
        let mut records: Vec<_> = self.documents.values().cloned().collect();
        sort_newest_first(&mut records);
        records
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_collection<T>(
        &self,
        path: &CollectionPath,
        f: impl FnOnce(&mut Collection) -> T,
    ) -> T {
        let mut collections = self.collections
            .lock()
            .expect("failed locking the document store");
        f(collections.entry(path.clone()).or_insert_with(Collection::new))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn set_document(
        &self,
        collection: &CollectionPath,
        record: &NoteRecord,
    ) -> Result<(), DocumentStoreError> {
        trace!("setting document {collection}/{}", record.id);
        self.with_collection(collection, |c| {
            c.documents.insert(record.id, record.clone());
            c.publish();
        });
        Ok(())
    }

    async fn update_document(
        &self,
        collection: &CollectionPath,
        id: Uuid,
        patch: &RecordPatch,
    ) -> Result<(), DocumentStoreError> {
        trace!("updating document {collection}/{id}");
        self.with_collection(collection, |c| {
            c.documents
                .get_mut(&id)
                .ok_or(DocumentStoreError::NotFound(id))?
                .apply(patch.clone());
            c.publish();
            Ok(())
        })
    }

    async fn delete_document(
        &self,
        collection: &CollectionPath,
        id: Uuid,
    ) -> Result<(), DocumentStoreError> {
        trace!("deleting document {collection}/{id}");
        self.with_collection(collection, |c| {
            if c.documents.remove(&id).is_some() {
                c.publish();
            }
        });
        Ok(())
    }

    async fn query(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<NoteRecord>, DocumentStoreError> {
        Ok(self.with_collection(collection, |c| c.snapshot()))
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
    ) -> Result<RecordSnapshots, DocumentStoreError> {
        let receiver = self.with_collection(collection, |c| c.snapshots.subscribe());
        Ok(WatchStream::new(receiver).map(Ok).boxed())
    }
}
