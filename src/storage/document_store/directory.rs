
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, error, trace, warn};
use uuid::Uuid;
use crate::file_watcher::{FileWatchGuard, FileWatcher, FileWatcherError, ProductionFileWatcher};
use crate::lib_constants::{MAX_STORED_FILE_LEN, NOTES_DIRECTORY_PATH};
use crate::storage::document_store::{sort_newest_first, CollectionPath, DocumentStore, DocumentStoreError, RecordSnapshots};
use crate::storage::io_trait::{write_file_atomically, ProductionStorageIo, StorageIo};
use crate::storage::record::{NoteRecord, RecordPatch};

/// One JSON file per document, `<data_dir>/notes/<owner>/<id>`.
///
/// Any number of processes may share the directory; subscriptions follow
/// their writes through the file watcher.
pub type DirectoryDocumentStore = DirectoryDocumentStoreImpl<ProductionStorageIo, ProductionFileWatcher>;

pub struct DirectoryDocumentStoreImpl<Io: StorageIo, W: FileWatcher> {
    documents: Arc<Documents<Io>>,
    file_watcher: W,
}

struct Documents<Io: StorageIo> {
    io: Io,
    root: PathBuf,
}

impl DirectoryDocumentStore {
    pub async fn new(
        data_directory: &Path,
        file_watcher: ProductionFileWatcher,
    ) -> Result<DirectoryDocumentStore, DocumentStoreError> {
        let io = ProductionStorageIo::new();
        let root = data_directory.join(NOTES_DIRECTORY_PATH);
        io.create_dir_all(&root).await?;
        let root = tokio::fs::canonicalize(root).await?;
        Ok(Self::new_impl(root, io, file_watcher))
    }
}

impl<Io: StorageIo, W: FileWatcher> DirectoryDocumentStoreImpl<Io, W> {
    pub fn new_impl(root: PathBuf, io: Io, file_watcher: W) -> Self {
        debug!("using document directory \"{}\"", root.display());
        DirectoryDocumentStoreImpl {
            documents: Arc::new(Documents { io, root }),
            file_watcher,
        }
    }
}

fn try_extract_uuid(name: &OsStr) -> Option<Uuid> {
    let name = name.to_str()?;
    if name.len() != uuid::fmt::Hyphenated::LENGTH {
        return None;
    }
    Uuid::try_parse(name).ok()
}

impl<Io: StorageIo> Documents<Io> {
    fn collection_dir(
        &self,
        collection: &CollectionPath,
    ) -> Result<PathBuf, DocumentStoreError> {
        let owner: &str = collection.owner();
        let mut components = Path::new(owner).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == owner =>
                Ok(self.root.join(owner)),
            _ => Err(DocumentStoreError::InvalidCollection(collection.to_string())),
        }
    }

    fn document_path(dir: &Path, id: Uuid) -> PathBuf {
        dir.join(id.hyphenated().to_string())
    }

    async fn read(
        &self,
        path: &Path,
    ) -> Result<Option<NoteRecord>, DocumentStoreError> {
        let file = match self.io.read_file(path, MAX_STORED_FILE_LEN).await? {
            Some(file) => file,
            None => return Ok(None),
        };
        if file.size > MAX_STORED_FILE_LEN {
            return Err(DocumentStoreError::TooBig);
        }
        Ok(Some(serde_json::from_str(&file.data)?))
    }

    async fn write(
        &self,
        dir: &Path,
        record: &NoteRecord,
    ) -> Result<(), DocumentStoreError> {
        self.io.create_dir_all(dir).await?;
        let data = serde_json::to_vec(record)?;
        write_file_atomically(
            &self.io,
            &Self::document_path(dir, record.id),
            &data,
        ).await?;
        Ok(())
    }

    async fn query_dir(
        &self,
        dir: &Path,
    ) -> Result<Vec<NoteRecord>, DocumentStoreError> {
        let names = match self.io.list_dir(dir).await {
            Ok(names) => names,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::with_capacity(names.len());
        for id in names.iter().filter_map(|name| try_extract_uuid(name)) {
            let path = Self::document_path(dir, id);
            match self.read(&path).await {
                Ok(Some(record)) if record.id == id => records.push(record),
                Ok(Some(record)) => warn!(
                    "document \"{}\" holds note {}, skipping",
                    path.display(),
                    record.id,
                ),
                // deleted since listing
                Ok(None) => {},
                Err(e) => error!(
                    "failed to read document \"{}\": {e}",
                    path.display(),
                ),
            }
        }
        sort_newest_first(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl<Io: StorageIo, W: FileWatcher> DocumentStore for DirectoryDocumentStoreImpl<Io, W> {
    async fn set_document(
        &self,
        collection: &CollectionPath,
        record: &NoteRecord,
    ) -> Result<(), DocumentStoreError> {
        trace!("setting document {collection}/{}", record.id);
        let dir = self.documents.collection_dir(collection)?;
        self.documents.write(&dir, record).await
    }

    async fn update_document(
        &self,
        collection: &CollectionPath,
        id: Uuid,
        patch: &RecordPatch,
    ) -> Result<(), DocumentStoreError> {
        trace!("updating document {collection}/{id}");
        let dir = self.documents.collection_dir(collection)?;
        let mut record = self.documents
            .read(&Documents::<Io>::document_path(&dir, id))
            .await?
            .ok_or(DocumentStoreError::NotFound(id))?;
        record.apply(patch.clone());
        self.documents.write(&dir, &record).await
    }

    async fn delete_document(
        &self,
        collection: &CollectionPath,
        id: Uuid,
    ) -> Result<(), DocumentStoreError> {
        trace!("deleting document {collection}/{id}");
        let dir = self.documents.collection_dir(collection)?;
        match self.documents.io
            .remove_file(&Documents::<Io>::document_path(&dir, id))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn query(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<NoteRecord>, DocumentStoreError> {
        let dir = self.documents.collection_dir(collection)?;
        self.documents.query_dir(&dir).await
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
    ) -> Result<RecordSnapshots, DocumentStoreError> {
        let dir = self.documents.collection_dir(collection)?;
        self.documents.io.create_dir_all(&dir).await?;
        let guard = self.file_watcher.watch(&dir)?;
        let events = guard.get_events();
        let documents = self.documents.clone();
        debug!("subscribing to {collection}");
        Ok(
            stream! {
                let _guard = guard;
                let mut events = Box::pin(events);
                let mut last = None;
                loop {
                    match documents.query_dir(&dir).await {
                        Ok(records) if last.as_ref() == Some(&records) =>
                            trace!("collection unchanged"),
                        Ok(records) => {
                            last = Some(records.clone());
                            yield Ok(records);
                        },
                        Err(e) => {
                            yield Err(e);
                        },
                    }
                    match events.next().await {
                        Some(Ok(_)) => {},
                        Some(Err(FileWatcherError::Overflow(n))) =>
                            warn!("missed {n} document events, requerying"),
                        Some(Err(e)) => {
                            yield Err(e.into());
                        },
                        None => break,
                    }
                }
                trace!("subscription to \"{}\" finished", dir.display());
            }.boxed()
        )
    }
}
