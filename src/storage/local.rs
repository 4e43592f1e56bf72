
use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use log::{debug, error, info, trace, warn};
use tokio::sync::Mutex;
use uuid::Uuid;
use crate::data::{ListOrder, Note};
use crate::file_watcher::{FileWatchGuard, FileWatcher, FileWatcherError, ProductionFileWatcher};
use crate::lib_constants::{MAX_STORED_FILE_LEN, NOTES_BLOB_PATH};
use crate::storage::io_trait::{write_file_atomically, ProductionStorageIo, StorageIo};
use crate::storage::record::{format_blob, parse_blob};
use crate::storage::{LoadedNotes, NoteChanges, NoteStorage, StorageError, StorageEvent};

/// The whole collection as one JSON array in the data directory.
///
/// Other local sessions write the same file; their writes come back through
/// [`NoteStorage::subscribe`] as full snapshots.
pub type LocalNoteStorage = LocalNoteStorageImpl<ProductionStorageIo, ProductionFileWatcher>;

pub struct LocalNoteStorageImpl<Io: StorageIo, W: FileWatcher> {
    inner: Arc<Blob<Io>>,
    watch_guard: W::Guard,
}

struct Blob<Io: StorageIo> {
    io: Io,
    path: PathBuf,
    /// What the file holds as far as this session knows.
    persisted: Mutex<Vec<Note>>,
}

impl LocalNoteStorage {
    pub async fn new(
        data_directory: &Path,
        file_watcher: ProductionFileWatcher,
    ) -> Result<LocalNoteStorage, StorageError> {
        let io = ProductionStorageIo::new();
        io.create_dir_all(data_directory).await?;
        // watcher events carry canonical paths
        let data_directory = tokio::fs::canonicalize(data_directory).await?;
        Self::new_impl(&data_directory, io, file_watcher)
    }
}

impl<Io: StorageIo, W: FileWatcher> LocalNoteStorageImpl<Io, W> {
    pub fn new_impl(
        data_directory: &Path,
        io: Io,
        file_watcher: W,
    ) -> Result<Self, StorageError> {
        let path = data_directory.join(NOTES_BLOB_PATH);
        debug!("using local note storage at \"{}\"", path.display());
        let watch_guard = file_watcher.watch(data_directory)?;
        Ok(
            LocalNoteStorageImpl {
                inner: Arc::new(
                    Blob {
                        io,
                        path,
                        persisted: Mutex::new(Vec::new()),
                    }
                ),
                watch_guard,
            }
        )
    }

    pub fn blob_path(&self) -> &Path {
        &self.inner.path
    }
}

impl<Io: StorageIo> Blob<Io> {
    async fn read(&self) -> Result<Option<Vec<Note>>, StorageError> {
        trace!("reading notes from \"{}\"", self.path.display());
        let file = match self.io.read_file(&self.path, MAX_STORED_FILE_LEN).await? {
            Some(file) => file,
            None => return Ok(None),
        };
        if file.size > MAX_STORED_FILE_LEN {
            return Err(StorageError::TooBig);
        }
        Ok(Some(parse_blob(&file.data)?))
    }

    async fn write(&self, notes: &[Note]) -> Result<(), StorageError> {
        debug!(
            "writing {} notes to \"{}\"",
            notes.len(),
            self.path.display(),
        );
        let blob = format_blob(notes)?;
        write_file_atomically(&self.io, &self.path, blob.as_bytes()).await?;
        Ok(())
    }

    async fn reread(&self) -> Option<Vec<Note>> {
        let mut persisted = self.persisted.lock().await;
        match self.read().await {
            Ok(Some(notes)) if notes == *persisted => {
                trace!("notes file unchanged, ignoring the event");
                None
            },
            Ok(Some(notes)) => {
                info!("notes changed by another session");
                persisted.clone_from(&notes);
                Some(notes)
            },
            Ok(None) => {
                debug!("notes file removed, ignoring");
                None
            },
            Err(e) => {
                error!("failed to read notes changed by another session: {e}");
                None
            },
        }
    }
}

#[async_trait]
impl<Io: StorageIo, W: FileWatcher> NoteStorage for LocalNoteStorageImpl<Io, W> {
    async fn load_all(&self) -> Result<LoadedNotes, StorageError> {
        let mut persisted = self.inner.persisted.lock().await;
        Ok(
            match self.inner.read().await? {
                Some(notes) => {
                    debug!("loaded {} notes", notes.len());
                    persisted.clone_from(&notes);
                    LoadedNotes::Found(notes)
                },
                None => {
                    debug!("no notes stored yet");
                    LoadedNotes::Absent
                },
            }
        )
    }

    async fn seed(&self, notes: &[Note]) {
        debug!("starting over from {} notes", notes.len());
        *self.inner.persisted.lock().await = notes.to_vec();
    }

    async fn create(&self, note: &Note) -> Result<(), StorageError> {
        let mut persisted = self.inner.persisted.lock().await;
        match persisted.iter_mut().find(|n| n.id == note.id) {
            Some(existing) => existing.clone_from(note),
            None => persisted.insert(0, note.clone()),
        }
        self.inner.write(&persisted).await
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &NoteChanges,
    ) -> Result<(), StorageError> {
        let mut persisted = self.inner.persisted.lock().await;
        let note = persisted
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(StorageError::NoteNotFound)?;
        changes.apply(note);
        self.inner.write(&persisted).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        let mut persisted = self.inner.persisted.lock().await;
        let before = persisted.len();
        persisted.retain(|n| n.id != id);
        if persisted.len() == before {
            trace!("note {id} is not stored, nothing to delete");
            return Ok(());
        }
        self.inner.write(&persisted).await
    }

    async fn subscribe(
        &self,
    ) -> Result<BoxStream<'static, StorageEvent>, StorageError> {
        let blob = self.inner.clone();
        let events = self.watch_guard.get_events();
        Ok(
            stream! {
                let mut events = Box::pin(events);
                while let Some(event) = events.next().await {
                    match event {
                        Ok(event) if !event.touches(&blob.path) => continue,
                        Ok(_) => {},
                        Err(FileWatcherError::Overflow(n)) =>
                            warn!("missed {n} file events, rereading notes"),
                        Err(e) => {
                            error!("failed to watch notes: {e}");
                            continue
                        },
                    }
                    if let Some(notes) = blob.reread().await {
                        yield StorageEvent::Snapshot(notes);
                    }
                }
                trace!("stopped observing the notes file");
            }.boxed()
        )
    }

    fn list_order(&self) -> ListOrder {
        ListOrder::Insertion
    }
}
