use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::{mpsc, OwnedRwLockWriteGuard, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;
use crate::data::{ListOrder, Note, UserId};
use crate::identity::IdentityError;
use crate::notes_store::NotesStoreIo;
use crate::storage::{LoadedNotes, NoteChanges, NoteStorage, StorageError, StorageEvent};
use crate::timestamp::Timestamp;

#[derive(Clone)]
pub struct MockNotesStoreIo {
    now: Arc<AtomicI64>,
    next_uuid: Arc<AtomicU64>,
}

impl MockNotesStoreIo {
    pub fn new() -> Self {
        MockNotesStoreIo {
            now: Arc::new(AtomicI64::new(1_000)),
            next_uuid: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn set_now(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) -> Timestamp {
        Timestamp::from_millis(self.now.fetch_add(millis, Ordering::SeqCst) + millis)
    }
}

impl NotesStoreIo for MockNotesStoreIo {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now.load(Ordering::SeqCst))
    }

    fn generate_uuid(&self) -> Uuid {
        Uuid::from_u128(self.next_uuid.fetch_add(1, Ordering::SeqCst) as u128)
    }
}

#[derive(Clone)]
pub enum LoadBehavior {
    Found(Vec<Note>),
    Absent,
    Unreadable,
    NoIdentity,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StorageCall {
    Create(Note),
    Update(Uuid, NoteChanges),
    Delete(Uuid),
    Seed(Vec<Note>),
}

#[derive(Clone)]
pub struct MockNoteStorage {
    load: LoadBehavior,
    list_order: ListOrder,
    owner: Option<UserId>,
    calls: Arc<Mutex<Vec<StorageCall>>>,
    fail_writes: Arc<AtomicBool>,
    write_gate: Arc<RwLock<()>>,
    event_sender: mpsc::UnboundedSender<StorageEvent>,
    event_receiver: Arc<Mutex<Option<mpsc::UnboundedReceiver<StorageEvent>>>>,
}

impl MockNoteStorage {
    pub fn new(load: LoadBehavior) -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        MockNoteStorage {
            load,
            list_order: ListOrder::Insertion,
            owner: None,
            calls: Default::default(),
            fail_writes: Default::default(),
            write_gate: Default::default(),
            event_sender,
            event_receiver: Arc::new(Mutex::new(Some(event_receiver))),
        }
    }

    pub fn with_notes(notes: Vec<Note>) -> Self {
        Self::new(LoadBehavior::Found(notes))
    }

    pub fn ordered_by_update(mut self) -> Self {
        self.list_order = ListOrder::UpdatedDescending;
        self
    }

    pub fn owned_by(mut self, owner: &str) -> Self {
        self.owner = Some(UserId::new(owner));
        self
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Writes wait until the guard is dropped.
    pub async fn hold_writes(&self) -> OwnedRwLockWriteGuard<()> {
        self.write_gate.clone().write_owned().await
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// As if another session changed the collection.
    pub fn send_snapshot(&self, notes: Vec<Note>) {
        self.event_sender
            .send(StorageEvent::Snapshot(notes))
            .expect("store stopped listening");
    }

    async fn record(&self, call: StorageCall) -> Result<(), StorageError> {
        let _open = self.write_gate.read().await;
        self.calls.lock().unwrap().push(call);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

#[async_trait]
impl NoteStorage for MockNoteStorage {
    async fn load_all(&self) -> Result<LoadedNotes, StorageError> {
        match self.load.clone() {
            LoadBehavior::Found(notes) => Ok(LoadedNotes::Found(notes)),
            LoadBehavior::Absent => Ok(LoadedNotes::Absent),
            LoadBehavior::Unreadable => Err(
                StorageError::Malformed(
                    serde_json::from_str::<Vec<u8>>("{").unwrap_err()
                )
            ),
            LoadBehavior::NoIdentity => Err(
                StorageError::Identity(
                    IdentityError::SignIn(std::io::Error::other("offline"))
                )
            ),
        }
    }

    async fn create(&self, note: &Note) -> Result<(), StorageError> {
        self.record(StorageCall::Create(note.clone())).await
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &NoteChanges,
    ) -> Result<(), StorageError> {
        self.record(StorageCall::Update(id, changes.clone())).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        self.record(StorageCall::Delete(id)).await
    }

    async fn seed(&self, notes: &[Note]) {
        self.calls.lock().unwrap().push(StorageCall::Seed(notes.to_vec()));
    }

    async fn subscribe(
        &self,
    ) -> Result<BoxStream<'static, StorageEvent>, StorageError> {
        let receiver = self.event_receiver
            .lock()
            .unwrap()
            .take()
            .expect("subscribed twice");
        Ok(UnboundedReceiverStream::new(receiver).boxed())
    }

    fn list_order(&self) -> ListOrder {
        self.list_order
    }

    fn owner(&self) -> Option<UserId> {
        self.owner.clone()
    }
}
