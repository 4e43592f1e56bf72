use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};
use futures::stream::BoxStream;
use futures::StreamExt;
use log::{debug, error, info, trace};
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use uuid::Uuid;
use crate::data::{ListOrder, Note, NoteUpdate};
use crate::lib_constants::{WELCOME_NOTE_CONTENT, WELCOME_NOTE_TITLE};
use crate::notes_store::io_trait::NotesStoreIo;
use crate::storage::{LoadedNotes, NoteChanges, NoteStorage, StorageError, StorageEvent};
use crate::version_policy::{changes_content, decide_versions};

pub struct NotesStoreImpl<Io: NotesStoreIo> {
    shared: Arc<Shared<Io>>,
}

impl<Io: NotesStoreIo> Clone for NotesStoreImpl<Io> {
    fn clone(&self) -> Self {
        NotesStoreImpl {
            shared: self.shared.clone(),
        }
    }
}

struct Shared<Io: NotesStoreIo> {
    io: Io,
    storage: Arc<dyn NoteStorage>,
    state: RwLock<State>,
    writes: mpsc::UnboundedSender<Write>,
    pending: Arc<PendingWrites>,
    loading: watch::Sender<bool>,
    revision: watch::Sender<u64>,
    _die_notice: oneshot::Sender<()>,
}

struct State {
    notes: Vec<Note>,
    active_id: Option<Uuid>,
    list_order: ListOrder,
}

enum Write {
    Create(Note),
    Update(Uuid, NoteChanges),
    Delete(Uuid),
    Seed(Vec<Note>),
    Flush(oneshot::Sender<()>),
}

impl Write {
    fn note_id(&self) -> Option<Uuid> {
        match self {
            Write::Create(note) => Some(note.id),
            Write::Update(id, _) | Write::Delete(id) => Some(*id),
            Write::Seed(_) | Write::Flush(_) => None,
        }
    }
}

/// Notes with writes that did not reach the storage yet.
#[derive(Default)]
struct PendingWrites(Mutex<HashMap<Uuid, usize>>);

impl PendingWrites {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, usize>> {
        self.0.lock().expect("failed locking the pending writes")
    }

    fn add(&self, id: Uuid) {
        *self.lock().entry(id).or_default() += 1;
    }

    fn done(&self, id: Uuid) {
        let mut pending = self.lock();
        if let Some(count) = pending.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                pending.remove(&id);
            }
        }
    }

    fn ids(&self) -> HashSet<Uuid> {
        self.lock().keys().copied().collect()
    }
}

enum Bootstrap {
    None,
    /// Nothing was stored, the welcome note gets written.
    Write(Note),
    /// The stored notes are unreadable, the storage starts over from ours.
    Seed,
}

struct Loaded {
    notes: Vec<Note>,
    bootstrap: Bootstrap,
}

impl State {
    fn sorted(&self) -> Vec<Note> {
        let mut notes = self.notes.clone();
        match self.list_order {
            ListOrder::Insertion => {},
            ListOrder::UpdatedDescending =>
                notes.sort_by_key(|n| Reverse(n.updated_at)),
        }
        notes
    }

    fn first_id(&self) -> Option<Uuid> {
        let first = match self.list_order {
            ListOrder::Insertion => self.notes.first(),
            // the first of equals, like the stable sort above
            ListOrder::UpdatedDescending => self.notes
                .iter()
                .min_by_key(|n| Reverse(n.updated_at)),
        };
        first.map(|n| n.id)
    }

    fn find(&self, id: Uuid) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }
}

impl<Io: NotesStoreIo> NotesStoreImpl<Io> {
    pub fn new_impl(io: Io, storage: impl NoteStorage) -> Self {
        let storage: Arc<dyn NoteStorage> = Arc::new(storage);
        let (writes, write_receiver) = mpsc::unbounded_channel();
        let (die_notice, die_receiver) = oneshot::channel();
        let pending = Arc::new(PendingWrites::default());
        let shared = Arc::new(
            Shared {
                io,
                storage: storage.clone(),
                state: RwLock::new(
                    State {
                        notes: Vec::new(),
                        active_id: None,
                        list_order: storage.list_order(),
                    }
                ),
                writes,
                pending: pending.clone(),
                loading: watch::Sender::new(true),
                revision: watch::Sender::new(0),
                _die_notice: die_notice,
            }
        );
        tokio::spawn(drain_writes(storage, pending, write_receiver));
        tokio::spawn(load_and_follow(Arc::downgrade(&shared), die_receiver));
        NotesStoreImpl { shared }
    }

    /// Ordered per the backing storage, see [`NoteStorage::list_order`].
    pub async fn list_notes(&self) -> Vec<Note> {
        self.shared.state.read().await.sorted()
    }

    pub async fn note(&self, id: Uuid) -> Option<Note> {
        self.shared.state.read().await.find(id).cloned()
    }

    pub async fn active_note(&self) -> Option<Note> {
        let state = self.shared.state.read().await;
        state.active_id.and_then(|id| state.find(id).cloned())
    }

    pub async fn active_note_id(&self) -> Option<Uuid> {
        self.shared.state.read().await.active_id
    }

    pub async fn set_active_note_id(&self, id: Option<Uuid>) {
        let mut state = self.shared.state.write().await;
        if state.active_id != id {
            trace!("active note is now {id:?}");
            state.active_id = id;
            self.shared.bump_revision();
        }
    }

    /// Returns `None` only while loading.
    pub async fn add_note(&self) -> Option<Uuid> {
        let mut state = self.shared.state.write().await;
        if self.shared.ignored_while_loading("add a note") {
            return None;
        }
        let note = Note::new(
            self.shared.io.generate_uuid(),
            self.shared.io.now(),
            self.shared.storage.owner(),
        );
        let id = note.id;
        debug!("adding note {id}");
        state.notes.insert(0, note.clone());
        state.active_id = Some(id);
        self.shared.enqueue(Write::Create(note));
        self.shared.bump_revision();
        Some(id)
    }

    pub async fn delete_note(&self, id: Uuid) {
        let mut state = self.shared.state.write().await;
        if self.shared.ignored_while_loading("delete a note") {
            return;
        }
        let Some(index) = state.notes.iter().position(|n| n.id == id) else {
            trace!("no note {id} to delete");
            return;
        };
        debug!("deleting note {id}");
        state.notes.remove(index);
        if state.active_id == Some(id) {
            state.active_id = state.first_id();
        }
        self.shared.enqueue(Write::Delete(id));
        self.shared.bump_revision();
    }

    pub async fn update_note(&self, id: Uuid, update: NoteUpdate) {
        let mut state = self.shared.state.write().await;
        if self.shared.ignored_while_loading("update a note") {
            return;
        }
        if self.shared.apply_update(&mut state, id, update) {
            self.shared.bump_revision();
        }
    }

    /// Returns whether the version was found and restored.
    pub async fn restore_version(&self, id: Uuid, version_id: Uuid) -> bool {
        let mut state = self.shared.state.write().await;
        if self.shared.ignored_while_loading("restore a version") {
            return false;
        }
        let Some(content) = state
            .find(id)
            .and_then(|n| n.find_version(version_id))
            .map(|v| v.content.clone())
        else {
            trace!("no version {version_id} of note {id} to restore");
            return false;
        };
        debug!("restoring version {version_id} of note {id}");
        let restored = self.shared.apply_update(
            &mut state,
            id,
            NoteUpdate::content(content),
        );
        if restored {
            self.shared.bump_revision();
        }
        restored
    }

    pub fn is_loading(&self) -> bool {
        *self.shared.loading.borrow()
    }

    /// Never returns if the notes can not be loaded at all.
    pub async fn wait_loaded(&self) {
        let mut loading = self.shared.loading.subscribe();
        // the sender lives as long as self
        let _ = loading.wait_for(|loading| !loading).await;
    }

    /// Waits until every write issued so far reached the backing storage.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.shared.enqueue(Write::Flush(done));
        let _ = wait.await;
    }

    /// Changes its value on every change of the notes or the selection.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }
}

impl<Io: NotesStoreIo> Shared<Io> {
    fn ignored_while_loading(&self, what: &str) -> bool {
        let loading = *self.loading.borrow();
        if loading {
            debug!("notes are still loading, refusing to {what}");
        }
        loading
    }

    fn enqueue(&self, write: Write) {
        let id = write.note_id();
        if let Some(id) = id {
            self.pending.add(id);
        }
        if self.writes.send(write).is_err() {
            if let Some(id) = id {
                self.pending.done(id);
            }
            error!("note writer has stopped, the change is not saved");
        }
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    fn apply_update(&self, state: &mut State, id: Uuid, update: NoteUpdate) -> bool {
        let Some(note) = state.notes.iter_mut().find(|n| n.id == id) else {
            trace!("no note {id} to update");
            return false;
        };
        let versions = changes_content(note, &update)
            .then(|| decide_versions(note, &update, || self.io.generate_uuid()));
        let changes = NoteChanges {
            title: update.title,
            content: update.content,
            versions,
            updated_at: self.io.now().max(note.updated_at),
        };
        trace!("updating note {id}: {changes:?}");
        changes.apply(note);
        self.enqueue(Write::Update(id, changes));
        true
    }

    fn welcome_note(&self) -> Note {
        let mut note = Note::new(
            self.io.generate_uuid(),
            self.io.now(),
            self.storage.owner(),
        );
        note.title = WELCOME_NOTE_TITLE.to_owned();
        note.content = WELCOME_NOTE_CONTENT.to_owned();
        note
    }

    /// `None` if there is no way to see any notes.
    fn loaded(&self, result: Result<LoadedNotes, StorageError>) -> Option<Loaded> {
        Some(
            match result {
                Ok(LoadedNotes::Found(notes)) => {
                    debug!("loaded {} notes", notes.len());
                    Loaded {
                        notes,
                        bootstrap: Bootstrap::None,
                    }
                },
                Ok(LoadedNotes::Absent) => {
                    info!("no notes stored yet, creating the welcome note");
                    let welcome = self.welcome_note();
                    Loaded {
                        notes: vec![welcome.clone()],
                        bootstrap: Bootstrap::Write(welcome),
                    }
                },
                Err(StorageError::Identity(e)) => {
                    error!("notes are unavailable without an identity: {e}");
                    return None;
                },
                Err(e) => {
                    error!("failed to load notes, starting with the welcome note: {e}");
                    Loaded {
                        notes: vec![self.welcome_note()],
                        bootstrap: Bootstrap::Seed,
                    }
                },
            }
        )
    }

    async fn finish_loading(&self, loaded: Loaded) {
        let mut state = self.state.write().await;
        match loaded.bootstrap {
            Bootstrap::None => {},
            Bootstrap::Write(welcome) => self.enqueue(Write::Create(welcome)),
            Bootstrap::Seed => self.enqueue(Write::Seed(loaded.notes.clone())),
        }
        state.notes = loaded.notes;
        if state.active_id.is_none() {
            state.active_id = state.first_id();
        }
        self.loading.send_replace(false);
        self.bump_revision();
    }

    async fn replace_notes(&self, notes: Vec<Note>) {
        let mut state = self.state.write().await;
        let notes = overlay_pending(&state, notes, &self.pending.ids());
        if state.notes == notes {
            trace!("snapshot matches the current notes");
            return;
        }
        info!(
            "replacing {} notes with {} from another session",
            state.notes.len(),
            notes.len(),
        );
        state.notes = notes;
        self.bump_revision();
    }
}

/// A snapshot can be older than writes still on their way to the storage,
/// notes with such writes keep their local state.
fn overlay_pending(
    state: &State,
    mut notes: Vec<Note>,
    pending: &HashSet<Uuid>,
) -> Vec<Note> {
    if pending.is_empty() {
        return notes;
    }
    notes.retain(|n| !pending.contains(&n.id) || state.find(n.id).is_some());
    for note in notes.iter_mut().filter(|n| pending.contains(&n.id)) {
        if let Some(local) = state.find(note.id) {
            trace!("keeping local note {} over the snapshot", note.id);
            note.clone_from(local);
        }
    }
    let unsaved: Vec<Note> = state.notes
        .iter()
        .filter(|n| pending.contains(&n.id) && !notes.iter().any(|s| s.id == n.id))
        .cloned()
        .collect();
    notes.splice(0..0, unsaved);
    notes
}

async fn drain_writes(
    storage: Arc<dyn NoteStorage>,
    pending: Arc<PendingWrites>,
    mut writes: mpsc::UnboundedReceiver<Write>,
) {
    while let Some(write) = writes.recv().await {
        let id = write.note_id();
        let result = match write {
            Write::Create(note) => {
                debug!("saving new note {}", note.id);
                storage.create(&note).await
            },
            Write::Update(id, changes) => {
                debug!("saving note {id}");
                storage.update(id, &changes).await
            },
            Write::Delete(id) => {
                debug!("deleting stored note {id}");
                storage.delete(id).await
            },
            Write::Seed(notes) => {
                storage.seed(&notes).await;
                continue;
            },
            Write::Flush(done) => {
                let _ = done.send(());
                continue;
            },
        };
        if let Some(id) = id {
            pending.done(id);
        }
        if let Err(e) = result {
            error!("failed to save notes: {e}");
        }
    }
    trace!("note writer finished");
}

async fn load_and_follow<Io: NotesStoreIo>(
    shared: Weak<Shared<Io>>,
    mut die_notice: oneshot::Receiver<()>,
) {
    let Some(storage) = shared.upgrade().map(|s| s.storage.clone()) else {
        return;
    };
    let result = tokio::select! {
        biased;
        _ = &mut die_notice => return,
        result = storage.load_all() => result,
    };
    let Some(mut events) = subscribe_loaded(&shared, &storage, result).await else {
        return;
    };
    loop {
        let event = tokio::select! {
            biased;
            _ = &mut die_notice => break,
            event = events.next() => event,
        };
        let Some(StorageEvent::Snapshot(notes)) = event else {
            debug!("note changes are no longer observed");
            break;
        };
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.replace_notes(notes).await;
    }
    trace!("stopped following note changes");
}

async fn subscribe_loaded<Io: NotesStoreIo>(
    shared: &Weak<Shared<Io>>,
    storage: &Arc<dyn NoteStorage>,
    result: Result<LoadedNotes, StorageError>,
) -> Option<BoxStream<'static, StorageEvent>> {
    let shared = shared.upgrade()?;
    let loaded = shared.loaded(result)?;
    let events = storage
        .subscribe()
        .await
        .inspect_err(|e| error!("changes from other sessions will not be seen: {e}"))
        .ok();
    shared.finish_loading(loaded).await;
    events
}
