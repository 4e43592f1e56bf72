//! Edit buffer of one open note.
//!
//! Typing goes into a draft; the draft reaches the store once input stops
//! for the save delay. While a draft is pending, snapshots from other
//! sessions do not overwrite it: the draft is applied on top of them when
//! its own timer fires.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use boolean_enums::gen_boolean_enum;
use log::{debug, trace};
use tokio::sync::watch;
use uuid::Uuid;
use crate::data::NoteUpdate;
use crate::notes_store::{NotesStoreImpl, NotesStoreIo};
use crate::scheduler::SaveScheduler;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SaveState {
    Idle,
    PendingEdit,
    Committing,
}

gen_boolean_enum!(pub FlushPending);

pub struct NoteEditor<Io: NotesStoreIo> {
    note_id: Uuid,
    store: NotesStoreImpl<Io>,
    scheduler: SaveScheduler<Uuid>,
    save_delay: Duration,
    shared: Arc<Shared>,
}

struct Shared {
    draft: Mutex<Draft>,
    save_state: watch::Sender<SaveState>,
}

struct Draft {
    title: String,
    content: String,
    edits: u64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Draft> {
        self.draft.lock().expect("failed locking the note draft")
    }
}

impl<Io: NotesStoreIo> NoteEditor<Io> {
    /// `None` if there is no such note.
    pub async fn open(
        store: NotesStoreImpl<Io>,
        note_id: Uuid,
        save_delay: Duration,
    ) -> Option<Self> {
        let note = store.note(note_id).await?;
        debug!("editing note {note_id}");
        Some(
            NoteEditor {
                note_id,
                store,
                scheduler: SaveScheduler::new(),
                save_delay,
                shared: Arc::new(
                    Shared {
                        draft: Mutex::new(
                            Draft {
                                title: note.title,
                                content: note.content,
                                edits: 0,
                            }
                        ),
                        save_state: watch::Sender::new(SaveState::Idle),
                    }
                ),
            }
        )
    }

    pub fn note_id(&self) -> Uuid {
        self.note_id
    }

    pub fn title(&self) -> String {
        self.shared.lock().title.clone()
    }

    pub fn content(&self) -> String {
        self.shared.lock().content.clone()
    }

    pub fn save_state(&self) -> SaveState {
        *self.shared.save_state.borrow()
    }

    pub fn watch_save_state(&self) -> watch::Receiver<SaveState> {
        self.shared.save_state.subscribe()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.edit(|draft| draft.title = title.into());
    }

    pub fn set_content(&self, content: impl Into<String>) {
        self.edit(|draft| draft.content = content.into());
    }

    fn edit(&self, change: impl FnOnce(&mut Draft)) {
        {
            let mut draft = self.shared.lock();
            change(&mut draft);
            draft.edits += 1;
            self.shared.save_state.send_replace(SaveState::PendingEdit);
        }
        let shared = self.shared.clone();
        let store = self.store.clone();
        let note_id = self.note_id;
        self.scheduler.arm(
            note_id,
            self.save_delay,
            move || commit(shared, store, note_id),
        );
    }

    /// Takes the stored title and content unless there are unsaved edits.
    /// Returns whether the draft changed.
    pub async fn sync_from_store(&self) -> bool {
        let Some(note) = self.store.note(self.note_id).await else {
            return false;
        };
        let mut draft = self.shared.lock();
        if *self.shared.save_state.borrow() != SaveState::Idle {
            trace!("keeping the unsaved draft of note {}", self.note_id);
            return false;
        }
        if draft.title == note.title && draft.content == note.content {
            return false;
        }
        draft.title = note.title;
        draft.content = note.content;
        true
    }

    /// Waits for the draft to be saved, only returns while edits keep
    /// coming if they are saved in between.
    pub async fn wait_saved(&self) {
        let mut save_state = self.shared.save_state.subscribe();
        let _ = save_state.wait_for(|s| *s == SaveState::Idle).await;
    }

    /// Without [`FlushPending::Yes`] a draft still waiting for its timer is
    /// discarded.
    pub async fn close(self, flush: FlushPending) {
        let pending = self.scheduler.cancel(&self.note_id);
        if flush.into() {
            if pending {
                commit(self.shared.clone(), self.store.clone(), self.note_id).await;
            }
            self.wait_saved().await;
        } else if pending {
            debug!("discarding unsaved edits of note {}", self.note_id);
            self.shared.save_state.send_replace(SaveState::Idle);
        }
    }
}

impl<Io: NotesStoreIo> Drop for NoteEditor<Io> {
    fn drop(&mut self) {
        self.scheduler.cancel_all();
    }
}

async fn commit<Io: NotesStoreIo>(
    shared: Arc<Shared>,
    store: NotesStoreImpl<Io>,
    note_id: Uuid,
) {
    let (title, content, edits) = {
        let draft = shared.lock();
        shared.save_state.send_replace(SaveState::Committing);
        (draft.title.clone(), draft.content.clone(), draft.edits)
    };
    match store.note(note_id).await {
        Some(current) => {
            let update = NoteUpdate {
                title: (title != current.title).then_some(title),
                content: (content != current.content).then_some(content),
            };
            if update.is_empty() {
                trace!("draft of note {note_id} matches the store");
            } else {
                store.update_note(note_id, update).await;
            }
        },
        None => debug!("note {note_id} is gone, dropping its draft"),
    }
    let draft = shared.lock();
    if draft.edits == edits {
        shared.save_state.send_replace(SaveState::Idle);
    }
}
