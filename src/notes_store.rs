//! The authoritative in-memory note collection of a session.
//!
//! Mutations apply to memory first and reach the backing storage through an
//! ordered write queue; storage failures are logged and never undo what the
//! caller already sees. Snapshots published by other sessions replace the
//! collection wholesale.

mod internal;
mod io_trait;
#[cfg(test)] pub(crate) mod tests;

pub use internal::NotesStoreImpl;
pub use io_trait::{NotesStoreIo, ProductionNotesStoreIo};
use crate::storage::NoteStorage;

pub type NotesStore = NotesStoreImpl<ProductionNotesStoreIo>;

impl NotesStore {
    /// Starts loading right away, see [`NotesStoreImpl::is_loading`].
    /// Must be called within a tokio runtime.
    pub fn new(storage: impl NoteStorage) -> NotesStore {
        NotesStoreImpl::new_impl(ProductionNotesStoreIo, storage)
    }
}
