//! Deciding when an update snapshots the note's content.
//!
//! The history is a log of pre-images: every entry holds the content a note
//! had right before a content change, stamped with the note's `updated_at`
//! at that moment. Restoring an entry therefore always brings back text that
//! was once live.

use uuid::Uuid;
use crate::data::{Note, NoteUpdate, NoteVersion};
use crate::lib_constants::MAX_VERSIONS;

pub fn changes_content(current: &Note, updates: &NoteUpdate) -> bool {
    updates.content
        .as_ref()
        .is_some_and(|content| *content != current.content)
}

pub fn decide_versions(
    current: &Note,
    updates: &NoteUpdate,
    new_id: impl FnOnce() -> Uuid,
) -> Vec<NoteVersion> {
    if !changes_content(current, updates) {
        return current.versions.clone();
    }
    let mut versions = Vec::with_capacity(
        (current.versions.len() + 1).min(MAX_VERSIONS)
    );
    versions.push(
        NoteVersion {
            id: new_id(),
            content: current.content.clone(),
            timestamp: current.updated_at,
        }
    );
    versions.extend(
        current.versions
            .iter()
            .take(MAX_VERSIONS - 1)
            .cloned()
    );
    versions
}
