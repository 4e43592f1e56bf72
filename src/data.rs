use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::lib_constants::DEFAULT_NOTE_TITLE;
use crate::timestamp::Timestamp;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    /// Newest first.
    pub versions: Vec<NoteVersion>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Only set by stores that keep a collection per account.
    pub owner_id: Option<UserId>,
}

impl Note {
    pub fn new(id: Uuid, now: Timestamp, owner_id: Option<UserId>) -> Self {
        Note {
            id,
            title: DEFAULT_NOTE_TITLE.to_owned(),
            content: String::new(),
            versions: Vec::new(),
            created_at: now,
            updated_at: now,
            owner_id,
        }
    }

    pub fn find_version(&self, version_id: Uuid) -> Option<&NoteVersion> {
        self.versions.iter().find(|v| v.id == version_id)
    }
}

/// Content of a note as it was right before it got replaced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NoteVersion {
    pub id: Uuid,
    pub content: String,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NoteUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        NoteUpdate {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        NoteUpdate {
            title: None,
            content: Some(content.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        UserId(value.into())
    }
}

impl Deref for UserId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How [`crate::notes_store::NotesStore::list_notes`] orders the collection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListOrder {
    /// As kept by the store, new notes first.
    Insertion,
    UpdatedDescending,
}
