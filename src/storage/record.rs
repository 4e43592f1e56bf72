//! Persisted shape of notes.
//!
//! Timestamps come either as epoch milliseconds (the local blob) or as the
//! document store's `{seconds, nanoseconds}` pair. [`normalize`] is the single
//! place where both turn into [`Timestamp`]; nothing outside this module sees
//! the stored forms.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::data::{Note, NoteVersion, UserId};
use crate::storage::NoteChanges;
use crate::timestamp::Timestamp;

const MILLIS_IN_SECOND: i64 = 1_000;
const NANOS_IN_MILLI: u32 = 1_000_000;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StoredTimestamp {
    Millis(i64),
    Native {
        seconds: i64,
        nanoseconds: u32,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimestampStyle {
    Millis,
    Native,
}

pub fn normalize(timestamp: StoredTimestamp) -> Timestamp {
    match timestamp {
        StoredTimestamp::Millis(millis) => Timestamp::from_millis(millis),
        StoredTimestamp::Native { seconds, nanoseconds } => Timestamp::from_millis(
            seconds
                .saturating_mul(MILLIS_IN_SECOND)
                .saturating_add((nanoseconds / NANOS_IN_MILLI) as i64)
        ),
    }
}

impl StoredTimestamp {
    pub fn new(timestamp: Timestamp, style: TimestampStyle) -> Self {
        let millis = timestamp.as_millis();
        match style {
            TimestampStyle::Millis => StoredTimestamp::Millis(millis),
            TimestampStyle::Native => StoredTimestamp::Native {
                seconds: millis.div_euclid(MILLIS_IN_SECOND),
                nanoseconds: millis.rem_euclid(MILLIS_IN_SECOND) as u32
                    * NANOS_IN_MILLI,
            },
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub versions: Vec<VersionRecord>,
    pub created_at: StoredTimestamp,
    pub updated_at: StoredTimestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct VersionRecord {
    pub id: Uuid,
    pub content: String,
    pub timestamp: StoredTimestamp,
}

/// A targeted document update.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub versions: Option<Vec<VersionRecord>>,
    pub updated_at: StoredTimestamp,
}

impl NoteRecord {
    pub fn new(note: &Note, style: TimestampStyle) -> Self {
        NoteRecord {
            id: note.id,
            title: note.title.clone(),
            content: note.content.clone(),
            versions: note.versions
                .iter()
                .map(|v| VersionRecord::new(v, style))
                .collect(),
            created_at: StoredTimestamp::new(note.created_at, style),
            updated_at: StoredTimestamp::new(note.updated_at, style),
            owner_id: note.owner_id.clone(),
        }
    }

    pub fn apply(&mut self, patch: RecordPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(versions) = patch.versions {
            self.versions = versions;
        }
        self.updated_at = patch.updated_at;
    }
}

impl From<NoteRecord> for Note {
    fn from(value: NoteRecord) -> Self {
        Note {
            id: value.id,
            title: value.title,
            content: value.content,
            versions: value.versions
                .into_iter()
                .map(NoteVersion::from)
                .collect(),
            created_at: normalize(value.created_at),
            updated_at: normalize(value.updated_at),
            owner_id: value.owner_id,
        }
    }
}

impl VersionRecord {
    pub fn new(version: &NoteVersion, style: TimestampStyle) -> Self {
        VersionRecord {
            id: version.id,
            content: version.content.clone(),
            timestamp: StoredTimestamp::new(version.timestamp, style),
        }
    }
}

impl From<VersionRecord> for NoteVersion {
    fn from(value: VersionRecord) -> Self {
        NoteVersion {
            id: value.id,
            content: value.content,
            timestamp: normalize(value.timestamp),
        }
    }
}

impl RecordPatch {
    pub fn new(changes: &NoteChanges, style: TimestampStyle) -> Self {
        RecordPatch {
            title: changes.title.clone(),
            content: changes.content.clone(),
            versions: changes.versions
                .as_ref()
                .map(|versions| versions
                    .iter()
                    .map(|v| VersionRecord::new(v, style))
                    .collect()
                ),
            updated_at: StoredTimestamp::new(changes.updated_at, style),
        }
    }
}

pub fn parse_blob(blob: &str) -> Result<Vec<Note>, serde_json::Error> {
    Ok(
        serde_json::from_str::<Vec<NoteRecord>>(blob)?
            .into_iter()
            .map(Note::from)
            .collect()
    )
}

pub fn format_blob(notes: &[Note]) -> Result<String, serde_json::Error> {
    serde_json::to_string(
        &notes.iter()
            .map(|n| NoteRecord::new(n, TimestampStyle::Millis))
            .collect::<Vec<_>>()
    )
}
