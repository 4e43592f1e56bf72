pub(crate) mod mocks;

use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;
use crate::data::{Note, NoteUpdate, NoteVersion, UserId};
use crate::lib_constants::{DEFAULT_NOTE_TITLE, MAX_VERSIONS, WELCOME_NOTE_CONTENT, WELCOME_NOTE_TITLE};
use crate::notes_store::NotesStoreImpl;
use crate::storage::NoteChanges;
use crate::timestamp::Timestamp;
use mocks::{LoadBehavior, MockNoteStorage, MockNotesStoreIo, StorageCall};

type TestStore = NotesStoreImpl<MockNotesStoreIo>;

async fn open(storage: &MockNoteStorage) -> (TestStore, MockNotesStoreIo) {
    let io = MockNotesStoreIo::new();
    let store = NotesStoreImpl::new_impl(io.clone(), storage.clone());
    timeout(Duration::from_secs(10), store.wait_loaded())
        .await
        .expect("store did not load");
    (store, io)
}

fn note(id: u128, content: &str, updated_millis: i64) -> Note {
    let mut note = Note::new(
        Uuid::from_u128(id),
        Timestamp::from_millis(updated_millis),
        None,
    );
    note.title = format!("note {id}");
    note.content = content.into();
    note
}

fn ts(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

fn ids(notes: &[Note]) -> Vec<Uuid> {
    notes.iter().map(|n| n.id).collect()
}

#[tokio::test]
async fn absent_storage_gets_welcome_note_written() {
    let storage = MockNoteStorage::new(LoadBehavior::Absent);
    let (store, _) = open(&storage).await;
    store.flush().await;

    let notes = store.list_notes().await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, WELCOME_NOTE_TITLE);
    assert_eq!(notes[0].content, WELCOME_NOTE_CONTENT);
    assert!(notes[0].versions.is_empty());
    assert_eq!(store.active_note().await, Some(notes[0].clone()));
    assert_eq!(storage.calls(), vec![StorageCall::Create(notes[0].clone())]);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn unreadable_storage_gets_unsaved_welcome_note() {
    let storage = MockNoteStorage::new(LoadBehavior::Unreadable);
    let (store, _) = open(&storage).await;
    store.flush().await;

    let notes = store.list_notes().await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, WELCOME_NOTE_TITLE);
    assert_eq!(storage.calls(), vec![StorageCall::Seed(notes.clone())]);
}

#[tokio::test]
async fn missing_identity_keeps_loading() {
    let storage = MockNoteStorage::new(LoadBehavior::NoIdentity);
    let store = NotesStoreImpl::new_impl(MockNotesStoreIo::new(), storage.clone());
    assert!(
        timeout(Duration::from_millis(200), store.wait_loaded())
            .await
            .is_err()
    );
    assert!(store.is_loading());
    assert_eq!(store.add_note().await, None);
    store.flush().await;
    assert!(storage.calls().is_empty());
    assert!(store.list_notes().await.is_empty());
}

#[tokio::test]
async fn loaded_notes_select_the_first() {
    let notes = vec![note(101, "a", 1_000), note(102, "b", 2_000)];
    let storage = MockNoteStorage::with_notes(notes.clone());
    let (store, _) = open(&storage).await;
    assert_eq!(store.list_notes().await, notes);
    assert_eq!(store.active_note_id().await, Some(notes[0].id));
}

#[tokio::test]
async fn add_on_empty_creates_active_untitled_note() {
    let storage = MockNoteStorage::with_notes(vec![]);
    let (store, _) = open(&storage).await;
    assert_eq!(store.active_note().await, None);

    let id = store.add_note().await.expect("not loaded");
    store.flush().await;

    let notes = store.list_notes().await;
    assert_eq!(notes.len(), 1);
    let created = &notes[0];
    assert_eq!(created.id, id);
    assert_eq!(created.title, DEFAULT_NOTE_TITLE);
    assert_eq!(created.content, "");
    assert!(created.versions.is_empty());
    assert_eq!(created.created_at, ts(1_000));
    assert_eq!(created.updated_at, created.created_at);
    assert_eq!(store.active_note_id().await, Some(id));
    assert_eq!(storage.calls(), vec![StorageCall::Create(created.clone())]);
}

#[tokio::test]
async fn new_notes_carry_storage_owner() {
    let storage = MockNoteStorage::with_notes(vec![]).owned_by("alice");
    let (store, _) = open(&storage).await;
    let id = store.add_note().await.unwrap();
    assert_eq!(
        store.note(id).await.unwrap().owner_id,
        Some(UserId::new("alice")),
    );
}

#[tokio::test]
async fn new_notes_come_first_in_insertion_order() {
    let storage = MockNoteStorage::with_notes(vec![note(101, "", 5_000)]);
    let (store, _) = open(&storage).await;
    let first = store.add_note().await.unwrap();
    let second = store.add_note().await.unwrap();
    assert_eq!(
        ids(&store.list_notes().await),
        vec![second, first, Uuid::from_u128(101)],
    );
}

#[tokio::test]
async fn updated_descending_order_follows_edits() {
    let storage = MockNoteStorage::with_notes(vec![
        note(101, "", 1_000),
        note(102, "", 3_000),
        note(103, "", 2_000),
    ]).ordered_by_update();
    let (store, io) = open(&storage).await;
    assert_eq!(
        ids(&store.list_notes().await),
        [102, 103, 101].map(Uuid::from_u128),
    );
    assert_eq!(store.active_note_id().await, Some(Uuid::from_u128(102)));

    io.set_now(4_000);
    store.update_note(Uuid::from_u128(101), NoteUpdate::title("bumped")).await;
    assert_eq!(
        ids(&store.list_notes().await),
        [101, 102, 103].map(Uuid::from_u128),
    );
}

#[tokio::test]
async fn deleting_only_active_note_clears_selection() {
    let storage = MockNoteStorage::with_notes(vec![note(101, "", 1_000)]);
    let (store, _) = open(&storage).await;
    store.delete_note(Uuid::from_u128(101)).await;
    store.flush().await;
    assert!(store.list_notes().await.is_empty());
    assert_eq!(store.active_note_id().await, None);
    assert_eq!(storage.calls(), vec![StorageCall::Delete(Uuid::from_u128(101))]);
}

#[tokio::test]
async fn deleting_other_note_keeps_selection() {
    let storage = MockNoteStorage::with_notes(vec![
        note(101, "", 1_000),
        note(102, "", 2_000),
    ]);
    let (store, _) = open(&storage).await;
    store.set_active_note_id(Some(Uuid::from_u128(102))).await;
    store.delete_note(Uuid::from_u128(101)).await;
    assert_eq!(store.active_note_id().await, Some(Uuid::from_u128(102)));
}

#[tokio::test]
async fn deleting_active_note_selects_first_listed() {
    let storage = MockNoteStorage::with_notes(vec![
        note(101, "", 1_000),
        note(102, "", 3_000),
        note(103, "", 2_000),
    ]).ordered_by_update();
    let (store, _) = open(&storage).await;
    assert_eq!(store.active_note_id().await, Some(Uuid::from_u128(102)));
    store.delete_note(Uuid::from_u128(102)).await;
    assert_eq!(store.active_note_id().await, Some(Uuid::from_u128(103)));
}

#[tokio::test]
async fn unknown_ids_are_ignored() {
    let storage = MockNoteStorage::with_notes(vec![note(101, "", 1_000)]);
    let (store, _) = open(&storage).await;
    let before = store.list_notes().await;

    store.delete_note(Uuid::from_u128(999)).await;
    store.update_note(Uuid::from_u128(999), NoteUpdate::content("x")).await;
    assert!(!store.restore_version(Uuid::from_u128(999), Uuid::from_u128(1)).await);
    assert!(!store.restore_version(Uuid::from_u128(101), Uuid::from_u128(1)).await);
    store.flush().await;

    assert_eq!(store.list_notes().await, before);
    assert!(storage.calls().is_empty());
}

#[tokio::test]
async fn content_changes_keep_pre_images_newest_first() {
    let storage = MockNoteStorage::with_notes(vec![note(101, "hello", 1_000)]);
    let (store, io) = open(&storage).await;
    let id = Uuid::from_u128(101);

    io.set_now(2_000);
    store.update_note(id, NoteUpdate::content("hello world")).await;
    io.set_now(3_000);
    store.update_note(id, NoteUpdate::content("hello world!")).await;

    let updated = store.note(id).await.unwrap();
    assert_eq!(updated.content, "hello world!");
    assert_eq!(updated.updated_at, ts(3_000));
    let history: Vec<_> = updated.versions
        .iter()
        .map(|v| (v.content.as_str(), v.timestamp))
        .collect();
    assert_eq!(history, vec![("hello world", ts(2_000)), ("hello", ts(1_000))]);
}

#[tokio::test]
async fn title_only_update_keeps_versions() {
    let storage = MockNoteStorage::with_notes(vec![note(101, "body", 1_000)]);
    let (store, io) = open(&storage).await;
    let id = Uuid::from_u128(101);

    io.set_now(2_000);
    store.update_note(id, NoteUpdate::title("renamed")).await;
    store.flush().await;

    let updated = store.note(id).await.unwrap();
    assert_eq!(updated.title, "renamed");
    assert!(updated.versions.is_empty());
    assert_eq!(
        storage.calls(),
        vec![StorageCall::Update(
            id,
            NoteChanges {
                title: Some("renamed".into()),
                content: None,
                versions: None,
                updated_at: ts(2_000),
            },
        )],
    );
}

#[tokio::test]
async fn unchanged_content_creates_no_version() {
    let storage = MockNoteStorage::with_notes(vec![note(101, "same", 1_000)]);
    let (store, io) = open(&storage).await;
    let id = Uuid::from_u128(101);
    io.set_now(2_000);
    store.update_note(id, NoteUpdate::content("same")).await;
    let updated = store.note(id).await.unwrap();
    assert!(updated.versions.is_empty());
    assert_eq!(updated.updated_at, ts(2_000));
}

#[tokio::test]
async fn history_is_capped() {
    let storage = MockNoteStorage::with_notes(vec![note(101, "v0", 1_000)]);
    let (store, io) = open(&storage).await;
    let id = Uuid::from_u128(101);

    for n in 1..=MAX_VERSIONS {
        io.advance(1_000);
        store.update_note(id, NoteUpdate::content(format!("v{n}"))).await;
    }
    let full = store.note(id).await.unwrap();
    assert_eq!(full.versions.len(), MAX_VERSIONS);
    assert_eq!(full.versions.last().unwrap().content, "v0");

    io.advance(1_000);
    store.update_note(id, NoteUpdate::content("one more")).await;
    let capped = store.note(id).await.unwrap();
    assert_eq!(capped.versions.len(), MAX_VERSIONS);
    assert_eq!(capped.versions[0].content, format!("v{MAX_VERSIONS}"));
    assert_eq!(capped.versions.last().unwrap().content, "v1");

    for n in 0..5 {
        store.update_note(id, NoteUpdate::content(format!("more {n}"))).await;
        assert!(store.note(id).await.unwrap().versions.len() <= MAX_VERSIONS);
    }
}

#[tokio::test]
async fn restore_snapshots_replaced_content() {
    let mut stored = note(101, "current", 5_000);
    stored.versions = vec![
        NoteVersion {
            id: Uuid::from_u128(501),
            content: "older".into(),
            timestamp: ts(1_000),
        },
    ];
    let storage = MockNoteStorage::with_notes(vec![stored]);
    let (store, io) = open(&storage).await;
    let id = Uuid::from_u128(101);

    io.set_now(6_000);
    assert!(store.restore_version(id, Uuid::from_u128(501)).await);

    let restored = store.note(id).await.unwrap();
    assert_eq!(restored.content, "older");
    assert_eq!(restored.versions.len(), 2);
    assert_eq!(restored.versions[0].content, "current");
    assert_eq!(restored.versions[0].timestamp, ts(5_000));
    assert_eq!(restored.versions[1].id, Uuid::from_u128(501));
}

#[tokio::test]
async fn update_time_never_goes_back() {
    let storage = MockNoteStorage::with_notes(vec![note(101, "", 10_000)]);
    let (store, io) = open(&storage).await;
    io.set_now(2_000);
    store.update_note(Uuid::from_u128(101), NoteUpdate::content("x")).await;
    assert_eq!(store.note(Uuid::from_u128(101)).await.unwrap().updated_at, ts(10_000));
}

#[tokio::test]
async fn writes_reach_storage_in_issue_order() {
    let storage = MockNoteStorage::with_notes(vec![]);
    let (store, _) = open(&storage).await;
    let id = store.add_note().await.unwrap();
    store.update_note(id, NoteUpdate::title("t")).await;
    store.delete_note(id).await;
    store.flush().await;

    let calls = storage.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], StorageCall::Create(ref n) if n.id == id));
    assert!(matches!(calls[1], StorageCall::Update(u, _) if u == id));
    assert_eq!(calls[2], StorageCall::Delete(id));
}

#[tokio::test]
async fn failed_writes_are_not_rolled_back() {
    let storage = MockNoteStorage::with_notes(vec![]);
    let (store, _) = open(&storage).await;
    storage.fail_writes(true);
    let id = store.add_note().await.unwrap();
    store.update_note(id, NoteUpdate::content("kept")).await;
    store.flush().await;

    assert_eq!(storage.calls().len(), 2);
    assert_eq!(store.note(id).await.unwrap().content, "kept");
}

#[tokio::test]
async fn snapshots_from_other_sessions_replace_notes() {
    let storage = MockNoteStorage::with_notes(vec![note(101, "mine", 1_000)]);
    let (store, _) = open(&storage).await;
    let mut changes = store.subscribe_changes();

    let theirs = vec![note(102, "theirs", 2_000), note(101, "edited", 2_000)];
    storage.send_snapshot(theirs.clone());
    timeout(Duration::from_secs(10), changes.changed())
        .await
        .expect("no change published")
        .unwrap();

    assert_eq!(store.list_notes().await, theirs);
    assert_eq!(store.active_note().await.unwrap().content, "edited");
    store.flush().await;
    assert!(storage.calls().is_empty());
}

#[tokio::test]
async fn snapshot_does_not_undo_writes_in_flight() {
    let storage = MockNoteStorage::with_notes(vec![note(101, "v1", 1_000)]);
    let (store, io) = open(&storage).await;
    let mut changes = store.subscribe_changes();
    let held = storage.hold_writes().await;

    io.set_now(2_000);
    store.update_note(Uuid::from_u128(101), NoteUpdate::content("v2")).await;
    io.set_now(3_000);
    store.update_note(Uuid::from_u128(101), NoteUpdate::content("v3")).await;
    let added = store.add_note().await.unwrap();
    changes.mark_unchanged();

    // the echo of the first write, before the others are stored
    let mut echo = note(101, "v2", 2_000);
    echo.versions = store.note(Uuid::from_u128(101)).await.unwrap().versions[1..].to_vec();
    storage.send_snapshot(vec![echo, note(102, "theirs", 2_500)]);
    timeout(Duration::from_secs(10), changes.changed())
        .await
        .expect("no change published")
        .unwrap();

    let notes = store.list_notes().await;
    assert_eq!(ids(&notes), vec![added, Uuid::from_u128(101), Uuid::from_u128(102)]);
    let edited = &notes[1];
    assert_eq!(edited.content, "v3");
    assert_eq!(
        edited.versions.iter().map(|v| v.content.as_str()).collect::<Vec<_>>(),
        vec!["v2", "v1"],
    );

    drop(held);
    store.flush().await;
    io.set_now(4_000);
    store.update_note(Uuid::from_u128(101), NoteUpdate::content("v4")).await;
    assert_eq!(store.note(Uuid::from_u128(101)).await.unwrap().versions[0].content, "v3");
}

#[tokio::test]
async fn selection_changes_are_published() {
    let storage = MockNoteStorage::with_notes(vec![note(101, "", 1_000)]);
    let (store, _) = open(&storage).await;
    let mut changes = store.subscribe_changes();

    store.set_active_note_id(None).await;
    assert!(changes.has_changed().unwrap());
    changes.mark_unchanged();

    store.set_active_note_id(None).await;
    assert!(!changes.has_changed().unwrap());
    assert_eq!(store.active_note().await, None);
}
