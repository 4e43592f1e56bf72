use std::time::Duration;

pub const MAX_VERSIONS: usize = 20;

pub const DEFAULT_NOTE_TITLE: &str = "Untitled Note";

pub const WELCOME_NOTE_TITLE: &str = "Welcome to CollabNote!";
pub const WELCOME_NOTE_CONTENT: &str = "This is your first note. \
Start editing here!\n\
\n\
Features:\n\
- Create, edit, and delete notes.\n\
- Your notes are saved automatically after you stop typing.\n\
- Changes are synced across tabs in real-time.\n\
- Click the \"History\" button to view and restore previous versions \
of this note.";

pub const DEFAULT_SAVE_DEBOUNCE_TIME: Duration = Duration::from_millis(500);
pub const DEFAULT_FILE_WATCHER_DEBOUNCE_TIME: Duration = Duration::from_millis(100);

// relative to the data directory
pub const NOTES_BLOB_PATH: &str = "collab-notes.json";
pub const NOTES_DIRECTORY_PATH: &str = "notes";
pub const IDENTITY_PATH: &str = "identity";

pub const MAX_STORED_FILE_LEN: u64 = 16 * 1024 * 1024;
