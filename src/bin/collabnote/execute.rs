use log::debug;
use thiserror::Error;
use tokio::signal::ctrl_c;
use uuid::Uuid;
use collabnote::config::app_config::AppConfig;
use collabnote::data::{Note, NoteUpdate, NoteVersion};
use collabnote::DEFAULT_NOTE_TITLE;
use collabnote::editor::NoteEditor;
use collabnote::notes_store::NotesStore;
use collabnote::util::StrExt;
use crate::cli::Command;

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("no note {0}")]
    NoteNotFound(Uuid),

    #[error("note {0} has no version {1}")]
    VersionNotFound(Uuid, Uuid),

    #[error("nothing to change, pass --title or --content")]
    NothingToChange,

    #[error("notes are still loading")]
    StillLoading,

    #[error("failed waiting for an interrupt: {0}")]
    Signal(#[from] std::io::Error),
}

pub async fn execute(
    command: Command,
    store: &NotesStore,
    app_config: &AppConfig,
) -> Result<(), ExecuteError> {
    match command {
        Command::List => print_list(store).await,
        Command::Show { id } => {
            let note = find_note(store, id).await?;
            println!("{}", display_title(&note));
            println!();
            println!("{}", note.content);
            println!();
            println!("Last updated {}", note.updated_at);
        },
        Command::New { title, content } => {
            let id = store.add_note().await.ok_or(ExecuteError::StillLoading)?;
            let update = NoteUpdate { title, content };
            if !update.is_empty() {
                store.update_note(id, update).await;
            }
            println!("{id}");
        },
        Command::Edit { id, title, content } => {
            if title.is_none() && content.is_none() {
                return Err(ExecuteError::NothingToChange);
            }
            let editor = NoteEditor::open(
                store.clone(),
                id,
                app_config.save_debounce_time(),
            )
                .await
                .ok_or(ExecuteError::NoteNotFound(id))?;
            if let Some(title) = title {
                editor.set_title(title);
            }
            if let Some(content) = content {
                editor.set_content(content);
            }
            if !app_config.flush_on_navigation {
                editor.wait_saved().await;
            }
            editor.close(app_config.flush_on_navigation.into()).await;
        },
        Command::Delete { id } => {
            find_note(store, id).await?;
            store.delete_note(id).await;
        },
        Command::History { id } => {
            let note = find_note(store, id).await?;
            if note.versions.is_empty() {
                println!("No previous versions found.");
            }
            for version in &note.versions {
                println!("{}", version_line(version));
            }
        },
        Command::Restore { id, version_id } => {
            find_note(store, id).await?;
            if !store.restore_version(id, version_id).await {
                return Err(ExecuteError::VersionNotFound(id, version_id));
            }
            println!("Version Restored");
        },
        Command::Watch => {
            let mut changes = store.subscribe_changes();
            print_list(store).await;
            loop {
                tokio::select! {
                    result = ctrl_c() => {
                        result?;
                        debug!("interrupted, stopping watching");
                        break
                    },
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break
                        }
                        println!();
                        print_list(store).await;
                    },
                }
            }
        },
    }
    Ok(())
}

async fn find_note(store: &NotesStore, id: Uuid) -> Result<Note, ExecuteError> {
    store.note(id).await.ok_or(ExecuteError::NoteNotFound(id))
}

async fn print_list(store: &NotesStore) {
    let notes = store.list_notes().await;
    if notes.is_empty() {
        println!("No notes yet.");
    }
    for note in &notes {
        println!("{}", note_line(note));
    }
}

fn display_title(note: &Note) -> String {
    note.title
        .nonblank_to_some()
        .unwrap_or_else(|| DEFAULT_NOTE_TITLE.to_owned())
}

fn note_line(note: &Note) -> String {
    let preview = Some(note.content.first_line())
        .filter(|line| !line.trim().is_empty())
        .unwrap_or("No content");
    format!("{}  {}  {}", note.id, display_title(note), preview)
}

fn version_line(version: &NoteVersion) -> String {
    let preview = Some(version.content.first_line())
        .filter(|line| !line.trim().is_empty())
        .unwrap_or("Empty content");
    format!("{}  {}  {}", version.id, version.timestamp, preview)
}
