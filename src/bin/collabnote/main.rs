use std::error::Error;
use clap::Parser;
use figment::Figment;
use log::{debug, error, info};
use collabnote::bin_constants::LOAD_TIMEOUT;
use collabnote::config::app_config::{AppConfig, StorageKind};
use collabnote::config::read::{read_app_config, ReadConfig};
use collabnote::error_exit;
use collabnote::file_watcher::ProductionFileWatcher;
use collabnote::identity::AnonymousIdentity;
use collabnote::logging::init_tool_logging;
use collabnote::notes_store::NotesStore;
use collabnote::storage::document_store::DirectoryDocumentStore;
use collabnote::storage::{LocalNoteStorage, RemoteNoteStorage};
use crate::cli::CliConfig;
use crate::execute::execute;

mod cli;
mod execute;

#[tokio::main]
async fn main() {
    init_tool_logging();

    let cli_config = CliConfig::parse();

    let ReadConfig { app_config, .. } = read_app_config(
        &cli_config.config_file,
        Figment::new(),
    ).unwrap_or_else(|e| {
        for e in e {
            error!("{e}");
        }
        info!("finishing due to a configuration error");
        std::process::exit(1)
    });

    let store = open_store(&app_config)
        .await
        .unwrap_or_else(|e| error_exit!("could not open the notes: {e}"));
    if tokio::time::timeout(LOAD_TIMEOUT, store.wait_loaded()).await.is_err() {
        error_exit!("notes did not load in {} s", LOAD_TIMEOUT.as_secs())
    }

    let result = execute(cli_config.command, &store, &app_config).await;
    store.flush().await;
    if let Err(e) = result {
        error_exit!("{e}")
    }
    debug!("done");
}

async fn open_store(app_config: &AppConfig) -> Result<NotesStore, Box<dyn Error>> {
    let data_directory = &app_config.data_directory;
    let file_watcher = ProductionFileWatcher::new(
        app_config.file_watcher_debounce_time(),
    )?;
    let store = match app_config.storage {
        StorageKind::Local => NotesStore::new(
            LocalNoteStorage::new(data_directory, file_watcher).await?,
        ),
        StorageKind::Remote => NotesStore::new(
            RemoteNoteStorage::new(
                DirectoryDocumentStore::new(data_directory, file_watcher).await?,
                AnonymousIdentity::new(data_directory),
            ),
        ),
    };
    Ok(store)
}
