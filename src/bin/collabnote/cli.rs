use std::path::PathBuf;
use clap::{Parser, Subcommand};
use uuid::Uuid;
use collabnote::bin_constants::DEFAULT_CONFIG_FILE;

#[derive(Clone, Debug, Eq, Parser, PartialEq)]
#[command(version, author, about)]
pub struct CliConfig {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, Eq, PartialEq, Subcommand)]
pub enum Command {
    /// List the notes
    List,

    /// Print a note
    Show {
        id: Uuid,
    },

    /// Create a note and print its id
    New {
        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,
    },

    /// Change the title or the content of a note
    Edit {
        id: Uuid,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,
    },

    Delete {
        id: Uuid,
    },

    /// List the previous versions of a note's content
    History {
        id: Uuid,
    },

    /// Bring back a previous version of a note's content
    Restore {
        id: Uuid,
        version_id: Uuid,
    },

    /// Print the list again whenever the notes change, until interrupted
    Watch,
}
