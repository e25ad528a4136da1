use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the drive folder layout and a default transflow.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Translate every unprocessed document in the source folder once
    Poll,

    /// Handle one form submission event
    Submit {
        /// Event JSON file, or `-` for stdin
        #[arg(short, long)]
        event: String,
    },

    /// Translate a single drive file, ignoring its processed marker
    TranslateFile {
        /// File id relative to the drive root, e.g. Source/letter.txt
        #[arg(short, long)]
        path: String,
    },

    /// Move old output documents into the archive folder
    Archive,

    /// Run the installed triggers until interrupted
    Serve,

    /// Manage installed triggers
    Triggers {
        #[command(subcommand)]
        action: TriggerAction,
    },

    /// Show configuration, trigger and folder status
    Status,

    /// Find the ids of the well-known folders under the drive root
    FolderIds,

    /// Print the prompt that would be sent for a sample text
    TestPrompt {
        /// Sample text to append to the prompt
        #[arg(short, long, default_value = "This is a test of the translation prompt.")]
        text: String,
    },
}

#[derive(Subcommand)]
pub enum TriggerAction {
    /// Install the source folder poll trigger
    Setup,

    /// Remove the source folder poll trigger
    Remove,

    /// Install the daily archive triggers
    SetupArchive,

    /// Remove the daily archive triggers
    RemoveArchive,

    /// Install the form submission trigger
    SetupForm,

    /// Remove the form submission trigger
    RemoveForm,

    /// List installed triggers
    List,
}
