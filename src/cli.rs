use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "edubak")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a backup session of every registered collection
    Backup {
        /// Output the result as JSON
        #[arg(long = "json")]
        json: bool,

        /// Force enable progress indicators
        #[arg(long = "progress")]
        progress: bool,

        /// Force disable progress indicators
        #[arg(long = "no-progress", conflicts_with = "progress")]
        no_progress: bool,
    },

    /// Restore a backup session into the store (replaces collection contents)
    Restore {
        /// Timestamp identifier of the session to restore
        #[arg(value_name = "TIMESTAMP")]
        timestamp: String,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,

        /// Output the result as JSON
        #[arg(long = "json")]
        json: bool,

        /// Force enable progress indicators
        #[arg(long = "progress")]
        progress: bool,

        /// Force disable progress indicators
        #[arg(long = "no-progress", conflicts_with = "progress")]
        no_progress: bool,
    },

    /// List backup sessions, newest first
    #[command(alias = "ls")]
    List {
        /// Output the result as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// Delete a backup session and refresh the latest pointer
    #[command(alias = "rm")]
    Delete {
        /// Timestamp identifier of the session to delete
        #[arg(value_name = "TIMESTAMP")]
        timestamp: String,
    },

    /// Export all collections into a single bundle file
    Export {
        /// Output the result as JSON
        #[arg(long = "json")]
        json: bool,

        /// Force enable progress indicators
        #[arg(long = "progress")]
        progress: bool,

        /// Force disable progress indicators
        #[arg(long = "no-progress", conflicts_with = "progress")]
        no_progress: bool,
    },

    /// Import a bundle file into the store
    Import {
        /// Path to the bundle file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Delete existing documents in each collection before inserting
        #[arg(long = "clear")]
        clear: bool,

        /// Import only these collections (comma-separated, e.g., --collections="admins,batches")
        #[arg(long = "collections", value_delimiter = ',', require_equals = true)]
        collections: Option<Vec<String>>,

        /// Output the result as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// List exported bundle files
    Exports {
        /// Output the result as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// Delete an exported bundle file by name
    DeleteExport {
        /// File name of the bundle to delete
        #[arg(value_name = "FILE_NAME")]
        file_name: String,
    },

    /// Initialize a new .edubak.toml configuration file
    Init,

    /// View operation history
    History {
        /// Show only the last N entries
        #[arg(long = "last")]
        last: Option<usize>,

        /// Filter by session id or file name
        #[arg(long = "target")]
        target: Option<String>,

        /// Output as JSON
        #[arg(long = "json")]
        json: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
