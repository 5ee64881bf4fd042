//! CLI argument parsing for taskboard.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "taskboard",
    about = "Kanban task board with CSV import/export",
    version = env!("GIT_DESCRIBE")
)]
pub struct Cli {
    /// Directory holding the .taskboard store (default: current directory)
    #[arg(short = 'd', long, global = true)]
    pub store_dir: Option<PathBuf>,

    /// Config file (default: <config dir>/taskboard/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short = 'D', long)]
        detail: Option<String>,

        /// Deadline (YYYY-MM-DD, YYYY-MM-DDTHH:MM or RFC 3339)
        #[arg(short = 'u', long)]
        deadline: Option<String>,

        /// Tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        /// Initial status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Edit a task; omitted fields keep their value
    Edit {
        /// Task ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short = 'D', long)]
        detail: Option<String>,

        /// New deadline, or "none" to clear it
        #[arg(short = 'u', long)]
        deadline: Option<String>,

        /// Replace tags (comma-separated, empty to clear)
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        #[arg(short, long)]
        status: Option<String>,
    },

    /// Move a task to another status
    Mv {
        /// Task ID
        id: String,

        /// Target status
        status: String,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: String,
    },

    /// Show one task in full
    Show {
        /// Task ID
        id: String,
    },

    /// List tasks
    List {
        /// Case-insensitive search over title, detail and tags
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Only tasks with any of these tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tag: Option<Vec<String>>,

        #[arg(short, long)]
        status: Option<String>,

        /// Deadline window: overdue, today, week, month
        #[arg(long)]
        due: Option<String>,

        /// Creation window: today, week, month
        #[arg(long)]
        created: Option<String>,

        /// Sort by title, deadline, created or status
        #[arg(long)]
        sort: Option<String>,

        /// Ascending order (default is descending)
        #[arg(long)]
        asc: bool,
    },

    /// Show the board as columns
    Board {
        /// Search term
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Tag filter
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// List every tag in use
    Tags,

    /// Tasks due within the due-soon window
    Due,

    /// Tasks past their deadline
    Overdue,

    /// Announce tasks coming due
    Remind,

    /// Manage statuses
    Status {
        #[command(subcommand)]
        command: StatusCommand,
    },

    /// Export tasks to CSV
    Export {
        /// Output file (default: tasks_<date>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import tasks from a CSV file
    Import {
        /// CSV file
        file: PathBuf,
    },

    /// Full JSON backup
    Backup {
        #[command(subcommand)]
        command: BackupCommand,
    },

    /// Delete every task and status from the store
    Clear {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum StatusCommand {
    /// List statuses in column order
    List,

    /// Add a status
    Add { name: String },

    /// Remove a custom status; its tasks move to not-started
    Rm { name: String },

    /// Rename a custom status
    Rename { old: String, new: String },

    /// Set the column order (every status, comma-separated)
    Reorder {
        #[arg(value_delimiter = ',', required = true)]
        order: Vec<String>,
    },

    /// Drop custom statuses
    Reset,

    /// Write the status settings as JSON
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load status settings from JSON
    Import { file: PathBuf },
}

#[derive(Subcommand)]
pub enum BackupCommand {
    /// Write a backup of tasks and statuses
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the board with a backup
    Restore { file: PathBuf },
}
