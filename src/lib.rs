// Taskboard - Kanban task board with CSV import/export and SQLite persistence

pub mod backup;
pub mod board;
pub mod clock;
pub mod config;
pub mod csv;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod models;
pub mod status;
pub mod storage;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use board::Board;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use csv::{ImportReport, ImportSummary, RowIssue};
pub use error::BoardError;
pub use filter::{DeadlineWindow, FilterState, SearchCriteria, SortKey, SortOrder};
pub use models::{DEFAULT_STATUS, DEFAULT_STATUSES, Task, TaskDraft};
pub use status::StatusVocabulary;
pub use storage::{MemoryStorage, Persistence, Snapshot, SqliteStorage};
pub use store::TaskStore;
pub use view::{BoardView, DeadlineState};
