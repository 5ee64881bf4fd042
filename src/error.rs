// Error taxonomy for board operations

use std::fmt;

/// Errors raised by board, vocabulary and codec operations.
///
/// Not-found on the task store is reported as `Option`/`bool` instead of an
/// error; this enum is what callers see when they need a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// Title was empty or whitespace-only.
    EmptyTitle,
    /// No task with this id.
    TaskNotFound(String),
    /// Status is not a member of the vocabulary.
    UnknownStatus(String),
    /// Status already exists in the vocabulary.
    DuplicateStatus(String),
    /// Status name was empty after trimming.
    EmptyStatusName,
    /// Status name exceeds the configured length.
    StatusNameTooLong { name: String, max: usize },
    /// One of the protected default statuses.
    ProtectedStatus(String),
    /// Reorder list is not a permutation of the current vocabulary.
    InvalidOrder,
    /// A date field failed to parse.
    InvalidDate { field: &'static str, value: String },
    /// Import was given a file without a `.csv` extension.
    NotCsvFile(String),
    /// Backup payload failed validation.
    InvalidBackup(String),
    /// Settings payload failed validation.
    InvalidSettings(String),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::EmptyTitle => write!(f, "title is required"),
            BoardError::TaskNotFound(id) => write!(f, "task not found: {}", id),
            BoardError::UnknownStatus(s) => write!(f, "unknown status: {}", s),
            BoardError::DuplicateStatus(s) => write!(f, "status already exists: {}", s),
            BoardError::EmptyStatusName => write!(f, "status name cannot be empty"),
            BoardError::StatusNameTooLong { name, max } => {
                write!(f, "status name too long: {} (max {} chars)", name, max)
            }
            BoardError::ProtectedStatus(s) => write!(f, "default status cannot be changed: {}", s),
            BoardError::InvalidOrder => write!(f, "new order must contain every status exactly once"),
            BoardError::InvalidDate { field, value } => write!(f, "invalid {} date: {}", field, value),
            BoardError::NotCsvFile(path) => write!(f, "not a CSV file: {}", path),
            BoardError::InvalidBackup(reason) => write!(f, "invalid backup: {}", reason),
            BoardError::InvalidSettings(reason) => write!(f, "invalid settings: {}", reason),
        }
    }
}

impl std::error::Error for BoardError {}
