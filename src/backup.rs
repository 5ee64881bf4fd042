// JSON backup and restore of the whole board

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BoardError;
use crate::models::{DEFAULT_STATUSES, format_timestamp};
use crate::storage::Snapshot;

pub const BACKUP_VERSION: &str = "1.0";

/// Backup document: `{ timestamp, version, data: { tasks, statuses } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub timestamp: String,
    pub version: String,
    pub data: Snapshot,
}

/// Pretty-printed backup of `snapshot`.
pub fn export_backup(snapshot: &Snapshot, now: DateTime<Utc>) -> eyre::Result<String> {
    let backup = Backup {
        timestamp: format_timestamp(&now),
        version: BACKUP_VERSION.to_string(),
        data: snapshot.clone(),
    };
    Ok(serde_json::to_string_pretty(&backup)?)
}

/// Parse and validate a backup. Nothing is applied here.
pub fn parse_backup(json: &str) -> Result<Backup, BoardError> {
    let backup: Backup = serde_json::from_str(json).map_err(|e| BoardError::InvalidBackup(e.to_string()))?;

    if let Some(bad) = backup
        .data
        .tasks
        .iter()
        .find(|t| t.id.trim().is_empty() || t.title.trim().is_empty())
    {
        return Err(BoardError::InvalidBackup(format!(
            "task is missing an id or title: {:?}",
            bad.id
        )));
    }

    if let Some(missing) = DEFAULT_STATUSES
        .iter()
        .find(|d| !backup.data.statuses.iter().any(|s| s == *d))
    {
        return Err(BoardError::InvalidBackup(format!(
            "required status missing: {}",
            missing
        )));
    }

    info!(
        timestamp = %backup.timestamp,
        tasks = backup.data.tasks.len(),
        "Parsed backup"
    );
    Ok(backup)
}
