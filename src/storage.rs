// Persistence for the board: SQLite-backed key/value storage
//
// Tasks and statuses are stored as JSON blobs under fixed keys, the way a
// browser keeps them in local storage. Loading never fails; corrupt or
// missing entries fall back to defaults.

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::models::{DEFAULT_STATUSES, Task, now_ms};

const CURRENT_VERSION: u32 = 1;

/// Name of the data directory created under the store path
pub const STORE_DIR_NAME: &str = ".taskboard";

pub const TASKS_KEY: &str = "tasks";
pub const STATUSES_KEY: &str = "statuses";

/// Quota applied to the stored payload (5 MiB, like browser local storage)
pub const DEFAULT_LIMIT_BYTES: usize = 5 * 1024 * 1024;

/// Everything the board persists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub statuses: Vec<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            statuses: default_statuses(),
        }
    }
}

fn default_statuses() -> Vec<String> {
    DEFAULT_STATUSES.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageUsage {
    pub used: usize,
    pub limit: usize,
    pub percentage: f64,
}

impl StorageUsage {
    fn new(used: usize, limit: usize) -> Self {
        let percentage = if limit == 0 {
            0.0
        } else {
            used as f64 / limit as f64 * 100.0
        };
        Self { used, limit, percentage }
    }
}

/// Where the board keeps its state between sessions.
///
/// Callers must treat `save` as fallible and non-fatal.
pub trait Persistence {
    fn save(&mut self, tasks: &[Task], statuses: &[String]) -> Result<()>;

    /// Load saved state, defaulting anything absent or corrupt.
    fn load(&self) -> Snapshot;

    fn clear(&mut self) -> Result<()>;

    fn usage(&self) -> StorageUsage;

    fn is_available(&self) -> bool {
        true
    }
}

fn encode(tasks: &[Task], statuses: &[String], limit: usize) -> Result<(String, String)> {
    let tasks_json = serde_json::to_string(tasks).context("Failed to serialize tasks")?;
    let statuses_json = serde_json::to_string(statuses).context("Failed to serialize statuses")?;

    let size = tasks_json.len() + statuses_json.len();
    if size > limit {
        return Err(eyre!("Storage quota exceeded: {} bytes (limit {})", size, limit));
    }
    Ok((tasks_json, statuses_json))
}

fn decode_tasks(raw: Option<String>) -> Vec<Task> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(tasks) => tasks,
        Err(e) => {
            warn!(error = %e, "Saved tasks are corrupt, starting empty");
            Vec::new()
        }
    }
}

fn decode_statuses(raw: Option<String>) -> Vec<String> {
    let Some(raw) = raw else {
        return default_statuses();
    };
    match serde_json::from_str(&raw) {
        Ok(statuses) => statuses,
        Err(e) => {
            warn!(error = %e, "Saved statuses are corrupt, using defaults");
            default_statuses()
        }
    }
}

// ============================================================================
// SQLite storage
// ============================================================================

/// Key/value storage in `<path>/.taskboard/taskboard.db`
pub struct SqliteStorage {
    base_path: PathBuf,
    db: Connection,
    limit: usize,
}

impl SqliteStorage {
    /// Open or create storage under the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().join(STORE_DIR_NAME);

        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        let db_path = base_path.join("taskboard.db");
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let storage = Self {
            base_path,
            db,
            limit: DEFAULT_LIMIT_BYTES,
        };

        storage.create_schema()?;
        storage.create_gitignore()?;
        storage.write_version()?;

        info!(path = ?storage.base_path, "Opened board storage");
        Ok(storage)
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn create_gitignore(&self) -> Result<()> {
        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(
                gitignore_path,
                "taskboard.db\ntaskboard.db-shm\ntaskboard.db-wal\ntaskboard.lock\n",
            )?;
        }
        Ok(())
    }

    fn write_version(&self) -> Result<()> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }

    /// Raw value under `key`
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .query_row("SELECT value FROM storage WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.db.execute(
            "INSERT OR REPLACE INTO storage (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, now_ms()],
        )?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        self.db.execute("DELETE FROM storage WHERE key = ?1", [key])?;
        Ok(())
    }

    fn lock_file(&self) -> Result<fs::File> {
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.base_path.join("taskboard.lock"))
            .context("Failed to open lock file")?;
        file.lock_exclusive().context("Failed to acquire file lock")?;
        Ok(file)
    }

    fn read_item_or_warn(&self, key: &str) -> Option<String> {
        match self.get_item(key) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = ?e, "Failed to read storage entry");
                None
            }
        }
    }
}

impl Persistence for SqliteStorage {
    fn save(&mut self, tasks: &[Task], statuses: &[String]) -> Result<()> {
        let (tasks_json, statuses_json) = encode(tasks, statuses, self.limit)?;

        // Lock is released when the file is dropped
        let _lock = self.lock_file()?;

        let tx = self.db.transaction()?;
        let now = now_ms();
        tx.execute(
            "INSERT OR REPLACE INTO storage (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![TASKS_KEY, tasks_json, now],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO storage (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![STATUSES_KEY, statuses_json, now],
        )?;
        tx.commit()?;

        debug!(tasks = tasks.len(), statuses = statuses.len(), "Saved board");
        Ok(())
    }

    fn load(&self) -> Snapshot {
        let snapshot = Snapshot {
            tasks: decode_tasks(self.read_item_or_warn(TASKS_KEY)),
            statuses: decode_statuses(self.read_item_or_warn(STATUSES_KEY)),
        };
        info!(tasks = snapshot.tasks.len(), "Loaded board");
        snapshot
    }

    fn clear(&mut self) -> Result<()> {
        let _lock = self.lock_file()?;
        self.remove_item(TASKS_KEY)?;
        self.remove_item(STATUSES_KEY)?;
        info!("Cleared board storage");
        Ok(())
    }

    fn usage(&self) -> StorageUsage {
        let used: i64 = self
            .db
            .query_row("SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM storage", [], |row| row.get(0))
            .unwrap_or_else(|e| {
                warn!(error = ?e, "Failed to measure storage usage");
                0
            });
        StorageUsage::new(used.max(0) as usize, self.limit)
    }

    fn is_available(&self) -> bool {
        self.db
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }
}

// ============================================================================
// In-memory storage
// ============================================================================

/// Storage that lives only as long as the value; can be told to fail writes.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
    fail_writes: bool,
    limit: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `save`/`clear` fail.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Put a raw value in place, e.g. to simulate corruption.
    pub fn set_raw(&mut self, key: &str, value: &str) {
        self.items.insert(key.to_string(), value.to_string());
    }

    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }
}

impl Persistence for MemoryStorage {
    fn save(&mut self, tasks: &[Task], statuses: &[String]) -> Result<()> {
        if self.fail_writes {
            return Err(eyre!("Storage is not writable"));
        }
        let (tasks_json, statuses_json) = encode(tasks, statuses, self.limit.unwrap_or(DEFAULT_LIMIT_BYTES))?;
        self.items.insert(TASKS_KEY.to_string(), tasks_json);
        self.items.insert(STATUSES_KEY.to_string(), statuses_json);
        Ok(())
    }

    fn load(&self) -> Snapshot {
        Snapshot {
            tasks: decode_tasks(self.items.get(TASKS_KEY).cloned()),
            statuses: decode_statuses(self.items.get(STATUSES_KEY).cloned()),
        }
    }

    fn clear(&mut self) -> Result<()> {
        if self.fail_writes {
            return Err(eyre!("Storage is not writable"));
        }
        self.items.clear();
        Ok(())
    }

    fn usage(&self) -> StorageUsage {
        let used = self.items.values().map(String::len).sum();
        StorageUsage::new(used, self.limit.unwrap_or(DEFAULT_LIMIT_BYTES))
    }

    fn is_available(&self) -> bool {
        !self.fail_writes
    }
}
