// Board: the application state for one session
//
// Owns the task store, the status vocabulary and the persistence backend.
// Every successful mutation is followed by a save; a failed save is logged
// and never undoes the in-memory change.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::backup::{self, Backup};
use crate::clock::Clock;
use crate::config::Config;
use crate::csv::{self, ImportReport};
use crate::debounce::Debouncer;
use crate::error::BoardError;
use crate::filter::{FilterState, SearchStats};
use crate::models::{DEFAULT_STATUS, Task, TaskDraft, truncate_millis};
use crate::status::StatusVocabulary;
use crate::storage::{Persistence, Snapshot, StorageUsage};
use crate::store::TaskStore;
use crate::view::{BoardView, Reminders, render_board};

pub struct Board {
    store: TaskStore,
    statuses: StatusVocabulary,
    storage: Box<dyn Persistence>,
    clock: Arc<dyn Clock>,
    due_soon: Duration,
    max_status_len: usize,
    filter: FilterState,
    search: Debouncer<String>,
    reminders: Reminders,
}

impl Board {
    /// Load saved state from `storage`. Missing or corrupt data gives an
    /// empty board with the default statuses.
    pub fn open(storage: Box<dyn Persistence>, config: &Config, clock: Arc<dyn Clock>) -> Self {
        if !storage.is_available() {
            warn!("Storage is not available, changes will not persist");
        }

        let snapshot = storage.load();
        let due_soon = config.due_soon_window();

        let mut store = TaskStore::with_clock(clock.clone());
        store.set_due_soon_window(due_soon);
        store.replace_all(snapshot.tasks);

        let statuses = StatusVocabulary::from_saved(snapshot.statuses).with_max_len(config.max_status_len);

        info!(tasks = store.len(), statuses = statuses.len(), "Opened board");

        Self {
            store,
            statuses,
            storage,
            clock,
            due_soon,
            max_status_len: config.max_status_len,
            filter: FilterState::default(),
            search: Debouncer::new(config.debounce_delay()),
            reminders: Reminders::new(due_soon),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        truncate_millis(self.clock.now())
    }

    pub fn due_soon_window(&self) -> Duration {
        self.due_soon
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.all()
    }

    pub fn statuses(&self) -> &[String] {
        self.statuses.as_slice()
    }

    pub fn vocabulary(&self) -> &StatusVocabulary {
        &self.statuses
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: self.store.all().to_vec(),
            statuses: self.statuses.as_slice().to_vec(),
        }
    }

    /// Persist the current state. Returns false (and logs) on failure.
    pub fn save(&mut self) -> bool {
        match self.storage.save(self.store.all(), self.statuses.as_slice()) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to save board");
                false
            }
        }
    }

    pub fn usage(&self) -> StorageUsage {
        self.storage.usage()
    }

    fn check_status(&self, status: Option<&str>) -> Result<(), BoardError> {
        match status {
            Some(s) if !self.statuses.contains(s) => Err(BoardError::UnknownStatus(s.to_string())),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    pub fn create_task(&mut self, draft: TaskDraft) -> Result<Task, BoardError> {
        self.check_status(draft.status.as_deref())?;
        let task = self.store.create(draft)?;
        self.save();
        Ok(task)
    }

    /// Edit a task. The title is validated here; the store trusts its caller.
    pub fn update_task(&mut self, id: &str, draft: TaskDraft) -> Result<Task, BoardError> {
        draft.validate()?;
        self.check_status(draft.status.as_deref())?;
        let draft = draft.normalized();

        let deadline_changed = self.store.get(id).map(|t| t.deadline != draft.deadline);
        let task = self
            .store
            .update(id, draft)
            .ok_or_else(|| BoardError::TaskNotFound(id.to_string()))?;
        if deadline_changed == Some(true) {
            self.reminders.forget(id);
        }
        self.save();
        Ok(task)
    }

    pub fn delete_task(&mut self, id: &str) -> Result<(), BoardError> {
        if !self.store.delete(id) {
            return Err(BoardError::TaskNotFound(id.to_string()));
        }
        self.reminders.forget(id);
        self.save();
        Ok(())
    }

    /// Move a task to `status`. Returns whether the status actually changed.
    pub fn move_task(&mut self, id: &str, status: &str) -> Result<bool, BoardError> {
        self.check_status(Some(status))?;
        if self.store.get(id).is_none() {
            return Err(BoardError::TaskNotFound(id.to_string()));
        }
        let moved = self.store.move_task(id, status);
        if moved {
            self.save();
        }
        Ok(moved)
    }

    // ========================================================================
    // Statuses
    // ========================================================================

    pub fn add_status(&mut self, name: &str) -> Result<String, BoardError> {
        let added = self.statuses.add(name)?;
        self.save();
        Ok(added)
    }

    /// Remove a custom status, sending its tasks to the default status.
    /// Returns how many tasks moved.
    pub fn remove_status(&mut self, name: &str) -> Result<usize, BoardError> {
        let removed = self.statuses.remove(name)?;
        let moved = self.store.reassign_status(&removed, DEFAULT_STATUS);
        info!(status = %removed, moved, "Removed status");
        self.save();
        Ok(moved)
    }

    /// Rename a custom status; its tasks follow the new name.
    pub fn rename_status(&mut self, old: &str, new: &str) -> Result<usize, BoardError> {
        let renamed = self.statuses.rename(old, new)?;
        let moved = self.store.reassign_status(old, &renamed);
        info!(from = old, to = %renamed, moved, "Renamed status");
        self.save();
        Ok(moved)
    }

    pub fn reorder_statuses<S: AsRef<str>>(&mut self, order: &[S]) -> Result<(), BoardError> {
        self.statuses.reorder(order)?;
        self.save();
        Ok(())
    }

    /// Back to the default statuses. Returns how many tasks moved.
    pub fn reset_statuses(&mut self) -> usize {
        let removed = self.statuses.reset();
        let moved: usize = removed
            .iter()
            .map(|s| self.store.reassign_status(s, DEFAULT_STATUS))
            .sum();
        info!(removed = removed.len(), moved, "Reset statuses");
        self.save();
        moved
    }

    pub fn export_settings(&self) -> eyre::Result<String> {
        self.statuses.export_settings(self.now())
    }

    /// Replace the vocabulary from a settings document. Tasks whose status
    /// is no longer present go to the default status.
    pub fn import_settings(&mut self, json: &str) -> Result<usize, BoardError> {
        self.statuses = self.statuses.import_settings(json)?;
        let moved = self.adopt_orphans();
        self.save();
        Ok(moved)
    }

    fn adopt_orphans(&mut self) -> usize {
        let orphaned: Vec<String> = self
            .store
            .all()
            .iter()
            .filter(|t| !self.statuses.contains(&t.status))
            .map(|t| t.status.clone())
            .collect();

        let mut moved = 0;
        for status in orphaned {
            moved += self.store.reassign_status(&status, DEFAULT_STATUS);
        }
        if moved > 0 {
            debug!(moved, "Moved tasks with unknown status to default");
        }
        moved
    }

    // ========================================================================
    // Import / export
    // ========================================================================

    pub fn export_csv(&self) -> String {
        csv::export_tasks(self.store.all())
    }

    /// Import CSV text. Saves when at least one row was imported.
    pub fn import_csv(&mut self, text: &str) -> ImportReport {
        let now = self.now();
        let before: HashMap<String, Option<DateTime<Utc>>> =
            self.store.all().iter().map(|t| (t.id.clone(), t.deadline)).collect();

        let report = csv::import_tasks(text, self.store.tasks_mut(), self.statuses.as_slice(), now);

        // Replaced tasks whose deadline moved may be reminded again
        for task in &report.imported {
            if let Some(old) = before.get(&task.id)
                && *old != task.deadline
            {
                self.reminders.forget(&task.id);
            }
        }

        if report.summary.imported_count > 0 {
            self.save();
        }
        report
    }

    pub fn export_backup(&self) -> eyre::Result<String> {
        backup::export_backup(&self.snapshot(), self.now())
    }

    /// Replace everything with a backup. Validation happens before any
    /// state is touched.
    pub fn restore_backup(&mut self, json: &str) -> Result<Backup, BoardError> {
        let backup = backup::parse_backup(json)?;

        self.store.replace_all(backup.data.tasks.clone());
        self.statuses =
            StatusVocabulary::from_saved(&backup.data.statuses).with_max_len(self.max_status_len);
        self.reminders = Reminders::new(self.due_soon);
        self.save();

        info!(tasks = self.store.len(), "Restored backup");
        Ok(backup)
    }

    /// Wipe storage and start over with an empty board.
    pub fn clear(&mut self) -> eyre::Result<()> {
        self.storage.clear()?;
        self.store.replace_all(Vec::new());
        self.statuses = StatusVocabulary::default().with_max_len(self.max_status_len);
        self.filter.clear();
        self.search.cancel();
        self.reminders = Reminders::new(self.due_soon);
        info!("Cleared board");
        Ok(())
    }

    // ========================================================================
    // Viewing
    // ========================================================================

    /// Columns for the current filter.
    pub fn view(&self) -> BoardView<'_> {
        let visible = self.filter.filter(self.store.all());
        render_board(&visible, self.statuses.as_slice(), self.clock.now(), self.due_soon)
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_tag_filter(&mut self, tag: &str) {
        self.filter.tag = tag.trim().to_string();
    }

    /// Apply a search term immediately, dropping any pending input.
    pub fn set_search(&mut self, term: &str) {
        self.search.cancel();
        self.filter.term = term.to_string();
    }

    /// Feed a keystroke's worth of search text; applied once input settles.
    pub fn search_input(&mut self, term: &str, now: Instant) {
        self.search.input(term.to_string(), now);
    }

    /// Apply a settled search term. Returns whether the filter changed.
    pub fn poll_search(&mut self, now: Instant) -> bool {
        match self.search.poll(now) {
            Some(term) if term != self.filter.term => {
                debug!(term = %term, "Applying search");
                self.filter.term = term;
                true
            }
            _ => false,
        }
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
        self.search.cancel();
    }

    pub fn search_stats(&self) -> SearchStats {
        let visible = self.filter.filter(self.store.all());
        SearchStats::compute(self.store.all(), &visible)
    }

    /// Tasks newly inside the reminder window; each is reported once per session.
    pub fn due_reminders(&mut self) -> Vec<&Task> {
        let now = self.clock.now();
        self.reminders.check(self.store.all(), now)
    }
}
