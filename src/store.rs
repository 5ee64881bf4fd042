// In-memory task store: the authoritative task list for a session

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::BoardError;
use crate::filter::matches_term;
use crate::models::{DEFAULT_STATUS, Task, TaskDraft, generate_id, truncate_millis};

/// Default width of the due-soon window on either side of now
pub const DEFAULT_DUE_SOON_HOURS: i64 = 24;

/// Ordered collection of tasks. Performs no I/O.
pub struct TaskStore {
    tasks: Vec<Task>,
    clock: Arc<dyn Clock>,
    due_soon: Duration,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: Vec::new(),
            clock,
            due_soon: Duration::hours(DEFAULT_DUE_SOON_HOURS),
        }
    }

    /// Change the due-soon window (applied on both sides of now).
    pub fn set_due_soon_window(&mut self, window: Duration) {
        self.due_soon = window;
    }

    fn now(&self) -> DateTime<Utc> {
        truncate_millis(self.clock.now())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a task from a draft. The title must not be blank.
    pub fn create(&mut self, draft: TaskDraft) -> Result<Task, BoardError> {
        draft.validate()?;
        let draft = draft.normalized();

        let now = self.now();
        let task = Task {
            id: generate_id(),
            title: draft.title,
            detail: draft.detail,
            deadline: draft.deadline,
            status: draft.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            tags: draft.tags,
            created_at: now,
            status_changed_at: now,
        };

        debug!(id = %task.id, status = %task.status, "Created task");
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Overwrite a task's editable fields. `None` if the id is unknown.
    ///
    /// Title validation is the caller's job.
    pub fn update(&mut self, id: &str, draft: TaskDraft) -> Option<Task> {
        let draft = draft.normalized();
        let now = self.now();
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;

        task.title = draft.title;
        task.detail = draft.detail;
        task.deadline = draft.deadline;
        task.tags = draft.tags;
        if let Some(status) = draft.status
            && status != task.status
        {
            task.status = status;
            task.status_changed_at = now;
        }

        debug!(id, "Updated task");
        Some(task.clone())
    }

    /// Remove a task. Returns false if it was not there.
    pub fn delete(&mut self, id: &str) -> bool {
        match self.tasks.iter().position(|t| t.id == id) {
            Some(index) => {
                self.tasks.remove(index);
                debug!(id, "Deleted task");
                true
            }
            None => false,
        }
    }

    /// Move a task to another status. Returns whether anything changed.
    pub fn move_task(&mut self, id: &str, new_status: &str) -> bool {
        let now = self.now();
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) if task.status != new_status => {
                debug!(id, from = %task.status, to = new_status, "Moved task");
                task.status = new_status.to_string();
                task.status_changed_at = now;
                true
            }
            _ => false,
        }
    }

    /// Move every task in `from` to `to`. Returns how many moved.
    pub fn reassign_status(&mut self, from: &str, to: &str) -> usize {
        if from == to {
            return 0;
        }
        let ids: Vec<String> = self.by_status(from).into_iter().map(|t| t.id.clone()).collect();
        let mut moved = 0;
        for id in &ids {
            if self.move_task(id, to) {
                moved += 1;
            }
        }
        moved
    }

    /// Swap in a whole task list (after load or restore).
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Destination list for bulk import.
    pub(crate) fn tasks_mut(&mut self) -> &mut Vec<Task> {
        &mut self.tasks
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn by_status(&self, status: &str) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.status == status).collect()
    }

    /// Every distinct tag, sorted.
    pub fn all_tags(&self) -> Vec<String> {
        self.tasks
            .iter()
            .flat_map(|t| t.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Tasks whose deadline is within the due-soon window of now, either side.
    pub fn due_soon(&self) -> Vec<&Task> {
        let now = self.clock.now();
        let window = self.due_soon;
        self.tasks
            .iter()
            .filter(|t| {
                t.deadline
                    .map(|d| d - now <= window && now - d <= window)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Tasks whose deadline is strictly in the past.
    pub fn overdue(&self) -> Vec<&Task> {
        let now = self.clock.now();
        self.tasks
            .iter()
            .filter(|t| t.deadline.map(|d| d < now).unwrap_or(false))
            .collect()
    }

    /// Case-insensitive substring search over title, detail and tags.
    pub fn search(&self, term: &str) -> Vec<&Task> {
        self.tasks.iter().filter(|t| matches_term(t, term)).collect()
    }

    /// Tasks carrying `tag`; an empty tag matches everything.
    pub fn filter_by_tag(&self, tag: &str) -> Vec<&Task> {
        if tag.is_empty() {
            return self.tasks.iter().collect();
        }
        self.tasks.iter().filter(|t| t.has_tag(tag)).collect()
    }
}
