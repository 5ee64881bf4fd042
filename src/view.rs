//! Stateless board rendering.
//!
//! `render_board` turns a snapshot of tasks and the status vocabulary into
//! columns of cards; whatever draws the board only reads this.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use crate::models::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineState {
    None,
    Normal,
    DueSoon,
    Overdue,
}

impl DeadlineState {
    pub fn of(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>, due_soon: Duration) -> Self {
        match deadline {
            None => DeadlineState::None,
            Some(d) if d < now => DeadlineState::Overdue,
            Some(d) if d - now <= due_soon => DeadlineState::DueSoon,
            Some(_) => DeadlineState::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardView<'a> {
    pub task: &'a Task,
    pub deadline: DeadlineState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnView<'a> {
    pub status: &'a str,
    pub cards: Vec<CardView<'a>>,
}

impl ColumnView<'_> {
    pub fn count(&self) -> usize {
        self.cards.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardView<'a> {
    pub columns: Vec<ColumnView<'a>>,
    /// Tasks whose status has no column
    pub unplaced: Vec<&'a Task>,
}

impl BoardView<'_> {
    pub fn total(&self) -> usize {
        self.columns.iter().map(ColumnView::count).sum::<usize>() + self.unplaced.len()
    }
}

/// One column per status, in vocabulary order, cards in task order.
pub fn render_board<'a>(
    tasks: &[&'a Task],
    statuses: &'a [String],
    now: DateTime<Utc>,
    due_soon: Duration,
) -> BoardView<'a> {
    let columns = statuses
        .iter()
        .map(|status| ColumnView {
            status: status.as_str(),
            cards: tasks
                .iter()
                .filter(|t| &t.status == status)
                .map(|t| CardView {
                    task: *t,
                    deadline: DeadlineState::of(t.deadline, now, due_soon),
                })
                .collect(),
        })
        .collect();

    let unplaced = tasks
        .iter()
        .copied()
        .filter(|t| !statuses.contains(&t.status))
        .collect();

    BoardView { columns, unplaced }
}

/// Remembers which tasks have already been announced as due.
#[derive(Debug, Clone)]
pub struct Reminders {
    window: Duration,
    shown: HashSet<String>,
}

impl Reminders {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            shown: HashSet::new(),
        }
    }

    /// Tasks newly within the window of now, either side. Each task is
    /// returned at most once.
    pub fn check<'a>(&mut self, tasks: &'a [Task], now: DateTime<Utc>) -> Vec<&'a Task> {
        let mut due = Vec::new();
        for task in tasks {
            let Some(deadline) = task.deadline else {
                continue;
            };
            if self.shown.contains(&task.id) {
                continue;
            }
            if deadline - now <= self.window && now - deadline <= self.window {
                self.shown.insert(task.id.clone());
                due.push(task);
            }
        }
        due
    }

    /// Allow a task to be announced again, e.g. after its deadline moved.
    pub fn forget(&mut self, id: &str) {
        self.shown.remove(id);
    }
}
