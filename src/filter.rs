// Search, filtering and sorting over task lists

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::models::Task;

/// Calendar window relative to now (UTC, weeks start on Sunday)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    Today,
    ThisWeek,
    ThisMonth,
}

impl DateWindow {
    pub fn contains(self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        let today = now.date_naive();
        match self {
            DateWindow::Today => day == today,
            DateWindow::ThisWeek => {
                let start = week_start(today);
                day >= start && day <= start + Duration::days(6)
            }
            DateWindow::ThisMonth => day.year() == today.year() && day.month() == today.month(),
        }
    }
}

fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_sunday() as i64)
}

impl FromStr for DateWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(DateWindow::Today),
            "week" | "this-week" => Ok(DateWindow::ThisWeek),
            "month" | "this-month" => Ok(DateWindow::ThisMonth),
            other => Err(format!("unknown date window: {} (today, week, month)", other)),
        }
    }
}

/// Deadline filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineWindow {
    Overdue,
    Within(DateWindow),
}

impl DeadlineWindow {
    pub fn matches(self, deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(deadline) = deadline else {
            return false;
        };
        match self {
            DeadlineWindow::Overdue => deadline < now,
            DeadlineWindow::Within(window) => window.contains(deadline, now),
        }
    }
}

impl FromStr for DeadlineWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overdue" => Ok(DeadlineWindow::Overdue),
            other => DateWindow::from_str(other)
                .map(DeadlineWindow::Within)
                .map_err(|_| format!("unknown deadline filter: {} (overdue, today, week, month)", other)),
        }
    }
}

/// True if `term` appears (case-insensitively) in the title, detail or a tag.
/// An empty term matches everything.
pub fn matches_term(task: &Task, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let term = term.to_lowercase();
    task.title.to_lowercase().contains(&term)
        || task.detail.to_lowercase().contains(&term)
        || task.tags.iter().any(|t| t.to_lowercase().contains(&term))
}

/// Advanced search: every set criterion must match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub term: Option<String>,
    pub status: Option<String>,
    /// Any-of match
    pub tags: Vec<String>,
    pub deadline: Option<DeadlineWindow>,
    pub created: Option<DateWindow>,
}

impl SearchCriteria {
    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        if let Some(term) = &self.term
            && !matches_term(task, term)
        {
            return false;
        }
        if let Some(status) = &self.status
            && &task.status != status
        {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| task.has_tag(t)) {
            return false;
        }
        if let Some(window) = self.deadline
            && !window.matches(task.deadline, now)
        {
            return false;
        }
        if let Some(window) = self.created
            && !window.contains(task.created_at, now)
        {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, tasks: &'a [Task], now: DateTime<Utc>) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t, now)).collect()
    }
}

/// Live search box plus tag dropdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub term: String,
    pub tag: String,
}

impl FilterState {
    pub fn filter<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks
            .iter()
            .filter(|t| matches_term(t, &self.term))
            .filter(|t| self.tag.is_empty() || t.has_tag(&self.tag))
            .collect()
    }

    pub fn is_active(&self) -> bool {
        !self.term.is_empty() || !self.tag.is_empty()
    }

    pub fn clear(&mut self) {
        self.term.clear();
        self.tag.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Deadline,
    CreatedAt,
    Status,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortKey::Title),
            "deadline" => Ok(SortKey::Deadline),
            "created" | "created-at" => Ok(SortKey::CreatedAt),
            "status" => Ok(SortKey::Status),
            other => Err(format!("unknown sort key: {} (title, deadline, created, status)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

fn compare(a: &Task, b: &Task, key: SortKey) -> Ordering {
    match key {
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        // No deadline sorts as the far future
        SortKey::Deadline => match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::Status => a.status.cmp(&b.status),
    }
}

/// Stable sort into a new list.
pub fn sort_tasks<'a, I>(tasks: I, key: SortKey, order: SortOrder) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut sorted: Vec<&Task> = tasks.into_iter().collect();
    sorted.sort_by(|a, b| {
        let ord = compare(a, b, key);
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    sorted
}

/// Counts shown next to the search box
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub total: usize,
    pub displayed: usize,
    pub filtered: usize,
    pub by_status: BTreeMap<String, usize>,
}

impl SearchStats {
    pub fn compute(all: &[Task], filtered: &[&Task]) -> Self {
        let mut by_status = BTreeMap::new();
        for task in filtered {
            *by_status.entry(task.status.clone()).or_insert(0) += 1;
        }
        Self {
            total: all.len(),
            displayed: filtered.len(),
            filtered: all.len().saturating_sub(filtered.len()),
            by_status,
        }
    }
}
