//! Shared test infrastructure for taskboard integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use taskboard::{Board, Config, ManualClock, SqliteStorage, Task, TaskDraft};
use tempfile::TempDir;

/// Fixed starting time for every test board.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap()
}

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub clock: Arc<ManualClock>,
    pub board: Board,
}

impl TestEnv {
    /// Create a board backed by SQLite storage in a fresh temp dir.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let clock = Arc::new(ManualClock::new(start_time()));
        let board = open_board(&temp_dir, clock.clone());
        Self { temp_dir, clock, board }
    }

    /// Drop the current board and open a new one on the same storage.
    pub fn reopen(&mut self) {
        self.board = open_board(&self.temp_dir, self.clock.clone());
    }

    pub fn create_task(&mut self, title: &str) -> Task {
        self.board
            .create_task(TaskDraft::new(title))
            .expect("Failed to create task")
    }

    pub fn create_task_in(&mut self, title: &str, status: &str) -> Task {
        self.board
            .create_task(TaskDraft::new(title).status(status))
            .expect("Failed to create task")
    }

    pub fn create_task_with_tags(&mut self, title: &str, tags: &[&str]) -> Task {
        self.board
            .create_task(TaskDraft::new(title).tags(tags))
            .expect("Failed to create task")
    }
}

fn open_board(temp_dir: &TempDir, clock: Arc<ManualClock>) -> Board {
    let storage = SqliteStorage::open(temp_dir.path()).expect("Failed to open storage");
    Board::open(Box::new(storage), &Config::default(), clock)
}

/// CSV with the standard header followed by `rows`.
pub fn csv_with_rows(rows: &[&str]) -> String {
    let mut text = taskboard::csv::HEADERS.join(",");
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text
}
