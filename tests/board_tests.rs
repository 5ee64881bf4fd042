//! Integration tests for the board over SQLite storage.
//!
//! Tests persistence across reopen, status management and backups.

mod common;

use chrono::Duration;
use common::TestEnv;
use taskboard::{BoardError, Clock, TaskDraft};

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_state_survives_reopen() {
    let mut env = TestEnv::new();
    env.board.add_status("review").unwrap();
    let task = env.create_task_in("Persisted", "review");

    env.reopen();
    assert_eq!(env.board.statuses(), ["not-started", "in-progress", "done", "review"]);
    assert_eq!(env.board.store().get(&task.id), Some(&task));
}

#[test]
fn test_clear_wipes_storage() {
    let mut env = TestEnv::new();
    env.create_task("Gone");
    env.board.clear().unwrap();

    env.reopen();
    assert!(env.board.tasks().is_empty());
    assert_eq!(env.board.statuses().len(), 3);
}

#[test]
fn test_backup_round_trip_across_boards() {
    let mut env = TestEnv::new();
    env.board.add_status("blocked").unwrap();
    env.create_task_in("Stuck", "blocked");
    let json = env.board.export_backup().unwrap();

    let mut other = TestEnv::new();
    other.board.restore_backup(&json).unwrap();
    other.reopen();
    assert_eq!(other.board.snapshot(), env.board.snapshot());
}

#[test]
fn test_invalid_backup_leaves_board_alone() {
    let mut env = TestEnv::new();
    env.create_task("Keep me");

    let json = r#"{"timestamp":"x","version":"1.0","data":{"tasks":[],"statuses":["done"]}}"#;
    assert!(matches!(env.board.restore_backup(json), Err(BoardError::InvalidBackup(_))));
    assert_eq!(env.board.tasks().len(), 1);
}

// =============================================================================
// Status workflow
// =============================================================================

#[test]
fn test_status_changes_stamp_time() {
    let mut env = TestEnv::new();
    let task = env.create_task("Flow");

    env.clock.advance(Duration::hours(1));
    assert!(!env.board.move_task(&task.id, "not-started").unwrap());
    assert_eq!(env.board.store().get(&task.id).unwrap().status_changed_at, task.status_changed_at);

    assert!(env.board.move_task(&task.id, "in-progress").unwrap());
    let moved = env.board.store().get(&task.id).unwrap();
    assert_eq!(moved.status_changed_at, env.clock.now());
    assert_eq!(moved.created_at, task.created_at);
}

#[test]
fn test_custom_status_lifecycle() {
    let mut env = TestEnv::new();
    env.board.add_status("review").unwrap();
    let a = env.create_task_in("A", "review");

    assert!(matches!(env.board.add_status("review"), Err(BoardError::DuplicateStatus(_))));
    assert!(matches!(
        env.board.add_status("a-very-long-status-name"),
        Err(BoardError::StatusNameTooLong { .. })
    ));

    env.board.rename_status("review", "qa").unwrap();
    assert_eq!(env.board.store().get(&a.id).unwrap().status, "qa");

    env.board
        .reorder_statuses(&["qa", "not-started", "in-progress", "done"])
        .unwrap();
    assert_eq!(env.board.view().columns[0].status, "qa");
    assert!(matches!(env.board.reorder_statuses(&["qa"]), Err(BoardError::InvalidOrder)));

    env.board.remove_status("qa").unwrap();
    assert_eq!(env.board.store().get(&a.id).unwrap().status, "not-started");

    env.reopen();
    assert!(!env.board.vocabulary().contains("qa"));
}

#[test]
fn test_settings_export_import() {
    let mut env = TestEnv::new();
    env.board.add_status("ideas").unwrap();
    let json = env.board.export_settings().unwrap();

    let mut other = TestEnv::new();
    other.board.import_settings(&json).unwrap();
    assert_eq!(other.board.statuses(), env.board.statuses());
}

// =============================================================================
// Queries
// =============================================================================

#[test]
fn test_tags_due_and_overdue() {
    let mut env = TestEnv::new();
    env.create_task_with_tags("One", &["a", "b"]);
    env.create_task_with_tags("Two", &["b", "c"]);
    let now = env.clock.now();
    env.board
        .create_task(TaskDraft::new("Late").deadline(now - Duration::hours(2)))
        .unwrap();
    env.board
        .create_task(TaskDraft::new("Soon").deadline(now + Duration::hours(2)))
        .unwrap();

    assert_eq!(env.board.store().all_tags(), vec!["a", "b", "c"]);
    assert_eq!(env.board.store().overdue().len(), 1);
    assert_eq!(env.board.store().due_soon().len(), 2);

    let view = env.board.view();
    assert_eq!(view.columns[0].count(), 4);
    assert_eq!(view.total(), 4);
}

#[test]
fn test_tag_filter_narrows_view() {
    let mut env = TestEnv::new();
    env.create_task_with_tags("One", &["a"]);
    env.create_task_with_tags("Two", &["b"]);

    env.board.set_tag_filter("a");
    assert_eq!(env.board.view().total(), 1);
    assert_eq!(env.board.search_stats().displayed, 1);
}
