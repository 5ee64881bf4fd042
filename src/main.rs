//! Taskboard CLI - kanban task board with CSV import/export.

use chrono::{DateTime, Utc};
use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use taskboard::csv::{export_filename, read_csv_file, write_csv_file};
use taskboard::filter::{SearchStats, sort_tasks};
use taskboard::models::parse_timestamp;
use taskboard::{
    Board, BoardError, Config, DeadlineState, SearchCriteria, SortKey, SortOrder, SqliteStorage, SystemClock,
    Task, TaskDraft,
};
use tracing::info;
use tracing::level_filters::LevelFilter;

mod cli;

use cli::{BackupCommand, Cli, Command, StatusCommand};

fn setup_logging(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => configured.parse::<LevelFilter>().unwrap_or(LevelFilter::WARN),
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_board(config: &Config) -> Result<Board> {
    let store_dir = config.resolve_store_dir();
    let storage = SqliteStorage::open(&store_dir).context("Failed to open board storage")?;
    Ok(Board::open(Box::new(storage), config, Arc::new(SystemClock)))
}

fn parse_deadline(value: &str) -> Result<DateTime<Utc>, BoardError> {
    parse_timestamp(value).ok_or_else(|| BoardError::InvalidDate {
        field: "deadline",
        value: value.to_string(),
    })
}

fn format_status(status: &str) -> ColoredString {
    match status {
        "not-started" => status.yellow(),
        "in-progress" => status.blue(),
        "done" => status.green(),
        other => other.magenta(),
    }
}

fn format_deadline(task: &Task, now: DateTime<Utc>, board: &Board) -> String {
    let Some(deadline) = task.deadline else {
        return String::new();
    };
    let text = format!(" due {}", deadline.format("%Y-%m-%d %H:%M"));
    match DeadlineState::of(Some(deadline), now, board.due_soon_window()) {
        DeadlineState::Overdue => text.red().bold().to_string(),
        DeadlineState::DueSoon => text.yellow().to_string(),
        _ => text.dimmed().to_string(),
    }
}

fn format_tags(task: &Task) -> String {
    if task.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", task.tags.join(", ")).dimmed().to_string()
    }
}

fn print_task_line(task: &Task, now: DateTime<Utc>, board: &Board) {
    println!(
        "{} {} {}{}{}",
        format_status(&task.status),
        task.id.cyan(),
        task.title,
        format_tags(task),
        format_deadline(task, now, board)
    );
}

fn print_tasks(tasks: &[&Task], empty: &str, board: &Board) {
    if tasks.is_empty() {
        println!("{}", empty.dimmed());
        return;
    }
    let now = board.now();
    for task in tasks {
        print_task_line(task, now, board);
    }
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} Wrote {}", "✓".green(), path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(dir) = cli.store_dir {
        config.store_dir = Some(dir);
    }

    setup_logging(cli.verbose, &config.log_level);
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    let mut board = open_board(&config)?;

    match cli.command {
        Command::Add {
            title,
            detail,
            deadline,
            tags,
            status,
        } => {
            let mut draft = TaskDraft::new(title).detail(detail.unwrap_or_default());
            if let Some(d) = deadline {
                draft = draft.deadline(parse_deadline(&d)?);
            }
            if let Some(t) = tags {
                draft = draft.tags(t);
            }
            if let Some(s) = status {
                draft = draft.status(s);
            }

            let task = board.create_task(draft)?;
            println!("{} Created: {} {}", "✓".green(), task.id.cyan(), task.title);
        }

        Command::Edit {
            id,
            title,
            detail,
            deadline,
            tags,
            status,
        } => {
            let current = board
                .store()
                .get(&id)
                .cloned()
                .ok_or_else(|| BoardError::TaskNotFound(id.clone()))?;

            let mut draft = TaskDraft::new(title.unwrap_or(current.title))
                .detail(detail.unwrap_or(current.detail))
                .tags(tags.unwrap_or(current.tags));
            draft.deadline = match deadline.as_deref() {
                None => current.deadline,
                Some("") | Some("none") => None,
                Some(d) => Some(parse_deadline(d)?),
            };
            draft.status = status;

            let task = board.update_task(&id, draft)?;
            println!("{} Updated: {} {}", "✓".green(), task.id.cyan(), task.title);
        }

        Command::Mv { id, status } => {
            if board.move_task(&id, &status)? {
                println!("{} Moved {} to {}", "✓".green(), id.cyan(), format_status(&status));
            } else {
                println!("{} already in {}", id.cyan(), format_status(&status));
            }
        }

        Command::Rm { id } => {
            board.delete_task(&id)?;
            println!("{} Deleted: {}", "✓".green(), id.cyan());
        }

        Command::Show { id } => {
            let task = board
                .store()
                .get(&id)
                .ok_or_else(|| BoardError::TaskNotFound(id.clone()))?;
            let now = board.now();

            println!("{} {}", task.id.cyan(), task.title.bold());
            println!("  Status:  {}", format_status(&task.status));
            if !task.detail.is_empty() {
                println!("  Detail:  {}", task.detail);
            }
            if task.deadline.is_some() {
                println!("  Deadline:{}", format_deadline(task, now, &board));
            }
            if !task.tags.is_empty() {
                println!("  Tags:    {}", task.tags.join(", "));
            }
            println!("  Created: {}", task.created_at.format("%Y-%m-%d %H:%M"));
            println!("  Changed: {}", task.status_changed_at.format("%Y-%m-%d %H:%M"));
        }

        Command::List {
            search,
            tag,
            status,
            due,
            created,
            sort,
            asc,
        } => {
            if let Some(s) = &status
                && !board.vocabulary().contains(s)
            {
                return Err(BoardError::UnknownStatus(s.clone()).into());
            }

            let criteria = SearchCriteria {
                term: search,
                status,
                tags: tag.unwrap_or_default(),
                deadline: due.as_deref().map(str::parse).transpose().map_err(|e: String| eyre!(e))?,
                created: created.as_deref().map(str::parse).transpose().map_err(|e: String| eyre!(e))?,
            };

            let mut tasks = criteria.apply(board.tasks(), board.now());
            if let Some(key) = sort {
                let key: SortKey = key.parse().map_err(|e: String| eyre!(e))?;
                let order = if asc { SortOrder::Asc } else { SortOrder::Desc };
                tasks = sort_tasks(tasks, key, order);
            }

            print_tasks(&tasks, "No tasks found", &board);

            let stats = SearchStats::compute(board.tasks(), &tasks);
            if stats.filtered > 0 {
                println!(
                    "{}",
                    format!("Showing {} of {} tasks", stats.displayed, stats.total).dimmed()
                );
            }
        }

        Command::Board { search, tag } => {
            if let Some(term) = search {
                board.set_search(&term);
            }
            if let Some(tag) = tag {
                board.set_tag_filter(&tag);
            }

            let now = board.now();
            let view = board.view();
            for column in &view.columns {
                println!("{} ({})", format_status(column.status).bold(), column.count());
                for card in &column.cards {
                    let marker = match card.deadline {
                        DeadlineState::Overdue => "!".red().bold(),
                        DeadlineState::DueSoon => "*".yellow(),
                        _ => " ".normal(),
                    };
                    println!(
                        "  {} {} {}{}{}",
                        marker,
                        card.task.id.cyan(),
                        card.task.title,
                        format_tags(card.task),
                        format_deadline(card.task, now, &board)
                    );
                }
            }
            if !view.unplaced.is_empty() {
                println!("{} ({})", "unknown status".red().bold(), view.unplaced.len());
                for task in &view.unplaced {
                    print_task_line(task, now, &board);
                }
            }

            let usage = board.usage();
            println!(
                "{}",
                format!(
                    "{} task(s), storage {:.1} KB ({:.1}%)",
                    view.total(),
                    usage.used as f64 / 1024.0,
                    usage.percentage
                )
                .dimmed()
            );
        }

        Command::Tags => {
            let tags = board.store().all_tags();
            if tags.is_empty() {
                println!("{}", "No tags".dimmed());
            }
            for tag in tags {
                let count = board.store().filter_by_tag(&tag).len();
                println!("{} {}", tag.cyan(), format!("({})", count).dimmed());
            }
        }

        Command::Due => {
            print_tasks(&board.store().due_soon(), "Nothing due soon", &board);
        }

        Command::Overdue => {
            print_tasks(&board.store().overdue(), "Nothing overdue", &board);
        }

        Command::Remind => {
            let due: Vec<Task> = board.due_reminders().into_iter().cloned().collect();
            if due.is_empty() {
                println!("{}", "No reminders".dimmed());
            }
            for task in &due {
                let when = task
                    .deadline
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("{} Task due: {} ({})", "⏰".yellow(), task.title.bold(), when);
            }
        }

        Command::Status { command } => run_status(&mut board, command)?,

        Command::Export { output } => {
            let path = output.unwrap_or_else(|| export_filename(board.now()).into());
            let csv = board.export_csv();
            write_csv_file(&path, &csv)?;
            println!(
                "{} Exported {} task(s) to {}",
                "✓".green(),
                board.tasks().len(),
                path.display()
            );
        }

        Command::Import { file } => {
            let text = read_csv_file(&file)?;
            let report = board.import_csv(&text);
            let message = report.message();
            if report.summary.error_count > 0 {
                println!("{}", message.yellow());
            } else {
                println!("{}", message.green());
            }
        }

        Command::Backup { command } => match command {
            BackupCommand::Export { output } => {
                let json = board.export_backup()?;
                write_or_print(output.as_deref(), &json)?;
            }
            BackupCommand::Restore { file } => {
                let json = fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
                let backup = board.restore_backup(&json)?;
                println!(
                    "{} Restored {} task(s) from backup of {}",
                    "✓".green(),
                    backup.data.tasks.len(),
                    backup.timestamp
                );
            }
        },

        Command::Clear { yes } => {
            if !yes {
                return Err(eyre!("Refusing to clear the board without --yes"));
            }
            board.clear()?;
            println!("{} Board cleared", "✓".green());
        }
    }

    Ok(())
}

fn run_status(board: &mut Board, command: StatusCommand) -> Result<()> {
    match command {
        StatusCommand::List => {
            for status in board.statuses() {
                let count = board.store().by_status(status).len();
                println!("{} {}", format_status(status), format!("({})", count).dimmed());
            }
        }
        StatusCommand::Add { name } => {
            let name = board.add_status(&name)?;
            println!("{} Added status {}", "✓".green(), format_status(&name));
        }
        StatusCommand::Rm { name } => {
            let moved = board.remove_status(&name)?;
            println!("{} Removed status {} ({} task(s) moved)", "✓".green(), name, moved);
        }
        StatusCommand::Rename { old, new } => {
            let moved = board.rename_status(&old, &new)?;
            println!("{} Renamed {} to {} ({} task(s))", "✓".green(), old, new.trim(), moved);
        }
        StatusCommand::Reorder { order } => {
            board.reorder_statuses(&order)?;
            println!("{} New order: {}", "✓".green(), board.statuses().join(", "));
        }
        StatusCommand::Reset => {
            let moved = board.reset_statuses();
            println!("{} Statuses reset ({} task(s) moved)", "✓".green(), moved);
        }
        StatusCommand::Export { output } => {
            let json = board.export_settings()?;
            write_or_print(output.as_deref(), &json)?;
        }
        StatusCommand::Import { file } => {
            let json = fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let moved = board.import_settings(&json)?;
            println!(
                "{} Imported statuses: {} ({} task(s) moved)",
                "✓".green(),
                board.statuses().join(", "),
                moved
            );
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
