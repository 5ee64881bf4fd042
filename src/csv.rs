// CSV import/export for tasks
//
// Fixed 8-column layout; tags are joined with ';'. Fields containing a comma,
// a quote or a line break are quoted with inner quotes doubled.

use chrono::{DateTime, Utc};
use eyre::{Context, Result, eyre};
use fs2::FileExt;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::BoardError;
use crate::models::{DEFAULT_STATUS, Task, format_timestamp, generate_id, normalize_tags, parse_timestamp};

/// Header row, in column order
pub const HEADERS: [&str; 8] = [
    "TaskID",
    "Title",
    "Detail",
    "Deadline",
    "CreatedAt",
    "Status",
    "StatusChangedAt",
    "Tags",
];

pub const TAG_SEPARATOR: &str = ";";

/// Reason recorded for rows without a title
pub const SKIP_REASON: &str = "required field missing";

/// How many error lines `ImportReport::message` spells out
const MESSAGE_ERROR_LIMIT: usize = 3;

/// One parsed record and the line it started on (1-based)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub line: usize,
    pub fields: Vec<String>,
}

/// A row that was not imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    /// Line number of the row; 0 for payload-level failures
    pub line: usize,
    pub message: String,
    pub data: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub imported_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
}

/// Result of a CSV import: counts plus per-row detail
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub imported: Vec<Task>,
    pub skipped: Vec<RowIssue>,
    pub errors: Vec<RowIssue>,
    pub summary: ImportSummary,
}

impl ImportReport {
    fn skip(&mut self, row: CsvRow, reason: &str) {
        self.skipped.push(RowIssue {
            line: row.line,
            message: reason.to_string(),
            data: Some(row.fields),
        });
        self.summary.skipped_count += 1;
    }

    fn error(&mut self, line: usize, message: String, data: Option<Vec<String>>) {
        self.errors.push(RowIssue { line, message, data });
        self.summary.error_count += 1;
    }

    /// Human-readable digest: totals plus the first few errors.
    pub fn message(&self) -> String {
        let s = &self.summary;
        let mut out = format!(
            "CSV import complete\nRows processed: {}\nImported: {}\nSkipped: {}\nErrors: {}",
            s.total_rows, s.imported_count, s.skipped_count, s.error_count
        );

        if !self.errors.is_empty() {
            out.push_str("\n\nError details:");
            for issue in self.errors.iter().take(MESSAGE_ERROR_LIMIT) {
                out.push_str(&format!("\nRow {}: {}", issue.line, issue.message));
            }
            if self.errors.len() > MESSAGE_ERROR_LIMIT {
                out.push_str(&format!(
                    "\n... and {} more error(s)",
                    self.errors.len() - MESSAGE_ERROR_LIMIT
                ));
            }
        }

        out
    }
}

/// Why a data row was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowError {
    TooFewColumns(usize),
    MissingTitle,
    Date(BoardError),
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowError::TooFewColumns(n) => write!(
                f,
                "malformed row: expected {} columns, found {}",
                HEADERS.len(),
                n
            ),
            RowError::MissingTitle => write!(f, "{}", SKIP_REASON),
            RowError::Date(e) => write!(f, "{}", e),
        }
    }
}

// ============================================================================
// Export
// ============================================================================

fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Join rows of fields into CSV text, one record per line.
pub fn to_csv<R, F>(rows: R) -> String
where
    R: IntoIterator<Item = F>,
    F: IntoIterator,
    F::Item: AsRef<str>,
{
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| escape_field(cell.as_ref()).into_owned())
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn task_fields(task: &Task) -> [String; 8] {
    [
        task.id.clone(),
        task.title.clone(),
        task.detail.clone(),
        task.deadline.as_ref().map(format_timestamp).unwrap_or_default(),
        format_timestamp(&task.created_at),
        task.status.clone(),
        format_timestamp(&task.status_changed_at),
        task.tags.join(TAG_SEPARATOR),
    ]
}

/// Serialize tasks, in order, under the fixed header row.
pub fn export_tasks(tasks: &[Task]) -> String {
    let header = HEADERS.map(String::from);
    let rows = std::iter::once(header).chain(tasks.iter().map(task_fields));
    let csv = to_csv(rows);
    debug!(count = tasks.len(), "Exported tasks to CSV");
    csv
}

/// Default download name: `tasks_<YYYY-MM-DD>.csv`
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("tasks_{}.csv", now.format("%Y-%m-%d"))
}

/// Write an export to disk under an exclusive lock.
pub fn write_csv_file(path: &Path, content: &str) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    // Truncate only once the lock is held
    file.lock_exclusive().context("Failed to acquire file lock")?;
    file.set_len(0)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    info!(path = ?path, bytes = content.len(), "Wrote CSV export");
    Ok(())
}

// ============================================================================
// Parsing
// ============================================================================

fn finish_row(rows: &mut Vec<CsvRow>, fields: &mut Vec<String>, current: &mut String, line: usize) {
    fields.push(std::mem::take(current));
    let fields = std::mem::take(fields);
    if fields.len() == 1 && fields[0].trim().is_empty() {
        return;
    }
    rows.push(CsvRow { line, fields });
}

/// Split CSV text into records.
///
/// Quotes toggle an in-quotes state, `""` inside quotes is a literal quote,
/// and separators or line breaks inside quotes do not split. Blank lines are
/// dropped.
pub fn parse_csv(text: &str) -> Vec<CsvRow> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_start = 1;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' => {
                line += 1;
                if in_quotes {
                    current.push('\n');
                } else {
                    finish_row(&mut rows, &mut fields, &mut current, row_start);
                    row_start = line;
                }
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        warn!(line = row_start, "Unterminated quoted field at end of CSV");
    }
    finish_row(&mut rows, &mut fields, &mut current, row_start);

    rows
}

fn parse_date_field(field: &'static str, value: &str) -> Result<Option<DateTime<Utc>>, RowError> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_timestamp(value).map(Some).ok_or_else(|| {
        RowError::Date(BoardError::InvalidDate {
            field,
            value: value.to_string(),
        })
    })
}

fn task_from_row(fields: &[String], statuses: &[String], now: DateTime<Utc>) -> Result<Task, RowError> {
    if fields.len() < HEADERS.len() {
        return Err(RowError::TooFewColumns(fields.len()));
    }

    let [id, title, detail, deadline, created_at, status, status_changed_at, tags] = [
        &fields[0], &fields[1], &fields[2], &fields[3], &fields[4], &fields[5], &fields[6], &fields[7],
    ];

    let title = title.trim();
    if title.is_empty() {
        return Err(RowError::MissingTitle);
    }

    let deadline = parse_date_field("deadline", deadline)?;
    let created_at = parse_date_field("createdAt", created_at)?;
    let status_changed_at = parse_date_field("statusChangedAt", status_changed_at)?;

    let status = if statuses.iter().any(|s| s == status) {
        status.clone()
    } else {
        debug!(status = %status, "Unknown status in CSV, using default");
        DEFAULT_STATUS.to_string()
    };

    Ok(Task {
        id: if id.is_empty() { generate_id() } else { id.clone() },
        title: title.to_string(),
        detail: detail.trim().to_string(),
        deadline,
        status,
        tags: normalize_tags(tags.split(TAG_SEPARATOR)),
        created_at: created_at.unwrap_or(now),
        status_changed_at: status_changed_at.unwrap_or(now),
    })
}

/// Import CSV text into `existing`.
///
/// The first record is the header and is ignored. Rows whose id matches an
/// existing task replace it in place; other rows are appended. Bad rows are
/// recorded in the report and never abort the batch.
pub fn import_tasks(text: &str, existing: &mut Vec<Task>, statuses: &[String], now: DateTime<Utc>) -> ImportReport {
    let mut report = ImportReport::default();

    let rows = parse_csv(text);
    if rows.is_empty() {
        warn!("CSV import payload is empty");
        report.error(0, "CSV file is empty".to_string(), None);
        return report;
    }

    for row in rows.into_iter().skip(1) {
        report.summary.total_rows += 1;

        match task_from_row(&row.fields, statuses, now) {
            Ok(task) => {
                match existing.iter_mut().find(|t| t.id == task.id) {
                    Some(slot) => *slot = task.clone(),
                    None => existing.push(task.clone()),
                }
                report.imported.push(task);
                report.summary.imported_count += 1;
            }
            Err(RowError::MissingTitle) => {
                debug!(line = row.line, "Skipping CSV row without title");
                report.skip(row, SKIP_REASON);
            }
            Err(e) => {
                warn!(line = row.line, error = %e, "Rejected CSV row");
                report.error(row.line, e.to_string(), Some(row.fields));
            }
        }
    }

    info!(
        total = report.summary.total_rows,
        imported = report.summary.imported_count,
        skipped = report.summary.skipped_count,
        errors = report.summary.error_count,
        "CSV import finished"
    );

    report
}

/// Read an uploaded CSV file as UTF-8. Only `.csv` names are accepted.
pub fn read_csv_file(path: &Path) -> Result<String> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if !is_csv {
        return Err(eyre!(BoardError::NotCsvFile(path.display().to_string())));
    }

    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = String::from_utf8(bytes).context("CSV file is not valid UTF-8")?;

    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn statuses() -> Vec<String> {
        crate::models::DEFAULT_STATUSES.iter().map(|s| s.to_string()).collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    fn task(id: &str, title: &str) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            detail: String::new(),
            deadline: None,
            status: "not-started".to_string(),
            tags: Vec::new(),
            created_at: now(),
            status_changed_at: now(),
        }
    }

    fn header() -> String {
        HEADERS.join(",")
    }

    #[test]
    fn test_export_empty_is_header_only() {
        assert_eq!(export_tasks(&[]), header());
    }

    #[test]
    fn test_export_row_layout() {
        let mut t = task("t1", "Plan");
        t.tags = vec!["a".to_string(), "b".to_string()];
        t.deadline = Some(Utc.with_ymd_and_hms(2024, 6, 2, 17, 0, 0).unwrap());

        let csv = export_tasks(&[t]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "t1,Plan,,2024-06-02T17:00:00.000Z,2024-06-01T08:00:00.000Z,not-started,2024-06-01T08:00:00.000Z,a;b"
        );
    }

    #[test]
    fn test_quoting() {
        let t = task("t1", "He said \"hi\", ok");
        let csv = export_tasks(std::slice::from_ref(&t));
        assert!(csv.contains("\"He said \"\"hi\"\", ok\""));

        let mut dest = Vec::new();
        let report = import_tasks(&csv, &mut dest, &statuses(), now());
        assert_eq!(report.summary.imported_count, 1);
        assert_eq!(dest[0].title, "He said \"hi\", ok");
    }

    #[test]
    fn test_parse_csv_multiline_and_crlf() {
        let rows = parse_csv("a,b\r\n\"line1\nline2\",c\r\n\r\nd,e");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].fields, vec!["a", "b"]);
        assert_eq!(rows[0].line, 1);
        assert_eq!(rows[1].fields, vec!["line1\nline2", "c"]);
        assert_eq!(rows[1].line, 2);
        assert_eq!(rows[2].fields, vec!["d", "e"]);
        assert_eq!(rows[2].line, 5);
    }

    #[test]
    fn test_parse_csv_escaped_quotes_and_commas() {
        let rows = parse_csv(r#"x,"a ""b"", c",y"#);
        assert_eq!(rows[0].fields, vec!["x", "a \"b\", c", "y"]);
    }

    #[test]
    fn test_parse_csv_strips_bom() {
        let rows = parse_csv("\u{feff}TaskID,Title");
        assert_eq!(rows[0].fields[0], "TaskID");
    }

    #[test]
    fn test_round_trip() {
        let mut a = task("a", "First, with comma");
        a.detail = "multi\nline \"detail\"".to_string();
        a.tags = vec!["x".to_string(), "y".to_string()];
        a.deadline = Some(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
        let mut b = task("b", "Second");
        b.status = "done".to_string();

        let csv = export_tasks(&[a.clone(), b.clone()]);
        let mut dest = Vec::new();
        let report = import_tasks(&csv, &mut dest, &statuses(), Utc::now());

        assert_eq!(report.summary.imported_count, 2);
        assert_eq!(dest, vec![a, b]);
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let csv = export_tasks(&[task("a", "One"), task("b", "Two")]);
        let mut dest = Vec::new();
        import_tasks(&csv, &mut dest, &statuses(), now());
        let first = dest.clone();
        let report = import_tasks(&csv, &mut dest, &statuses(), now());

        assert_eq!(report.summary.imported_count, 2);
        assert_eq!(dest, first);
    }

    #[test]
    fn test_existing_id_replaced_in_place() {
        let mut dest = vec![task("a", "Old"), task("b", "Other")];
        let csv = export_tasks(&[task("a", "New")]);
        import_tasks(&csv, &mut dest, &statuses(), now());

        assert_eq!(dest.len(), 2);
        assert_eq!(dest[0].title, "New");
        assert_eq!(dest[1].id, "b");
    }

    #[test]
    fn test_unknown_status_coerced() {
        let csv = format!("{}\nt1,Title,,,,bogus,,", header());
        let mut dest = Vec::new();
        let report = import_tasks(&csv, &mut dest, &statuses(), now());

        assert_eq!(report.summary.imported_count, 1);
        assert_eq!(dest[0].status, "not-started");
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_empty_title_skipped() {
        let csv = format!("{}\nt1,  ,detail,,,done,,", header());
        let mut dest = vec![task("x", "keep")];
        let report = import_tasks(&csv, &mut dest, &statuses(), now());

        assert_eq!(report.summary.skipped_count, 1);
        assert_eq!(report.summary.imported_count, 0);
        assert_eq!(report.skipped[0].line, 2);
        assert_eq!(report.skipped[0].message, SKIP_REASON);
        assert_eq!(dest.len(), 1);
    }

    #[test]
    fn test_bad_date_errors() {
        let csv = format!("{}\nt1,Title,,not-a-date,,done,,", header());
        let mut dest = Vec::new();
        let report = import_tasks(&csv, &mut dest, &statuses(), now());

        assert_eq!(report.summary.error_count, 1);
        assert_eq!(report.summary.imported_count, 0);
        assert!(report.errors[0].message.contains("deadline"));
        assert!(dest.is_empty());
    }

    #[test]
    fn test_short_row_errors() {
        let csv = format!("{}\nt1,Title,detail", header());
        let mut dest = Vec::new();
        let report = import_tasks(&csv, &mut dest, &statuses(), now());

        assert_eq!(report.summary.error_count, 1);
        assert_eq!(report.errors[0].line, 2);
        assert!(report.errors[0].message.contains("found 3"));
    }

    #[test]
    fn test_missing_fields_filled() {
        let csv = format!("{}\n,Fresh, spaced detail ,,,,, a ; ;b", header());
        let mut dest = Vec::new();
        let report = import_tasks(&csv, &mut dest, &statuses(), now());

        assert_eq!(report.summary.imported_count, 1);
        let t = &dest[0];
        assert!(!t.id.is_empty());
        assert_eq!(t.detail, "spaced detail");
        assert_eq!(t.tags, vec!["a", "b"]);
        assert_eq!(t.created_at, now());
        assert_eq!(t.status_changed_at, now());
        assert_eq!(t.status, "not-started");
    }

    #[test]
    fn test_empty_payload_is_structural_error() {
        let mut dest = vec![task("a", "keep")];
        let report = import_tasks("  \n\n", &mut dest, &statuses(), now());

        assert_eq!(report.summary.error_count, 1);
        assert_eq!(report.errors[0].line, 0);
        assert_eq!(report.summary.total_rows, 0);
        assert_eq!(dest.len(), 1);
    }

    #[test]
    fn test_header_only_import() {
        let mut dest = vec![task("a", "keep")];
        let report = import_tasks(&export_tasks(&[]), &mut dest, &statuses(), now());
        assert_eq!(report.summary, ImportSummary::default());
        assert_eq!(dest.len(), 1);
    }

    #[test]
    fn test_message_digest() {
        let bad_rows: Vec<String> = (0..5).map(|i| format!("t{},T,,bad{},,,,", i, i)).collect();
        let csv = format!("{}\n{}", header(), bad_rows.join("\n"));
        let mut dest = Vec::new();
        let report = import_tasks(&csv, &mut dest, &statuses(), now());

        let msg = report.message();
        assert!(msg.contains("Rows processed: 5"));
        assert!(msg.contains("Errors: 5"));
        assert!(msg.contains("Row 2:"));
        assert!(msg.contains("Row 4:"));
        assert!(!msg.contains("Row 5:"));
        assert!(msg.contains("... and 2 more error(s)"));
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(export_filename(now()), "tasks_2024-06-01.csv");
    }

    #[test]
    fn test_read_csv_file_checks_extension() {
        let temp = TempDir::new().unwrap();
        let txt = temp.path().join("tasks.txt");
        fs::write(&txt, "a,b").unwrap();
        let err = read_csv_file(&txt).unwrap_err();
        assert!(err.downcast_ref::<BoardError>().is_some());

        let csv = temp.path().join("tasks.CSV");
        fs::write(&csv, "\u{feff}a,b").unwrap();
        assert_eq!(read_csv_file(&csv).unwrap(), "a,b");
    }

    #[test]
    fn test_write_csv_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.csv");
        write_csv_file(&path, "x,y").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x,y");
    }

    #[test]
    fn test_write_csv_file_replaces_longer_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.csv");
        fs::write(&path, "a much longer previous export\nwith two lines").unwrap();

        write_csv_file(&path, "x,y").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x,y");
    }
}
