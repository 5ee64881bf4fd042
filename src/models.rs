// Data models for the task board

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BoardError;

/// Status every new task starts in, and where orphaned tasks are sent.
pub const DEFAULT_STATUS: &str = "not-started";

/// Protected statuses, in default column order.
pub const DEFAULT_STATUSES: [&str; 3] = ["not-started", "in-progress", "done"];

/// A single card on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub status_changed_at: DateTime<Utc>,
}

impl Task {
    /// Whether the task carries this exact tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Form payload for creating or editing a task
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub detail: String,
    pub deadline: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    /// `None` keeps the current status on update and means the default on create.
    pub status: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Trimmed title and detail, cleaned tags, millisecond deadline: the
    /// shape a task has after a CSV round-trip.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            detail: self.detail.trim().to_string(),
            deadline: self.deadline.map(truncate_millis),
            tags: normalize_tags(self.tags),
            status: self.status,
        }
    }

    /// Form-level validation run by callers before submitting.
    pub fn validate(&self) -> Result<(), BoardError> {
        if self.title.trim().is_empty() {
            return Err(BoardError::EmptyTitle);
        }
        Ok(())
    }
}

/// Trim every tag and drop the empty ones, keeping order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Fresh task id (UUID v7, time ordered)
pub fn generate_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Format a timestamp the way it is exported: RFC 3339, milliseconds, `Z`.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Timestamps are kept at millisecond precision so exports round-trip.
pub fn truncate_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(3)
}

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a date/datetime string.
///
/// Accepts RFC 3339 with any offset, an offset-less ISO datetime (read as
/// UTC) and a bare `YYYY-MM-DD` (midnight UTC). Returns `None` otherwise.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(truncate_millis(dt.with_timezone(&Utc)));
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(truncate_millis(naive.and_utc()));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Current timestamp in milliseconds since the epoch
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_ms() {
        let ts = now_ms();
        assert!(ts > 0);
        // Should be reasonable timestamp (after year 2020)
        assert!(ts > 1_600_000_000_000);
    }

    #[test]
    fn test_generate_id_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T09:30:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T09:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T18:30:00+09:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T09:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01 09:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-05-01"),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("not-a-date"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn test_format_timestamp_round_trips() {
        let at = truncate_millis(Utc::now());
        let text = format_timestamp(&at);
        assert!(text.ends_with('Z'));
        assert_eq!(parse_timestamp(&text), Some(at));
    }

    #[test]
    fn test_draft_validate() {
        assert!(TaskDraft::new("Write report").validate().is_ok());
        assert_eq!(TaskDraft::new("   ").validate(), Err(BoardError::EmptyTitle));
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags([" a ", "", "b", "  "]);
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn test_task_serialization_uses_camel_case() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let task = Task {
            id: "t1".to_string(),
            title: "Test".to_string(),
            detail: String::new(),
            deadline: None,
            status: DEFAULT_STATUS.to_string(),
            tags: vec!["x".to_string()],
            created_at: at,
            status_changed_at: at,
        };

        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"statusChangedAt\""));

        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_draft_normalized() {
        let deadline = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap() + chrono::Duration::nanoseconds(123_456_789);
        let mut draft = TaskDraft::new("  Title ").detail("  padded detail \n");
        draft.deadline = Some(deadline);
        draft.tags = vec![" a ".to_string(), "".to_string(), "b".to_string()];

        let draft = draft.normalized();
        assert_eq!(draft.title, "Title");
        assert_eq!(draft.detail, "padded detail");
        assert_eq!(draft.tags, vec!["a", "b"]);
        assert_eq!(format_timestamp(&draft.deadline.unwrap()), "2024-01-01T09:30:00.123Z");
        assert_eq!(draft.deadline, Some(truncate_millis(deadline)));
    }
}
