// Status vocabulary: the ordered list of board columns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::BoardError;
use crate::models::{DEFAULT_STATUSES, format_timestamp};

/// Default maximum length of a status name, in characters
pub const DEFAULT_MAX_STATUS_LEN: usize = 20;

const SETTINGS_VERSION: &str = "1.0";

/// Ordered, mutable list of allowed task statuses.
///
/// The three defaults can be reordered but never removed or renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusVocabulary {
    statuses: Vec<String>,
    max_len: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    statuses: Vec<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    export_date: Option<String>,
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        Self {
            statuses: DEFAULT_STATUSES.iter().map(|s| s.to_string()).collect(),
            max_len: DEFAULT_MAX_STATUS_LEN,
        }
    }
}

impl StatusVocabulary {
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Restore a persisted list. Never fails: blanks and duplicates are
    /// dropped and missing defaults are appended.
    pub fn from_saved<I, S>(saved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut statuses: Vec<String> = Vec::new();
        for s in saved {
            let s = s.as_ref().trim();
            if s.is_empty() || statuses.iter().any(|x| x == s) {
                continue;
            }
            statuses.push(s.to_string());
        }

        for default in DEFAULT_STATUSES {
            if !statuses.iter().any(|s| s == default) {
                warn!(status = default, "Saved statuses missing a default, restoring it");
                statuses.push(default.to_string());
            }
        }

        Self {
            statuses,
            max_len: DEFAULT_MAX_STATUS_LEN,
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.statuses
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn contains(&self, status: &str) -> bool {
        self.statuses.iter().any(|s| s == status)
    }

    pub fn is_protected(status: &str) -> bool {
        DEFAULT_STATUSES.contains(&status)
    }

    fn check_new_name(&self, name: &str) -> Result<(), BoardError> {
        if name.is_empty() {
            return Err(BoardError::EmptyStatusName);
        }
        if self.contains(name) {
            return Err(BoardError::DuplicateStatus(name.to_string()));
        }
        if name.chars().count() > self.max_len {
            return Err(BoardError::StatusNameTooLong {
                name: name.to_string(),
                max: self.max_len,
            });
        }
        Ok(())
    }

    /// Append a new status. Returns the trimmed name.
    pub fn add(&mut self, name: &str) -> Result<String, BoardError> {
        let name = name.trim();
        self.check_new_name(name)?;
        self.statuses.push(name.to_string());
        debug!(status = name, "Added status");
        Ok(name.to_string())
    }

    /// Remove a custom status. Tasks in it must be reassigned by the caller.
    pub fn remove(&mut self, name: &str) -> Result<String, BoardError> {
        if Self::is_protected(name) {
            return Err(BoardError::ProtectedStatus(name.to_string()));
        }
        let index = self
            .statuses
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| BoardError::UnknownStatus(name.to_string()))?;
        let removed = self.statuses.remove(index);
        debug!(status = %removed, "Removed status");
        Ok(removed)
    }

    /// Rename a custom status in place, keeping its position.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<String, BoardError> {
        if Self::is_protected(old) {
            return Err(BoardError::ProtectedStatus(old.to_string()));
        }
        let index = self
            .statuses
            .iter()
            .position(|s| s == old)
            .ok_or_else(|| BoardError::UnknownStatus(old.to_string()))?;

        let new = new.trim();
        self.check_new_name(new)?;
        self.statuses[index] = new.to_string();
        debug!(from = old, to = new, "Renamed status");
        Ok(new.to_string())
    }

    /// Replace the order. `new_order` must be a permutation of the current list.
    pub fn reorder<S: AsRef<str>>(&mut self, new_order: &[S]) -> Result<(), BoardError> {
        let valid = new_order.len() == self.statuses.len()
            && new_order.iter().all(|s| self.contains(s.as_ref()))
            && self
                .statuses
                .iter()
                .all(|s| new_order.iter().any(|n| n.as_ref() == s));
        if !valid {
            return Err(BoardError::InvalidOrder);
        }
        self.statuses = new_order.iter().map(|s| s.as_ref().to_string()).collect();
        Ok(())
    }

    /// Back to the defaults. Returns the custom statuses that were dropped.
    pub fn reset(&mut self) -> Vec<String> {
        let removed: Vec<String> = self
            .statuses
            .iter()
            .filter(|s| !Self::is_protected(s))
            .cloned()
            .collect();
        self.statuses = DEFAULT_STATUSES.iter().map(|s| s.to_string()).collect();
        removed
    }

    /// Problems with the current list; empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for default in DEFAULT_STATUSES {
            if !self.contains(default) {
                problems.push(format!("required status missing: {}", default));
            }
        }
        let mut seen: Vec<&str> = Vec::new();
        for s in &self.statuses {
            if seen.contains(&s.as_str()) {
                problems.push(format!("duplicate status: {}", s));
            }
            seen.push(s);
        }
        if self.statuses.iter().any(|s| s.trim().is_empty()) {
            problems.push("empty status name".to_string());
        }
        problems
    }

    /// Settings document for download.
    pub fn export_settings(&self, now: DateTime<Utc>) -> eyre::Result<String> {
        let file = SettingsFile {
            statuses: self.statuses.clone(),
            version: Some(SETTINGS_VERSION.to_string()),
            export_date: Some(format_timestamp(&now)),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Parse a settings document. The current vocabulary is untouched; the
    /// caller swaps in the result.
    pub fn import_settings(&self, json: &str) -> Result<Self, BoardError> {
        let file: SettingsFile =
            serde_json::from_str(json).map_err(|e| BoardError::InvalidSettings(e.to_string()))?;

        if let Some(missing) = DEFAULT_STATUSES
            .iter()
            .find(|d| !file.statuses.iter().any(|s| s == *d))
        {
            return Err(BoardError::InvalidSettings(format!(
                "required status missing: {}",
                missing
            )));
        }

        Ok(Self::from_saved(file.statuses).with_max_len(self.max_len))
    }
}
