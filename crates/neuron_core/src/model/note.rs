//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical study record parsed from one Markdown file.
//! - Carry the embedded spaced-repetition state next to the content.
//!
//! # Invariants
//! - `source_path` is the identity key; it is unique within a store.
//! - `schedule.ease_factor >= MIN_EASE_FACTOR` at all times.
//! - `schedule.interval >= 1.0` after any scheduling update.
//! - `schedule.due_at` is always a concrete instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable surrogate identifier stored next to the source path.
pub type NoteId = Uuid;

/// Fallback title when neither metadata nor a heading provides one.
pub const UNTITLED: &str = "Untitled";
/// Interval assigned to freshly created notes, in days.
pub const DEFAULT_INTERVAL_DAYS: f64 = 1.0;
/// Ease factor assigned to freshly created notes.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
/// Lower bound for the ease factor.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Spaced-repetition state embedded in every note.
///
/// Only the scheduler mutates these fields. Sync never touches them once a
/// note exists in the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Instant from which the note is eligible for review.
    pub due_at: DateTime<Utc>,
    /// Spacing in days since the last successful review.
    pub interval: f64,
    /// Multiplier governing interval growth.
    pub ease_factor: f64,
}

impl Schedule {
    /// Initial state for a note first seen at `now`.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            due_at: now,
            interval: DEFAULT_INTERVAL_DAYS,
            ease_factor: DEFAULT_EASE_FACTOR,
        }
    }

    /// Returns whether the note is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}

/// One unit of study material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Surrogate id. Kept from the first insert; re-sync does not change it.
    pub id: NoteId,
    /// Path of the originating file; the identity key.
    pub source_path: String,
    pub title: String,
    /// Ordered set: duplicates are dropped, first occurrence wins.
    pub tags: Vec<String>,
    /// Full file content, verbatim.
    pub body: String,
    /// Date from the `created` metadata key, if present and valid.
    pub created_at: Option<DateTime<Utc>>,
    pub schedule: Schedule,
}

impl Note {
    /// Creates a note with a fresh id and the initial schedule.
    pub fn new(
        source_path: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_path: source_path.into(),
            title: title.into(),
            tags: Vec::new(),
            body: body.into(),
            created_at: None,
            schedule: Schedule::initial(now),
        }
    }

    /// Replaces the tag set, dropping blanks and repeated values.
    pub fn set_tags<I, T>(&mut self, tags: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.clear();
        for tag in tags {
            let tag = tag.into();
            let trimmed = tag.trim();
            if trimmed.is_empty() || self.tags.iter().any(|known| known == trimmed) {
                continue;
            }
            self.tags.push(trimmed.to_string());
        }
    }
}

/// Returns the last path component of a stored source path.
pub fn file_name_of(source_path: &str) -> &str {
    std::path::Path::new(source_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(source_path)
}

#[cfg(test)]
mod tests {
    use super::{file_name_of, Note, Schedule, DEFAULT_EASE_FACTOR};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn new_note_starts_due_now_with_default_schedule() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let note = Note::new("notes/a.md", "A", "# A", now);
        assert_eq!(note.schedule, Schedule::initial(now));
        assert_eq!(note.schedule.ease_factor, DEFAULT_EASE_FACTOR);
        assert!(note.schedule.is_due(now));
        assert!(!note.schedule.is_due(now - Duration::seconds(1)));
    }

    #[test]
    fn set_tags_deduplicates_and_drops_blanks() {
        let now = Utc::now();
        let mut note = Note::new("a.md", "A", "", now);
        note.set_tags(["rust", " ", "sql", "rust"]);
        assert_eq!(note.tags, vec!["rust".to_string(), "sql".to_string()]);
    }

    #[test]
    fn file_name_strips_directories() {
        assert_eq!(file_name_of("vault/deep/topic.md"), "topic.md");
        assert_eq!(file_name_of("topic.md"), "topic.md");
    }
}
