//! Review session use-cases.
//!
//! # Responsibility
//! - Select notes for single reviews, interleaved batches and lookups.
//! - Apply a rating and persist the resulting schedule.
//!
//! # Invariants
//! - "Nothing to review" is `Ok(None)` / an empty batch, never an error.
//! - A note's in-memory schedule only changes when persisting succeeded.

use crate::model::note::{Note, Schedule};
use crate::repo::note_store::{NoteStore, StoreError, StoreResult};
use crate::srs::{apply_rating, preview_intervals, Rating};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Which notes a single review may pick from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReviewMode {
    /// Earliest due note.
    #[default]
    Due,
    /// Any note, picked at random.
    Any,
}

#[derive(Debug)]
pub enum ReviewError {
    /// The note vanished from the store between selection and grading.
    NoteMissing(String),
    Store(StoreError),
}

impl Display for ReviewError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteMissing(path) => write!(f, "note no longer stored: {path}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReviewError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::NoteMissing(_) => None,
        }
    }
}

impl From<StoreError> for ReviewError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Review facade over a note store implementation.
pub struct ReviewService<S: NoteStore> {
    store: S,
}

impl<S: NoteStore> ReviewService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Picks the next note to review, or `None` when there is nothing to do.
    pub fn next_note(
        &self,
        mode: ReviewMode,
        now: DateTime<Utc>,
    ) -> Result<Option<Note>, ReviewError> {
        let found = match mode {
            ReviewMode::Due => self.store.get_due(now),
            ReviewMode::Any => self.store.get_any(),
        };
        not_found_as_none(found)
    }

    /// Up to `limit` due notes in random order for an interleaved session.
    pub fn mix_batch(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Note>, ReviewError> {
        let batch = self.store.get_due_batch(now, limit)?;
        debug!(
            "event=review_mix_batch module=service status=ok requested={} selected={}",
            limit,
            batch.len()
        );
        Ok(batch)
    }

    /// First note whose title or path contains `term`.
    pub fn find(&self, term: &str) -> Result<Option<Note>, ReviewError> {
        not_found_as_none(self.store.find_by_title_or_path(term))
    }

    pub fn due_count(&self, now: DateTime<Utc>) -> Result<u64, ReviewError> {
        Ok(self.store.count_due(now)?)
    }

    /// Applies `rating` to `note`, persists it and returns the new schedule.
    pub fn grade(
        &mut self,
        note: &mut Note,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<Schedule, ReviewError> {
        let previous = note.schedule;
        apply_rating(note, rating, now);

        if let Err(err) = self.store.update_schedule(note) {
            note.schedule = previous;
            return Err(match err {
                StoreError::NotFound(_) => ReviewError::NoteMissing(note.source_path.clone()),
                other => ReviewError::Store(other),
            });
        }

        info!(
            "event=review_grade module=service status=ok rating={} interval={} ease={:.2}",
            rating, note.schedule.interval, note.schedule.ease_factor
        );
        Ok(note.schedule)
    }

    /// Interval (in days) each rating would give `note` right now.
    pub fn preview(&self, note: &Note) -> [(Rating, f64); 3] {
        preview_intervals(&note.schedule)
    }
}

fn not_found_as_none(result: StoreResult<Note>) -> Result<Option<Note>, ReviewError> {
    match result {
        Ok(note) => Ok(Some(note)),
        Err(err) if err.is_not_found() => {
            debug!("event=review_select module=service status=empty lookup={err}");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}
