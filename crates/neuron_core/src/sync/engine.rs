//! Directory → store reconciliation.
//!
//! # Responsibility
//! - Walk a notes directory, parse every Markdown file and upsert it.
//! - In prune mode, delete stored notes whose file is gone from the tree.
//!
//! # Invariants
//! - One bad file or record never aborts the pass.
//! - Scheduling state of existing notes is never modified.
//! - Pruning is skipped when the walk itself reported errors, since an
//!   unreadable subdirectory would otherwise look like deleted files.
//! - Running twice on an unchanged tree yields the same store and report.

use crate::model::note::{file_name_of, Note};
use crate::parser::{is_markdown_path, parse_file};
use crate::repo::note_store::{NoteStore, StoreError, UpsertOutcome};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Options for one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Remove stored notes whose source file was not found in this pass.
    pub prune_missing: bool,
}

impl SyncOptions {
    pub fn strict() -> Self {
        Self {
            prune_missing: true,
        }
    }
}

/// Phase in which a single file or record failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Walk,
    Parse,
    Store,
    Prune,
}

impl SyncStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Walk => "walk",
            Self::Parse => "parse",
            Self::Store => "store",
            Self::Prune => "prune",
        }
    }
}

/// A recoverable per-item failure recorded during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub path: PathBuf,
    pub stage: SyncStage,
    pub message: String,
}

/// Progress notifications emitted while a pass runs.
#[derive(Debug)]
pub enum SyncEvent<'a> {
    Synced {
        note: &'a Note,
        outcome: UpsertOutcome,
    },
    Removed {
        source_path: &'a str,
    },
    Failed(&'a SyncFailure),
}

/// Summary of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Notes upserted successfully (`inserted + updated`).
    pub synced: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Source paths deleted by the prune step.
    pub removed: Vec<String>,
    pub failures: Vec<SyncFailure>,
    /// Prune was requested but not run because the walk was incomplete.
    pub prune_skipped: bool,
}

impl SyncReport {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// Fatal sync errors. Per-file problems never end up here.
#[derive(Debug)]
pub enum SyncError {
    InvalidRoot {
        path: PathBuf,
        reason: String,
    },
    Store(StoreError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRoot { path, reason } => {
                write!(f, "cannot sync `{}`: {reason}", path.display())
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::InvalidRoot { .. } => None,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Sync engine over any note store implementation.
pub struct SyncEngine<S: NoteStore> {
    store: S,
}

impl<S: NoteStore> SyncEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs one pass without progress callbacks.
    pub fn sync_dir(
        &mut self,
        root: &Path,
        options: SyncOptions,
        now: DateTime<Utc>,
    ) -> Result<SyncReport, SyncError> {
        self.sync_dir_with(root, options, now, |_| {})
    }

    /// Runs one pass, reporting each synced/removed/failed item to `on_event`.
    ///
    /// Source paths are stored in canonical absolute form so the same tree
    /// always maps to the same keys.
    pub fn sync_dir_with(
        &mut self,
        root: &Path,
        options: SyncOptions,
        now: DateTime<Utc>,
        mut on_event: impl FnMut(SyncEvent<'_>),
    ) -> Result<SyncReport, SyncError> {
        let started_at = Instant::now();
        let root = resolve_root(root)?;
        info!(
            "event=sync_start module=sync root={} prune={}",
            root.display(),
            options.prune_missing
        );

        let mut report = SyncReport::default();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut walk_incomplete = false;

        for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    walk_incomplete = true;
                    let path = err.path().map_or_else(|| root.clone(), Path::to_path_buf);
                    record_failure(&mut report, &mut on_event, path, SyncStage::Walk, err);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_markdown_path(entry.path()) {
                continue;
            }
            // A file still on disk is never pruned, even if it fails below.
            if let Some(source_path) = entry.path().to_str() {
                seen.insert(source_path.to_string());
            }

            let note = match parse_file(entry.path(), now) {
                Ok(note) => note,
                Err(err) => {
                    let path = err.path().to_path_buf();
                    record_failure(&mut report, &mut on_event, path, SyncStage::Parse, err);
                    continue;
                }
            };

            match self.store.upsert(&note) {
                Ok(outcome) => {
                    debug!(
                        "event=sync_file module=sync status=ok outcome={:?} path={}",
                        outcome, note.source_path
                    );
                    match outcome {
                        UpsertOutcome::Inserted => report.inserted += 1,
                        UpsertOutcome::Updated => report.updated += 1,
                    }
                    report.synced += 1;
                    on_event(SyncEvent::Synced {
                        note: &note,
                        outcome,
                    });
                }
                Err(err) => {
                    let path = PathBuf::from(&note.source_path);
                    record_failure(&mut report, &mut on_event, path, SyncStage::Store, err);
                }
            }
        }

        if options.prune_missing {
            if walk_incomplete {
                warn!(
                    "event=sync_prune module=sync status=skipped reason=walk_incomplete root={}",
                    root.display()
                );
                report.prune_skipped = true;
            } else {
                self.prune_unseen(&seen, &mut report, &mut on_event)?;
            }
        }

        info!(
            "event=sync_finish module=sync status=ok root={} synced={} inserted={} updated={} removed={} failed={} duration_ms={}",
            root.display(),
            report.synced,
            report.inserted,
            report.updated,
            report.removed_count(),
            report.failures.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    fn prune_unseen(
        &mut self,
        seen: &BTreeSet<String>,
        report: &mut SyncReport,
        on_event: &mut impl FnMut(SyncEvent<'_>),
    ) -> Result<(), SyncError> {
        let stored = self.store.all_paths()?;
        for source_path in stored.difference(seen) {
            match self.store.delete(source_path) {
                Ok(true) => {
                    info!(
                        "event=sync_remove module=sync status=ok file={}",
                        file_name_of(source_path)
                    );
                    report.removed.push(source_path.clone());
                    on_event(SyncEvent::Removed { source_path });
                }
                Ok(false) => {}
                Err(err) => {
                    let path = PathBuf::from(source_path);
                    record_failure(report, on_event, path, SyncStage::Prune, err);
                }
            }
        }
        Ok(())
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf, SyncError> {
    let canonical = std::fs::canonicalize(root).map_err(|err| SyncError::InvalidRoot {
        path: root.to_path_buf(),
        reason: err.to_string(),
    })?;
    if !canonical.is_dir() {
        return Err(SyncError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(canonical)
}

fn record_failure(
    report: &mut SyncReport,
    on_event: &mut impl FnMut(SyncEvent<'_>),
    path: PathBuf,
    stage: SyncStage,
    err: impl Display,
) {
    warn!(
        "event=sync_file module=sync status=error stage={} path={} error={}",
        stage.as_str(),
        path.display(),
        err
    );
    report.failures.push(SyncFailure {
        path,
        stage,
        message: err.to_string(),
    });
    if let Some(failure) = report.failures.last() {
        on_event(SyncEvent::Failed(failure));
    }
}
