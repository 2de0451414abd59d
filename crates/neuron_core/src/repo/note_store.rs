//! Note store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist notes keyed by `source_path` in the `notes` table.
//! - Answer the due/random/lookup queries review sessions need.
//!
//! # Invariants
//! - `upsert` never overwrites `due_at`, `interval` or `ease_factor` of an
//!   existing row.
//! - `update_schedule` touches only the scheduling columns.
//! - `NotFound` is an expected outcome and is never logged as an error.
//! - Tags are stored as a JSON array of strings.
//!
//! # Concurrency
//! Writes from several processes are not coordinated beyond SQLite's own
//! statement atomicity; last writer wins.

use crate::db::DbError;
use crate::model::note::{Note, Schedule};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    source_path,
    title,
    tags,
    body,
    created_at,
    due_at,
    interval,
    ease_factor
FROM notes";

const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "source_path",
    "title",
    "tags",
    "body",
    "created_at",
    "due_at",
    "interval",
    "ease_factor",
];

pub type StoreResult<T> = Result<T, StoreError>;

/// Which query came back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteLookup {
    Due,
    Any,
    Term(String),
    Path(String),
}

impl Display for NoteLookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Due => write!(f, "no note is due"),
            Self::Any => write!(f, "the store is empty"),
            Self::Term(term) => write!(f, "no note matches `{term}`"),
            Self::Path(path) => write!(f, "no note stored for `{path}`"),
        }
    }
}

/// Store error with enough context to diagnose the failing operation.
#[derive(Debug)]
pub enum StoreError {
    NotFound(NoteLookup),
    Storage {
        operation: &'static str,
        path: Option<String>,
        source: DbError,
    },
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(lookup) => write!(f, "{lookup}"),
            Self::Storage {
                operation,
                path: Some(path),
                source,
            } => write!(f, "note store {operation} failed for `{path}`: {source}"),
            Self::Storage {
                operation,
                path: None,
                source,
            } => write!(f, "note store {operation} failed: {source}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage { source, .. } => Some(source),
            _ => None,
        }
    }
}

trait StorageContext<T> {
    fn during(self, operation: &'static str, path: Option<&str>) -> StoreResult<T>;
}

impl<T> StorageContext<T> for rusqlite::Result<T> {
    fn during(self, operation: &'static str, path: Option<&str>) -> StoreResult<T> {
        self.map_err(|err| StoreError::Storage {
            operation,
            path: path.map(str::to_string),
            source: DbError::Sqlite(err),
        })
    }
}

/// Whether an upsert created a row or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Persistent keyed collection of notes.
pub trait NoteStore {
    /// Inserts a new note, or overwrites title/tags/body/created_at of the
    /// note stored under the same `source_path`.
    fn upsert(&mut self, note: &Note) -> StoreResult<UpsertOutcome>;
    /// Returns the note with the earliest `due_at <= now`.
    fn get_due(&self, now: DateTime<Utc>) -> StoreResult<Note>;
    /// Returns up to `limit` due notes picked uniformly at random.
    fn get_due_batch(&self, now: DateTime<Utc>, limit: u32) -> StoreResult<Vec<Note>>;
    /// Returns one note picked uniformly at random, due or not.
    fn get_any(&self) -> StoreResult<Note>;
    /// Returns the first note whose title or path contains `term`, ignoring
    /// ASCII case.
    ///
    /// When several notes match, which one is returned is implementation
    /// defined (currently insertion order). Callers must not rely on it.
    fn find_by_title_or_path(&self, term: &str) -> StoreResult<Note>;
    /// Gets one note by its source path.
    fn get_by_path(&self, source_path: &str) -> StoreResult<Option<Note>>;
    /// Persists the scheduling fields of an existing note.
    fn update_schedule(&mut self, note: &Note) -> StoreResult<()>;
    /// Returns every stored source path.
    fn all_paths(&self) -> StoreResult<BTreeSet<String>>;
    /// Removes one note. Returns `false` when nothing was stored there.
    fn delete(&mut self, source_path: &str) -> StoreResult<bool>;
    /// Counts notes due at `now`.
    fn count_due(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// SQLite-backed note store borrowing the process connection.
pub struct SqliteNoteStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteNoteStore<'conn> {
    /// Wraps a migrated connection after checking the schema shape.
    pub fn try_new(conn: &'conn mut Connection) -> StoreResult<Self> {
        ensure_notes_table_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_one(
        &self,
        operation: &'static str,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Option<Note>> {
        let mut stmt = self.conn.prepare(sql).during(operation, None)?;
        let mut rows = stmt.query(params).during(operation, None)?;
        match rows.next().during(operation, None)? {
            Some(row) => Ok(Some(parse_note_row(row)?)),
            None => Ok(None),
        }
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn upsert(&mut self, note: &Note) -> StoreResult<UpsertOutcome> {
        let path = Some(note.source_path.as_str());
        let tags_json = serde_json::to_string(&note.tags)
            .map_err(|err| StoreError::InvalidData(format!("cannot encode tags: {err}")))?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .during("upsert", path)?;
        let exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM notes WHERE source_path = ?1);",
                [note.source_path.as_str()],
                |row| row.get(0),
            )
            .during("upsert", path)?;

        tx.execute(
            "INSERT INTO notes (
                id,
                source_path,
                title,
                tags,
                body,
                created_at,
                due_at,
                interval,
                ease_factor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(source_path) DO UPDATE SET
                title = excluded.title,
                tags = excluded.tags,
                body = excluded.body,
                created_at = excluded.created_at;",
            params![
                note.id.to_string(),
                note.source_path.as_str(),
                note.title.as_str(),
                tags_json,
                note.body.as_str(),
                note.created_at.map(|at| at.timestamp_millis()),
                note.schedule.due_at.timestamp_millis(),
                note.schedule.interval,
                note.schedule.ease_factor,
            ],
        )
        .during("upsert", path)?;
        tx.commit().during("upsert", path)?;

        Ok(if exists {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    fn get_due(&self, now: DateTime<Utc>) -> StoreResult<Note> {
        self.query_one(
            "get_due",
            &format!("{NOTE_SELECT_SQL} WHERE due_at <= ?1 ORDER BY due_at ASC, rowid ASC LIMIT 1;"),
            [now.timestamp_millis()],
        )?
        .ok_or(StoreError::NotFound(NoteLookup::Due))
    }

    fn get_due_batch(&self, now: DateTime<Utc>, limit: u32) -> StoreResult<Vec<Note>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare(&format!(
                "{NOTE_SELECT_SQL} WHERE due_at <= ?1 ORDER BY RANDOM() LIMIT ?2;"
            ))
            .during("get_due_batch", None)?;
        let mut rows = stmt
            .query(params![now.timestamp_millis(), i64::from(limit)])
            .during("get_due_batch", None)?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next().during("get_due_batch", None)? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn get_any(&self) -> StoreResult<Note> {
        self.query_one(
            "get_any",
            &format!("{NOTE_SELECT_SQL} ORDER BY RANDOM() LIMIT 1;"),
            [],
        )?
        .ok_or(StoreError::NotFound(NoteLookup::Any))
    }

    fn find_by_title_or_path(&self, term: &str) -> StoreResult<Note> {
        // instr() instead of LIKE so `%` and `_` in the term match literally.
        self.query_one(
            "find_by_title_or_path",
            &format!(
                "{NOTE_SELECT_SQL}
                 WHERE instr(lower(title), lower(?1)) > 0
                    OR instr(lower(source_path), lower(?1)) > 0
                 ORDER BY rowid ASC
                 LIMIT 1;"
            ),
            [term],
        )?
        .ok_or_else(|| StoreError::NotFound(NoteLookup::Term(term.to_string())))
    }

    fn get_by_path(&self, source_path: &str) -> StoreResult<Option<Note>> {
        self.query_one(
            "get_by_path",
            &format!("{NOTE_SELECT_SQL} WHERE source_path = ?1;"),
            [source_path],
        )
    }

    fn update_schedule(&mut self, note: &Note) -> StoreResult<()> {
        let path = note.source_path.as_str();
        let changed = self
            .conn
            .execute(
                "UPDATE notes
                 SET
                    due_at = ?2,
                    interval = ?3,
                    ease_factor = ?4
                 WHERE source_path = ?1;",
                params![
                    path,
                    note.schedule.due_at.timestamp_millis(),
                    note.schedule.interval,
                    note.schedule.ease_factor,
                ],
            )
            .during("update_schedule", Some(path))?;

        if changed == 0 {
            return Err(StoreError::NotFound(NoteLookup::Path(path.to_string())));
        }
        Ok(())
    }

    fn all_paths(&self) -> StoreResult<BTreeSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT source_path FROM notes;")
            .during("all_paths", None)?;
        let paths = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .during("all_paths", None)?
            .collect::<rusqlite::Result<BTreeSet<_>>>()
            .during("all_paths", None)?;
        Ok(paths)
    }

    fn delete(&mut self, source_path: &str) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE source_path = ?1;", [source_path])
            .during("delete", Some(source_path))?;
        Ok(changed > 0)
    }

    fn count_due(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM notes WHERE due_at <= ?1;",
                [now.timestamp_millis()],
                |row| row.get(0),
            )
            .during("count_due", None)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

fn parse_note_row(row: &Row<'_>) -> StoreResult<Note> {
    let read = |err: rusqlite::Error| StoreError::Storage {
        operation: "read_row",
        path: None,
        source: DbError::Sqlite(err),
    };

    let source_path: String = row.get("source_path").map_err(read)?;
    let id_text: String = row.get("id").map_err(read)?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid id `{id_text}` for `{source_path}`"))
    })?;

    let tags_json: String = row.get("tags").map_err(read)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(|err| {
        StoreError::InvalidData(format!("invalid tags JSON for `{source_path}`: {err}"))
    })?;

    let created_at = row
        .get::<_, Option<i64>>("created_at")
        .map_err(read)?
        .map(|millis| millis_to_utc(millis, &source_path, "created_at"))
        .transpose()?;
    let due_at = millis_to_utc(
        row.get("due_at").map_err(read)?,
        &source_path,
        "due_at",
    )?;

    Ok(Note {
        id,
        title: row.get("title").map_err(read)?,
        tags,
        body: row.get("body").map_err(read)?,
        created_at,
        schedule: Schedule {
            due_at,
            interval: row.get("interval").map_err(read)?,
            ease_factor: row.get("ease_factor").map_err(read)?,
        },
        source_path,
    })
}

fn millis_to_utc(millis: i64, source_path: &str, column: &str) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid {column} value `{millis}` for `{source_path}`"
        ))
    })
}

fn ensure_notes_table_ready(conn: &Connection) -> StoreResult<()> {
    if !table_exists(conn, "notes")? {
        return Err(StoreError::MissingRequiredTable("notes"));
    }
    for &column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "notes", column)? {
            return Err(StoreError::MissingRequiredColumn {
                table: "notes",
                column,
            });
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
        [table],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .during("schema_check", None)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table});"))
        .during("schema_check", None)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .during("schema_check", None)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .during("schema_check", None)?;
    Ok(names.iter().any(|name| name == column))
}
