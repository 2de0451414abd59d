//! Single-file note parser.
//!
//! # Responsibility
//! - Resolve title, tags and creation date from metadata and body.
//! - Keep the whole file content verbatim as the note body.
//!
//! # Invariants
//! - Title order: metadata `title`, first `# ` heading, `"Untitled"`.
//! - Heading lookup ignores the front-matter block and fenced code.

use super::frontmatter::{split_front_matter, FrontMatter};
use crate::model::note::{Note, UNTITLED};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const TITLE_KEY: &str = "title";
pub const TAGS_KEY: &str = "tags";
pub const CREATED_KEY: &str = "created";

static TOP_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[ \t]+(\S.*)$").expect("valid heading regex"));

pub type ParseResult<T> = Result<T, ParseError>;

/// Per-file parse failure. Sync logs these and moves on.
#[derive(Debug)]
pub enum ParseError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    InvalidUtf8 {
        path: PathBuf,
    },
    /// The path itself cannot be stored as a UTF-8 key.
    NonUtf8Path(PathBuf),
    FrontMatter {
        path: PathBuf,
        message: String,
    },
}

impl ParseError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::InvalidUtf8 { path }
            | Self::NonUtf8Path(path)
            | Self::FrontMatter { path, .. } => path,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read `{}`: {source}", path.display()),
            Self::InvalidUtf8 { path } => {
                write!(f, "`{}` is not valid UTF-8 text", path.display())
            }
            Self::NonUtf8Path(path) => {
                write!(f, "path `{}` is not valid UTF-8", path.display())
            }
            Self::FrontMatter { path, message } => {
                write!(f, "malformed front matter in `{}`: {message}", path.display())
            }
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Returns whether `path` has a `.md` extension, ignoring case.
pub fn is_markdown_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// Reads and parses one file from disk.
pub fn parse_file(path: &Path, now: DateTime<Utc>) -> ParseResult<Note> {
    let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_note(path, &bytes, now)
}

/// Parses raw file bytes into a note keyed by `path`.
///
/// The returned note carries the initial schedule (`due_at = now`).
pub fn parse_note(path: &Path, bytes: &[u8], now: DateTime<Utc>) -> ParseResult<Note> {
    let source_path = path
        .to_str()
        .ok_or_else(|| ParseError::NonUtf8Path(path.to_path_buf()))?;
    let content = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8 {
        path: path.to_path_buf(),
    })?;

    let (meta, markdown) = match split_front_matter(content) {
        Some((yaml, rest)) => {
            let meta = FrontMatter::parse(yaml).map_err(|err| ParseError::FrontMatter {
                path: path.to_path_buf(),
                message: err.0,
            })?;
            (meta, rest)
        }
        None => (FrontMatter::default(), content),
    };

    let title = meta
        .get(TITLE_KEY)
        .as_text()
        .map(|value| value.into_owned())
        .or_else(|| first_top_heading(markdown))
        .unwrap_or_else(|| UNTITLED.to_string());

    let mut note = Note::new(source_path, title, content, now);
    note.set_tags(meta.get(TAGS_KEY).into_list());
    note.created_at = meta
        .get(CREATED_KEY)
        .as_date()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc());
    Ok(note)
}

fn first_top_heading(markdown: &str) -> Option<String> {
    let mut in_fence = false;
    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = TOP_HEADING_RE.captures(line.trim_end()) {
            return caps.get(1).map(|m| m.as_str().trim().to_string());
        }
    }
    None
}
