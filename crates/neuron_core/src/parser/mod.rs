//! Markdown note parsing.
//!
//! # Responsibility
//! - Turn one source file into a `Note` with default scheduling state.
//! - Report malformed files as recoverable per-file errors.
//!
//! # Invariants
//! - Parsing never touches the store.
//! - A missing or invalid date is not an error; a broken front-matter block is.

pub mod frontmatter;
mod note_parser;

pub use frontmatter::{split_front_matter, FrontMatter, MetadataValue};
pub use note_parser::{
    is_markdown_path, parse_file, parse_note, ParseError, ParseResult, CREATED_KEY, TAGS_KEY,
    TITLE_KEY,
};
