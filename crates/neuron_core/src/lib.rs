//! Core domain logic for Neuron, a spaced-repetition study tool over a
//! directory of Markdown notes.
//!
//! The binary opens one store connection and passes it explicitly to the
//! sync engine and review services.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod parser;
pub mod render;
pub mod repo;
pub mod service;
pub mod srs;
pub mod study;
pub mod sync;

pub use config::{ConfigError, ConfigOverrides, NeuronConfig, ProviderConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{Note, NoteId, Schedule};
pub use parser::{parse_file, parse_note, ParseError};
pub use render::{render_markdown, RenderError};
pub use repo::note_store::{
    NoteLookup, NoteStore, SqliteNoteStore, StoreError, StoreResult, UpsertOutcome,
};
pub use service::review_service::{ReviewError, ReviewMode, ReviewService};
pub use srs::{next_schedule, Rating};
pub use study::{OllamaProvider, ProviderError, QuestionProvider, QuestionStyle};
pub use sync::{SyncEngine, SyncError, SyncEvent, SyncOptions, SyncReport};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
