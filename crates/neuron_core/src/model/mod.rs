//! Domain model for study notes.
//!
//! # Responsibility
//! - Define the note record shared by parser, store, sync and scheduler.
//!
//! # Invariants
//! - Every note is identified by its stable `source_path`.
//! - Scheduling state lives inside the note and is never null.

pub mod note;
