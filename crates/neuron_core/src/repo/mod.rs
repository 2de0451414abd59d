//! Repository layer: the note store contract and its SQLite implementation.
//!
//! # Responsibility
//! - Define the use-case oriented note store operations.
//! - Isolate SQLite query details from sync and review orchestration.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`) in addition to storage
//!   failures, and wrap storage failures with operation/path context.

pub mod note_store;
