//! Note synchronization from a directory tree into the store.

mod engine;

pub use engine::{
    SyncEngine, SyncError, SyncEvent, SyncFailure, SyncOptions, SyncReport, SyncStage,
};
