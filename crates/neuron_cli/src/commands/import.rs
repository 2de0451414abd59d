use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use neuron_core::model::note::file_name_of;
use neuron_core::{SyncEngine, SyncEvent, SyncOptions};

use crate::app::App;

pub fn run(app: &mut App, dir: &Path, keep_missing: bool) -> Result<()> {
    println!("Starting import from directory: {}", dir.display());

    let options = if keep_missing {
        SyncOptions::default()
    } else {
        SyncOptions::strict()
    };
    let mut engine = SyncEngine::new(app.store()?);
    let report = engine
        .sync_dir_with(dir, options, Utc::now(), |event| match event {
            SyncEvent::Synced { note, .. } => println!("✓ Synced: {}", note.title),
            SyncEvent::Removed { source_path } => {
                println!("✗ Removed: {}", file_name_of(source_path))
            }
            SyncEvent::Failed(failure) => eprintln!(
                "warning: skipped {} ({} failed): {}",
                failure.path.display(),
                failure.stage.as_str(),
                failure.message
            ),
        })
        .with_context(|| format!("Failed to import notes from {}", dir.display()))?;

    print!("\nSync complete. Processed {} notes.", report.synced);
    if report.removed_count() > 0 {
        print!(" Removed {} deleted notes.", report.removed_count());
    }
    println!();

    if !report.failures.is_empty() {
        println!("{} file(s) could not be imported.", report.failures.len());
    }
    if report.prune_skipped {
        eprintln!("warning: the directory could not be fully read, so no notes were removed.");
    }
    Ok(())
}
