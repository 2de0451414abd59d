use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use neuron_core::srs::days_until;
use neuron_core::{QuestionStyle, ReviewService};

use crate::app::App;
use crate::session::{run_card, CardOptions, CardOutcome, Prompter, MIX_FULL_NOTE_PROMPT};

pub fn run(app: &mut App, brief: bool, limit: Option<u32>, use_color: bool) -> Result<()> {
    let limit = limit.unwrap_or(app.config.mix_size);
    if limit == 0 {
        bail!("--limit must be at least 1");
    }

    let provider = app.provider()?;
    let mut service = ReviewService::new(app.store()?);
    let mut notes = service
        .mix_batch(Utc::now(), limit)
        .context("Failed to fetch due notes")?;
    if notes.is_empty() {
        println!("🎉 No notes are due for review. Great job!");
        return Ok(());
    }

    let total = notes.len();
    let options = CardOptions {
        style: QuestionStyle::Mixed,
        brief,
        use_color,
        full_note_prompt: MIX_FULL_NOTE_PROMPT,
    };
    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout().lock());
    writeln!(
        prompter.out(),
        "--- Starting Interleaved Review Session ({total} notes) ---"
    )?;

    for (index, note) in notes.iter_mut().enumerate() {
        writeln!(prompter.out(), "\n--- Card {} of {} ---", index + 1, total)?;
        match run_card(&mut prompter, &provider, note, &options)? {
            CardOutcome::Rated(rating) => {
                let now = Utc::now();
                let schedule = service
                    .grade(note, rating, now)
                    .context("Failed to update note schedule")?;
                writeln!(
                    prompter.out(),
                    "✓ Scheduled for review in about {} day(s).",
                    days_until(schedule.due_at, now)
                )?;
            }
            CardOutcome::Skipped(err) => writeln!(
                prompter.out(),
                "Error studying {}: {}. Skipping.",
                note.title,
                err
            )?,
        }
    }

    writeln!(prompter.out(), "\n--- Interleaved session complete! ---")?;
    Ok(())
}
