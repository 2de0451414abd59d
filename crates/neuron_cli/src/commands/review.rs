use std::io;

use anyhow::{Context, Result};
use chrono::Utc;
use neuron_core::srs::days_until;
use neuron_core::{QuestionStyle, ReviewMode, ReviewService};

use crate::app::App;
use crate::session::{run_card, CardOptions, CardOutcome, Prompter, REVIEW_FULL_NOTE_PROMPT};

pub fn run(
    app: &mut App,
    any: bool,
    brief: bool,
    style: QuestionStyle,
    use_color: bool,
) -> Result<()> {
    let provider = app.provider()?;
    let mut service = ReviewService::new(app.store()?);

    let mode = if any {
        println!("Fetching a random note to review...");
        ReviewMode::Any
    } else {
        ReviewMode::Due
    };
    let Some(mut note) = service
        .next_note(mode, Utc::now())
        .context("Failed to fetch note")?
    else {
        match mode {
            ReviewMode::Any => println!("You have no notes in your database to review!"),
            ReviewMode::Due => println!("🎉 No notes are due for review. Great job!"),
        }
        return Ok(());
    };

    let options = CardOptions {
        style,
        brief,
        use_color,
        full_note_prompt: REVIEW_FULL_NOTE_PROMPT,
    };
    let outcome = {
        let mut prompter = Prompter::new(io::stdin().lock(), io::stdout().lock());
        run_card(&mut prompter, &provider, &note, &options)?
    };
    let rating = match outcome {
        CardOutcome::Rated(rating) => rating,
        CardOutcome::Skipped(err) => {
            return Err(err).context(format!("Could not study \"{}\"", note.title))
        }
    };

    let now = Utc::now();
    let schedule = service
        .grade(&mut note, rating, now)
        .context("Failed to update note schedule")?;
    println!(
        "✓ Good work! This note is scheduled for review in about {} day(s).",
        days_until(schedule.due_at, now)
    );

    if mode == ReviewMode::Due {
        let remaining = service
            .due_count(Utc::now())
            .context("Failed to count due notes")?;
        if remaining > 0 {
            println!("📚 {remaining} more note(s) due for review.");
        }
    }
    Ok(())
}
