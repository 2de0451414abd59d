use std::io::{self, Write};

use anyhow::{bail, Result};
use chrono::Utc;
use neuron_core::srs::{days_until, format_interval};
use neuron_core::ReviewService;

use crate::app::App;
use crate::session::write_note_body;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

pub fn run(app: &mut App, term: &str, use_color: bool) -> Result<()> {
    let service = ReviewService::new(app.store()?);
    let Some(note) = service.find(term)? else {
        bail!("No note matching '{}'", term);
    };

    let mut out = io::stdout().lock();
    if use_color {
        writeln!(out, "{BOLD}{}{RESET}", note.title)?;
    } else {
        writeln!(out, "{}", note.title)?;
    }

    let mut meta = vec![note.source_path.clone()];
    if !note.tags.is_empty() {
        meta.push(
            note.tags
                .iter()
                .map(|tag| format!("#{tag}"))
                .collect::<Vec<_>>()
                .join(" "),
        );
    }
    let due_in = days_until(note.schedule.due_at, Utc::now());
    meta.push(if due_in == 0 {
        "due now".to_string()
    } else {
        format!("due in {due_in} day(s)")
    });
    meta.push(
        service
            .preview(&note)
            .iter()
            .map(|(rating, days)| format!("{rating} {}", format_interval(*days)))
            .collect::<Vec<_>>()
            .join(" · "),
    );
    for line in meta {
        if use_color {
            writeln!(out, "{DIM}{line}{RESET}")?;
        } else {
            writeln!(out, "{line}")?;
        }
    }

    writeln!(out)?;
    write_note_body(&mut out, &note.body, use_color)?;
    Ok(())
}
