use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use neuron_core::QuestionStyle;

mod app;
mod commands;
mod session;

#[derive(Parser)]
#[command(
    name = "neuron",
    about = "Spaced-repetition review for a folder of Markdown notes",
    version
)]
struct Cli {
    /// Config file (defaults to <config dir>/neuron-cli/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file to use instead of the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync a directory of Markdown notes into the database
    Import {
        /// Notes directory, scanned recursively
        dir: PathBuf,
        /// Keep notes whose files are no longer present
        #[arg(long)]
        keep_missing: bool,
    },
    /// Review the next due note
    Review {
        /// Review any note, even if it is not due yet
        #[arg(long)]
        any: bool,
        /// Only show the question and answer, never offer the full note
        #[arg(long)]
        brief: bool,
        /// factual, conceptual, application or mixed
        #[arg(long, default_value = "mixed")]
        question_type: QuestionStyle,
    },
    /// Interleaved session over a few random due notes
    Mix {
        /// Only show the question and answer, never offer the full note
        #[arg(long)]
        brief: bool,
        /// Cards per session (defaults to the configured mix size)
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Print a note, matched by title or path
    Show {
        /// Case-insensitive fragment of the title or path
        term: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();

    let mut app = app::App::new(app::AppOptions {
        config_file: cli.config,
        db_path: cli.db,
        log_level: cli.log_level,
    })?;

    match cli.command {
        Command::Import { dir, keep_missing } => {
            commands::import::run(&mut app, &dir, keep_missing)?;
        }
        Command::Review {
            any,
            brief,
            question_type,
        } => {
            commands::review::run(&mut app, any, brief, question_type, use_color)?;
        }
        Command::Mix { brief, limit } => {
            commands::mix::run(&mut app, brief, limit, use_color)?;
        }
        Command::Show { term } => {
            commands::show::run(&mut app, &term, use_color)?;
        }
    }

    Ok(())
}
