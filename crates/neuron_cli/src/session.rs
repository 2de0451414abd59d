//! Interactive study card flow shared by `review` and `mix`.
//!
//! Everything here is generic over `BufRead`/`Write` so sessions can be
//! driven from tests with canned input.

use std::io::{self, BufRead, Write};

use log::warn;
use neuron_core::{render_markdown, Note, ProviderError, QuestionProvider, QuestionStyle, Rating};

pub const DIVIDER: &str = "-----------------------------------------------------------";
pub const REVIEW_FULL_NOTE_PROMPT: &str =
    "📖 Would you like to see the full note for additional context? (y/n): ";
pub const MIX_FULL_NOTE_PROMPT: &str = "📖 See full note? (y/n): ";

/// Line-oriented prompts over an input and an output stream.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn out(&mut self) -> &mut W {
        &mut self.output
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Prints `prompt` and blocks until a line is entered.
    pub fn wait_for_enter(&mut self, prompt: &str) -> io::Result<()> {
        self.ask(prompt).map(|_| ())
    }

    /// Prints `prompt`; `y` or `yes` (any case) confirms.
    pub fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        let answer = self.ask(prompt)?.to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }

    /// Asks for a recall rating until a valid one is entered.
    pub fn read_rating(&mut self) -> io::Result<Rating> {
        loop {
            let input = self.ask("\nHow well did you recall this? (1=Again, 2=Good, 3=Easy): ")?;
            match input.parse::<Rating>() {
                Ok(rating) => return Ok(rating),
                Err(_) => writeln!(self.output, "Invalid input. Please enter 1, 2, or 3.")?,
            }
        }
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before an answer was given",
            ));
        }
        Ok(line.trim().to_string())
    }
}

/// How a single card is presented.
#[derive(Debug, Clone, Copy)]
pub struct CardOptions {
    pub style: QuestionStyle,
    /// Never offer the full note.
    pub brief: bool,
    pub use_color: bool,
    pub full_note_prompt: &'static str,
}

#[derive(Debug)]
pub enum CardOutcome {
    Rated(Rating),
    /// The provider failed; the note was left untouched.
    Skipped(ProviderError),
}

/// Question, answer, optional full note, then the user's rating.
///
/// The schedule is not touched here; callers grade `Rated` outcomes.
pub fn run_card<P, R, W>(
    prompter: &mut Prompter<R, W>,
    provider: &P,
    note: &Note,
    options: &CardOptions,
) -> io::Result<CardOutcome>
where
    P: QuestionProvider,
    R: BufRead,
    W: Write,
{
    writeln!(prompter.out(), "🧠 Generating {} question...", options.style)?;
    let question = match provider.generate_question(&note.body, options.style) {
        Ok(question) => question,
        Err(err) => return skipped(note, err),
    };

    writeln!(prompter.out(), "\n🤔 Question: {question}")?;
    prompter.wait_for_enter("   (Press Enter to reveal concise answer)")?;

    writeln!(prompter.out(), "\n🤖 Generating concise answer...")?;
    let answer = match provider.generate_answer(&question, &note.body) {
        Ok(answer) => answer,
        Err(err) => return skipped(note, err),
    };

    let out = prompter.out();
    writeln!(out, "\n💡 Concise Answer:")?;
    writeln!(out, "{DIVIDER}")?;
    writeln!(out, "{answer}")?;
    writeln!(out, "{DIVIDER}")?;

    if !options.brief && prompter.confirm(&format!("\n{}", options.full_note_prompt))? {
        let out = prompter.out();
        writeln!(out, "\n📖 Full Note Context:")?;
        writeln!(out, "{DIVIDER}")?;
        write_note_body(out, &note.body, options.use_color)?;
        writeln!(out, "{DIVIDER}")?;
    }

    prompter.read_rating().map(CardOutcome::Rated)
}

/// Writes `body` rendered for the terminal, or raw when rendering fails.
pub fn write_note_body(out: &mut impl Write, body: &str, use_color: bool) -> io::Result<()> {
    match render_markdown(body, use_color) {
        Ok(rendered) => write!(out, "{rendered}"),
        Err(err) => {
            warn!("event=render module=cli status=error error={err}");
            writeln!(out, "Error rendering markdown, showing raw content:")?;
            writeln!(out, "{body}")
        }
    }
}

fn skipped(note: &Note, err: ProviderError) -> io::Result<CardOutcome> {
    warn!(
        "event=card_skip module=cli status=error note_id={} unavailable={} error={}",
        note.id,
        err.is_unavailable(),
        err
    );
    Ok(CardOutcome::Skipped(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use neuron_core::study::ProviderResult;

    struct StubProvider {
        question: ProviderResult<String>,
        answer: ProviderResult<String>,
    }

    impl StubProvider {
        fn ok() -> Self {
            Self {
                question: Ok("What does the borrow checker enforce?".to_string()),
                answer: Ok("One mutable or many shared references.".to_string()),
            }
        }

        fn failing_question() -> Self {
            Self {
                question: Err(down()),
                ..Self::ok()
            }
        }

        fn failing_answer() -> Self {
            Self {
                answer: Err(down()),
                ..Self::ok()
            }
        }
    }

    impl QuestionProvider for StubProvider {
        fn generate_question(&self, _body: &str, _style: QuestionStyle) -> ProviderResult<String> {
            self.question.clone()
        }

        fn generate_answer(&self, _question: &str, _body: &str) -> ProviderResult<String> {
            self.answer.clone()
        }
    }

    fn down() -> ProviderError {
        ProviderError::Unavailable {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            message: "connection refused".to_string(),
        }
    }

    fn note() -> Note {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        Note::new("/vault/borrowing.md", "Borrowing", "# Borrowing\n\nAliasing XOR mutation.\n", now)
    }

    fn options(brief: bool) -> CardOptions {
        CardOptions {
            style: QuestionStyle::Conceptual,
            brief,
            use_color: false,
            full_note_prompt: REVIEW_FULL_NOTE_PROMPT,
        }
    }

    fn prompter(input: &str) -> Prompter<&[u8], Vec<u8>> {
        Prompter::new(input.as_bytes(), Vec::new())
    }

    fn text(prompter: Prompter<&[u8], Vec<u8>>) -> String {
        String::from_utf8(prompter.into_output()).unwrap()
    }

    #[test]
    fn rating_prompt_repeats_until_valid() {
        let mut prompter = prompter("0\nmaybe\n\n3\n");
        assert_eq!(prompter.read_rating().unwrap(), Rating::Easy);

        let output = text(prompter);
        assert_eq!(output.matches("Invalid input. Please enter 1, 2, or 3.").count(), 3);
        assert_eq!(output.matches("(1=Again, 2=Good, 3=Easy)").count(), 4);
    }

    #[test]
    fn confirm_accepts_y_and_yes_only() {
        let mut prompter = prompter("Y\nyes\nn\nsure\n");
        assert!(prompter.confirm("? ").unwrap());
        assert!(prompter.confirm("? ").unwrap());
        assert!(!prompter.confirm("? ").unwrap());
        assert!(!prompter.confirm("? ").unwrap());
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut prompter = prompter("");
        let err = prompter.read_rating().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn brief_card_shows_question_and_answer_then_rates() {
        let mut prompter = prompter("\n2\n");
        let outcome = run_card(&mut prompter, &StubProvider::ok(), &note(), &options(true)).unwrap();
        assert!(matches!(outcome, CardOutcome::Rated(Rating::Good)));

        let output = text(prompter);
        assert!(output.contains("🧠 Generating conceptual question..."));
        assert!(output.contains("🤔 Question: What does the borrow checker enforce?"));
        assert!(output.contains("💡 Concise Answer:"));
        assert!(output.contains("One mutable or many shared references."));
        assert!(!output.contains("📖"));
    }

    #[test]
    fn full_note_is_rendered_on_request() {
        let mut prompter = prompter("\nyes\n1\n");
        let outcome =
            run_card(&mut prompter, &StubProvider::ok(), &note(), &options(false)).unwrap();
        assert!(matches!(outcome, CardOutcome::Rated(Rating::Again)));

        let output = text(prompter);
        assert!(output.contains(REVIEW_FULL_NOTE_PROMPT));
        assert!(output.contains("📖 Full Note Context:"));
        assert!(output.contains("Aliasing XOR mutation."));
    }

    #[test]
    fn declining_the_full_note_goes_straight_to_rating() {
        let mut prompter = prompter("\nn\n3\n");
        let outcome =
            run_card(&mut prompter, &StubProvider::ok(), &note(), &options(false)).unwrap();
        assert!(matches!(outcome, CardOutcome::Rated(Rating::Easy)));
        assert!(!text(prompter).contains("Full Note Context"));
    }

    #[test]
    fn question_failure_skips_without_reading_input() {
        let mut prompter = prompter("");
        let outcome = run_card(
            &mut prompter,
            &StubProvider::failing_question(),
            &note(),
            &options(false),
        )
        .unwrap();
        assert!(matches!(outcome, CardOutcome::Skipped(err) if err.is_unavailable()));
        assert!(!text(prompter).contains("🤔"));
    }

    #[test]
    fn answer_failure_skips_after_the_question() {
        let mut prompter = prompter("\n");
        let outcome = run_card(
            &mut prompter,
            &StubProvider::failing_answer(),
            &note(),
            &options(false),
        )
        .unwrap();
        assert!(matches!(outcome, CardOutcome::Skipped(_)));

        let output = text(prompter);
        assert!(output.contains("🤔 Question:"));
        assert!(!output.contains("💡"));
    }
}
