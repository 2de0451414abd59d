//! Study-assist question generation.
//!
//! # Responsibility
//! - Define the provider contract used by review sessions.
//! - Build prompts from note bodies.
//! - Talk to an Ollama-compatible text generation endpoint.
//!
//! # Invariants
//! - Provider calls are synchronous and bounded by the configured timeout.
//! - A failed call yields an error and no partial text.

mod ollama;
mod prompt;

pub use ollama::{decode_generate_body, OllamaProvider, DEFAULT_MODEL, DEFAULT_PROVIDER_URL};
pub use prompt::{answer_prompt, extract_summary, question_prompt};

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Kind of question to generate for a note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuestionStyle {
    /// Definitions, facts and specific details.
    Factual,
    /// Relationships, principles and why things work.
    Conceptual,
    /// Applying the note to a realistic scenario.
    Application,
    #[default]
    Mixed,
}

impl QuestionStyle {
    pub const ALL: [QuestionStyle; 4] = [
        QuestionStyle::Factual,
        QuestionStyle::Conceptual,
        QuestionStyle::Application,
        QuestionStyle::Mixed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Factual => "factual",
            Self::Conceptual => "conceptual",
            Self::Application => "application",
            Self::Mixed => "mixed",
        }
    }
}

impl Display for QuestionStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidQuestionStyle(pub String);

impl Display for InvalidQuestionStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown question type `{}`; expected factual|conceptual|application|mixed",
            self.0
        )
    }
}

impl Error for InvalidQuestionStyle {}

impl FromStr for QuestionStyle {
    type Err = InvalidQuestionStyle;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == normalized)
            .ok_or_else(|| InvalidQuestionStyle(value.trim().to_string()))
    }
}

/// Provider call failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The endpoint could not be reached or did not answer in time.
    Unavailable { endpoint: String, message: String },
    /// The endpoint answered with an error status or an unusable body.
    Protocol { endpoint: String, message: String },
}

impl ProviderError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable { endpoint, message } => write!(
                f,
                "question provider unavailable at {endpoint}: {message}; is Ollama running?"
            ),
            Self::Protocol { endpoint, message } => {
                write!(f, "question provider error from {endpoint}: {message}")
            }
        }
    }
}

impl Error for ProviderError {}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Text generation backend for review questions and answers.
pub trait QuestionProvider {
    /// Generates one question about `body` in the requested style.
    fn generate_question(&self, body: &str, style: QuestionStyle) -> ProviderResult<String>;
    /// Generates a concise answer to `question` grounded in `body`.
    fn generate_answer(&self, question: &str, body: &str) -> ProviderResult<String>;
}

impl<P: QuestionProvider + ?Sized> QuestionProvider for &P {
    fn generate_question(&self, body: &str, style: QuestionStyle) -> ProviderResult<String> {
        (**self).generate_question(body, style)
    }

    fn generate_answer(&self, question: &str, body: &str) -> ProviderResult<String> {
        (**self).generate_answer(question, body)
    }
}

#[cfg(test)]
mod tests {
    use super::{ProviderError, QuestionStyle};

    #[test]
    fn parses_known_styles_case_insensitively() {
        assert_eq!(
            "Factual".parse::<QuestionStyle>().unwrap(),
            QuestionStyle::Factual
        );
        assert_eq!(
            " application ".parse::<QuestionStyle>().unwrap(),
            QuestionStyle::Application
        );
        assert_eq!(QuestionStyle::default(), QuestionStyle::Mixed);
    }

    #[test]
    fn rejects_unknown_style() {
        let err = "trivia".parse::<QuestionStyle>().unwrap_err();
        assert!(err.to_string().contains("trivia"));
    }

    #[test]
    fn unavailable_message_mentions_endpoint() {
        let err = ProviderError::Unavailable {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("localhost:11434"));
    }
}
