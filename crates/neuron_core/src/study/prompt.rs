//! Prompt construction for question and answer generation.

use super::QuestionStyle;
use std::borrow::Cow;

const SUMMARY_HEADING: &str = "## summary";
const TAKEAWAYS_HEADING: &str = "## key takeaways";
/// Summary sections shorter than this (trimmed) fall back to the full body.
const MIN_SUMMARY_CHARS: usize = 10;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Summary,
    Takeaways,
}

/// Returns the `## Summary` and `## Key Takeaways` sections of `body`, or the
/// whole body when those sections are missing or nearly empty.
///
/// Sections are matched by heading prefix, ignoring case, and end at the next
/// `##` heading.
pub fn extract_summary(body: &str) -> Cow<'_, str> {
    let combined = collect_sections(body);
    if combined.trim().chars().count() > MIN_SUMMARY_CHARS {
        Cow::Owned(combined)
    } else {
        Cow::Borrowed(body)
    }
}

fn collect_sections(body: &str) -> String {
    let mut summary = String::new();
    let mut takeaways = String::new();
    let mut section = Section::Other;

    for line in body.lines() {
        let lower = line.to_lowercase();
        if lower.starts_with(SUMMARY_HEADING) {
            section = Section::Summary;
            continue;
        }
        if lower.starts_with(TAKEAWAYS_HEADING) {
            section = Section::Takeaways;
            continue;
        }
        if lower.starts_with("##") {
            section = Section::Other;
        }
        let target = match section {
            Section::Summary => &mut summary,
            Section::Takeaways => &mut takeaways,
            Section::Other => continue,
        };
        target.push_str(line);
        target.push('\n');
    }

    summary.push_str(&takeaways);
    summary
}

fn style_rule(style: QuestionStyle) -> &'static str {
    match style {
        QuestionStyle::Factual => {
            "Ask about a definition, a fact, or a specific detail stated in the text."
        }
        QuestionStyle::Conceptual => {
            "Ask about a relationship or principle in the text, or why something works."
        }
        QuestionStyle::Application => {
            "Ask how the main idea would be applied to a concrete, realistic scenario."
        }
        QuestionStyle::Mixed => {
            "Choose whichever kind of question (factual, conceptual or applied) best tests the main concept."
        }
    }
}

/// Prompt asking for one recall question about the note.
pub fn question_prompt(body: &str, style: QuestionStyle) -> String {
    format!(
        "You are a helpful study assistant. Your goal is to help me review my notes using \
active recall. Based ONLY on the following text from my notes, generate one single, clear, \
and concise question that tests the main concept. RULES: 1. Ask only ONE question. \
2. Do NOT provide the answer in your question. 3. The question must be answerable from the \
provided text. 4. {} 5. Do not add any introductory text like \"Here is a question for you:\". \
Just provide the question. TEXT: --- {} ---",
        style_rule(style),
        extract_summary(body)
    )
}

/// Prompt asking for a concise answer to `question` using only the note.
pub fn answer_prompt(question: &str, body: &str) -> String {
    format!(
        "You are a helpful study assistant. Your goal is to provide a concise, direct answer \
to a question, using ONLY the provided text as your source of truth. RULES: 1. Base your \
answer STRICTLY on the text provided. Do not add outside information. 2. Answer the question \
directly and concisely. A few sentences or a bulleted list is best. 3. Do not add any \
introductory text like \"The answer is:\". Just provide the answer. QUESTION: {} \
TEXT TO USE: --- {} ---",
        question.trim(),
        extract_summary(body)
    )
}
