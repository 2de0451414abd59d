//! Markdown to terminal text.
//!
//! # Responsibility
//! - Turn a note body into readable terminal output, optionally with ANSI
//!   styling.
//!
//! # Invariants
//! - Front matter is never shown.
//! - Without colour the output contains no escape sequences.

use crate::parser::split_front_matter;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd};
use std::error::Error;
use std::fmt::{self, Display, Formatter, Write};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const ITALIC: &str = "\x1b[3m";
const UNDERLINE: &str = "\x1b[4m";
const STRIKE: &str = "\x1b[9m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const TITLE: &str = "\x1b[1;4;36m";
const HEADING: &str = "\x1b[1;36m";

const RULE_WIDTH: usize = 40;
const CODE_INDENT: &str = "    ";
const LIST_INDENT: &str = "  ";
const QUOTE_BAR: &str = "│ ";

#[derive(Debug)]
pub enum RenderError {
    Format(fmt::Error),
}

impl Display for RenderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format(err) => write!(f, "cannot render markdown: {err}"),
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Format(err) => Some(err),
        }
    }
}

impl From<fmt::Error> for RenderError {
    fn from(value: fmt::Error) -> Self {
        Self::Format(value)
    }
}

/// Renders a note body for the terminal.
///
/// Headings are bold cyan, inline code yellow, quotes carry a bar, code
/// blocks are indented and links are followed by their URL.
pub fn render_markdown(markdown: &str, use_color: bool) -> Result<String, RenderError> {
    let content = split_front_matter(markdown).map_or(markdown, |(_, body)| body);

    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut writer = TerminalWriter::new(use_color);
    for event in Parser::new_ext(content, options) {
        writer.event(event)?;
    }
    Ok(writer.finish())
}

struct TerminalWriter {
    out: String,
    color: bool,
    styles: Vec<&'static str>,
    lists: Vec<Option<u64>>,
    links: Vec<Option<String>>,
    quote_depth: usize,
    in_code_block: bool,
    at_line_start: bool,
    /// A list marker was just written; the item's first block stays on its line.
    item_open: bool,
}

impl TerminalWriter {
    fn new(color: bool) -> Self {
        Self {
            out: String::new(),
            color,
            styles: Vec::new(),
            lists: Vec::new(),
            links: Vec::new(),
            quote_depth: 0,
            in_code_block: false,
            at_line_start: true,
            item_open: false,
        }
    }

    fn event(&mut self, event: Event<'_>) -> fmt::Result {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) if self.in_code_block => self.code_text(&text),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                if self.color {
                    self.paint(YELLOW, &code)
                } else {
                    self.text(&format!("`{code}`"))
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::SoftBreak | Event::HardBreak => self.newline(),
            Event::Rule => {
                self.block_break()?;
                self.paint(DIM, &"─".repeat(RULE_WIDTH))?;
                self.newline()
            }
            Event::TaskListMarker(done) => self.text(if done { "[x] " } else { "[ ] " }),
            Event::FootnoteReference(name) => self.text(&format!("[^{name}]")),
        }
    }

    fn start(&mut self, tag: Tag<'_>) -> fmt::Result {
        match tag {
            Tag::Paragraph => self.block_break(),
            Tag::Heading { level, .. } => {
                self.block_break()?;
                self.push_style(if level == HeadingLevel::H1 { TITLE } else { HEADING })?;
                self.text(&"#".repeat(heading_depth(level)))?;
                self.text(" ")
            }
            Tag::BlockQuote => {
                self.block_break()?;
                self.quote_depth += 1;
                self.push_style(ITALIC)
            }
            Tag::CodeBlock(kind) => {
                self.block_break()?;
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(info) = kind {
                    let language = info.split_whitespace().next().unwrap_or("");
                    if !language.is_empty() {
                        self.paint(DIM, language)?;
                        self.newline()?;
                    }
                }
                Ok(())
            }
            Tag::List(first_number) => {
                if self.lists.is_empty() {
                    self.block_break()?;
                } else if !self.at_line_start {
                    self.newline()?;
                }
                self.lists.push(first_number);
                Ok(())
            }
            Tag::Item => self.item_marker(),
            Tag::Emphasis => self.push_style(ITALIC),
            Tag::Strong => self.push_style(BOLD),
            Tag::Strikethrough => self.push_style(STRIKE),
            Tag::Link {
                link_type,
                dest_url,
                ..
            } => {
                let shown = match link_type {
                    LinkType::Autolink | LinkType::Email => None,
                    _ if dest_url.is_empty() => None,
                    _ => Some(dest_url.to_string()),
                };
                self.links.push(shown);
                self.push_style(UNDERLINE)
            }
            Tag::Image { dest_url, .. } => {
                self.links.push(Some(dest_url.to_string()));
                self.text("[image: ")
            }
            _ => Ok(()),
        }
    }

    fn end(&mut self, tag: TagEnd) -> fmt::Result {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => {
                if matches!(tag, TagEnd::Heading(_)) {
                    self.pop_style()?;
                }
                self.end_line()
            }
            TagEnd::BlockQuote => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style()?;
                self.end_line()
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.end_line()
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.end_line()
            }
            TagEnd::Item => {
                self.item_open = false;
                self.end_line()
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style()?;
                self.link_target()
            }
            TagEnd::Image => {
                self.text("]")?;
                self.link_target()
            }
            _ => Ok(()),
        }
    }

    fn item_marker(&mut self) -> fmt::Result {
        self.end_line()?;
        self.at_line_start = false;
        self.quote_bars()?;
        for _ in 1..self.lists.len() {
            self.out.push_str(LIST_INDENT);
        }
        let marker = match self.lists.last_mut() {
            Some(Some(number)) => {
                let marker = format!("{number}. ");
                *number += 1;
                marker
            }
            _ => "• ".to_string(),
        };
        self.raw_paint(CYAN, &marker)?;
        self.item_open = true;
        Ok(())
    }

    fn link_target(&mut self) -> fmt::Result {
        if let Some(Some(url)) = self.links.pop() {
            self.text(" ")?;
            self.paint(DIM, &format!("({url})"))?;
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> fmt::Result {
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                self.newline()?;
            }
            if line.is_empty() {
                continue;
            }
            self.line_prefix()?;
            self.out.write_str(line)?;
        }
        Ok(())
    }

    fn code_text(&mut self, text: &str) -> fmt::Result {
        for line in text.lines() {
            self.line_prefix()?;
            self.out.write_str(CODE_INDENT)?;
            self.raw_paint(YELLOW, line)?;
            self.newline()?;
        }
        Ok(())
    }

    /// Writes `text` in `style`, then restores the active style stack.
    fn paint(&mut self, style: &str, text: &str) -> fmt::Result {
        self.line_prefix()?;
        self.raw_paint(style, text)
    }

    fn raw_paint(&mut self, style: &str, text: &str) -> fmt::Result {
        if !self.color {
            return self.out.write_str(text);
        }
        write!(self.out, "{style}{text}{RESET}")?;
        self.reapply_styles()
    }

    fn push_style(&mut self, style: &'static str) -> fmt::Result {
        self.styles.push(style);
        if self.color {
            self.out.write_str(style)?;
        }
        Ok(())
    }

    fn pop_style(&mut self) -> fmt::Result {
        self.styles.pop();
        if self.color {
            self.out.write_str(RESET)?;
            self.reapply_styles()?;
        }
        Ok(())
    }

    fn reapply_styles(&mut self) -> fmt::Result {
        for style in &self.styles {
            self.out.write_str(style)?;
        }
        Ok(())
    }

    fn line_prefix(&mut self) -> fmt::Result {
        if !self.at_line_start {
            return Ok(());
        }
        self.at_line_start = false;
        self.quote_bars()?;
        for _ in 0..self.lists.len() {
            self.out.write_str(LIST_INDENT)?;
        }
        Ok(())
    }

    fn quote_bars(&mut self) -> fmt::Result {
        for _ in 0..self.quote_depth {
            self.raw_paint(DIM, QUOTE_BAR)?;
        }
        Ok(())
    }

    fn newline(&mut self) -> fmt::Result {
        self.out.write_char('\n')?;
        self.at_line_start = true;
        Ok(())
    }

    fn end_line(&mut self) -> fmt::Result {
        if self.at_line_start {
            return Ok(());
        }
        self.newline()
    }

    /// Separates blocks with one blank line.
    fn block_break(&mut self) -> fmt::Result {
        if self.item_open {
            self.item_open = false;
            return Ok(());
        }
        if self.out.is_empty() {
            return Ok(());
        }
        self.end_line()?;
        if !self.out.ends_with("\n\n") {
            self.newline()?;
        }
        Ok(())
    }

    fn finish(mut self) -> String {
        let trimmed = self.out.trim_end().len();
        self.out.truncate(trimmed);
        if self.color {
            self.out.push_str(RESET);
        }
        self.out.push('\n');
        self.out
    }
}

fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
