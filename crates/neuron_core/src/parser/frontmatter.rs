//! YAML front-matter splitting and typed metadata lookup.
//!
//! # Responsibility
//! - Separate a leading `---` block from the Markdown body.
//! - Resolve loosely typed YAML values into `MetadataValue` at parse time.
//!
//! # Invariants
//! - Keys are matched case-insensitively; the first spelling wins.
//! - A file without a closed front-matter block has no metadata.

use chrono::NaiveDate;
use serde_yaml::Value;
use std::borrow::Cow;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Resolved shape of one front-matter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    Text(String),
    TextList(Vec<String>),
    /// A string in strict `YYYY-MM-DD` form.
    Date(NaiveDate),
    Missing,
}

impl MetadataValue {
    /// Returns the scalar text form, including dates.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(value) => Some(Cow::Borrowed(value.as_str())),
            Self::Date(date) => Some(Cow::Owned(date.format(DATE_FORMAT).to_string())),
            Self::TextList(_) | Self::Missing => None,
        }
    }

    /// Returns the date value, if this is one.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            _ => None,
        }
    }

    /// Flattens into a list. A scalar string is split on commas.
    pub fn into_list(self) -> Vec<String> {
        match self {
            Self::TextList(items) => items,
            Self::Text(value) => value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            Self::Date(date) => vec![date.format(DATE_FORMAT).to_string()],
            Self::Missing => Vec::new(),
        }
    }
}

/// Parsed front-matter mapping with lowercase keys.
#[derive(Debug, Clone, Default)]
pub struct FrontMatter {
    entries: Vec<(String, Value)>,
}

/// Front-matter block that is not valid YAML or not a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatterError(pub String);

impl FrontMatter {
    /// Parses the YAML between the delimiters.
    pub fn parse(yaml: &str) -> Result<Self, FrontMatterError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: Value =
            serde_yaml::from_str(yaml).map_err(|err| FrontMatterError(err.to_string()))?;
        let mapping = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => return Ok(Self::default()),
            _ => {
                return Err(FrontMatterError(
                    "front matter must be a key/value mapping".to_string(),
                ))
            }
        };

        let mut entries: Vec<(String, Value)> = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let Some(key) = key.as_str().map(|k| k.trim().to_lowercase()) else {
                continue;
            };
            if entries.iter().any(|(known, _)| *known == key) {
                continue;
            }
            entries.push((key, value));
        }
        Ok(Self { entries })
    }

    /// Looks up `key` case-insensitively and resolves its shape.
    pub fn get(&self, key: &str) -> MetadataValue {
        let key = key.to_lowercase();
        self.entries
            .iter()
            .find(|(known, _)| *known == key)
            .map_or(MetadataValue::Missing, |(_, value)| resolve(value))
    }
}

/// Splits `content` into `(yaml, body)` when it opens with a closed `---` block.
pub fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = rest.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "---" || trimmed == "..." {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn resolve(value: &Value) -> MetadataValue {
    match value {
        Value::String(text) => resolve_text(text),
        Value::Sequence(items) => MetadataValue::TextList(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Value::Tagged(tagged) => resolve(&tagged.value),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Mapping(_) => {
            MetadataValue::Missing
        }
    }
}

fn resolve_text(text: &str) -> MetadataValue {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return MetadataValue::Missing;
    }
    if trimmed.len() == 10 {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
            return MetadataValue::Date(date);
        }
    }
    MetadataValue::Text(trimmed.to_string())
}
