//! Note domain record.
//!
//! # Responsibility
//! - Define the canonical `Note` shape persisted by the note store.
//! - Provide constructors for the "new", "copy" and "generated" flows.
//!
//! # Invariants
//! - `tags` keep their input order; no dedup or case folding is applied.
//! - Persisted records missing a field load with an empty value.

use serde::{Deserialize, Serialize};

/// Title given to notes created from the "new note" action.
pub const BLANK_NOTE_TITLE: &str = "New note";
/// Suffix appended to the title of a copied note.
pub const COPY_TITLE_SUFFIX: &str = " (copy)";

/// A single note: title, markdown body and ordered tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub title: String,
    /// Markdown body (plain text is valid markdown).
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Note {
    /// Creates an untagged note.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tags: Vec::new(),
        }
    }

    /// Creates a note with the given tags, keeping their order.
    pub fn with_tags<I, T>(title: impl Into<String>, body: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            title: title.into(),
            body: body.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates the placeholder note used by the "new note" action.
    pub fn blank() -> Self {
        Self::new(BLANK_NOTE_TITLE, "")
    }

    /// Creates a detached copy whose title is marked as a copy.
    pub fn copy_of(source: &Note) -> Self {
        Self {
            title: format!("{}{}", source.title, COPY_TITLE_SUFFIX),
            body: source.body.clone(),
            tags: source.tags.clone(),
        }
    }

    /// Returns the lower-cased `title body tags...` text searched by filters.
    pub fn search_haystack(&self) -> String {
        let mut hay = String::with_capacity(self.title.len() + self.body.len() + 16);
        hay.push_str(&self.title.to_lowercase());
        hay.push(' ');
        hay.push_str(&self.body.to_lowercase());
        hay.push(' ');
        hay.push_str(&self.tags.join(" ").to_lowercase());
        hay
    }
}

/// Parses a comma-separated tag field into trimmed, non-empty tags.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Normalizes a user-supplied title.
///
/// Returns `None` for blank input; renaming rejects it as an empty title.
pub fn normalize_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
