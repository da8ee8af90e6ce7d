//! Free-text identity tags.

use serde::Serialize;
use std::fmt;

use crate::error::FacelabelError;

/// Label given to annotations with no category.
pub const UNTAGGED: &str = "Untagged";
/// Label given to animals with no known breed.
pub const BREED_UNKNOWN: &str = "unknown";

/// Kind id of a generic category block, `d[...]`.
pub const CATEGORY_KIND: char = 'd';
/// Kind id of a breed block, `b[...]`.
pub const BREED_KIND: char = 'b';

/// A single free-text label plus the one-letter kind it is written under.
///
/// The label is never the empty string. Clearing the label of a `d` or `b`
/// category puts back its sentinel; other kinds keep no label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Category {
    label: Option<String>,
    kind: char,
}

impl Category {
    /// Creates a category, rejecting an empty label.
    pub fn new(label: Option<&str>, kind: char) -> Result<Self, FacelabelError> {
        let mut category = Self { label: None, kind };
        category.set_label(label)?;
        Ok(category)
    }

    /// The untagged sentinel, `d[Untagged]`.
    pub fn untagged() -> Self {
        Self {
            label: Some(UNTAGGED.to_string()),
            kind: CATEGORY_KIND,
        }
    }

    /// The unknown breed sentinel, `b[unknown]`.
    pub fn breed_unknown() -> Self {
        Self {
            label: Some(BREED_UNKNOWN.to_string()),
            kind: BREED_KIND,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn kind(&self) -> char {
        self.kind
    }

    /// Replaces the label. Only the literal empty string is refused;
    /// whitespace-only labels are kept as given.
    pub fn set_label(&mut self, label: Option<&str>) -> Result<(), FacelabelError> {
        if label == Some("") {
            return Err(FacelabelError::InvalidArgument(
                "category label must not be empty".to_string(),
            ));
        }
        self.label = label.or_else(|| sentinel(self.kind)).map(str::to_string);
        Ok(())
    }

    /// True if the label equals `text`.
    pub fn is(&self, text: &str) -> bool {
        self.label.as_deref() == Some(text)
    }

    /// True for the untagged sentinel or an absent label.
    pub fn is_untagged(&self) -> bool {
        self.label.is_none() || self.is(UNTAGGED)
    }

    /// True for the unknown-breed sentinel or an absent label.
    pub fn is_breed_unknown(&self) -> bool {
        self.label.is_none() || self.is(BREED_UNKNOWN)
    }

    /// Parses a `<c>[<text>]` block. The kind letter must be ASCII
    /// alphabetic; the text may contain anything, including brackets.
    pub fn parse_block(text: &str) -> Option<Result<Self, FacelabelError>> {
        let mut chars = text.chars();
        let kind = chars.next().filter(char::is_ascii_alphabetic)?;
        let rest = chars.as_str();
        let inner = rest.strip_prefix('[')?.strip_suffix(']')?;
        Some(Self::new(Some(inner), kind))
    }

    /// The serialized block, `<c>[label]`.
    pub fn block(&self) -> String {
        format!("{}[{}]", self.kind, self.label.as_deref().unwrap_or(""))
    }
}

fn sentinel(kind: char) -> Option<&'static str> {
    match kind {
        CATEGORY_KIND => Some(UNTAGGED),
        BREED_KIND => Some(BREED_UNKNOWN),
        _ => None,
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label.as_deref().unwrap_or(""))
    }
}
