use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use ulid::Ulid;

/// Maximum fact length enforced by client input controls. The server only
/// requires non-blank content; anything longer than this is a client concern.
pub const MAX_CONTENT_CHARS: usize = 200;

/// Conventional category set. Membership is a convention, not a constraint:
/// the store accepts any string or null.
pub const KNOWN_CATEGORIES: [&str; 8] = [
    "TECHNOLOGY",
    "SCIENCE",
    "FINANCE",
    "SOCIETY",
    "ENTERTAINMENT",
    "HEALTH",
    "HISTORY",
    "NEWS",
];

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum FactError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("fact not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FactId(pub Ulid);

impl FactId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Ulid::from_string(value).ok().map(Self)
    }
}

impl Default for FactId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for FactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Fact {
    pub id: FactId,
    pub content: String,
    pub category: Option<String>,
    pub source: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Fact {
    #[must_use]
    pub fn matches_category(&self, name: &str) -> bool {
        self.category.as_deref().is_some_and(|category| category.eq_ignore_ascii_case(name))
    }
}

/// Caller-supplied fields for a create or update, before the store assigns
/// identity and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct FactDraft {
    pub content: String,
    pub category: Option<String>,
    pub source: Option<String>,
}

impl FactDraft {
    /// Map blank category/source values to null, mirroring the `|| null`
    /// coercion the write endpoints apply.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            content: self.content,
            category: self.category.filter(|value| !value.trim().is_empty()),
            source: self.source.filter(|value| !value.trim().is_empty()),
        }
    }

    /// Validate the draft for persistence.
    ///
    /// # Errors
    /// Returns [`FactError::Validation`] when content is empty or blank.
    pub fn validate(&self) -> Result<(), FactError> {
        if self.content.trim().is_empty() {
            return Err(FactError::Validation("Content is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CategoryFilter {
    All,
    Category(String),
}

impl CategoryFilter {
    #[must_use]
    pub fn matches(&self, fact: &Fact) -> bool {
        match self {
            Self::All => true,
            Self::Category(name) => fact.matches_category(name),
        }
    }
}

/// Project a fetched sequence through a category filter. Pure: hides rows,
/// never reorders the remainder, never touches the network.
#[must_use]
pub fn filter_facts<'a>(facts: &'a [Fact], filter: &CategoryFilter) -> Vec<&'a Fact> {
    facts.iter().filter(|fact| filter.matches(fact)).collect()
}
