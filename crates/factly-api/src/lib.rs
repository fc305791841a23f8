use std::path::PathBuf;

use anyhow::Result;
use factly_core::{Fact, FactDraft, FactError, FactId};
use factly_store_sqlite::{SchemaStatus, SqliteStore};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateFactRequest {
    pub content: String,
    pub category: Option<String>,
    pub source: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateFactRequest {
    pub content: String,
    pub category: Option<String>,
    pub source: Option<String>,
}

/// Per-request facade over the fact store. Each operation opens its own
/// scoped store session and holds no state across calls.
#[derive(Debug, Clone)]
pub struct FactlyApi {
    db_path: PathBuf,
}

impl FactlyApi {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.db_path)
    }

    /// Inspect schema status without mutating data.
    ///
    /// # Errors
    /// Returns an error when the `SQLite` database cannot be opened or queried.
    pub fn schema_status(&self) -> Result<SchemaStatus> {
        let store = self.open_store()?;
        store.schema_status()
    }

    /// List all facts, newest first.
    ///
    /// # Errors
    /// Returns an error when migration or the query fails.
    pub fn list_facts(&self) -> Result<Vec<Fact>> {
        let mut store = self.open_store()?;
        store.migrate()?;
        store.list_facts()
    }

    /// Create one fact; the store assigns identity and timestamps.
    ///
    /// # Errors
    /// Returns [`FactError::Validation`] when content is blank, or an error
    /// when persistence fails.
    pub fn create_fact(&self, input: CreateFactRequest) -> Result<Fact> {
        let mut store = self.open_store()?;
        store.migrate()?;
        let fact = build_fact(input)?;
        store.insert_fact(&fact)?;
        Ok(fact)
    }

    /// Update content, category, and source of an existing fact.
    ///
    /// # Errors
    /// Returns [`FactError::Validation`] when content is blank,
    /// [`FactError::NotFound`] when the id is unknown or malformed, or an
    /// error when persistence fails.
    pub fn update_fact(&self, id: &str, input: UpdateFactRequest) -> Result<Fact> {
        let mut store = self.open_store()?;
        store.migrate()?;
        let id = parse_id(id)?;
        let draft = FactDraft {
            content: input.content,
            category: input.category,
            source: input.source,
        }
        .normalized();
        store.update_fact(id, &draft)
    }

    /// Permanently delete one fact.
    ///
    /// # Errors
    /// Returns [`FactError::NotFound`] when the id is unknown or malformed,
    /// or an error when persistence fails.
    pub fn delete_fact(&self, id: &str) -> Result<()> {
        let mut store = self.open_store()?;
        store.migrate()?;
        let id = parse_id(id)?;
        store.delete_fact(id)
    }
}

// A malformed id cannot match any stored row, so it reports the same
// outcome as an unknown one.
fn parse_id(raw: &str) -> Result<FactId> {
    FactId::parse(raw).ok_or_else(|| FactError::NotFound(raw.to_string()).into())
}

fn build_fact(input: CreateFactRequest) -> Result<Fact> {
    let draft = FactDraft {
        content: input.content,
        category: input.category,
        source: input.source,
    }
    .normalized();
    draft.validate()?;

    let created_at = input.created_at.unwrap_or_else(OffsetDateTime::now_utc);
    Ok(Fact {
        id: FactId::new(),
        content: draft.content,
        category: draft.category,
        source: draft.source,
        created_at,
        updated_at: created_at,
    })
}
