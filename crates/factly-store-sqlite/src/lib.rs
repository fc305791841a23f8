use std::path::Path;

use anyhow::{anyhow, Context, Result};
use factly_core::{Fact, FactDraft, FactError, FactId};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use ulid::Ulid;

const LATEST_SCHEMA_VERSION: i64 = 1;

const CREATE_SCHEMA_MIGRATIONS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at TEXT NOT NULL
);
";

const MIGRATION_001_SQL: &str = r"
CREATE TABLE IF NOT EXISTS facts (
  id TEXT PRIMARY KEY,
  content TEXT NOT NULL CHECK (length(trim(content)) > 0),
  category TEXT,
  source TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_facts_created_at ON facts(created_at);
";

pub struct SqliteStore {
    conn: Connection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaStatus {
    pub current_version: i64,
    pub target_version: i64,
    pub pending_versions: Vec<i64>,
}

impl SqliteStore {
    /// Open a SQLite-backed fact store and configure required runtime pragmas.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or pragmas cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Ok(Self { conn })
    }

    /// Report current and target schema versions plus pending migrations.
    ///
    /// # Errors
    /// Returns an error when schema metadata cannot be read or initialized.
    pub fn schema_status(&self) -> Result<SchemaStatus> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .context("failed to apply schema_migrations table")?;
        let current_version = current_schema_version(&self.conn)?;
        let pending_versions = if current_version < LATEST_SCHEMA_VERSION {
            ((current_version + 1)..=LATEST_SCHEMA_VERSION).collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        Ok(SchemaStatus {
            current_version,
            target_version: LATEST_SCHEMA_VERSION,
            pending_versions,
        })
    }

    /// Apply all forward migrations up to the latest supported schema version.
    ///
    /// # Errors
    /// Returns an error when migration bootstrapping or any migration step fails.
    pub fn migrate(&mut self) -> Result<()> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .context("failed to apply schema_migrations table")?;

        let mut version = current_schema_version(&self.conn)?;

        if version == 0 {
            self.conn.execute_batch(MIGRATION_001_SQL).context("failed to apply migration v1")?;
            record_schema_version(&self.conn, 1)?;
            version = 1;
        }

        if version != LATEST_SCHEMA_VERSION {
            return Err(anyhow!(
                "unsupported schema version {version}; expected {LATEST_SCHEMA_VERSION}"
            ));
        }

        Ok(())
    }

    /// Persist one fact row.
    ///
    /// # Errors
    /// Returns [`FactError::Validation`] when content is blank, or an error
    /// when the insert fails.
    pub fn insert_fact(&mut self, fact: &Fact) -> Result<()> {
        if fact.content.trim().is_empty() {
            return Err(FactError::Validation("Content is required".to_string()).into());
        }

        self.conn
            .execute(
                "INSERT INTO facts(id, content, category, source, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    fact.id.to_string(),
                    fact.content,
                    fact.category,
                    fact.source,
                    rfc3339(fact.created_at)?,
                    rfc3339(fact.updated_at)?,
                ],
            )
            .context("failed to insert fact")?;
        Ok(())
    }

    /// Load all persisted facts, newest first.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read or decoded from `SQLite`.
    pub fn list_facts(&self) -> Result<Vec<Fact>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, category, source, created_at, updated_at
             FROM facts
             ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map([], read_fact_row)?;
        let mut facts = Vec::new();
        for row in rows {
            facts.push(row?.into_fact()?);
        }

        Ok(facts)
    }

    /// Fetch one fact by id, if it exists.
    ///
    /// # Errors
    /// Returns an error when the lookup or row decoding fails.
    pub fn get_fact(&self, id: FactId) -> Result<Option<Fact>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, category, source, created_at, updated_at
             FROM facts WHERE id = ?1",
        )?;
        let row = stmt.query_row(params![id.to_string()], read_fact_row).optional()?;
        row.map(FactRow::into_fact).transpose()
    }

    /// Rewrite content, category, and source of an existing fact; `updated_at`
    /// is set to now, `id` and `created_at` never change.
    ///
    /// # Errors
    /// Returns [`FactError::Validation`] when content is blank,
    /// [`FactError::NotFound`] when no row matches, or an error when the
    /// write fails.
    pub fn update_fact(&mut self, id: FactId, draft: &FactDraft) -> Result<Fact> {
        draft.validate()?;

        let affected = self
            .conn
            .execute(
                "UPDATE facts SET content = ?2, category = ?3, source = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    draft.content,
                    draft.category,
                    draft.source,
                    now_rfc3339()?,
                ],
            )
            .context("failed to update fact")?;

        if affected == 0 {
            return Err(FactError::NotFound(id.to_string()).into());
        }

        self.get_fact(id)?.ok_or_else(|| anyhow!("updated fact row disappeared: {id}"))
    }

    /// Permanently remove one fact.
    ///
    /// # Errors
    /// Returns [`FactError::NotFound`] when no row matches, or an error when
    /// the delete fails.
    pub fn delete_fact(&mut self, id: FactId) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM facts WHERE id = ?1", params![id.to_string()])
            .context("failed to delete fact")?;

        if affected == 0 {
            return Err(FactError::NotFound(id.to_string()).into());
        }

        Ok(())
    }

    /// Count persisted facts.
    ///
    /// # Errors
    /// Returns an error when the count query fails.
    pub fn fact_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM facts", [], |row| row.get::<_, i64>(0))
            .context("failed to count facts")?;
        Ok(count)
    }
}

#[derive(Debug)]
struct FactRow {
    id: String,
    content: String,
    category: Option<String>,
    source: Option<String>,
    created_at: String,
    updated_at: String,
}

impl FactRow {
    fn into_fact(self) -> Result<Fact> {
        Ok(Fact {
            id: parse_fact_id(&self.id)?,
            content: self.content,
            category: self.category,
            source: self.source,
            created_at: parse_rfc3339(&self.created_at)?,
            updated_at: parse_rfc3339(&self.updated_at)?,
        })
    }
}

fn read_fact_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FactRow> {
    Ok(FactRow {
        id: row.get(0)?,
        content: row.get(1)?,
        category: row.get(2)?,
        source: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn current_schema_version(conn: &Connection) -> Result<i64> {
    let version = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| {
            row.get::<_, i64>(0)
        })
        .context("failed to read current schema version")?;
    Ok(version)
}

fn record_schema_version(conn: &Connection, version: i64) -> Result<()> {
    let now = now_rfc3339()?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
        params![version, now],
    )
    .with_context(|| format!("failed to record migration version {version}"))?;
    Ok(())
}

fn now_rfc3339() -> Result<String> {
    rfc3339(OffsetDateTime::now_utc())
}

fn rfc3339(value: OffsetDateTime) -> Result<String> {
    value
        .format(&time::format_description::well_known::Rfc3339)
        .context("failed to format RFC3339 timestamp")
}

fn parse_rfc3339(value: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339)
        .with_context(|| format!("invalid RFC3339 timestamp: {value}"))
}

fn parse_fact_id(raw: &str) -> Result<FactId> {
    let parsed = Ulid::from_string(raw).with_context(|| format!("invalid ULID: {raw}"))?;
    Ok(FactId(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_migrated() -> Result<SqliteStore> {
        let mut store = SqliteStore::open(Path::new(":memory:"))?;
        store.migrate()?;
        Ok(store)
    }

    fn fact_at(content: &str, category: Option<&str>, created_at: OffsetDateTime) -> Fact {
        Fact {
            id: FactId::new(),
            content: content.to_string(),
            category: category.map(ToString::to_string),
            source: None,
            created_at,
            updated_at: created_at,
        }
    }

    // Test IDs: TDB-001
    #[test]
    fn migrate_is_idempotent_and_reports_status() -> Result<()> {
        let mut store = SqliteStore::open(Path::new(":memory:"))?;

        let before = store.schema_status()?;
        assert_eq!(before.current_version, 0);
        assert_eq!(before.pending_versions, vec![1]);

        store.migrate()?;
        store.migrate()?;

        let after = store.schema_status()?;
        assert_eq!(after.current_version, LATEST_SCHEMA_VERSION);
        assert!(after.pending_versions.is_empty());
        Ok(())
    }

    // Test IDs: TDB-002
    #[test]
    fn list_returns_newest_first_with_id_tie_break() -> Result<()> {
        let mut store = open_migrated()?;

        let older = fact_at("older", Some("SCIENCE"), OffsetDateTime::UNIX_EPOCH);
        let newer = fact_at(
            "newer",
            None,
            OffsetDateTime::UNIX_EPOCH + time::Duration::hours(1),
        );
        store.insert_fact(&older)?;
        store.insert_fact(&newer)?;

        let facts = store.list_facts()?;
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].content, "newer");
        assert_eq!(facts[1].content, "older");

        // Equal timestamps fall back to descending id order.
        let same_instant = OffsetDateTime::UNIX_EPOCH + time::Duration::days(1);
        let tied_a = fact_at("tied a", None, same_instant);
        let tied_b = fact_at("tied b", None, same_instant);
        store.insert_fact(&tied_a)?;
        store.insert_fact(&tied_b)?;

        let facts = store.list_facts()?;
        let expected_first = if tied_a.id > tied_b.id { "tied a" } else { "tied b" };
        assert_eq!(facts[0].content, expected_first);
        Ok(())
    }

    // Test IDs: TDB-003
    #[test]
    fn empty_store_lists_empty_sequence() -> Result<()> {
        let store = open_migrated()?;
        assert!(store.list_facts()?.is_empty());
        assert_eq!(store.fact_count()?, 0);
        Ok(())
    }

    // Test IDs: TDB-004
    #[test]
    fn blank_content_is_rejected_before_and_by_the_schema() -> Result<()> {
        let mut store = open_migrated()?;

        let blank = fact_at("   ", None, OffsetDateTime::now_utc());
        let err = store.insert_fact(&blank).err().map(|e| e.downcast::<FactError>());
        assert!(matches!(err, Some(Ok(FactError::Validation(_)))));

        // The CHECK constraint holds even when the store-level guard is bypassed.
        let direct = store.conn.execute(
            "INSERT INTO facts(id, content, category, source, created_at, updated_at)
             VALUES (?1, ?2, NULL, NULL, ?3, ?3)",
            params![FactId::new().to_string(), "  ", "2026-01-01T00:00:00Z"],
        );
        assert!(direct.is_err());
        assert_eq!(store.fact_count()?, 0);
        Ok(())
    }

    // Test IDs: TDB-005
    #[test]
    fn update_rewrites_fields_and_bumps_updated_at_only() -> Result<()> {
        let mut store = open_migrated()?;

        let original = fact_at("before", Some("SCIENCE"), OffsetDateTime::UNIX_EPOCH);
        store.insert_fact(&original)?;

        let updated = store.update_fact(
            original.id,
            &FactDraft {
                content: "after".to_string(),
                category: None,
                source: Some("almanac".to_string()),
            },
        )?;

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.content, "after");
        assert_eq!(updated.category, None);
        assert_eq!(updated.source.as_deref(), Some("almanac"));
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);
        Ok(())
    }

    // Test IDs: TDB-006
    #[test]
    fn update_and_delete_on_missing_id_surface_not_found() -> Result<()> {
        let mut store = open_migrated()?;
        let missing = FactId::new();

        let draft = FactDraft { content: "anything".to_string(), category: None, source: None };
        let update_err = store.update_fact(missing, &draft).err().map(|e| e.downcast::<FactError>());
        assert!(matches!(update_err, Some(Ok(FactError::NotFound(_)))));

        let delete_err = store.delete_fact(missing).err().map(|e| e.downcast::<FactError>());
        assert!(matches!(delete_err, Some(Ok(FactError::NotFound(_)))));
        Ok(())
    }

    // Test IDs: TDB-007
    #[test]
    fn delete_removes_the_row_permanently() -> Result<()> {
        let mut store = open_migrated()?;

        let fact = fact_at("ephemeral", None, OffsetDateTime::now_utc());
        store.insert_fact(&fact)?;
        assert_eq!(store.fact_count()?, 1);

        store.delete_fact(fact.id)?;
        assert_eq!(store.fact_count()?, 0);
        assert!(store.get_fact(fact.id)?.is_none());
        Ok(())
    }

    // Test IDs: TDB-008
    #[test]
    fn nullable_fields_round_trip_as_null() -> Result<()> {
        let mut store = open_migrated()?;

        let fact = fact_at("uncategorized", None, OffsetDateTime::now_utc());
        store.insert_fact(&fact)?;

        let loaded = store.get_fact(fact.id)?.ok_or_else(|| anyhow!("fact missing"))?;
        assert_eq!(loaded.category, None);
        assert_eq!(loaded.source, None);
        Ok(())
    }
}
