//! Changelog tracking.
//!
//! The changelog table holds one row per applied changeset: its name, the
//! hash of its queries and the time it was applied. Timestamps are stored as
//! text, since a `varchar` behaves the same in all major databases.

use chrono::{DateTime, Utc};
use groundwork_derive::Record;
use groundwork_sql::{exec, query_all, query_optional, Executor, Insert, Positional, Result, Sql};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Maximum length of a changeset name, in characters.
pub const NAME_SIZE: usize = 256;
/// Length of a hex-encoded SHA-256 hash.
pub const HASH_SIZE: usize = 64;
/// Length of a stored timestamp.
pub const TIME_SIZE: usize = 30;
/// Format of stored timestamps, always in UTC.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

const COLUMN_NAME: &str = "name";
const COLUMN_HASH: &str = "hash";
const COLUMN_TIME: &str = "time";

/// A record of an applied changeset.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Record)]
pub struct ChangelogEntry {
    /// Name of the changeset.
    #[column(name = "name,primary")]
    pub name: String,
    /// Hex-encoded SHA-256 of the changeset queries.
    pub hash: String,
    /// When the changeset was applied, see [`TIME_FORMAT`].
    pub time: String,
}

impl ChangelogEntry {
    /// Creates an entry for a changeset applied at `time`.
    #[must_use]
    pub fn new(name: impl Into<String>, hash: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            hash: hash.into(),
            time: time.format(TIME_FORMAT).to_string(),
        }
    }

    /// Parses the stored timestamp.
    #[must_use]
    pub fn applied_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.time)
            .ok()
            .map(|time| time.with_timezone(&Utc))
    }
}

/// Returns the hex-encoded SHA-256 hash of changeset queries.
#[must_use]
pub fn hash_queries(queries: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(queries.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Reads and writes the changelog table.
#[derive(Debug, Clone)]
pub struct ChangelogStore {
    table: String,
}

impl ChangelogStore {
    /// Creates a store for the given table.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates the changelog table if it does not exist.
    pub async fn ensure_table<E: Executor>(&self, executor: &mut E) -> Result<()> {
        let dialect = executor.dialect();
        let name = dialect.quote_identifier(COLUMN_NAME);

        let schema = format!(
            "create table if not exists {table} ( \
             {name} varchar ( {NAME_SIZE} ) not null , \
             {hash} varchar ( {HASH_SIZE} ) not null , \
             {time} varchar ( {TIME_SIZE} ) not null , \
             primary key ( {name} ) \
             ) ;",
            table = dialect.quote_identifier(&self.table),
            hash = dialect.quote_identifier(COLUMN_HASH),
            time = dialect.quote_identifier(COLUMN_TIME),
        );

        exec(executor, &Sql::new(schema)).await?;
        Ok(())
    }

    /// Looks up the entry of a changeset.
    pub async fn lookup<E: Executor>(
        &self,
        executor: &mut E,
        name: &str,
    ) -> Result<Option<ChangelogEntry>> {
        let dialect = executor.dialect();
        let query = format!(
            "select * from {} where {} = @0 ;",
            dialect.quote_identifier(&self.table),
            dialect.quote_identifier(COLUMN_NAME),
        );

        query_optional(executor, &Sql::new(query).args(Positional::new().arg(name))).await
    }

    /// Inserts a new entry.
    pub async fn insert<E: Executor>(&self, executor: &mut E, entry: &ChangelogEntry) -> Result<()> {
        exec(executor, &Insert::new(self.table.as_str(), entry)).await?;
        Ok(())
    }

    /// Returns all entries, ordered by name.
    pub async fn entries<E: Executor>(&self, executor: &mut E) -> Result<Vec<ChangelogEntry>> {
        let dialect = executor.dialect();
        let query = format!(
            "select * from {} order by {} ;",
            dialect.quote_identifier(&self.table),
            dialect.quote_identifier(COLUMN_NAME),
        );

        query_all(executor, &Sql::new(query)).await
    }
}
