//! Applying changesets in order, one transaction each.

use std::collections::HashMap;

use chrono::Utc;
use groundwork_sql::{exec, Executor, Sql, Transaction, Transactional};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::changelog::{hash_queries, ChangelogEntry, ChangelogStore, NAME_SIZE};
use crate::changeset::Changeset;
use crate::error::{MigrateError, Result};

/// Name of the changelog table when none is configured.
pub const DEFAULT_CHANGELOG_TABLE: &str = "database_changelog";

/// Migration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Name of the changelog table. Empty means [`DEFAULT_CHANGELOG_TABLE`].
    pub changelog_table: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            changelog_table: DEFAULT_CHANGELOG_TABLE.to_string(),
        }
    }
}

impl Options {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the changelog table name.
    #[must_use]
    pub fn changelog_table(mut self, table: impl Into<String>) -> Self {
        self.changelog_table = table.into();
        self
    }

    fn table_name(&self) -> &str {
        if self.changelog_table.is_empty() {
            DEFAULT_CHANGELOG_TABLE
        } else {
            &self.changelog_table
        }
    }
}

/// The outcome of a migration run.
///
/// Changesets committed before a failure stay applied, so a failed run still
/// reports what it did.
#[derive(Debug)]
pub struct MigrationReport<'a, C> {
    /// Changesets applied by this run, in order.
    pub applied: Vec<&'a C>,
    /// The error that stopped the run, if any.
    pub error: Option<MigrateError>,
}

impl<'a, C: Changeset> MigrationReport<'a, C> {
    /// Returns whether every changeset was applied or skipped.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the names of the applied changesets.
    #[must_use]
    pub fn applied_names(&self) -> Vec<&str> {
        self.applied.iter().map(|changeset| changeset.name()).collect()
    }

    /// Converts the report into a `Result`, dropping the applied list on error.
    pub fn into_result(self) -> Result<Vec<&'a C>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.applied),
        }
    }
}

/// State of a changeset relative to the changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChangesetStatus {
    /// Not applied yet.
    Pending,
    /// Applied with the same queries.
    Applied {
        /// When it was applied.
        time: String,
    },
    /// Applied, but the queries changed since.
    Drifted {
        /// The hash stored in the changelog.
        recorded: String,
        /// The hash of the current queries.
        current: String,
    },
}

/// A changeset name with its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangesetState {
    /// The changeset name.
    pub name: String,
    /// Its status.
    #[serde(flatten)]
    pub status: ChangesetStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Applied,
    Skipped,
}

/// Applies changesets and tracks them in the changelog.
#[derive(Debug, Clone)]
pub struct Migrator {
    store: ChangelogStore,
}

impl Migrator {
    /// Creates a migrator.
    #[must_use]
    pub fn new(options: &Options) -> Self {
        Self {
            store: ChangelogStore::new(options.table_name()),
        }
    }

    /// Returns the changelog store.
    #[must_use]
    pub const fn store(&self) -> &ChangelogStore {
        &self.store
    }

    /// Creates the changelog table if it does not exist.
    pub async fn init<D: Transactional>(&self, db: &D) -> Result<()> {
        let mut tx = db.begin().await?;

        if let Err(err) = self.store.ensure_table(&mut tx).await {
            rollback(tx, None).await;
            return Err(err.into());
        }

        tx.commit().await?;
        debug!(table = self.store.table(), "Changelog table ready");
        Ok(())
    }

    /// Applies the changesets in order.
    ///
    /// Each changeset runs in its own transaction together with its
    /// changelog entry. Already applied changesets are skipped. The run stops
    /// at the first error, including a changeset whose queries changed since
    /// it was applied.
    pub async fn up<'a, D, C>(&self, db: &D, changesets: &'a [C]) -> MigrationReport<'a, C>
    where
        D: Transactional,
        C: Changeset,
    {
        let mut applied = Vec::new();

        if let Err(err) = self.init(db).await {
            return MigrationReport {
                applied,
                error: Some(err),
            };
        }

        for changeset in changesets {
            match self.apply(db, changeset).await {
                Ok(Outcome::Applied) => applied.push(changeset),
                Ok(Outcome::Skipped) => {}
                Err(err) => {
                    return MigrationReport {
                        applied,
                        error: Some(err),
                    };
                }
            }
        }

        info!(applied = applied.len(), total = changesets.len(), "Migration complete");
        MigrationReport {
            applied,
            error: None,
        }
    }

    /// Reports the status of each changeset without changing the database.
    pub async fn status<D, C>(&self, db: &D, changesets: &[C]) -> Result<Vec<ChangesetState>>
    where
        D: Transactional,
        C: Changeset,
    {
        let mut tx = db.begin().await?;
        let entries = match self.read_entries(&mut tx).await {
            Ok(entries) => entries,
            Err(err) => {
                rollback(tx, None).await;
                return Err(err.into());
            }
        };
        tx.rollback().await?;

        let recorded: HashMap<&str, &ChangelogEntry> = entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry))
            .collect();

        let mut states = Vec::with_capacity(changesets.len());
        for changeset in changesets {
            let name = changeset.name();
            let queries = changeset.queries().map_err(|err| err.in_changeset(name))?;
            let current = hash_queries(&queries);

            let status = match recorded.get(name) {
                None => ChangesetStatus::Pending,
                Some(entry) if entry.hash == current => ChangesetStatus::Applied {
                    time: entry.time.clone(),
                },
                Some(entry) => ChangesetStatus::Drifted {
                    recorded: entry.hash.clone(),
                    current,
                },
            };

            states.push(ChangesetState {
                name: name.to_string(),
                status,
            });
        }

        Ok(states)
    }

    async fn read_entries<E: Executor>(
        &self,
        executor: &mut E,
    ) -> groundwork_sql::Result<Vec<ChangelogEntry>> {
        self.store.ensure_table(executor).await?;
        self.store.entries(executor).await
    }

    async fn apply<D, C>(&self, db: &D, changeset: &C) -> Result<Outcome>
    where
        D: Transactional,
        C: Changeset + ?Sized,
    {
        let name = changeset.name();
        let queries = changeset.queries().map_err(|err| err.in_changeset(name))?;

        if name.chars().count() > NAME_SIZE {
            return Err(MigrateError::NameTooLong {
                name: name.to_string(),
                max: NAME_SIZE,
            });
        }

        let hash = hash_queries(&queries);
        let mut tx = db
            .begin()
            .await
            .map_err(|err| MigrateError::from(err).in_changeset(name))?;

        match self.check_and_apply(&mut tx, name, &queries, hash).await {
            Ok(outcome) => {
                tx.commit()
                    .await
                    .map_err(|err| MigrateError::from(err).in_changeset(name))?;
                if outcome == Outcome::Applied {
                    info!(changeset = name, "Applied changeset");
                }
                Ok(outcome)
            }
            Err(err) => {
                rollback(tx, Some(name)).await;
                Err(err.in_changeset(name))
            }
        }
    }

    async fn check_and_apply<E: Executor>(
        &self,
        tx: &mut E,
        name: &str,
        queries: &str,
        hash: String,
    ) -> Result<Outcome> {
        match self.store.lookup(tx, name).await? {
            Some(entry) if entry.hash == hash => {
                debug!(changeset = name, "Changeset already applied");
                Ok(Outcome::Skipped)
            }
            Some(entry) => {
                warn!(
                    changeset = name,
                    recorded = %entry.hash,
                    current = %hash,
                    "Changeset changed since it was applied"
                );
                Err(MigrateError::Drift {
                    name: name.to_string(),
                    recorded: entry.hash,
                    current: hash,
                })
            }
            None => {
                exec(tx, &Sql::new(queries)).await?;
                let entry = ChangelogEntry::new(name, hash, Utc::now());
                self.store.insert(tx, &entry).await?;
                Ok(Outcome::Applied)
            }
        }
    }
}

async fn rollback<T: Transaction>(tx: T, changeset: Option<&str>) {
    if let Err(err) = tx.rollback().await {
        warn!(changeset, error = %err, "Rollback failed");
    }
}

/// Applies the changesets with the given options, see [`Migrator::up`].
pub async fn up<'a, D, C>(db: &D, changesets: &'a [C], options: &Options) -> MigrationReport<'a, C>
where
    D: Transactional,
    C: Changeset,
{
    Migrator::new(options).up(db, changesets).await
}

#[cfg(test)]
mod tests {
    use groundwork_sql::{query_all, SqlError};
    use groundwork_sqlite::Database;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::changeset::LiteralChangeset;

    async fn create_test_db() -> Database {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        Database::new(pool)
    }

    #[derive(Debug, Default, PartialEq, groundwork_derive::Record)]
    pub struct Item {
        pub id: i64,
        pub label: String,
    }

    async fn items(db: &mut Database) -> Vec<Item> {
        query_all(db, &Sql::new("select id, label from t order by id ;"))
            .await
            .unwrap()
    }

    fn changesets() -> Vec<LiteralChangeset> {
        vec![
            LiteralChangeset::new("A", "create table t (id integer primary key, label text) ;"),
            LiteralChangeset::new("B", "insert into t values (1, 'one') ;"),
        ]
    }

    #[test]
    fn test_options() {
        assert_eq!(Options::default().table_name(), DEFAULT_CHANGELOG_TABLE);
        assert_eq!(Options::new().changelog_table("").table_name(), DEFAULT_CHANGELOG_TABLE);
        assert_eq!(Options::new().changelog_table("log").table_name(), "log");
    }

    #[tokio::test]
    async fn test_up_is_idempotent() {
        let mut db = create_test_db().await;
        let changesets = changesets();

        let report = up(&db, &changesets, &Options::default()).await;
        assert!(report.is_success());
        assert_eq!(report.applied_names(), ["A", "B"]);

        let report = up(&db, &changesets, &Options::default()).await;
        assert!(report.is_success());
        assert!(report.applied.is_empty());

        assert_eq!(
            items(&mut db).await,
            [Item {
                id: 1,
                label: "one".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_up_detects_drift() {
        let mut db = create_test_db().await;
        let initial = changesets();
        let report = up(&db, &initial, &Options::default()).await;
        assert!(report.is_success());

        let changed = vec![
            changesets().remove(0),
            LiteralChangeset::new("B", "insert into t values (2, 'two') ;"),
        ];
        let report = up(&db, &changed, &Options::default()).await;

        assert!(report.applied.is_empty());
        let err = report.error.unwrap();
        assert!(err.is_drift());
        assert_eq!(err.changeset(), Some("B"));

        assert_eq!(items(&mut db).await.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_changesets() {
        let mut db = create_test_db().await;
        let changesets = vec![
            LiteralChangeset::new("1", "create table t (id integer primary key, label text) ;"),
            LiteralChangeset::new("2", "insert into t values (1, 'one') ;"),
            LiteralChangeset::new("3", "insert into t values (1, 'duplicate') ;"),
            LiteralChangeset::new("4", "insert into t values (4, 'never') ;"),
        ];

        let report = up(&db, &changesets, &Options::default()).await;
        assert_eq!(report.applied_names(), ["1", "2"]);

        let err = report.error.unwrap();
        assert_eq!(err.changeset(), Some("3"));
        assert!(matches!(
            &err,
            MigrateError::Changeset { source, .. }
                if matches!(**source, MigrateError::Sql(SqlError::Backend(_)))
        ));

        let migrator = Migrator::new(&Options::default());
        let names: Vec<String> = migrator
            .store()
            .entries(&mut db)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, ["1", "2"]);
        assert_eq!(items(&mut db).await.len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_changeset_stops_run() {
        let mut db = create_test_db().await;
        let changesets: Vec<Box<dyn Changeset>> = vec![
            Box::new(LiteralChangeset::new("A", "create table a (id integer) ;")),
            Box::new(crate::changeset::FileChangeset::new("/nonexistent/x.sql")),
            Box::new(LiteralChangeset::new("C", "create table c (id integer) ;")),
        ];

        let report = up(&db, &changesets, &Options::default()).await;
        assert_eq!(report.applied_names(), ["A"]);

        let err = report.error.unwrap();
        assert_eq!(err.changeset(), Some("x.sql"));
        assert!(matches!(
            &err,
            MigrateError::Changeset { source, .. } if matches!(**source, MigrateError::Io(_))
        ));

        let result = exec(&mut db, &Sql::new("select * from c ;")).await;
        assert!(matches!(result, Err(SqlError::Backend(_))));
    }

    #[tokio::test]
    async fn test_name_too_long() {
        let db = create_test_db().await;
        let long_name = "x".repeat(NAME_SIZE + 1);
        let changesets = vec![
            LiteralChangeset::new("ok", "create table t (id integer) ;"),
            LiteralChangeset::new(long_name.clone(), "select 1 ;"),
        ];

        let report = up(&db, &changesets, &Options::default()).await;
        assert_eq!(report.applied_names(), ["ok"]);
        assert!(matches!(
            report.error,
            Some(MigrateError::NameTooLong { ref name, max: NAME_SIZE }) if *name == long_name
        ));

        let exact = vec![LiteralChangeset::new("é".repeat(NAME_SIZE), "select 1 ;")];
        let report = up(&db, &exact, &Options::default()).await;
        assert!(report.is_success());
        assert_eq!(report.applied.len(), 1);
    }

    #[tokio::test]
    async fn test_escaped_at_in_changeset() {
        let mut db = create_test_db().await;
        let changesets = vec![
            LiteralChangeset::new("1", "create table t (id integer primary key, label text) ;"),
            LiteralChangeset::new("2", "insert into t values (1, 'root@@localhost') ;"),
        ];

        let report = up(&db, &changesets, &Options::default()).await;
        assert!(report.is_success());
        assert_eq!(items(&mut db).await[0].label, "root@localhost");

        let unescaped = vec![LiteralChangeset::new("3", "insert into t values (2, 'a@b') ;")];
        let report = up(&db, &unescaped, &Options::default()).await;
        assert!(matches!(
            report.error,
            Some(MigrateError::Changeset { ref name, .. }) if name == "3"
        ));
    }

    #[tokio::test]
    async fn test_custom_changelog_table() {
        let mut db = create_test_db().await;
        let options = Options::new().changelog_table("schema history");

        let initial = changesets();
        let report = up(&db, &initial, &options).await;
        assert!(report.is_success());

        let store = ChangelogStore::new("schema history");
        assert_eq!(store.entries(&mut db).await.unwrap().len(), 2);

        let default_store = ChangelogStore::new(DEFAULT_CHANGELOG_TABLE);
        assert!(default_store.entries(&mut db).await.is_err());
    }

    #[tokio::test]
    async fn test_status() {
        let db = create_test_db().await;
        let migrator = Migrator::new(&Options::default());

        let states = migrator.status(&db, &changesets()).await.unwrap();
        assert!(states
            .iter()
            .all(|state| state.status == ChangesetStatus::Pending));

        let first = vec![changesets().remove(0)];
        assert!(migrator.up(&db, &first).await.is_success());

        let changed = vec![
            LiteralChangeset::new("A", "create table t (id integer) ;"),
            LiteralChangeset::new("B", "select 1 ;"),
        ];
        let states = migrator.status(&db, &changed).await.unwrap();

        assert_eq!(states[0].name, "A");
        assert!(matches!(states[0].status, ChangesetStatus::Drifted { .. }));
        assert_eq!(states[1].status, ChangesetStatus::Pending);

        let states = migrator.status(&db, &changesets()).await.unwrap();
        assert!(matches!(states[0].status, ChangesetStatus::Applied { .. }));
    }

    #[tokio::test]
    async fn test_status_is_read_only() {
        let mut db = create_test_db().await;
        let migrator = Migrator::new(&Options::default());

        migrator.status(&db, &changesets()).await.unwrap();
        assert!(migrator.store().entries(&mut db).await.is_err());
    }

    #[test]
    fn test_status_json() {
        let state = ChangesetState {
            name: "0001.sql".into(),
            status: ChangesetStatus::Applied {
                time: "2024-03-09T07:05:01.000000000Z".into(),
            },
        };
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"name":"0001.sql","status":"applied","time":"2024-03-09T07:05:01.000000000Z"}"#
        );

        let state = ChangesetState {
            name: "0002.sql".into(),
            status: ChangesetStatus::Pending,
        };
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"name":"0002.sql","status":"pending"}"#
        );
    }

    #[tokio::test]
    async fn test_mixed_changesets() {
        let mut db = create_test_db().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("0002_insert.sql"),
            "insert into t values (7, 'seven') ;",
        )
        .unwrap();

        let changesets: Vec<Box<dyn Changeset>> = vec![
            Box::new(LiteralChangeset::new(
                "0001_create",
                "create table t (id integer primary key, label text) ;",
            )),
            Box::new(crate::changeset::FileChangeset::new(
                dir.path().join("0002_insert.sql"),
            )),
        ];

        let report = up(&db, &changesets, &Options::default()).await;
        assert!(report.is_success());
        assert_eq!(report.applied_names(), ["0001_create", "0002_insert.sql"]);
        assert_eq!(items(&mut db).await[0].id, 7);
    }
}
