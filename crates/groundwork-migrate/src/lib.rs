//! Ordered SQL changesets with a changelog table.
//!
//! `groundwork-migrate` applies a list of [`Changeset`]s to a database, each
//! in its own transaction, and records every applied changeset in a changelog
//! table together with a SHA-256 hash of its queries:
//! - Changesets already in the changelog with the same hash are skipped
//! - A changeset whose queries changed after it was applied stops the run
//!   with [`MigrateError::Drift`]
//! - Changesets applied before an error stay applied
//!
//! # Example
//!
//! ```rust,no_run
//! use groundwork_migrate::{load_dir, up, Options};
//! use groundwork_sqlite::Database;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("sqlite:db.sqlite3").await?;
//! let changesets = load_dir("changesets")?;
//!
//! let report = up(&db, &changesets, &Options::default()).await;
//! println!("applied: {:?}", report.applied_names());
//! report.into_result()?;
//! # Ok(())
//! # }
//! ```
//!
//! Changeset queries are rebound without arguments, so a literal `@` must be
//! written as `@@`.
//!
//! # CLI Usage
//!
//! ```bash
//! # Create the changelog table
//! groundwork-migrate init
//!
//! # Apply pending changesets from ./changesets
//! groundwork-migrate up
//!
//! # Show which changesets are applied, pending or changed
//! groundwork-migrate status --json
//! ```

pub mod changelog;
pub mod changeset;
pub mod error;
pub mod migrator;

pub use changelog::{hash_queries, ChangelogEntry, ChangelogStore};
pub use changeset::{load_dir, Changeset, FileChangeset, LiteralChangeset};
pub use error::{MigrateError, Result};
pub use migrator::{
    up, ChangesetState, ChangesetStatus, MigrationReport, Migrator, Options,
    DEFAULT_CHANGELOG_TABLE,
};
