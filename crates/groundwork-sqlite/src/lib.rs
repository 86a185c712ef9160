//! # groundwork-sqlite
//!
//! SQLite backend for `groundwork-sql`, built on sqlx.
//!
//! [`Database`] wraps a connection pool and implements both
//! [`Executor`](groundwork_sql::Executor) and
//! [`Transactional`](groundwork_sql::Transactional). Queries are rebound with
//! the SQLite dialect: `?` placeholders and double-quoted identifiers.
//!
//! # How values are mapped
//!
//! - **Parameters**: `SqlValue::Bool` is stored as an integer, `Null` as a
//!   typed NULL.
//! - **Columns**: values are read by their [storage class], not by the
//!   declared column type. `INTEGER` becomes `SqlValue::Int`, `REAL` becomes
//!   `SqlValue::Float`, `BLOB` becomes `SqlValue::Blob` and anything else is
//!   read as text.
//!
//! [storage class]: https://www.sqlite.org/datatype3.html
//!
//! ## Example
//!
//! ```rust,no_run
//! use groundwork_sql::{exec, Sql};
//! use groundwork_sqlite::Database;
//!
//! # async fn run() -> groundwork_sql::Result<()> {
//! let mut db = Database::connect("sqlite:app.sqlite3").await?;
//! exec(&mut db, &Sql::new("create table if not exists t (a integer)")).await?;
//! # Ok(())
//! # }
//! ```

mod cursor;
mod database;
mod value;

pub use cursor::SqliteCursor;
pub use database::{Database, SqliteTx};
