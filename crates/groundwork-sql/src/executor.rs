//! Backend capabilities: executing queries, reading rows and transactions.
//!
//! Backends implement these traits; everything above them passes the executor
//! explicitly. Queries reaching an executor are already rebound, so the query
//! text uses the executor's own placeholder syntax.

use std::sync::Arc;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::value::SqlValue;

/// A result row: column names shared by all rows of a result, and one value per
/// column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Creates a row. `values` is aligned with `columns`.
    #[must_use]
    pub const fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    /// Returns the values, in column order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Returns the value of the named column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Splits the row into its columns and values.
    #[must_use]
    pub fn into_parts(self) -> (Arc<[String]>, Vec<SqlValue>) {
        (self.columns, self.values)
    }
}

/// A forward-only cursor over the rows of a query.
#[allow(async_fn_in_trait)]
pub trait Cursor {
    /// Fetches the next row, or `None` once the result is exhausted.
    async fn next_row(&mut self) -> Result<Option<Row>>;

    /// Releases the cursor.
    async fn close(self) -> Result<()>;
}

/// Runs rebound queries against a database connection, pool or transaction.
#[allow(async_fn_in_trait)]
pub trait Executor {
    /// Cursor type returned by [`query`](Self::query).
    type Cursor<'c>: Cursor
    where
        Self: 'c;

    /// Returns the dialect queries must be rebound for.
    fn dialect(&self) -> &'static dyn Dialect;

    /// Executes a statement and returns the number of affected rows.
    async fn execute(&mut self, query: &str, params: Vec<SqlValue>) -> Result<u64>;

    /// Runs a query and returns a cursor over its rows.
    async fn query<'c>(
        &'c mut self,
        query: &'c str,
        params: Vec<SqlValue>,
    ) -> Result<Self::Cursor<'c>>;
}

/// An open transaction. Dropping it without commit rolls it back.
#[allow(async_fn_in_trait)]
pub trait Transaction: Executor {
    /// Commits the transaction.
    async fn commit(self) -> Result<()>;

    /// Rolls the transaction back.
    async fn rollback(self) -> Result<()>;
}

/// A database that can open transactions.
#[allow(async_fn_in_trait)]
pub trait Transactional {
    /// Transaction type returned by [`begin`](Self::begin).
    type Transaction: Transaction;

    /// Returns the dialect of the database.
    fn dialect(&self) -> &'static dyn Dialect;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Transaction>;
}
