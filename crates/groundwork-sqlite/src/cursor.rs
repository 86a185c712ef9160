//! Row cursor over a sqlx result stream.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::TryStreamExt;
use groundwork_sql::{Cursor, Result, Row, SqlError};
use sqlx::sqlite::SqliteRow;

use crate::value::{column_names, decode_row};

/// Cursor over the rows of a SQLite query.
///
/// The query runs lazily: nothing is sent to the database until the first row
/// is requested. Column names are read from the first row.
pub struct SqliteCursor<'c> {
    stream: BoxStream<'c, std::result::Result<SqliteRow, sqlx::Error>>,
    columns: Option<Arc<[String]>>,
}

impl<'c> SqliteCursor<'c> {
    pub(crate) fn new(stream: BoxStream<'c, std::result::Result<SqliteRow, sqlx::Error>>) -> Self {
        Self {
            stream,
            columns: None,
        }
    }
}

impl Cursor for SqliteCursor<'_> {
    async fn next_row(&mut self) -> Result<Option<Row>> {
        let Some(row) = self.stream.try_next().await.map_err(SqlError::backend)? else {
            return Ok(None);
        };

        let columns = self
            .columns
            .get_or_insert_with(|| column_names(&row).into())
            .clone();

        Ok(Some(Row::new(columns, decode_row(&row)?)))
    }

    async fn close(self) -> Result<()> {
        drop(self.stream);
        Ok(())
    }
}

impl std::fmt::Debug for SqliteCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCursor")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}
