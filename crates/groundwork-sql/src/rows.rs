//! Lazy mapping of result rows into records.

use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, SqlError};
use crate::executor::{Cursor, Row};
use crate::field_index::{FieldIndex, FieldPath};
use crate::record::Record;

/// Forward-only iterator of records read from a cursor.
///
/// Rows must be advanced explicitly. Result columns are matched against the
/// record's [`FieldIndex`] once, on the first row; columns without a matching
/// field are discarded. The cursor is closed when the rows are exhausted, when
/// reading fails, or by [`close`](Self::close).
pub struct Rows<T, C> {
    cursor: Option<C>,
    index: Arc<FieldIndex>,
    plan: Option<Vec<Option<FieldPath>>>,
    current: Option<T>,
}

impl<T: Record, C: Cursor> Rows<T, C> {
    /// Wraps a cursor, indexing `T` if that has not happened yet.
    pub fn new(cursor: C) -> Result<Self> {
        Ok(Self::with_index(cursor, FieldIndex::of::<T>()?))
    }

    pub(crate) const fn with_index(cursor: C, index: Arc<FieldIndex>) -> Self {
        Self {
            cursor: Some(cursor),
            index,
            plan: None,
            current: None,
        }
    }

    /// Moves to the next row. Returns `false` once the rows are exhausted.
    pub async fn advance(&mut self) -> Result<bool> {
        self.current = None;

        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(false);
        };

        let row = match cursor.next_row().await {
            Ok(Some(row)) => row,
            Ok(None) => {
                self.close().await?;
                return Ok(false);
            }
            Err(err) => return Err(self.fail(err).await),
        };

        match self.scan(row) {
            Ok(record) => {
                self.current = Some(record);
                Ok(true)
            }
            Err(err) => Err(self.fail(err).await),
        }
    }

    /// Returns the record of the current row.
    pub fn value(&self) -> Result<&T> {
        self.current.as_ref().ok_or(SqlError::NoCurrentRow)
    }

    /// Advances and takes the record of the next row.
    pub async fn try_next(&mut self) -> Result<Option<T>> {
        if self.advance().await? {
            Ok(self.current.take())
        } else {
            Ok(None)
        }
    }

    /// Reads all remaining rows.
    pub async fn collect(mut self) -> Result<Vec<T>> {
        let mut records = Vec::new();

        while let Some(record) = self.try_next().await? {
            records.push(record);
        }

        Ok(records)
    }

    /// Reads the next row and closes the cursor. Fails with
    /// [`SqlError::NotFound`] if there is none.
    pub async fn first(mut self) -> Result<T> {
        let record = self.try_next().await;
        let closed = self.close().await;

        match record? {
            Some(record) => closed.map(|()| record),
            None => Err(SqlError::NotFound),
        }
    }

    /// Closes the cursor. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        self.current = None;

        match self.cursor.take() {
            Some(cursor) => cursor.close().await,
            None => Ok(()),
        }
    }

    async fn fail(&mut self, err: SqlError) -> SqlError {
        if let Err(close_err) = self.close().await {
            trace!(error = %close_err, "Closing rows after error failed");
        }
        err
    }

    fn scan(&mut self, row: Row) -> Result<T> {
        let (columns, values) = row.into_parts();
        let index = &self.index;

        let plan = self.plan.get_or_insert_with(|| {
            trace!(
                record = index.record(),
                columns = columns.len(),
                "Mapping result columns"
            );
            columns.iter().map(|column| index.get(column).cloned()).collect()
        });

        let mut record = T::default();

        for ((column, value), path) in columns.iter().zip(values).zip(plan.iter()) {
            let Some(path) = path else {
                continue;
            };

            index
                .write(&mut record, path, value)?
                .map_err(|source| SqlError::Scan {
                    column: column.clone(),
                    source,
                })?;
        }

        Ok(record)
    }
}

impl<T, C> std::fmt::Debug for Rows<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("record", &self.index.record())
            .field("open", &self.cursor.is_some())
            .finish_non_exhaustive()
    }
}
