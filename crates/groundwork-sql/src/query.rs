//! Running statements against an executor.

use crate::error::{Result, SqlError};
use crate::executor::Executor;
use crate::field_index::FieldIndex;
use crate::rebind::Rebound;
use crate::record::Record;
use crate::rows::Rows;
use crate::statement::Statement;

/// Executes a statement and returns the number of affected rows.
pub async fn exec<E: Executor>(executor: &mut E, statement: &impl Statement) -> Result<u64> {
    let Rebound { query, params } = statement.rebind(executor.dialect())?;
    executor.execute(&query, params).await
}

/// Runs a rebound query and returns its rows as records of type `T`.
///
/// `T` is indexed before the query is sent, so a record type that cannot be
/// mapped fails without touching the database. The rows borrow `rebound`.
pub async fn iterate<'c, T: Record, E: Executor>(
    executor: &'c mut E,
    rebound: &'c Rebound,
) -> Result<Rows<T, E::Cursor<'c>>> {
    let index = FieldIndex::of::<T>()?;
    let cursor = executor
        .query(&rebound.query, rebound.params.clone())
        .await?;
    Ok(Rows::with_index(cursor, index))
}

/// Runs a statement and reads all rows.
pub async fn query_all<T: Record, E: Executor>(
    executor: &mut E,
    statement: &impl Statement,
) -> Result<Vec<T>> {
    let rebound = statement.rebind(executor.dialect())?;
    let records = iterate::<T, E>(executor, &rebound).await?.collect().await;
    records
}

/// Runs a statement and reads the first row, failing with
/// [`SqlError::NotFound`] if there is none.
pub async fn query_first<T: Record, E: Executor>(
    executor: &mut E,
    statement: &impl Statement,
) -> Result<T> {
    let rebound = statement.rebind(executor.dialect())?;
    let record = iterate::<T, E>(executor, &rebound).await?.first().await;
    record
}

/// Runs a statement and reads the first row, if there is one.
pub async fn query_optional<T: Record, E: Executor>(
    executor: &mut E,
    statement: &impl Statement,
) -> Result<Option<T>> {
    match query_first(executor, statement).await {
        Ok(record) => Ok(Some(record)),
        Err(SqlError::NotFound) => Ok(None),
        Err(err) => Err(err),
    }
}
