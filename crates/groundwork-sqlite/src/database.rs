//! SQLite connection pool and transactions.

use std::str::FromStr;

use groundwork_sql::{
    Dialect, Executor, Result, SqlError, SqlValue, SqliteDialect, Transaction, Transactional,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;
use tracing::{debug, trace};

use crate::cursor::SqliteCursor;
use crate::value::prepare;

static DIALECT: SqliteDialect = SqliteDialect::new();

/// A SQLite database behind a sqlx connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a database, creating the file if it does not exist.
    ///
    /// Accepts the URLs understood by sqlx, e.g. `sqlite:db.sqlite3` or
    /// `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(SqlError::backend)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(SqlError::backend)?;

        debug!(url, "Connected to database");
        Ok(Self::new(pool))
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the SQLite dialect.
    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        &DIALECT
    }

    /// Closes all connections of the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl Executor for Database {
    type Cursor<'c> = SqliteCursor<'c>;

    fn dialect(&self) -> &'static dyn Dialect {
        &DIALECT
    }

    async fn execute(&mut self, query: &str, params: Vec<SqlValue>) -> Result<u64> {
        trace!(query, params = params.len(), "Executing statement");
        let result = prepare(query, params)
            .execute(&self.pool)
            .await
            .map_err(SqlError::backend)?;
        Ok(result.rows_affected())
    }

    async fn query<'c>(
        &'c mut self,
        query: &'c str,
        params: Vec<SqlValue>,
    ) -> Result<Self::Cursor<'c>> {
        trace!(query, params = params.len(), "Running query");
        Ok(SqliteCursor::new(prepare(query, params).fetch(&self.pool)))
    }
}

impl Transactional for Database {
    type Transaction = SqliteTx;

    fn dialect(&self) -> &'static dyn Dialect {
        &DIALECT
    }

    async fn begin(&self) -> Result<SqliteTx> {
        if self.pool.is_closed() {
            return Err(SqlError::NoExecutor("the connection pool is closed".into()));
        }

        let tx = self.pool.begin().await.map_err(SqlError::backend)?;
        trace!("Transaction started");
        Ok(SqliteTx { tx })
    }
}

/// An open SQLite transaction. Dropped transactions are rolled back.
#[derive(Debug)]
pub struct SqliteTx {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl Executor for SqliteTx {
    type Cursor<'c> = SqliteCursor<'c>;

    fn dialect(&self) -> &'static dyn Dialect {
        &DIALECT
    }

    async fn execute(&mut self, query: &str, params: Vec<SqlValue>) -> Result<u64> {
        trace!(query, params = params.len(), "Executing statement in transaction");
        let result = prepare(query, params)
            .execute(&mut *self.tx)
            .await
            .map_err(SqlError::backend)?;
        Ok(result.rows_affected())
    }

    async fn query<'c>(
        &'c mut self,
        query: &'c str,
        params: Vec<SqlValue>,
    ) -> Result<Self::Cursor<'c>> {
        trace!(query, params = params.len(), "Running query in transaction");
        Ok(SqliteCursor::new(prepare(query, params).fetch(&mut *self.tx)))
    }
}

impl Transaction for SqliteTx {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(SqlError::backend)?;
        trace!("Transaction committed");
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.map_err(SqlError::backend)?;
        trace!("Transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use groundwork_derive::Record;
    use groundwork_sql::{
        exec, iterate, query_all, query_first, query_optional, Insert, Named, Positional, Row,
        Sql, Statement,
    };

    use super::*;

    #[derive(Debug, Default, Clone, PartialEq, Record)]
    pub struct Audit {
        pub created_by: Option<String>,
    }

    #[derive(Debug, Default, Clone, PartialEq, Record)]
    pub struct User {
        #[column(name = "id,primary")]
        pub id: i64,
        pub name: String,
        pub score: Option<f64>,
        #[column(flatten)]
        pub audit: Option<Audit>,
    }

    async fn create_test_db() -> Database {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        let mut db = Database::new(pool);

        exec(
            &mut db,
            &Sql::new(
                "create table users (id integer primary key, name text not null, \
                 score real, created_by text, avatar blob) ;",
            ),
        )
        .await
        .unwrap();

        db
    }

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            name: name.into(),
            ..User::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_query_all() {
        let mut db = create_test_db().await;

        for record in [user(1, "alice"), user(2, "bob")] {
            let affected = exec(&mut db, &Insert::new("users", &record)).await.unwrap();
            assert_eq!(affected, 1);
        }

        let users: Vec<User> = query_all(
            &mut db,
            &Sql::new("select id, name, score from users order by id ;"),
        )
        .await
        .unwrap();
        assert_eq!(users, vec![user(1, "alice"), user(2, "bob")]);

        let first: User = query_first(&mut db, &Sql::new("select * from users order by id"))
            .await
            .unwrap();
        assert_eq!(first.audit, Some(Audit::default()));
    }

    #[tokio::test]
    async fn test_insert_embedded_record() {
        let mut db = create_test_db().await;
        let record = User {
            score: Some(1.5),
            audit: Some(Audit {
                created_by: Some("root".into()),
            }),
            ..user(1, "alice")
        };

        exec(&mut db, &Insert::new("users", &record)).await.unwrap();

        let found: User = query_first(
            &mut db,
            &Sql::new("select * from users where id = @0").args(Positional::new().arg(1)),
        )
        .await
        .unwrap();
        assert_eq!(found, record);
    }

    #[tokio::test]
    async fn test_query_first_not_found() {
        let mut db = create_test_db().await;

        let result = query_first::<User, _>(&mut db, &Sql::new("select * from users")).await;
        assert!(matches!(result, Err(SqlError::NotFound)));

        let optional = query_optional::<User, _>(&mut db, &Sql::new("select * from users"))
            .await
            .unwrap();
        assert_eq!(optional, None);
    }

    #[tokio::test]
    async fn test_named_args_with_sequence() {
        let mut db = create_test_db().await;
        for id in 1..=4 {
            exec(&mut db, &Insert::new("users", &user(id, &format!("u{id}"))))
                .await
                .unwrap();
        }

        #[derive(Debug, Default, Record)]
        pub struct Filter {
            pub ids: Vec<i64>,
            pub name: String,
        }

        let filter = Filter {
            ids: vec![1, 3, 4],
            name: "u4".into(),
        };
        let users: Vec<User> = query_all(
            &mut db,
            &Sql::new("select * from users where id in (@ids) and name <> @name order by id")
                .args(Named::by_ref(&filter)),
        )
        .await
        .unwrap();

        assert_eq!(
            users.iter().map(|u| u.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[tokio::test]
    async fn test_iterate_tolerates_extra_columns() {
        let mut db = create_test_db().await;
        exec(&mut db, &Insert::new("users", &user(1, "alice")))
            .await
            .unwrap();

        let rebound = Sql::new("select id, name, 42 as answer, 'x' as extra from users")
            .rebind(db.dialect())
            .unwrap();
        let mut rows = iterate::<User, _>(&mut db, &rebound).await.unwrap();

        assert!(rows.advance().await.unwrap());
        assert_eq!(rows.value().unwrap(), &user(1, "alice"));
        assert!(!rows.advance().await.unwrap());
    }

    #[tokio::test]
    async fn test_decode_storage_classes() {
        let mut db = create_test_db().await;
        let rebound = Sql::new("select 1 as i, 2.5 as r, 'text' as t, x'0102' as b, null as n")
            .rebind(db.dialect())
            .unwrap();

        let mut cursor = Executor::query(&mut db, &rebound.query, rebound.params.clone())
            .await
            .unwrap();
        let row: Row = groundwork_sql::Cursor::next_row(&mut cursor)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(row.columns().as_ref(), ["i", "r", "t", "b", "n"]);
        assert_eq!(
            row.values(),
            [
                SqlValue::Int(1),
                SqlValue::Float(2.5),
                SqlValue::Text("text".into()),
                SqlValue::Blob(vec![1, 2]),
                SqlValue::Null,
            ]
        );
    }

    #[tokio::test]
    async fn test_transaction_commit_and_rollback() {
        let mut db = create_test_db().await;

        let mut tx = db.begin().await.unwrap();
        exec(&mut tx, &Insert::new("users", &user(1, "kept")))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        exec(&mut tx, &Insert::new("users", &user(2, "discarded")))
            .await
            .unwrap();
        let seen: Vec<User> = query_all(&mut tx, &Sql::new("select * from users"))
            .await
            .unwrap();
        assert_eq!(seen.len(), 2);
        tx.rollback().await.unwrap();

        let users: Vec<User> = query_all(&mut db, &Sql::new("select id, name from users"))
            .await
            .unwrap();
        assert_eq!(users, vec![user(1, "kept")]);
    }

    #[tokio::test]
    async fn test_backend_error() {
        let mut db = create_test_db().await;
        let result = exec(&mut db, &Sql::new("insert into missing values (1)")).await;
        assert!(matches!(result, Err(SqlError::Backend(_))));
    }

    #[tokio::test]
    async fn test_begin_on_closed_pool() {
        let db = create_test_db().await;
        assert!(!db.pool().is_closed());
        db.close().await;
        assert!(db.pool().is_closed());
        assert!(matches!(db.begin().await, Err(SqlError::NoExecutor(_))));
    }
}
