//! Statements that rebind into executable queries.

use std::borrow::Cow;

use crate::args::{ArgumentSource, Named, NoArgs};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::field_index::FieldIndex;
use crate::rebind::{rebind, Rebound};
use crate::record::Record;

/// Something that can be turned into a query for a given dialect.
pub trait Statement {
    /// Produces the query text and parameters for `dialect`.
    fn rebind(&self, dialect: &dyn Dialect) -> Result<Rebound>;
}

impl<S: Statement + ?Sized> Statement for &S {
    fn rebind(&self, dialect: &dyn Dialect) -> Result<Rebound> {
        (**self).rebind(dialect)
    }
}

/// A query with `@name` parameters and the source of their values.
///
/// ```
/// use groundwork_sql::{GenericDialect, Positional, Sql, Statement};
///
/// let rebound = Sql::new("select * from users where id = @0")
///     .args(Positional::new().arg(7))
///     .rebind(&GenericDialect)?;
/// assert_eq!(rebound.query, "select * from users where id = ?");
/// # Ok::<(), groundwork_sql::SqlError>(())
/// ```
pub struct Sql<'a> {
    query: Cow<'a, str>,
    args: Box<dyn ArgumentSource + 'a>,
}

impl<'a> Sql<'a> {
    /// Creates a statement without arguments.
    #[must_use]
    pub fn new(query: impl Into<Cow<'a, str>>) -> Self {
        Self {
            query: query.into(),
            args: Box::new(NoArgs),
        }
    }

    /// Sets the argument source.
    #[must_use]
    pub fn args(mut self, args: impl ArgumentSource + 'a) -> Self {
        self.args = Box::new(args);
        self
    }

    /// Returns the unrebound query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }
}

impl std::fmt::Debug for Sql<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sql")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl Statement for Sql<'_> {
    fn rebind(&self, dialect: &dyn Dialect) -> Result<Rebound> {
        rebind(&self.query, dialect, self.args.as_ref())
    }
}

/// Inserts one record into a table, one column per indexed field.
///
/// Columns are written in ascending key order. With
/// [`returning`](Self::returning) the inserted row is returned, on backends
/// that support `returning *`.
#[derive(Debug)]
pub struct Insert<'a, R> {
    table: Cow<'a, str>,
    record: &'a R,
    returning: bool,
}

impl<'a, R: Record> Insert<'a, R> {
    /// Creates an insert of `record` into `table`.
    #[must_use]
    pub fn new(table: impl Into<Cow<'a, str>>, record: &'a R) -> Self {
        Self {
            table: table.into(),
            record,
            returning: false,
        }
    }

    /// Appends `returning *` to the generated query.
    #[must_use]
    pub const fn returning(mut self, returning: bool) -> Self {
        self.returning = returning;
        self
    }

    fn query(&self, dialect: &dyn Dialect, index: &FieldIndex) -> String {
        let columns = index.keys();
        let mut query = String::new();

        query.push_str("insert into ");
        query.push_str(&dialect.quote_identifier(&self.table));
        query.push_str(" (");

        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                query.push_str(", ");
            }
            query.push_str(&dialect.quote_identifier(column));
        }

        query.push_str(") values (");

        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                query.push_str(", ");
            }
            query.push('@');
            query.push_str(column);
        }

        query.push(')');

        if self.returning {
            query.push_str(" returning *");
        }

        query.push_str(" ;");
        query
    }
}

impl<R: Record> Statement for Insert<'_, R> {
    fn rebind(&self, dialect: &dyn Dialect) -> Result<Rebound> {
        let index = FieldIndex::of::<R>()?;
        let query = self.query(dialect, &index);
        rebind(&query, dialect, &Named::by_ref(self.record))
    }
}
