//! # groundwork-sql
//!
//! Named parameters for plain SQL, and rows mapped onto plain structs.
//!
//! This crate provides:
//! - A query rebinder that rewrites `@name` and `@0` parameters into the
//!   placeholders of a [`Dialect`], expanding sequences into lists
//! - Argument sources: [`NoArgs`], [`Positional`] and [`Named`] over a record
//! - A [`FieldIndex`] mapping names to struct fields, with flattening of
//!   embedded records and name overrides
//! - Backend traits ([`Executor`], [`Transactional`]) and lazy [`Rows`]
//!
//! ## Rebinding
//!
//! ```rust
//! use groundwork_sql::{rebind, PostgresDialect, Positional, SqlValue};
//!
//! let args = Positional::new().arg(1).arg(vec![1, 2, 3]);
//! let rebound = rebind(
//!     "select * from t where a = @0 and b in (@1) ;",
//!     &PostgresDialect,
//!     &args,
//! )?;
//!
//! assert_eq!(rebound.query, "select * from t where a = $1 and b in ($2, $3, $4) ;");
//! assert_eq!(rebound.params.len(), 4);
//! assert_eq!(rebound.params[0], SqlValue::Int(1));
//! # Ok::<(), groundwork_sql::SqlError>(())
//! ```
//!
//! `@@` writes a literal `@`. The rebinder does not parse SQL, so an `@`
//! inside a string literal is a parameter unless it is escaped.
//!
//! ## Records
//!
//! Structs deriving `Record` (see the `groundwork-derive` crate) can be used
//! as named arguments and as the destination of query results. Only `pub`
//! fields take part.

pub mod args;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod field_index;
pub mod query;
pub mod rebind;
pub mod record;
pub mod rows;
pub mod statement;
pub mod value;

pub use args::{ArgumentSource, Named, NoArgs, Positional};
pub use dialect::{
    detect, Dialect, GenericDialect, MysqlDialect, PostgresDialect, SqliteDialect,
};
pub use error::{Result, SqlError};
pub use executor::{Cursor, Executor, Row, Transaction, Transactional};
pub use field_index::{FieldIndex, FieldPath};
pub use query::{exec, iterate, query_all, query_first, query_optional};
pub use rebind::{rebind, Rebound};
pub use record::{FieldAccess, FieldDescriptor, FieldKind, FieldMut, FieldRef, Record, ScanTarget};
pub use rows::Rows;
pub use statement::{Insert, Sql, Statement};
pub use value::{Arg, FromSqlValue, SqlValue, ToArg, ToSqlValue, TypeMismatch};
