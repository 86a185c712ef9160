//! SQL Dialect support.
//!
//! Databases disagree on two things the rebinder cares about: how a bound
//! parameter is written into the query text, and how identifiers are quoted.
//! Both are captured by the [`Dialect`] trait.

mod generic;
mod mysql;
mod postgres;
mod sqlite;

use std::borrow::Cow;

pub use generic::GenericDialect;
pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character (e.g., `"` for standard SQL, `` ` `` for MySQL).
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Returns the placeholder for the parameter at the given 0-based position
    /// in the emitted parameter list.
    fn placeholder(&self, _position: usize) -> Cow<'static, str> {
        Cow::Borrowed("?")
    }

    /// Quotes an identifier, doubling any embedded quote character.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push(quote);
        for c in name.chars() {
            if c == quote {
                quoted.push(quote);
            }
            quoted.push(c);
        }
        quoted.push(quote);
        quoted
    }
}

/// Picks a dialect by case-insensitive substring match against a driver or
/// connection identifier such as `sqlite3`, `postgres://...` or `mysql`.
///
/// Unknown identifiers fall back to [`GenericDialect`].
#[must_use]
pub fn detect(identifier: &str) -> &'static dyn Dialect {
    let identifier = identifier.to_ascii_lowercase();

    if identifier.contains("sqlite") {
        &SqliteDialect
    } else if identifier.contains("postgres") || identifier.contains("pgx") {
        &PostgresDialect
    } else if identifier.contains("mysql") || identifier.contains("mariadb") {
        &MysqlDialect
    } else {
        &GenericDialect
    }
}
