//! PostgreSQL dialect.

use std::borrow::Cow;

use super::Dialect;

/// PostgreSQL dialect: numbered `$1`, `$2`, ... placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, position: usize) -> Cow<'static, str> {
        Cow::Owned(format!("${}", position + 1))
    }
}
