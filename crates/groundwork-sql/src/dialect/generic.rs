//! Fallback dialect for drivers `detect` does not recognize.

use super::Dialect;

/// Uses the trait defaults: `?` for every parameter, `"` around identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl GenericDialect {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }
}
