//! Argument sources resolve `@name` parameters to values.

use std::sync::Arc;

use crate::error::{Result, SqlError};
use crate::field_index::FieldIndex;
use crate::record::{FieldAccess, Record};
use crate::value::{Arg, ToArg};

/// Resolves a parameter name, without the leading `@`, to an argument.
pub trait ArgumentSource {
    /// Looks up the argument for `name`.
    fn lookup(&self, name: &str) -> Result<Arg>;
}

impl<S: ArgumentSource + ?Sized> ArgumentSource for &S {
    fn lookup(&self, name: &str) -> Result<Arg> {
        (**self).lookup(name)
    }
}

impl<S: ArgumentSource + ?Sized> ArgumentSource for Box<S> {
    fn lookup(&self, name: &str) -> Result<Arg> {
        (**self).lookup(name)
    }
}

/// Argument source for queries without parameters. Every lookup fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoArgs;

impl ArgumentSource for NoArgs {
    fn lookup(&self, name: &str) -> Result<Arg> {
        Err(SqlError::invalid_arg(name, "provided none"))
    }
}

/// Arguments addressed by their 0-based position, as in `@0`, `@1`.
///
/// ```
/// use groundwork_sql::{rebind, GenericDialect, Positional};
///
/// let args = Positional::new().arg(1).arg(vec![1, 2, 3]);
/// let rebound = rebind("select * from t where a = @0 and b in (@1)", &GenericDialect, &args)?;
/// assert_eq!(rebound.query, "select * from t where a = ? and b in (?, ?, ?)");
/// # Ok::<(), groundwork_sql::SqlError>(())
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Positional {
    args: Vec<Arg>,
}

impl Positional {
    /// Creates an empty positional argument list.
    #[must_use]
    pub const fn new() -> Self {
        Self { args: Vec::new() }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, value: impl ToArg) -> Self {
        self.args.push(value.to_arg());
        self
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns whether there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl<T: ToArg> FromIterator<T> for Positional {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().map(|value| value.to_arg()).collect(),
        }
    }
}

impl ArgumentSource for Positional {
    fn lookup(&self, name: &str) -> Result<Arg> {
        let position: usize = name
            .parse()
            .map_err(|_| SqlError::invalid_arg(name, "is not a number"))?;

        self.args.get(position).cloned().ok_or_else(|| {
            SqlError::invalid_arg(
                name,
                format!("is out of range [0,{})", self.args.len()),
            )
        })
    }
}

enum Held<'a> {
    Owned(Box<dyn FieldAccess + 'a>),
    Borrowed(&'a dyn FieldAccess),
}

impl Held<'_> {
    fn get(&self) -> &dyn FieldAccess {
        match self {
            Self::Owned(record) => record.as_ref(),
            Self::Borrowed(record) => *record,
        }
    }
}

/// Arguments taken from the fields of a record.
///
/// Field names resolve through the record's [`FieldIndex`]. If the record type
/// cannot be indexed, the error is reported by the first lookup.
pub struct Named<'a> {
    index: fn() -> Result<Arc<FieldIndex>>,
    record: Held<'a>,
}

impl<'a> Named<'a> {
    /// Uses a record taken by value.
    #[must_use]
    pub fn new<R: Record>(record: R) -> Self {
        Self {
            index: FieldIndex::of::<R>,
            record: Held::Owned(Box::new(record)),
        }
    }

    /// Uses a borrowed record.
    #[must_use]
    pub fn by_ref<R: Record>(record: &'a R) -> Self {
        Self {
            index: FieldIndex::of::<R>,
            record: Held::Borrowed(record),
        }
    }
}

impl std::fmt::Debug for Named<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Named").finish_non_exhaustive()
    }
}

impl ArgumentSource for Named<'_> {
    fn lookup(&self, name: &str) -> Result<Arg> {
        let index = (self.index)()?;
        let path = index
            .get(name)
            .ok_or_else(|| SqlError::invalid_arg(name, format!("is not in {}", index.record())))?;

        index.read(self.record.get(), path)
    }
}
