//! Mapping of argument and column names to record field paths.
//!
//! A [`FieldIndex`] is built once per record type from its
//! [`FieldDescriptor`]s. Embedded records are flattened into the parent's
//! namespace, so a key maps to a [`FieldPath`] of one position per level.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::{Result, SqlError};
use crate::record::{FieldAccess, FieldDescriptor, FieldKind, FieldMut, FieldRef, Record};
use crate::value::{Arg, SqlValue, TypeMismatch};

/// Field positions from the outermost record down to the value field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<usize>);

impl FieldPath {
    /// Returns the positions, outermost first.
    #[must_use]
    pub fn positions(&self) -> &[usize] {
        &self.0
    }

    fn child(&self, position: usize) -> Self {
        let mut positions = Vec::with_capacity(self.0.len() + 1);
        positions.extend_from_slice(&self.0);
        positions.push(position);
        Self(positions)
    }
}

impl From<Vec<usize>> for FieldPath {
    fn from(positions: Vec<usize>) -> Self {
        Self(positions)
    }
}

/// Immutable name to field path mapping for one record type.
#[derive(Debug, Clone)]
pub struct FieldIndex {
    record: &'static str,
    paths: HashMap<String, FieldPath>,
}

type IndexCache = RwLock<HashMap<TypeId, Arc<FieldIndex>>>;

fn cache() -> &'static IndexCache {
    static CACHE: OnceLock<IndexCache> = OnceLock::new();
    CACHE.get_or_init(IndexCache::default)
}

impl FieldIndex {
    /// Returns the shared index for `R`, building it on first use.
    ///
    /// Concurrent first uses build the index at most once. Construction errors
    /// are not cached; they are returned again on every call.
    pub fn of<R: Record>() -> Result<Arc<Self>> {
        let id = TypeId::of::<R>();

        if let Some(index) = cache()
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&id)
        {
            return Ok(Arc::clone(index));
        }

        let mut indexes = cache()
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(index) = indexes.get(&id) {
            return Ok(Arc::clone(index));
        }

        let index = Arc::new(Self::build::<R>()?);
        indexes.insert(id, Arc::clone(&index));
        Ok(index)
    }

    /// Builds a fresh index for `R` without consulting the cache.
    pub fn build<R: Record>() -> Result<Self> {
        Self::from_fields(type_name::<R>(), R::fields())
    }

    /// Builds an index from field descriptors.
    ///
    /// Fails if a resolved key contains anything but ASCII letters, digits,
    /// `-` and `_`, or if two fields resolve to the same key.
    pub fn from_fields(record: &'static str, fields: Vec<FieldDescriptor>) -> Result<Self> {
        let mut index = Self {
            record,
            paths: HashMap::new(),
        };
        index.analyze(&FieldPath(Vec::new()), fields)?;
        Ok(index)
    }

    fn analyze(&mut self, prefix: &FieldPath, fields: Vec<FieldDescriptor>) -> Result<()> {
        for (position, field) in fields.into_iter().enumerate() {
            let path = prefix.child(position);

            match field.kind {
                FieldKind::Embedded(fields) => self.analyze(&path, fields())?,
                FieldKind::Value => {
                    let key = field.key();

                    if !is_valid_key(key) {
                        return Err(SqlError::invalid_record(
                            self.record,
                            format!("invalid field name {key:?}"),
                        ));
                    }

                    if self.paths.contains_key(key) {
                        return Err(SqlError::invalid_record(
                            self.record,
                            format!("duplicate field {key:?}"),
                        ));
                    }

                    self.paths.insert(key.to_string(), path);
                }
            }
        }

        Ok(())
    }

    /// Returns the Rust type name of the indexed record.
    #[must_use]
    pub const fn record(&self) -> &'static str {
        self.record
    }

    /// Returns the path for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldPath> {
        self.paths.get(key)
    }

    /// Returns all keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.paths.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns whether the record has no indexed fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Reads the value at `path`. Paths through an absent optional record read
    /// as NULL.
    pub fn read(&self, record: &dyn FieldAccess, path: &FieldPath) -> Result<Arg> {
        read_path(record, path.positions()).ok_or_else(|| self.unresolved(path))
    }

    /// Stores a scanned value at `path`, allocating empty optional records on
    /// the way.
    pub fn write(
        &self,
        record: &mut dyn FieldAccess,
        path: &FieldPath,
        value: SqlValue,
    ) -> Result<std::result::Result<(), TypeMismatch>> {
        write_path(record, path.positions(), value).ok_or_else(|| self.unresolved(path))
    }

    fn unresolved(&self, path: &FieldPath) -> SqlError {
        SqlError::invalid_record(
            self.record,
            format!("field path {:?} does not resolve", path.positions()),
        )
    }
}

/// Returns whether `key` is usable as a parameter name.
pub(crate) fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(is_name_char)
}

pub(crate) const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn read_path(record: &dyn FieldAccess, path: &[usize]) -> Option<Arg> {
    let (&position, rest) = path.split_first()?;

    match record.field(position)? {
        FieldRef::Value(value) if rest.is_empty() => Some(value.to_arg()),
        FieldRef::Record(inner) if !rest.is_empty() => read_path(inner, rest),
        FieldRef::Absent => Some(Arg::Scalar(SqlValue::Null)),
        _ => None,
    }
}

fn write_path(
    record: &mut dyn FieldAccess,
    path: &[usize],
    value: SqlValue,
) -> Option<std::result::Result<(), TypeMismatch>> {
    let (&position, rest) = path.split_first()?;

    match record.field_mut(position)? {
        FieldMut::Value(target) if rest.is_empty() => Some(target.scan(value)),
        FieldMut::Record(inner) if !rest.is_empty() => write_path(inner, rest, value),
        _ => None,
    }
}
