//! Record traits for mapping struct fields to arguments and columns.
//!
//! These traits are implemented by the `#[derive(Record)]` macro. A record
//! describes its fields once through [`Record::fields`], and exposes them by
//! position through the object-safe [`FieldAccess`] trait so that a
//! [`FieldIndex`](crate::FieldIndex) path can be followed into embedded
//! records for reading and writing.

use crate::value::{FromSqlValue, SqlValue, ToArg, TypeMismatch};

/// Describes a single field of a record, in declaration order.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// The natural Rust field name.
    pub name: &'static str,
    /// The raw name override, possibly followed by `,`-separated modifiers.
    pub rename: Option<&'static str>,
    /// Whether the field holds a value or embeds another record.
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Describes a value field.
    #[must_use]
    pub const fn value(name: &'static str, rename: Option<&'static str>) -> Self {
        Self {
            name,
            rename,
            kind: FieldKind::Value,
        }
    }

    /// Describes an embedded record whose fields are flattened into the parent.
    #[must_use]
    pub const fn embedded(name: &'static str, fields: fn() -> Vec<FieldDescriptor>) -> Self {
        Self {
            name,
            rename: None,
            kind: FieldKind::Embedded(fields),
        }
    }

    /// Returns the lookup key: the override without modifiers, or the field name.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self.rename {
            Some(rename) => rename.split(',').next().unwrap_or_default(),
            None => self.name,
        }
    }
}

/// The kind of a record field.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// A value bound as an argument and scanned from a column.
    Value,
    /// An embedded record; the function returns its descriptors.
    Embedded(fn() -> Vec<FieldDescriptor>),
}

/// Read access to a field.
pub enum FieldRef<'a> {
    /// A value field.
    Value(&'a dyn ToArg),
    /// An embedded record.
    Record(&'a dyn FieldAccess),
    /// An optional embedded record that is currently empty.
    Absent,
}

/// Write access to a field.
pub enum FieldMut<'a> {
    /// A value field.
    Value(&'a mut dyn ScanTarget),
    /// An embedded record, allocated if it was empty.
    Record(&'a mut dyn FieldAccess),
}

/// Positional access to the fields described by [`Record::fields`].
pub trait FieldAccess {
    /// Returns the field at `position`, if there is one.
    fn field(&self, position: usize) -> Option<FieldRef<'_>>;

    /// Returns the field at `position` for writing, if there is one.
    fn field_mut(&mut self, position: usize) -> Option<FieldMut<'_>>;
}

/// A struct whose public fields map to query arguments and result columns.
///
/// Usually derived:
///
/// ```ignore
/// use groundwork_derive::Record;
///
/// #[derive(Debug, Default, Record)]
/// pub struct User {
///     #[column(name = "id,primary")]
///     pub id: i64,
///     pub name: String,
///     #[column(flatten)]
///     pub audit: Option<Audit>,
/// }
/// ```
pub trait Record: FieldAccess + Default + 'static {
    /// Returns the descriptors of the public fields, in declaration order.
    fn fields() -> Vec<FieldDescriptor>;
}

/// An optional record reads as absent while empty and is allocated on write.
impl<T: Record> FieldAccess for Option<T> {
    fn field(&self, position: usize) -> Option<FieldRef<'_>> {
        match self {
            Some(record) => record.field(position),
            None => Some(FieldRef::Absent),
        }
    }

    fn field_mut(&mut self, position: usize) -> Option<FieldMut<'_>> {
        self.get_or_insert_with(T::default).field_mut(position)
    }
}

impl<T: Record> Record for Option<T> {
    fn fields() -> Vec<FieldDescriptor> {
        T::fields()
    }
}

/// A field that a scanned column value can be stored into.
pub trait ScanTarget {
    /// Replaces the field with the scanned value.
    fn scan(&mut self, value: SqlValue) -> Result<(), TypeMismatch>;
}

impl<T: FromSqlValue> ScanTarget for T {
    fn scan(&mut self, value: SqlValue) -> Result<(), TypeMismatch> {
        *self = T::from_sql_value(value)?;
        Ok(())
    }
}
