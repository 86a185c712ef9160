//! SQL values, query arguments and conversions.
//!
//! [`SqlValue`] is what travels between the rebinder and a backend. Rust values
//! turn into arguments through [`ToArg`], which decides whether a value binds
//! as one placeholder ([`Arg::Scalar`]) or expands into one placeholder per
//! element ([`Arg::List`]). Scanned columns turn back into Rust values through
//! [`FromSqlValue`].

/// A SQL value that can be used as a parameter or read from a result column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns a short name of the value's kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    /// Returns whether the value is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

macro_rules! impl_to_sql_value_int {
    ($($ty:ty),+) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Int(i64::from(self))
                }
            }
        )+
    };
}

impl_to_sql_value_int!(i64, i32, i16, i8, u32, u16, u8);

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

/// A resolved query argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Binds to exactly one placeholder.
    Scalar(SqlValue),
    /// Expands into one placeholder per element, in order.
    List(Vec<SqlValue>),
}

impl Arg {
    /// Returns the values this argument contributes to the parameter list.
    #[must_use]
    pub fn into_values(self) -> Vec<SqlValue> {
        match self {
            Self::Scalar(value) => vec![value],
            Self::List(values) => values,
        }
    }
}

/// Trait for values that can be bound as query arguments.
///
/// Sequences (`Vec<T>`, slices and arrays) become [`Arg::List`], everything
/// else is an [`Arg::Scalar`]. `None` binds as NULL. Byte blobs are passed as
/// [`SqlValue::Blob`], since a `Vec<u8>` is a sequence like any other.
pub trait ToArg {
    /// Converts the value into an argument without consuming it.
    fn to_arg(&self) -> Arg;
}

macro_rules! impl_to_arg_scalar {
    ($($ty:ty),+) => {
        $(
            impl ToArg for $ty {
                fn to_arg(&self) -> Arg {
                    Arg::Scalar(self.clone().to_sql_value())
                }
            }
        )+
    };
}

impl_to_arg_scalar!(SqlValue, bool, i64, i32, i16, i8, u32, u16, u8, f64, f32, String);

impl ToArg for str {
    fn to_arg(&self) -> Arg {
        Arg::Scalar(SqlValue::Text(self.to_string()))
    }
}

impl ToArg for Arg {
    fn to_arg(&self) -> Arg {
        self.clone()
    }
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Arg {
        (**self).to_arg()
    }
}

impl<T: ToArg> ToArg for Option<T> {
    fn to_arg(&self) -> Arg {
        match self {
            Some(v) => v.to_arg(),
            None => Arg::Scalar(SqlValue::Null),
        }
    }
}

impl<T: ToSqlValue + Clone> ToArg for [T] {
    fn to_arg(&self) -> Arg {
        Arg::List(self.iter().cloned().map(ToSqlValue::to_sql_value).collect())
    }
}

impl<T: ToSqlValue + Clone> ToArg for Vec<T> {
    fn to_arg(&self) -> Arg {
        self.as_slice().to_arg()
    }
}

impl<T: ToSqlValue + Clone, const N: usize> ToArg for [T; N] {
    fn to_arg(&self) -> Arg {
        self.as_slice().to_arg()
    }
}

/// A scanned value did not fit the destination type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected}, found {found}")]
pub struct TypeMismatch {
    /// The destination type.
    pub expected: &'static str,
    /// The kind of the scanned value.
    pub found: &'static str,
}

impl TypeMismatch {
    fn new(expected: &'static str, value: &SqlValue) -> Self {
        Self {
            expected,
            found: value.kind(),
        }
    }
}

/// Trait for types that can be read from a result column.
pub trait FromSqlValue: Sized {
    /// Converts a scanned value into `Self`.
    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch>;
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        Ok(value)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            SqlValue::Int(n) => Ok(n != 0),
            other => Err(TypeMismatch::new("bool", &other)),
        }
    }
}

macro_rules! impl_from_sql_value_int {
    ($($ty:ty),+) => {
        $(
            impl FromSqlValue for $ty {
                fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
                    match value {
                        SqlValue::Int(n) => <$ty>::try_from(n)
                            .map_err(|_| TypeMismatch::new(stringify!($ty), &SqlValue::Int(n))),
                        SqlValue::Bool(b) => Ok(<$ty>::from(b)),
                        other => Err(TypeMismatch::new(stringify!($ty), &other)),
                    }
                }
            }
        )+
    };
}

impl_from_sql_value_int!(i64, i32, i16, i8, u64, u32, u16, u8);

impl FromSqlValue for f64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        match value {
            SqlValue::Float(f) => Ok(f),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(n) => Ok(n as f64),
            other => Err(TypeMismatch::new("f64", &other)),
        }
    }
}

impl FromSqlValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        f64::from_sql_value(value).map(|f| f as f32)
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        match value {
            SqlValue::Text(s) => Ok(s),
            SqlValue::Blob(bytes) => {
                String::from_utf8(bytes).map_err(|_| TypeMismatch {
                    expected: "String",
                    found: "non-utf8 blob",
                })
            }
            other => Err(TypeMismatch::new("String", &other)),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_sql_value(value).map(Some)
    }
}

/// Sequences scan from blobs (one element per byte) or from NULL (empty).
impl<T: FromSqlValue> FromSqlValue for Vec<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self, TypeMismatch> {
        match value {
            SqlValue::Null => Ok(Vec::new()),
            SqlValue::Blob(bytes) => bytes
                .into_iter()
                .map(|b| T::from_sql_value(SqlValue::Int(i64::from(b))))
                .collect(),
            other => Err(TypeMismatch::new("Vec", &other)),
        }
    }
}
