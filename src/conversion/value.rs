//! Native values produced and consumed by codecs.

use std::convert::identity;

use crate::error::{Error, Result};

/// A decoded column value or an encodable parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    Bool(bool),
    Char(char),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Text(String),
    Bytea(Vec<u8>),
    #[cfg(feature = "with-chrono")]
    Date(chrono::NaiveDate),
    #[cfg(feature = "with-chrono")]
    Time(chrono::NaiveTime),
    #[cfg(feature = "with-chrono")]
    Timestamp(chrono::NaiveDateTime),
    #[cfg(feature = "with-chrono")]
    TimestampTz(chrono::DateTime<chrono::FixedOffset>),
    #[cfg(feature = "with-uuid")]
    Uuid(uuid::Uuid),
    #[cfg(feature = "with-rust-decimal")]
    Numeric(rust_decimal::Decimal),
}

impl Value {
    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Int2(_) => "int2",
            Value::Int4(_) => "int4",
            Value::Int8(_) => "int8",
            Value::Float4(_) => "float4",
            Value::Float8(_) => "float8",
            Value::Text(_) => "text",
            Value::Bytea(_) => "bytea",
            #[cfg(feature = "with-chrono")]
            Value::Date(_) => "date",
            #[cfg(feature = "with-chrono")]
            Value::Time(_) => "time",
            #[cfg(feature = "with-chrono")]
            Value::Timestamp(_) => "timestamp",
            #[cfg(feature = "with-chrono")]
            Value::TimestampTz(_) => "timestamptz",
            #[cfg(feature = "with-uuid")]
            Value::Uuid(_) => "uuid",
            #[cfg(feature = "with-rust-decimal")]
            Value::Numeric(_) => "numeric",
        }
    }

    /// Check if this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Conversion from a decoded [`Value`] into a Rust type.
pub trait FromValue: Sized {
    /// Convert a value. NULL is an error unless the type can represent it.
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(value: &Value, target: &str) -> Result<T> {
    match value {
        Value::Null => Err(Error::Decode("unexpected NULL value".into())),
        other => Err(Error::Decode(format!(
            "cannot convert {} to {}",
            other.type_name(),
            target
        ))),
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

macro_rules! impl_from_value {
    ($target:ty, $name:literal, $($variant:ident => $convert:expr),+) => {
        impl FromValue for $target {
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    $(Value::$variant(v) => Ok($convert(v)),)+
                    other => mismatch(&other, $name),
                }
            }
        }
    };
}

impl_from_value!(bool, "bool", Bool => identity);
impl_from_value!(char, "char", Char => identity);
impl_from_value!(i16, "i16", Int2 => identity);
impl_from_value!(i32, "i32", Int2 => i32::from, Int4 => identity);
impl_from_value!(i64, "i64", Int2 => i64::from, Int4 => i64::from, Int8 => identity);
impl_from_value!(f32, "f32", Float4 => identity);
impl_from_value!(f64, "f64", Float4 => f64::from, Float8 => identity);
impl_from_value!(String, "String", Text => identity);
impl_from_value!(Vec<u8>, "Vec<u8>", Bytea => identity);

#[cfg(feature = "with-chrono")]
impl_from_value!(chrono::NaiveDate, "NaiveDate", Date => identity);
#[cfg(feature = "with-chrono")]
impl_from_value!(chrono::NaiveTime, "NaiveTime", Time => identity);
#[cfg(feature = "with-chrono")]
impl_from_value!(chrono::NaiveDateTime, "NaiveDateTime", Timestamp => identity);
#[cfg(feature = "with-chrono")]
impl_from_value!(
    chrono::DateTime<chrono::FixedOffset>,
    "DateTime<FixedOffset>",
    TimestampTz => identity
);
#[cfg(feature = "with-uuid")]
impl_from_value!(uuid::Uuid, "Uuid", Uuid => identity);
#[cfg(feature = "with-rust-decimal")]
impl_from_value!(rust_decimal::Decimal, "Decimal", Numeric => identity);

macro_rules! impl_into_value {
    ($($source:ty => $variant:ident),+ $(,)?) => {
        $(impl From<$source> for Value {
            fn from(value: $source) -> Self {
                Value::$variant(value)
            }
        })+
    };
}

impl_into_value!(
    bool => Bool,
    char => Char,
    i16 => Int2,
    i32 => Int4,
    i64 => Int8,
    f32 => Float4,
    f64 => Float8,
    String => Text,
    Vec<u8> => Bytea,
);

#[cfg(feature = "with-chrono")]
impl_into_value!(
    chrono::NaiveDate => Date,
    chrono::NaiveTime => Time,
    chrono::NaiveDateTime => Timestamp,
    chrono::DateTime<chrono::FixedOffset> => TimestampTz,
);
#[cfg(feature = "with-uuid")]
impl_into_value!(uuid::Uuid => Uuid);
#[cfg(feature = "with-rust-decimal")]
impl_into_value!(rust_decimal::Decimal => Numeric);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
