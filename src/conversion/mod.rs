//! Type encoding and decoding for PostgreSQL wire values.
//!
//! A [`Codec`] converts between the bytes of one wire representation and a
//! [`Value`]. Codecs are collected in a [`Codecs`] registry which is built once
//! per connection and shared by every row decoded on it. Lookup is ordered:
//! the first codec that accepts a column or value wins.

mod bytes;
mod primitives;
mod string;
mod value;

#[cfg(feature = "with-chrono")]
mod chrono;
#[cfg(feature = "with-rust-decimal")]
mod decimal;
#[cfg(feature = "with-uuid")]
mod uuid;

use std::fmt;
use std::sync::Arc;

use ::bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::types::{Format, Oid, oid};

pub use self::bytes::BinaryCodec;
pub use primitives::{
    BooleanCodec, DoubleCodec, FloatCodec, IntegerCodec, LongCodec, ShortCodec,
};
pub use string::{CharacterCodec, StringCodec, TextCodec};
pub use value::{FromValue, Value};

#[cfg(feature = "with-chrono")]
pub use self::chrono::{LocalDateCodec, LocalDateTimeCodec, LocalTimeCodec, ZonedDateTimeCodec};
#[cfg(feature = "with-rust-decimal")]
pub use decimal::DecimalCodec;
#[cfg(feature = "with-uuid")]
pub use self::uuid::UuidCodec;

/// An encoded value ready to be sent to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Wire format of `value`
    pub format: Format,
    /// Type the server should interpret `value` as
    pub oid: Oid,
    /// Encoded bytes, `None` for SQL NULL
    pub value: Option<Bytes>,
}

impl Parameter {
    /// Create a parameter.
    pub fn new(format: Format, oid: Oid, value: impl Into<Bytes>) -> Self {
        Self {
            format,
            oid,
            value: Some(value.into()),
        }
    }

    /// A NULL parameter whose type the server infers.
    pub fn null() -> Self {
        Self {
            format: Format::Text,
            oid: oid::UNSPECIFIED,
            value: None,
        }
    }
}

/// Conversion between one wire representation and [`Value`].
///
/// `decode` is only called for `(format, oid)` pairs accepted by `can_decode`,
/// and `encode` only for values accepted by `can_encode`.
pub trait Codec: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether this codec handles columns of type `oid` sent in `format`.
    fn can_decode(&self, format: Format, oid: Oid) -> bool;

    /// Decode column bytes. `None` is rejected with `InvalidArgument`.
    fn decode(&self, bytes: Option<&[u8]>, format: Format) -> Result<Value>;

    /// Whether this codec produces a parameter for `value`.
    fn can_encode(&self, value: &Value) -> bool;

    /// Encode a value. `Value::Null` is rejected with `InvalidArgument`.
    fn encode(&self, value: &Value) -> Result<Parameter>;
}

/// Ordered registry of codecs.
#[derive(Clone)]
pub struct Codecs {
    codecs: Vec<Arc<dyn Codec>>,
}

impl Codecs {
    /// A registry with no codecs.
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Add a codec with the highest priority.
    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codecs.insert(0, Arc::new(codec));
        self
    }

    /// Add a codec with the lowest priority.
    pub fn push(&mut self, codec: impl Codec + 'static) {
        self.codecs.push(Arc::new(codec));
    }

    /// Decode a column value. SQL NULL decodes to [`Value::Null`].
    pub fn decode(&self, bytes: Option<&[u8]>, oid: Oid, format: Format) -> Result<Value> {
        let Some(bytes) = bytes else {
            return Ok(Value::Null);
        };
        let codec = self
            .codecs
            .iter()
            .find(|codec| codec.can_decode(format, oid))
            .ok_or_else(|| {
                Error::UnsupportedType(format!(
                    "no codec decodes oid {} in {:?} format",
                    oid, format
                ))
            })?;
        codec.decode(Some(bytes), format)
    }

    /// Encode a value. [`Value::Null`] becomes a NULL parameter of unspecified type.
    pub fn encode(&self, value: &Value) -> Result<Parameter> {
        if value.is_null() {
            return Ok(Parameter::null());
        }
        let codec = self
            .codecs
            .iter()
            .find(|codec| codec.can_encode(value))
            .ok_or_else(|| {
                Error::UnsupportedType(format!("no codec encodes {}", value.type_name()))
            })?;
        codec.encode(value)
    }
}

impl Default for Codecs {
    /// Every built-in codec, in lookup order.
    fn default() -> Self {
        let mut codecs = Self::empty();
        codecs.push(StringCodec);
        codecs.push(TextCodec);
        codecs.push(BooleanCodec);
        codecs.push(CharacterCodec);
        codecs.push(ShortCodec);
        codecs.push(IntegerCodec);
        codecs.push(LongCodec);
        codecs.push(FloatCodec);
        codecs.push(DoubleCodec);
        codecs.push(BinaryCodec);
        #[cfg(feature = "with-chrono")]
        {
            codecs.push(LocalDateCodec);
            codecs.push(LocalTimeCodec);
            codecs.push(LocalDateTimeCodec);
            codecs.push(ZonedDateTimeCodec);
        }
        #[cfg(feature = "with-uuid")]
        codecs.push(UuidCodec);
        #[cfg(feature = "with-rust-decimal")]
        codecs.push(DecimalCodec);
        codecs
    }
}

impl fmt::Debug for Codecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|codec| codec.name()))
            .finish()
    }
}

// Shared argument checks and text helpers for the built-in codecs.

fn require_bytes(bytes: Option<&[u8]>) -> Result<&[u8]> {
    bytes.ok_or_else(|| Error::invalid_argument("bytes must not be null"))
}

fn require_value(value: &Value) -> Result<&Value> {
    if value.is_null() {
        Err(Error::invalid_argument("value must not be null"))
    } else {
        Ok(value)
    }
}

fn require_format(codec: &str, format: Format, accepted: &[Format]) -> Result<()> {
    if accepted.contains(&format) {
        Ok(())
    } else {
        Err(Error::Decode(format!(
            "{} cannot decode {:?} format",
            codec, format
        )))
    }
}

fn cannot_encode<T>(codec: &str, value: &Value) -> Result<T> {
    Err(Error::UnsupportedType(format!(
        "{} cannot encode {}",
        codec,
        value.type_name()
    )))
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    simdutf8::compat::from_utf8(bytes).map_err(|e| Error::Decode(format!("invalid UTF-8: {}", e)))
}

fn text_parameter(oid: Oid, text: String) -> Parameter {
    Parameter::new(Format::Text, oid, text)
}
