//! Character type codecs.

use crate::error::{Error, Result};
use crate::protocol::types::{Format, Oid, oid};

use super::{
    Codec, Parameter, Value, cannot_encode, require_bytes, require_format, require_value,
    text_parameter, utf8,
};

/// VARCHAR in text format; encodes every [`Value::Text`].
pub struct StringCodec;

impl Codec for StringCodec {
    fn name(&self) -> &'static str {
        "StringCodec"
    }

    fn can_decode(&self, format: Format, oid: Oid) -> bool {
        format == Format::Text && oid == oid::VARCHAR
    }

    fn decode(&self, bytes: Option<&[u8]>, format: Format) -> Result<Value> {
        let bytes = require_bytes(bytes)?;
        require_format(self.name(), format, &[Format::Text])?;
        Ok(Value::Text(utf8(bytes)?.to_owned()))
    }

    fn can_encode(&self, value: &Value) -> bool {
        matches!(value, Value::Text(_))
    }

    fn encode(&self, value: &Value) -> Result<Parameter> {
        match require_value(value)? {
            Value::Text(text) => Ok(text_parameter(oid::VARCHAR, text.clone())),
            other => cannot_encode(self.name(), other),
        }
    }
}

/// TEXT, BPCHAR and NAME columns; decode only.
pub struct TextCodec;

impl Codec for TextCodec {
    fn name(&self) -> &'static str {
        "TextCodec"
    }

    fn can_decode(&self, format: Format, oid: Oid) -> bool {
        format == Format::Text && matches!(oid, oid::TEXT | oid::BPCHAR | oid::NAME)
    }

    fn decode(&self, bytes: Option<&[u8]>, format: Format) -> Result<Value> {
        let bytes = require_bytes(bytes)?;
        require_format(self.name(), format, &[Format::Text])?;
        Ok(Value::Text(utf8(bytes)?.to_owned()))
    }

    fn can_encode(&self, _value: &Value) -> bool {
        false
    }

    fn encode(&self, value: &Value) -> Result<Parameter> {
        cannot_encode(self.name(), require_value(value)?)
    }
}

/// The single-byte `"char"` type.
pub struct CharacterCodec;

impl Codec for CharacterCodec {
    fn name(&self) -> &'static str {
        "CharacterCodec"
    }

    fn can_decode(&self, format: Format, oid: Oid) -> bool {
        format == Format::Text && oid == oid::CHAR
    }

    fn decode(&self, bytes: Option<&[u8]>, format: Format) -> Result<Value> {
        let bytes = require_bytes(bytes)?;
        require_format(self.name(), format, &[Format::Text])?;
        let text = utf8(bytes)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Value::Char(c)),
            _ => Err(Error::Decode(format!(
                "expected a single character, got {:?}",
                text
            ))),
        }
    }

    fn can_encode(&self, value: &Value) -> bool {
        matches!(value, Value::Char(_))
    }

    fn encode(&self, value: &Value) -> Result<Parameter> {
        match require_value(value)? {
            Value::Char(c) => Ok(text_parameter(oid::CHAR, c.to_string())),
            other => cannot_encode(self.name(), other),
        }
    }
}
