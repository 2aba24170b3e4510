//! UUID codec (uuid crate).

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::types::{Format, Oid, oid};

use super::{
    Codec, Parameter, Value, cannot_encode, require_bytes, require_value, text_parameter, utf8,
};

/// UUID in either format; encodes the hyphenated text form.
pub struct UuidCodec;

impl Codec for UuidCodec {
    fn name(&self) -> &'static str {
        "UuidCodec"
    }

    fn can_decode(&self, _format: Format, oid: Oid) -> bool {
        oid == oid::UUID
    }

    fn decode(&self, bytes: Option<&[u8]>, format: Format) -> Result<Value> {
        let bytes = require_bytes(bytes)?;
        let uuid = match format {
            Format::Text => Uuid::parse_str(utf8(bytes)?),
            Format::Binary => Uuid::from_slice(bytes),
        };
        uuid.map(Value::Uuid)
            .map_err(|e| Error::Decode(format!("invalid UUID: {}", e)))
    }

    fn can_encode(&self, value: &Value) -> bool {
        matches!(value, Value::Uuid(_))
    }

    fn encode(&self, value: &Value) -> Result<Parameter> {
        match require_value(value)? {
            Value::Uuid(uuid) => Ok(text_parameter(oid::UUID, uuid.hyphenated().to_string())),
            other => cannot_encode(self.name(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11";

    #[test]
    fn text_and_binary_agree() {
        let expected = Uuid::parse_str(TEXT).unwrap();
        assert_eq!(
            UuidCodec.decode(Some(TEXT.as_bytes()), Format::Text).unwrap(),
            Value::Uuid(expected)
        );
        assert_eq!(
            UuidCodec
                .decode(Some(expected.as_bytes()), Format::Binary)
                .unwrap(),
            Value::Uuid(expected)
        );
        assert!(UuidCodec.decode(Some(&[1, 2, 3]), Format::Binary).is_err());
    }

    #[test]
    fn encodes_hyphenated() {
        let uuid = Uuid::parse_str(TEXT).unwrap();
        assert_eq!(
            UuidCodec.encode(&Value::Uuid(uuid)).unwrap(),
            Parameter::new(Format::Text, oid::UUID, TEXT)
        );
    }
}
