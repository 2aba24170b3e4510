//! BYTEA codec.

use crate::error::{Error, Result};
use crate::protocol::types::{Format, Oid, oid};

use super::{Codec, Parameter, Value, cannot_encode, require_bytes, require_value};

/// BYTEA in either format; encodes raw binary.
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn name(&self) -> &'static str {
        "BinaryCodec"
    }

    fn can_decode(&self, _format: Format, oid: Oid) -> bool {
        oid == oid::BYTEA
    }

    fn decode(&self, bytes: Option<&[u8]>, format: Format) -> Result<Value> {
        let bytes = require_bytes(bytes)?;
        match format {
            Format::Binary => Ok(Value::Bytea(bytes.to_vec())),
            Format::Text => match bytes.strip_prefix(b"\\x") {
                Some(hex) => decode_hex(hex).map(Value::Bytea),
                None => decode_escape(bytes).map(Value::Bytea),
            },
        }
    }

    fn can_encode(&self, value: &Value) -> bool {
        matches!(value, Value::Bytea(_))
    }

    fn encode(&self, value: &Value) -> Result<Parameter> {
        match require_value(value)? {
            Value::Bytea(data) => Ok(Parameter::new(Format::Binary, oid::BYTEA, data.clone())),
            other => cannot_encode(self.name(), other),
        }
    }
}

fn hex_digit(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(Error::Decode(format!("invalid hex digit: {:?}", c as char))),
    }
}

fn decode_hex(hex: &[u8]) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(Error::Decode("odd number of hex digits in bytea".into()));
    }
    hex.chunks_exact(2)
        .map(|pair| Ok((hex_digit(pair[0])? << 4) | hex_digit(pair[1])?))
        .collect()
}

// Legacy `bytea_output = escape`: `\\` and `\ooo` octal escapes.
fn decode_escape(text: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let mut rest = text;
    while let Some((&first, tail)) = rest.split_first() {
        if first != b'\\' {
            out.push(first);
            rest = tail;
            continue;
        }
        match tail {
            [b'\\', more @ ..] => {
                out.push(b'\\');
                rest = more;
            }
            [a @ b'0'..=b'3', b @ b'0'..=b'7', c @ b'0'..=b'7', more @ ..] => {
                out.push(((a - b'0') << 6) | ((b - b'0') << 3) | (c - b'0'));
                rest = more;
            }
            _ => return Err(Error::Decode("invalid escape in bytea".into())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_hex_text() {
        assert_eq!(
            BinaryCodec.decode(Some(b"\\x00ff10"), Format::Text).unwrap(),
            Value::Bytea(vec![0x00, 0xFF, 0x10])
        );
        assert!(BinaryCodec.decode(Some(b"\\x0"), Format::Text).is_err());
        assert!(BinaryCodec.decode(Some(b"\\xzz"), Format::Text).is_err());
    }

    #[test]
    fn decode_escape_text() {
        assert_eq!(
            BinaryCodec.decode(Some(b"a\\\\b\\001"), Format::Text).unwrap(),
            Value::Bytea(vec![b'a', b'\\', b'b', 1])
        );
    }

    #[test]
    fn binary_passthrough() {
        assert_eq!(
            BinaryCodec.decode(Some(&[1, 2, 3]), Format::Binary).unwrap(),
            Value::Bytea(vec![1, 2, 3])
        );
        assert_eq!(
            BinaryCodec.encode(&Value::Bytea(vec![9])).unwrap(),
            Parameter::new(Format::Binary, oid::BYTEA, vec![9])
        );
    }
}
