//! Boolean and numeric codecs.

use crate::error::{Error, Result};
use crate::protocol::types::{Format, Oid, oid};

use super::{Codec, Parameter, Value, cannot_encode, require_bytes, require_value, utf8};

/// BOOL in either format; encodes as text.
pub struct BooleanCodec;

impl Codec for BooleanCodec {
    fn name(&self) -> &'static str {
        "BooleanCodec"
    }

    fn can_decode(&self, _format: Format, oid: Oid) -> bool {
        oid == oid::BOOL
    }

    fn decode(&self, bytes: Option<&[u8]>, format: Format) -> Result<Value> {
        let bytes = require_bytes(bytes)?;
        let value = match format {
            Format::Text => match bytes {
                b"t" | b"true" | b"TRUE" | b"T" | b"1" => true,
                b"f" | b"false" | b"FALSE" | b"F" | b"0" => false,
                _ => {
                    return Err(Error::Decode(format!(
                        "invalid boolean: {:?}",
                        String::from_utf8_lossy(bytes)
                    )));
                }
            },
            Format::Binary => match bytes {
                [byte] => *byte != 0,
                _ => {
                    return Err(Error::Decode(format!(
                        "invalid boolean length: {}",
                        bytes.len()
                    )));
                }
            },
        };
        Ok(Value::Bool(value))
    }

    fn can_encode(&self, value: &Value) -> bool {
        matches!(value, Value::Bool(_))
    }

    fn encode(&self, value: &Value) -> Result<Parameter> {
        match require_value(value)? {
            Value::Bool(b) => Ok(Parameter::new(
                Format::Text,
                oid::BOOL,
                if *b { &b"TRUE"[..] } else { &b"FALSE"[..] },
            )),
            other => cannot_encode(self.name(), other),
        }
    }
}

/// Fixed-width numbers: text or big-endian binary in, big-endian binary out.
macro_rules! number_codec {
    ($(#[$doc:meta])* $codec:ident, $oid:path, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub struct $codec;

        impl Codec for $codec {
            fn name(&self) -> &'static str {
                stringify!($codec)
            }

            fn can_decode(&self, _format: Format, oid: Oid) -> bool {
                oid == $oid
            }

            fn decode(&self, bytes: Option<&[u8]>, format: Format) -> Result<Value> {
                let bytes = require_bytes(bytes)?;
                let value = match format {
                    Format::Text => utf8(bytes)?.parse::<$ty>().map_err(|e| {
                        Error::Decode(format!(
                            "invalid {}: {}",
                            stringify!($ty),
                            e
                        ))
                    })?,
                    Format::Binary => {
                        let arr = bytes.try_into().map_err(|_| {
                            Error::Decode(format!(
                                "invalid {} length: {}",
                                stringify!($ty),
                                bytes.len()
                            ))
                        })?;
                        <$ty>::from_be_bytes(arr)
                    }
                };
                Ok(Value::$variant(value))
            }

            fn can_encode(&self, value: &Value) -> bool {
                matches!(value, Value::$variant(_))
            }

            fn encode(&self, value: &Value) -> Result<Parameter> {
                match require_value(value)? {
                    Value::$variant(n) => Ok(Parameter::new(
                        Format::Binary,
                        $oid,
                        n.to_be_bytes().to_vec(),
                    )),
                    other => cannot_encode(self.name(), other),
                }
            }
        }
    };
}

number_codec!(
    /// INT2 (`i16`).
    ShortCodec, oid::INT2, Int2, i16
);
number_codec!(
    /// INT4 (`i32`).
    IntegerCodec, oid::INT4, Int4, i32
);
number_codec!(
    /// INT8 (`i64`).
    LongCodec, oid::INT8, Int8, i64
);
number_codec!(
    /// FLOAT4 (`f32`).
    FloatCodec, oid::FLOAT4, Float4, f32
);
number_codec!(
    /// FLOAT8 (`f64`).
    DoubleCodec, oid::FLOAT8, Float8, f64
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean() {
        assert_eq!(
            BooleanCodec.decode(Some(b"t"), Format::Text).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            BooleanCodec.decode(Some(&[0]), Format::Binary).unwrap(),
            Value::Bool(false)
        );
        assert!(BooleanCodec.decode(Some(b"yes"), Format::Text).is_err());
        assert_eq!(
            BooleanCodec.encode(&Value::Bool(true)).unwrap(),
            Parameter::new(Format::Text, oid::BOOL, &b"TRUE"[..])
        );
    }

    #[test]
    fn integer_text_and_binary() {
        assert!(IntegerCodec.can_decode(Format::Text, oid::INT4));
        assert!(IntegerCodec.can_decode(Format::Binary, oid::INT4));
        assert!(!IntegerCodec.can_decode(Format::Text, oid::INT8));

        assert_eq!(
            IntegerCodec.decode(Some(b"-17"), Format::Text).unwrap(),
            Value::Int4(-17)
        );
        assert_eq!(
            IntegerCodec.decode(Some(&[0, 0, 0, 100]), Format::Binary).unwrap(),
            Value::Int4(100)
        );
        assert!(IntegerCodec.decode(Some(&[0, 100]), Format::Binary).is_err());
        assert!(IntegerCodec.decode(Some(b"1.5"), Format::Text).is_err());
    }

    #[test]
    fn numbers_encode_binary() {
        assert_eq!(
            LongCodec.encode(&Value::Int8(1)).unwrap(),
            Parameter::new(Format::Binary, oid::INT8, vec![0, 0, 0, 0, 0, 0, 0, 1])
        );
        assert_eq!(
            ShortCodec.encode(&Value::Int2(-1)).unwrap(),
            Parameter::new(Format::Binary, oid::INT2, vec![0xFF, 0xFF])
        );
        assert!(ShortCodec.encode(&Value::Int4(1)).is_err());
        assert!(matches!(
            ShortCodec.encode(&Value::Null),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn float_text_special_values() {
        match DoubleCodec.decode(Some(b"NaN"), Format::Text).unwrap() {
            Value::Float8(f) => assert!(f.is_nan()),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            DoubleCodec.decode(Some(b"-Infinity"), Format::Text).unwrap(),
            Value::Float8(f64::NEG_INFINITY)
        );
        assert_eq!(
            FloatCodec
                .decode(Some(&1.5_f32.to_be_bytes()), Format::Binary)
                .unwrap(),
            Value::Float4(1.5)
        );
    }
}
