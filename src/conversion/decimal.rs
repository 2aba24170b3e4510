//! NUMERIC codec (rust_decimal crate).
//!
//! Only the text representation is handled. `NaN` and the infinities have no
//! [`Decimal`] counterpart and fail to decode.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::protocol::types::{Format, Oid, oid};

use super::{
    Codec, Parameter, Value, cannot_encode, require_bytes, require_format, require_value,
    text_parameter, utf8,
};

/// NUMERIC in text format.
pub struct DecimalCodec;

impl Codec for DecimalCodec {
    fn name(&self) -> &'static str {
        "DecimalCodec"
    }

    fn can_decode(&self, format: Format, oid: Oid) -> bool {
        format == Format::Text && oid == oid::NUMERIC
    }

    fn decode(&self, bytes: Option<&[u8]>, format: Format) -> Result<Value> {
        let bytes = require_bytes(bytes)?;
        require_format(self.name(), format, &[Format::Text])?;
        let text = utf8(bytes)?;
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .map(Value::Numeric)
            .map_err(|e| Error::Decode(format!("invalid numeric {:?}: {}", text, e)))
    }

    fn can_encode(&self, value: &Value) -> bool {
        matches!(value, Value::Numeric(_))
    }

    fn encode(&self, value: &Value) -> Result<Parameter> {
        match require_value(value)? {
            Value::Numeric(d) => Ok(text_parameter(oid::NUMERIC, d.to_string())),
            other => cannot_encode(self.name(), other),
        }
    }
}
