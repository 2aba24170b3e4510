//! Date and time codecs (chrono crate), text format only.
//!
//! The server renders these types in ISO `DateStyle` by default, which is what
//! the formats below parse. `%.f` accepts an absent fractional part.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};
use crate::protocol::types::{Format, Oid, oid};

use super::{
    Codec, Parameter, Value, cannot_encode, require_bytes, require_format, require_value,
    text_parameter, utf8,
};

macro_rules! chrono_codec {
    (
        $(#[$doc:meta])*
        $codec:ident, $oid:path, $variant:ident, $ty:ty, parse: $parse:literal, print: $print:literal
    ) => {
        $(#[$doc])*
        pub struct $codec;

        impl Codec for $codec {
            fn name(&self) -> &'static str {
                stringify!($codec)
            }

            fn can_decode(&self, format: Format, oid: Oid) -> bool {
                format == Format::Text && oid == $oid
            }

            fn decode(&self, bytes: Option<&[u8]>, format: Format) -> Result<Value> {
                let bytes = require_bytes(bytes)?;
                require_format(self.name(), format, &[Format::Text])?;
                let text = utf8(bytes)?;
                <$ty>::parse_from_str(text, $parse)
                    .map(Value::$variant)
                    .map_err(|e| {
                        Error::Decode(format!(
                            "invalid {} {:?}: {}",
                            stringify!($variant),
                            text,
                            e
                        ))
                    })
            }

            fn can_encode(&self, value: &Value) -> bool {
                matches!(value, Value::$variant(_))
            }

            fn encode(&self, value: &Value) -> Result<Parameter> {
                match require_value(value)? {
                    Value::$variant(v) => Ok(text_parameter($oid, v.format($print).to_string())),
                    other => cannot_encode(self.name(), other),
                }
            }
        }
    };
}

chrono_codec!(
    /// DATE as [`NaiveDate`].
    LocalDateCodec, oid::DATE, Date, NaiveDate,
    parse: "%Y-%m-%d", print: "%Y-%m-%d"
);
chrono_codec!(
    /// TIME as [`NaiveTime`].
    LocalTimeCodec, oid::TIME, Time, NaiveTime,
    parse: "%H:%M:%S%.f", print: "%H:%M:%S%.f"
);
chrono_codec!(
    /// TIMESTAMP as [`NaiveDateTime`].
    LocalDateTimeCodec, oid::TIMESTAMP, Timestamp, NaiveDateTime,
    parse: "%Y-%m-%d %H:%M:%S%.f", print: "%Y-%m-%d %H:%M:%S%.f"
);
chrono_codec!(
    /// TIMESTAMPTZ as [`DateTime<FixedOffset>`]. The server may send offsets
    /// as `+02`, `+0530` or `+05:30`.
    ZonedDateTimeCodec, oid::TIMESTAMPTZ, TimestampTz, DateTime<FixedOffset>,
    parse: "%Y-%m-%d %H:%M:%S%.f%#z", print: "%Y-%m-%d %H:%M:%S%.f%:z"
);
