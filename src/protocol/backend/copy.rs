//! COPY protocol backend messages.

use crate::error::Result;
use crate::protocol::codec::{expect_consumed, read_u8, read_u16};
use crate::protocol::types::Format;

/// Body shared by CopyInResponse, CopyOutResponse and CopyBothResponse.
///
/// Wire layout: `overall_format(1) || count(2) || formats[count](2 each)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyResponse {
    /// Overall format of the copy data
    pub overall_format: Format,
    /// Per-column format codes
    pub column_formats: Vec<Format>,
}

impl CopyResponse {
    /// Parse a copy response body from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (format_byte, rest) = read_u8(payload)?;
        let overall_format = Format::from_u16(format_byte as u16)?;

        let (num_columns, mut rest) = read_u16(rest)?;
        let mut column_formats = Vec::with_capacity(num_columns as usize);

        for _ in 0..num_columns {
            let (fmt, remaining) = read_u16(rest)?;
            column_formats.push(Format::from_u16(fmt)?);
            rest = remaining;
        }
        expect_consumed("CopyResponse", rest)?;

        Ok(Self {
            overall_format,
            column_formats,
        })
    }
}
