//! Extended query and function call backend messages.
//!
//! The client never issues extended-protocol requests, but these messages are
//! part of protocol v3 and decode like any other.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::codec::{expect_consumed, read_bytes, read_i32, read_u16, read_u32};
use crate::protocol::types::Oid;

/// ParameterDescription message - describes parameters for a prepared statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescription {
    /// Parameter type OIDs
    pub oids: Vec<Oid>,
}

impl ParameterDescription {
    /// Parse a ParameterDescription message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (num_params, mut data) = read_u16(payload)?;
        let mut oids = Vec::with_capacity(num_params as usize);

        for _ in 0..num_params {
            let (oid, rest) = read_u32(data)?;
            oids.push(oid);
            data = rest;
        }
        expect_consumed("ParameterDescription", data)?;

        Ok(Self { oids })
    }
}

/// FunctionCallResponse message - result of a fast-path function call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCallResponse {
    /// Result value, `None` for NULL
    pub value: Option<Bytes>,
}

impl FunctionCallResponse {
    /// Parse a FunctionCallResponse message from payload bytes.
    pub fn parse(payload: &Bytes) -> Result<Self> {
        let (len, rest) = read_i32(payload)?;
        let value = match len {
            -1 => {
                expect_consumed("FunctionCallResponse", rest)?;
                None
            }
            len if len < -1 => {
                return Err(Error::ProtocolDecode(format!(
                    "FunctionCallResponse: invalid value length {}",
                    len
                )));
            }
            len => {
                let (value, rest) = read_bytes(rest, len as usize)?;
                expect_consumed("FunctionCallResponse", rest)?;
                Some(payload.slice_ref(value))
            }
        };
        Ok(Self { value })
    }
}
