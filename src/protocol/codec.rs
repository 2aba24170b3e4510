//! PostgreSQL wire protocol encoding and decoding primitives.
//!
//! PostgreSQL uses big-endian (network byte order) for all integers.

use zerocopy::FromBytes;
use zerocopy::byteorder::big_endian::{I16 as I16BE, I32 as I32BE, U16 as U16BE, U32 as U32BE};

use crate::error::{Error, Result};

/// Size of the tag byte plus the length field.
pub const HEADER_LEN: usize = 5;

/// Largest value of a length field, in either direction. The server refuses
/// anything longer (`PQ_LARGE_MESSAGE_LIMIT`).
pub const MAX_MESSAGE_LEN: usize = (1 << 30) - 1;

/// Read 1-byte unsigned integer.
#[inline]
pub fn read_u8(data: &[u8]) -> Result<(u8, &[u8])> {
    match data.split_first() {
        Some((value, rest)) => Ok((*value, rest)),
        None => Err(Error::ProtocolDecode("read_u8: empty buffer".into())),
    }
}

/// Read 2-byte big-endian signed integer.
#[inline]
pub fn read_i16(data: &[u8]) -> Result<(i16, &[u8])> {
    let (value, rest) = I16BE::read_from_prefix(data).map_err(|_| {
        Error::ProtocolDecode(format!("read_i16: buffer too short: {} < 2", data.len()))
    })?;
    Ok((value.get(), rest))
}

/// Read 2-byte big-endian unsigned integer.
#[inline]
pub fn read_u16(data: &[u8]) -> Result<(u16, &[u8])> {
    let (value, rest) = U16BE::read_from_prefix(data).map_err(|_| {
        Error::ProtocolDecode(format!("read_u16: buffer too short: {} < 2", data.len()))
    })?;
    Ok((value.get(), rest))
}

/// Read 4-byte big-endian signed integer.
#[inline]
pub fn read_i32(data: &[u8]) -> Result<(i32, &[u8])> {
    let (value, rest) = I32BE::read_from_prefix(data).map_err(|_| {
        Error::ProtocolDecode(format!("read_i32: buffer too short: {} < 4", data.len()))
    })?;
    Ok((value.get(), rest))
}

/// Read 4-byte big-endian unsigned integer.
#[inline]
pub fn read_u32(data: &[u8]) -> Result<(u32, &[u8])> {
    let (value, rest) = U32BE::read_from_prefix(data).map_err(|_| {
        Error::ProtocolDecode(format!("read_u32: buffer too short: {} < 4", data.len()))
    })?;
    Ok((value.get(), rest))
}

/// Read fixed-length bytes.
#[inline]
pub fn read_bytes(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    data.split_at_checked(len).ok_or_else(|| {
        Error::ProtocolDecode(format!(
            "read_bytes: buffer too short: {} < {}",
            data.len(),
            len
        ))
    })
}

/// Read null-terminated string (PostgreSQL String type).
/// Returns the string bytes (without the null terminator) and remaining data.
#[inline]
pub fn read_cstring(data: &[u8]) -> Result<(&[u8], &[u8])> {
    match memchr::memchr(0, data) {
        Some(pos) => Ok((&data[..pos], &data[pos + 1..])),
        None => Err(Error::ProtocolDecode(
            "read_cstring: no null terminator found".into(),
        )),
    }
}

/// Read null-terminated string as &str.
#[inline]
pub fn read_cstr(data: &[u8]) -> Result<(&str, &[u8])> {
    let (bytes, rest) = read_cstring(data)?;
    let s = simdutf8::compat::from_utf8(bytes)
        .map_err(|e| Error::ProtocolDecode(format!("read_cstr: invalid UTF-8: {e}")))?;
    Ok((s, rest))
}

/// Fail unless a payload decoder consumed every byte of its message.
#[inline]
pub fn expect_consumed(message: &str, rest: &[u8]) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::ProtocolDecode(format!(
            "{}: {} trailing bytes after payload",
            message,
            rest.len()
        )))
    }
}

/// Split one complete message off the front of `data`.
///
/// Returns `Ok(None)` when `data` does not yet hold a whole message, otherwise
/// `(tag, payload, rest)`. A declared length below 4 or above
/// [`MAX_MESSAGE_LEN`] is a protocol violation.
pub fn split_frame(data: &[u8]) -> Result<Option<(u8, &[u8], &[u8])>> {
    if data.len() < HEADER_LEN {
        return Ok(None);
    }
    let tag = data[0];
    let len = frame_payload_len(&data[1..HEADER_LEN])?;
    let (payload, rest) = match data[HEADER_LEN..].split_at_checked(len) {
        Some(parts) => parts,
        None => return Ok(None),
    };
    Ok(Some((tag, payload, rest)))
}

/// Interpret a 4-byte length field and return the payload length it announces.
pub fn frame_payload_len(len_field: &[u8]) -> Result<usize> {
    let (len, _) = read_i32(len_field)?;
    if len < 4 || len as usize > MAX_MESSAGE_LEN {
        return Err(Error::ProtocolDecode(format!(
            "invalid message length: {}",
            len
        )));
    }
    Ok(len as usize - 4)
}

/// Write 1-byte unsigned integer.
#[inline]
pub fn write_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

/// Write 4-byte big-endian signed integer.
#[inline]
pub fn write_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write raw bytes.
#[inline]
pub fn write_bytes(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(data);
}

/// Write null-terminated string (PostgreSQL String type).
#[inline]
pub fn write_cstring(out: &mut Vec<u8>, s: &[u8]) {
    out.extend_from_slice(s);
    out.push(0);
}

/// Write null-terminated string from &str.
#[inline]
pub fn write_cstr(out: &mut Vec<u8>, s: &str) {
    write_cstring(out, s.as_bytes());
}

/// Message builder helper that handles the length field.
///
/// PostgreSQL message format:
/// - Type byte (1 byte) - NOT included in length
/// - Length (4 bytes) - includes itself
/// - Payload (Length - 4 bytes)
///
/// The length is reserved up front and patched in `finish`, so variable-length
/// payloads never need to be measured in advance.
pub struct MessageBuilder<'a> {
    buf: &'a mut Vec<u8>,
    frame_start: usize,
    start: usize,
}

impl<'a> MessageBuilder<'a> {
    /// Start building a message with a type byte.
    pub fn new(buf: &'a mut Vec<u8>, type_byte: u8) -> Self {
        let frame_start = buf.len();
        buf.push(type_byte);
        let start = buf.len();
        buf.extend_from_slice(&[0, 0, 0, 0]); // Placeholder for length
        Self {
            buf,
            frame_start,
            start,
        }
    }

    /// Start building a startup message (no type byte).
    pub fn new_startup(buf: &'a mut Vec<u8>) -> Self {
        let start = buf.len();
        buf.extend_from_slice(&[0, 0, 0, 0]); // Placeholder for length
        Self {
            buf,
            frame_start: start,
            start,
        }
    }

    /// Write a u8.
    pub fn write_u8(&mut self, value: u8) {
        write_u8(self.buf, value);
    }

    /// Write an i32.
    pub fn write_i32(&mut self, value: i32) {
        write_i32(self.buf, value);
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) {
        write_bytes(self.buf, data);
    }

    /// Write null-terminated string.
    pub fn write_cstr(&mut self, s: &str) {
        write_cstr(self.buf, s);
    }

    /// Finish building the message and fill in the length field.
    ///
    /// A message longer than [`MAX_MESSAGE_LEN`] is removed from the buffer
    /// again and reported as `InvalidArgument`.
    pub fn finish(self) -> Result<()> {
        self.finish_within(MAX_MESSAGE_LEN)
    }

    fn finish_within(self, limit: usize) -> Result<()> {
        let len = self.buf.len() - self.start;
        if len > limit {
            self.buf.truncate(self.frame_start);
            return Err(Error::invalid_argument(format!(
                "message of {} bytes exceeds the {} byte limit",
                len, limit
            )));
        }
        let len = len as i32;
        self.buf[self.start..self.start + 4].copy_from_slice(&len.to_be_bytes());
        Ok(())
    }
}
