//! COPY protocol frontend messages.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::codec::{MessageBuilder, expect_consumed, read_cstr};

use super::FrontendMessage;

/// CopyData message - one chunk of a `COPY FROM STDIN` data stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyData {
    /// Raw data bytes
    pub data: Bytes,
}

impl CopyData {
    /// Create a CopyData message.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mut msg = MessageBuilder::new(buf, super::msg_type::COPY_DATA);
        msg.write_bytes(&self.data);
        msg.finish()
    }
}

/// CopyFail message - aborts a COPY IN with a reason reported back by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFail {
    reason: String,
}

impl CopyFail {
    /// Create a CopyFail message. The reason must not contain a NUL byte.
    pub fn new(reason: impl Into<String>) -> Result<Self> {
        let reason = reason.into();
        if reason.as_bytes().contains(&0) {
            return Err(Error::invalid_argument("reason must not contain a NUL byte"));
        }
        Ok(Self { reason })
    }

    /// The failure reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mut msg = MessageBuilder::new(buf, super::msg_type::COPY_FAIL);
        msg.write_cstr(&self.reason);
        msg.finish()
    }

    pub(crate) fn parse(payload: &[u8]) -> Result<Self> {
        let (reason, rest) = read_cstr(payload)?;
        expect_consumed("CopyFail", rest)?;
        Ok(Self {
            reason: reason.to_owned(),
        })
    }
}

/// A request accepted by the COPY IN flow.
///
/// A well-formed request stream is `Data*` followed by exactly one `Done` or `Fail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyMessage {
    /// A chunk of data
    Data(CopyData),
    /// End of data
    Done,
    /// Abort the copy
    Fail(CopyFail),
}

impl CopyMessage {
    /// Shorthand for `CopyMessage::Data(CopyData::new(data))`.
    pub fn data(data: impl Into<Bytes>) -> Self {
        CopyMessage::Data(CopyData::new(data))
    }

    /// Shorthand for `CopyMessage::Fail(CopyFail::new(reason)?)`.
    pub fn fail(reason: impl Into<String>) -> Result<Self> {
        Ok(CopyMessage::Fail(CopyFail::new(reason)?))
    }
}

impl From<CopyMessage> for FrontendMessage {
    fn from(message: CopyMessage) -> Self {
        match message {
            CopyMessage::Data(data) => FrontendMessage::CopyData(data),
            CopyMessage::Done => FrontendMessage::CopyDone,
            CopyMessage::Fail(fail) => FrontendMessage::CopyFail(fail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_data() {
        let mut buf = Vec::new();
        CopyData::new(&b"hello\tworld\n"[..]).write(&mut buf).unwrap();

        assert_eq!(buf[0], b'd');
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(len as usize, buf.len() - 1);
        assert_eq!(&buf[5..], b"hello\tworld\n");
    }

    #[test]
    fn test_copy_fail() {
        let mut buf = Vec::new();
        CopyFail::new("error occurred").unwrap().write(&mut buf).unwrap();

        assert_eq!(buf[0], b'f');
        assert_eq!(&buf[5..], b"error occurred\0");
    }

    #[test]
    fn test_copy_fail_rejects_nul() {
        assert!(matches!(
            CopyFail::new("bad\0reason"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_copy_message_into_frontend() {
        assert_eq!(
            FrontendMessage::from(CopyMessage::Done),
            FrontendMessage::CopyDone
        );
        assert_eq!(
            FrontendMessage::from(CopyMessage::data(vec![1, 2])),
            FrontendMessage::CopyData(CopyData::new(vec![1, 2]))
        );
    }
}
