//! PostgreSQL frontend (client → server) messages.

pub mod auth;
pub mod copy;
pub mod simple;
pub mod startup;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::codec::expect_consumed;

pub use auth::{PasswordMessage, SaslInitialResponse, SaslResponse};
pub use copy::{CopyData, CopyFail, CopyMessage};
pub use simple::Query;
pub use startup::Startup;

/// Frontend message type bytes.
pub mod msg_type {
    /// Password/SASL response (all auth response types use 'p')
    pub const PASSWORD: u8 = b'p';
    /// Query (simple query protocol)
    pub const QUERY: u8 = b'Q';
    /// CopyData
    pub const COPY_DATA: u8 = b'd';
    /// CopyDone
    pub const COPY_DONE: u8 = b'c';
    /// CopyFail
    pub const COPY_FAIL: u8 = b'f';
    /// Terminate
    pub const TERMINATE: u8 = b'X';
}

/// A message sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendMessage {
    /// Simple query
    Query(Query),
    /// A chunk of COPY IN data
    CopyData(CopyData),
    /// End of COPY IN data
    CopyDone,
    /// Abort COPY IN
    CopyFail(CopyFail),
    /// Orderly connection shutdown
    Terminate,
    /// Untagged startup message
    Startup(Startup),
    /// Cleartext or MD5 password
    Password(PasswordMessage),
    /// First SASL message
    SaslInitialResponse(SaslInitialResponse),
    /// Subsequent SASL message
    SaslResponse(SaslResponse),
}

impl FrontendMessage {
    /// Append the framed message to `buf`.
    ///
    /// Fails with `InvalidArgument`, leaving `buf` as it was, if the message
    /// is longer than the protocol allows.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            FrontendMessage::Query(query) => query.write(buf),
            FrontendMessage::CopyData(data) => data.write(buf),
            FrontendMessage::CopyDone => write_empty(buf, msg_type::COPY_DONE),
            FrontendMessage::CopyFail(fail) => fail.write(buf),
            FrontendMessage::Terminate => write_empty(buf, msg_type::TERMINATE),
            FrontendMessage::Startup(startup) => startup.write(buf),
            FrontendMessage::Password(password) => password.write(buf),
            FrontendMessage::SaslInitialResponse(initial) => initial.write(buf),
            FrontendMessage::SaslResponse(response) => response.write(buf),
        }
    }

    /// The framed message as a standalone buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Decode a tagged frontend message from its type byte and payload.
    ///
    /// Only the messages a client sends after startup are recognized. The `p`
    /// family cannot be told apart without the authentication context, so it is
    /// rejected here along with every other tag.
    pub fn decode(tag: u8, payload: &[u8]) -> Result<Self> {
        match tag {
            msg_type::QUERY => Ok(FrontendMessage::Query(Query::parse(payload)?)),
            msg_type::COPY_DATA => Ok(FrontendMessage::CopyData(CopyData::new(
                Bytes::copy_from_slice(payload),
            ))),
            msg_type::COPY_DONE => {
                expect_consumed("CopyDone", payload)?;
                Ok(FrontendMessage::CopyDone)
            }
            msg_type::COPY_FAIL => Ok(FrontendMessage::CopyFail(CopyFail::parse(payload)?)),
            msg_type::TERMINATE => {
                expect_consumed("Terminate", payload)?;
                Ok(FrontendMessage::Terminate)
            }
            _ => Err(Error::ProtocolDecode(format!(
                "unknown frontend message type: '{}'",
                tag as char
            ))),
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            FrontendMessage::Query(_) => "Query",
            FrontendMessage::CopyData(_) => "CopyData",
            FrontendMessage::CopyDone => "CopyDone",
            FrontendMessage::CopyFail(_) => "CopyFail",
            FrontendMessage::Terminate => "Terminate",
            FrontendMessage::Startup(_) => "Startup",
            FrontendMessage::Password(_) => "PasswordMessage",
            FrontendMessage::SaslInitialResponse(_) => "SASLInitialResponse",
            FrontendMessage::SaslResponse(_) => "SASLResponse",
        }
    }
}

impl From<Query> for FrontendMessage {
    fn from(query: Query) -> Self {
        FrontendMessage::Query(query)
    }
}

fn write_empty(buf: &mut Vec<u8>, tag: u8) -> Result<()> {
    buf.push(tag);
    buf.extend_from_slice(&4_i32.to_be_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::split_frame;

    fn frame_of(message: &FrontendMessage) -> (u8, Vec<u8>) {
        let bytes = message.to_bytes().unwrap();
        let (tag, payload, rest) = split_frame(&bytes).unwrap().unwrap();
        assert!(rest.is_empty());
        (tag, payload.to_vec())
    }

    #[test]
    fn length_counts_itself_and_payload() {
        let messages = [
            FrontendMessage::Query(Query::new("SELECT 1").unwrap()),
            FrontendMessage::CopyData(CopyData::new(&b"1\ta\n"[..])),
            FrontendMessage::CopyDone,
            FrontendMessage::CopyFail(CopyFail::new("stop").unwrap()),
            FrontendMessage::Terminate,
        ];
        for message in &messages {
            let bytes = message.to_bytes().unwrap();
            let len = i32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
            assert_eq!(len as usize, bytes.len() - 1, "{}", message.name());
        }
    }

    #[test]
    fn terminate_and_copy_done_are_header_only() {
        assert_eq!(&FrontendMessage::Terminate.to_bytes().unwrap()[..], &[b'X', 0, 0, 0, 4]);
        assert_eq!(&FrontendMessage::CopyDone.to_bytes().unwrap()[..], &[b'c', 0, 0, 0, 4]);
    }

    #[test]
    fn encoding_is_deterministic() {
        let message = FrontendMessage::Query(Query::new("SELECT now()").unwrap());
        assert_eq!(message.to_bytes().unwrap(), message.to_bytes().unwrap());
    }

    #[test]
    fn decode_recovers_tagged_messages() {
        let messages = [
            FrontendMessage::Query(Query::new("BEGIN").unwrap()),
            FrontendMessage::CopyData(CopyData::new(vec![0, 1, 2, 255])),
            FrontendMessage::CopyDone,
            FrontendMessage::CopyFail(CopyFail::new("cancelled").unwrap()),
            FrontendMessage::Terminate,
        ];
        for message in messages {
            let (tag, payload) = frame_of(&message);
            assert_eq!(FrontendMessage::decode(tag, &payload).unwrap(), message);
        }
    }

    #[test]
    fn decode_rejects_inconsistent_payloads() {
        assert!(matches!(
            FrontendMessage::decode(b'X', &[0]),
            Err(Error::ProtocolDecode(_))
        ));
        // query text without its terminator
        assert!(matches!(
            FrontendMessage::decode(b'Q', b"SELECT 1"),
            Err(Error::ProtocolDecode(_))
        ));
        // trailing garbage after the terminator
        assert!(matches!(
            FrontendMessage::decode(b'Q', b"SELECT 1\0x"),
            Err(Error::ProtocolDecode(_))
        ));
        assert!(matches!(
            FrontendMessage::decode(b'P', &[]),
            Err(Error::ProtocolDecode(_))
        ));
    }
}
