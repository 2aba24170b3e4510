//! Startup message.

use crate::error::Result;
use crate::protocol::codec::MessageBuilder;

/// Protocol version 3.0 (0x00030000)
pub const PROTOCOL_VERSION_3_0: i32 = 196608;

/// StartupMessage - the first message on a connection. It has no type byte.
///
/// Parameters are (name, value) pairs.
/// Required: "user" - database username
/// Optional: "database", "options", "application_name", "client_encoding", etc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Startup {
    /// Protocol version requested
    pub version: i32,
    /// Startup parameters, in order
    pub params: Vec<(String, String)>,
}

impl Startup {
    /// Create a protocol 3.0 startup message.
    pub fn new(params: Vec<(String, String)>) -> Self {
        Self {
            version: PROTOCOL_VERSION_3_0,
            params,
        }
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mut msg = MessageBuilder::new_startup(buf);
        msg.write_i32(self.version);

        for (name, value) in &self.params {
            msg.write_cstr(name);
            msg.write_cstr(value);
        }

        // Terminator
        msg.write_u8(0);
        msg.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup() {
        let mut buf = Vec::new();
        Startup::new(vec![
            ("user".into(), "postgres".into()),
            ("database".into(), "test".into()),
        ])
        .write(&mut buf).unwrap();

        // Check length is at start
        let len = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        assert_eq!(len as usize, buf.len());

        // Check protocol version
        let version = i32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        assert_eq!(version, PROTOCOL_VERSION_3_0);

        assert_eq!(&buf[8..], b"user\0postgres\0database\0test\0\0");
    }
}
