//! Simple query protocol messages.

use crate::error::{Error, Result};
use crate::protocol::codec::{MessageBuilder, expect_consumed, read_cstr};

/// Query message.
///
/// The query string may contain multiple SQL statements separated by semicolons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
}

impl Query {
    /// Create a Query message.
    ///
    /// The text is sent as a C string, so it must not contain a NUL byte.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.as_bytes().contains(&0) {
            return Err(Error::invalid_argument("query must not contain a NUL byte"));
        }
        Ok(Self { text })
    }

    /// The SQL text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mut msg = MessageBuilder::new(buf, super::msg_type::QUERY);
        msg.write_cstr(&self.text);
        msg.finish()
    }

    pub(crate) fn parse(payload: &[u8]) -> Result<Self> {
        let (text, rest) = read_cstr(payload)?;
        expect_consumed("Query", rest)?;
        Ok(Self {
            text: text.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query() {
        let mut buf = Vec::new();
        Query::new("SELECT 1").unwrap().write(&mut buf).unwrap();

        assert_eq!(buf[0], b'Q');

        // Length should be 4 (length field) + 9 (query + null terminator)
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(len, 13);

        // Query string should be "SELECT 1\0"
        assert_eq!(&buf[5..14], b"SELECT 1\0");
    }

    #[test]
    fn test_query_rejects_nul() {
        let err = Query::new("SELECT '\0'").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument: query must not contain a NUL byte"
        );
    }
}
