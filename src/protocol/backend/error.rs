//! Error and notice response messages.

use crate::error::{Error, ErrorFields, Result};
use crate::protocol::codec::{expect_consumed, read_cstr};

/// Error field type codes from PostgreSQL protocol.
pub mod field_type {
    /// Severity (localized)
    pub const SEVERITY: u8 = b'S';
    /// Severity (non-localized, PostgreSQL 9.6+)
    pub const SEVERITY_NON_LOCALIZED: u8 = b'V';
    /// SQLSTATE code
    pub const CODE: u8 = b'C';
    /// Message
    pub const MESSAGE: u8 = b'M';
    /// Detail
    pub const DETAIL: u8 = b'D';
    /// Hint
    pub const HINT: u8 = b'H';
    /// Position in query
    pub const POSITION: u8 = b'P';
    /// Internal position
    pub const INTERNAL_POSITION: u8 = b'p';
    /// Internal query
    pub const INTERNAL_QUERY: u8 = b'q';
    /// Where (context)
    pub const WHERE: u8 = b'W';
    /// Schema name
    pub const SCHEMA: u8 = b's';
    /// Table name
    pub const TABLE: u8 = b't';
    /// Column name
    pub const COLUMN: u8 = b'c';
    /// Data type name
    pub const DATA_TYPE: u8 = b'd';
    /// Constraint name
    pub const CONSTRAINT: u8 = b'n';
    /// File name
    pub const FILE: u8 = b'F';
    /// Line number
    pub const LINE: u8 = b'L';
    /// Routine name
    pub const ROUTINE: u8 = b'R';
}

/// Parse `(code, cstring)*` fields up to the terminating zero byte.
fn parse_fields(message: &str, payload: &[u8]) -> Result<ErrorFields> {
    let mut fields = ErrorFields::default();
    let mut data = payload;

    loop {
        let Some((&code, rest)) = data.split_first() else {
            return Err(Error::ProtocolDecode(format!(
                "{}: missing field terminator",
                message
            )));
        };
        if code == 0 {
            expect_consumed(message, rest)?;
            return Ok(fields);
        }

        let (value, rest) = read_cstr(rest)?;
        data = rest;

        let value = value.to_string();
        match code {
            field_type::SEVERITY => fields.severity = Some(value),
            field_type::SEVERITY_NON_LOCALIZED => fields.severity_non_localized = Some(value),
            field_type::CODE => fields.code = Some(value),
            field_type::MESSAGE => fields.message = Some(value),
            field_type::DETAIL => fields.detail = Some(value),
            field_type::HINT => fields.hint = Some(value),
            field_type::POSITION => fields.position = value.parse().ok(),
            field_type::INTERNAL_POSITION => fields.internal_position = value.parse().ok(),
            field_type::INTERNAL_QUERY => fields.internal_query = Some(value),
            field_type::WHERE => fields.where_ = Some(value),
            field_type::SCHEMA => fields.schema = Some(value),
            field_type::TABLE => fields.table = Some(value),
            field_type::COLUMN => fields.column = Some(value),
            field_type::DATA_TYPE => fields.data_type = Some(value),
            field_type::CONSTRAINT => fields.constraint = Some(value),
            field_type::FILE => fields.file = Some(value),
            field_type::LINE => fields.line = value.parse().ok(),
            field_type::ROUTINE => fields.routine = Some(value),
            _ => {
                tracing::debug!("Unknown error field type: {}", code as char);
            }
        }
    }
}

/// ErrorResponse message - the current request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Parsed error fields
    pub fields: ErrorFields,
}

impl ErrorResponse {
    /// Parse an ErrorResponse message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Ok(Self {
            fields: parse_fields("ErrorResponse", payload)?,
        })
    }

    /// Convert to an Error.
    pub fn into_error(self) -> Error {
        Error::Server(self.fields)
    }

    /// Get the SQLSTATE code.
    pub fn code(&self) -> Option<&str> {
        self.fields.code.as_deref()
    }

    /// Get the primary message.
    pub fn message(&self) -> Option<&str> {
        self.fields.message.as_deref()
    }

    /// FATAL and PANIC errors end the session; the server closes the connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.fields
                .severity_non_localized
                .as_deref()
                .or(self.fields.severity.as_deref()),
            Some("FATAL") | Some("PANIC")
        )
    }
}

/// NoticeResponse message - non-fatal warning/info from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeResponse {
    /// Parsed notice fields
    pub fields: ErrorFields,
}

impl NoticeResponse {
    /// Parse a NoticeResponse message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Ok(Self {
            fields: parse_fields("NoticeResponse", payload)?,
        })
    }

    /// Get the severity.
    pub fn severity(&self) -> Option<&str> {
        self.fields
            .severity_non_localized
            .as_deref()
            .or(self.fields.severity.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_error_fields() {
        let payload = b"SERROR\0VERROR\0C42P01\0Mrelation \"t\" does not exist\0P15\0Zignored\0\0";
        let error = ErrorResponse::parse(payload).unwrap();
        assert_eq!(error.code(), Some("42P01"));
        assert_eq!(error.message(), Some("relation \"t\" does not exist"));
        assert_eq!(error.fields.position, Some(15));
        assert_eq!(error.fields.severity_non_localized.as_deref(), Some("ERROR"));
    }

    #[test]
    fn requires_terminator_and_nothing_after() {
        assert!(matches!(
            ErrorResponse::parse(b"SERROR\0"),
            Err(Error::ProtocolDecode(_))
        ));
        assert!(matches!(
            ErrorResponse::parse(b"SERROR\0\0x"),
            Err(Error::ProtocolDecode(_))
        ));
        assert!(ErrorResponse::parse(b"\0").is_ok());
    }

    #[test]
    fn notice_severity_prefers_non_localized() {
        let notice = NoticeResponse::parse(b"SAVISO\0VWARNING\0Mhi\0\0").unwrap();
        assert_eq!(notice.severity(), Some("WARNING"));
    }
}
