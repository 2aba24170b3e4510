//! PostgreSQL backend (server → client) messages.

pub mod auth;
pub mod copy;
pub mod error;
pub mod extended;
pub mod query;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::codec::expect_consumed;

pub use auth::{
    Authentication, BackendKeyData, NegotiateProtocolVersion, NotificationResponse,
    ParameterStatus, ReadyForQuery,
};
pub use copy::CopyResponse;
pub use error::{ErrorResponse, NoticeResponse};
pub use extended::{FunctionCallResponse, ParameterDescription};
pub use query::{CommandComplete, DataRow, FieldDescription, RowDescription};

/// Backend message type bytes.
pub mod msg_type {
    /// Authentication message
    pub const AUTHENTICATION: u8 = b'R';
    /// BackendKeyData
    pub const BACKEND_KEY_DATA: u8 = b'K';
    /// ParameterStatus
    pub const PARAMETER_STATUS: u8 = b'S';
    /// ReadyForQuery
    pub const READY_FOR_QUERY: u8 = b'Z';
    /// RowDescription
    pub const ROW_DESCRIPTION: u8 = b'T';
    /// DataRow
    pub const DATA_ROW: u8 = b'D';
    /// CommandComplete
    pub const COMMAND_COMPLETE: u8 = b'C';
    /// EmptyQueryResponse
    pub const EMPTY_QUERY_RESPONSE: u8 = b'I';
    /// ErrorResponse
    pub const ERROR_RESPONSE: u8 = b'E';
    /// NoticeResponse
    pub const NOTICE_RESPONSE: u8 = b'N';
    /// NotificationResponse
    pub const NOTIFICATION_RESPONSE: u8 = b'A';
    /// ParseComplete
    pub const PARSE_COMPLETE: u8 = b'1';
    /// BindComplete
    pub const BIND_COMPLETE: u8 = b'2';
    /// CloseComplete
    pub const CLOSE_COMPLETE: u8 = b'3';
    /// ParameterDescription
    pub const PARAMETER_DESCRIPTION: u8 = b't';
    /// NoData
    pub const NO_DATA: u8 = b'n';
    /// PortalSuspended
    pub const PORTAL_SUSPENDED: u8 = b's';
    /// CopyInResponse
    pub const COPY_IN_RESPONSE: u8 = b'G';
    /// CopyOutResponse
    pub const COPY_OUT_RESPONSE: u8 = b'H';
    /// CopyBothResponse
    pub const COPY_BOTH_RESPONSE: u8 = b'W';
    /// CopyData
    pub const COPY_DATA: u8 = b'd';
    /// CopyDone
    pub const COPY_DONE: u8 = b'c';
    /// FunctionCallResponse
    pub const FUNCTION_CALL_RESPONSE: u8 = b'V';
    /// NegotiateProtocolVersion
    pub const NEGOTIATE_PROTOCOL_VERSION: u8 = b'v';
}

/// A message sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMessage {
    Authentication(Authentication),
    BackendKeyData(BackendKeyData),
    BindComplete,
    CloseComplete,
    CommandComplete(CommandComplete),
    CopyBothResponse(CopyResponse),
    CopyData(Bytes),
    CopyDone,
    CopyInResponse(CopyResponse),
    CopyOutResponse(CopyResponse),
    DataRow(DataRow),
    EmptyQueryResponse,
    ErrorResponse(ErrorResponse),
    FunctionCallResponse(FunctionCallResponse),
    NegotiateProtocolVersion(NegotiateProtocolVersion),
    NoData,
    NoticeResponse(NoticeResponse),
    NotificationResponse(NotificationResponse),
    ParameterDescription(ParameterDescription),
    ParameterStatus(ParameterStatus),
    ParseComplete,
    PortalSuspended,
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription),
}

impl BackendMessage {
    /// Decode a backend message from its type byte and payload.
    ///
    /// Every payload must be consumed exactly; unknown tags and length
    /// mismatches are [`Error::ProtocolDecode`].
    pub fn decode(tag: u8, payload: Bytes) -> Result<Self> {
        let empty = |name: &str, message: BackendMessage| -> Result<BackendMessage> {
            expect_consumed(name, &payload)?;
            Ok(message)
        };

        Ok(match tag {
            msg_type::AUTHENTICATION => {
                BackendMessage::Authentication(Authentication::parse(&payload)?)
            }
            msg_type::BACKEND_KEY_DATA => {
                BackendMessage::BackendKeyData(BackendKeyData::parse(&payload)?)
            }
            msg_type::BIND_COMPLETE => empty("BindComplete", BackendMessage::BindComplete)?,
            msg_type::CLOSE_COMPLETE => empty("CloseComplete", BackendMessage::CloseComplete)?,
            msg_type::COMMAND_COMPLETE => {
                BackendMessage::CommandComplete(CommandComplete::parse(&payload)?)
            }
            msg_type::COPY_BOTH_RESPONSE => {
                BackendMessage::CopyBothResponse(CopyResponse::parse(&payload)?)
            }
            msg_type::COPY_DATA => BackendMessage::CopyData(payload.clone()),
            msg_type::COPY_DONE => empty("CopyDone", BackendMessage::CopyDone)?,
            msg_type::COPY_IN_RESPONSE => {
                BackendMessage::CopyInResponse(CopyResponse::parse(&payload)?)
            }
            msg_type::COPY_OUT_RESPONSE => {
                BackendMessage::CopyOutResponse(CopyResponse::parse(&payload)?)
            }
            msg_type::DATA_ROW => BackendMessage::DataRow(DataRow::parse(&payload)?),
            msg_type::EMPTY_QUERY_RESPONSE => {
                empty("EmptyQueryResponse", BackendMessage::EmptyQueryResponse)?
            }
            msg_type::ERROR_RESPONSE => {
                BackendMessage::ErrorResponse(ErrorResponse::parse(&payload)?)
            }
            msg_type::FUNCTION_CALL_RESPONSE => {
                BackendMessage::FunctionCallResponse(FunctionCallResponse::parse(&payload)?)
            }
            msg_type::NEGOTIATE_PROTOCOL_VERSION => {
                BackendMessage::NegotiateProtocolVersion(NegotiateProtocolVersion::parse(&payload)?)
            }
            msg_type::NO_DATA => empty("NoData", BackendMessage::NoData)?,
            msg_type::NOTICE_RESPONSE => {
                BackendMessage::NoticeResponse(NoticeResponse::parse(&payload)?)
            }
            msg_type::NOTIFICATION_RESPONSE => {
                BackendMessage::NotificationResponse(NotificationResponse::parse(&payload)?)
            }
            msg_type::PARAMETER_DESCRIPTION => {
                BackendMessage::ParameterDescription(ParameterDescription::parse(&payload)?)
            }
            msg_type::PARAMETER_STATUS => {
                BackendMessage::ParameterStatus(ParameterStatus::parse(&payload)?)
            }
            msg_type::PARSE_COMPLETE => empty("ParseComplete", BackendMessage::ParseComplete)?,
            msg_type::PORTAL_SUSPENDED => {
                empty("PortalSuspended", BackendMessage::PortalSuspended)?
            }
            msg_type::READY_FOR_QUERY => {
                BackendMessage::ReadyForQuery(ReadyForQuery::parse(&payload)?)
            }
            msg_type::ROW_DESCRIPTION => {
                BackendMessage::RowDescription(RowDescription::parse(&payload)?)
            }
            _ => {
                return Err(Error::ProtocolDecode(format!(
                    "unknown backend message type: '{}'",
                    tag as char
                )));
            }
        })
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BackendMessage::Authentication(_) => "Authentication",
            BackendMessage::BackendKeyData(_) => "BackendKeyData",
            BackendMessage::BindComplete => "BindComplete",
            BackendMessage::CloseComplete => "CloseComplete",
            BackendMessage::CommandComplete(_) => "CommandComplete",
            BackendMessage::CopyBothResponse(_) => "CopyBothResponse",
            BackendMessage::CopyData(_) => "CopyData",
            BackendMessage::CopyDone => "CopyDone",
            BackendMessage::CopyInResponse(_) => "CopyInResponse",
            BackendMessage::CopyOutResponse(_) => "CopyOutResponse",
            BackendMessage::DataRow(_) => "DataRow",
            BackendMessage::EmptyQueryResponse => "EmptyQueryResponse",
            BackendMessage::ErrorResponse(_) => "ErrorResponse",
            BackendMessage::FunctionCallResponse(_) => "FunctionCallResponse",
            BackendMessage::NegotiateProtocolVersion(_) => "NegotiateProtocolVersion",
            BackendMessage::NoData => "NoData",
            BackendMessage::NoticeResponse(_) => "NoticeResponse",
            BackendMessage::NotificationResponse(_) => "NotificationResponse",
            BackendMessage::ParameterDescription(_) => "ParameterDescription",
            BackendMessage::ParameterStatus(_) => "ParameterStatus",
            BackendMessage::ParseComplete => "ParseComplete",
            BackendMessage::PortalSuspended => "PortalSuspended",
            BackendMessage::ReadyForQuery(_) => "ReadyForQuery",
            BackendMessage::RowDescription(_) => "RowDescription",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{Format, TransactionStatus};

    fn decode(tag: u8, payload: &'static [u8]) -> Result<BackendMessage> {
        BackendMessage::decode(tag, Bytes::from_static(payload))
    }

    #[test]
    fn decodes_by_tag() {
        assert_eq!(
            decode(b'Z', b"I").unwrap(),
            BackendMessage::ReadyForQuery(ReadyForQuery {
                status: TransactionStatus::Idle
            })
        );
        assert_eq!(
            decode(b'C', b"SELECT 1\0").unwrap(),
            BackendMessage::CommandComplete(CommandComplete::new("SELECT 1"))
        );
        assert_eq!(
            decode(b'G', &[0, 0, 1, 0, 0]).unwrap(),
            BackendMessage::CopyInResponse(CopyResponse {
                overall_format: Format::Text,
                column_formats: vec![Format::Text],
            })
        );
        assert_eq!(
            decode(b'd', b"1\tx\n").unwrap(),
            BackendMessage::CopyData(Bytes::from_static(b"1\tx\n"))
        );
        assert_eq!(decode(b'c', b"").unwrap(), BackendMessage::CopyDone);
        assert_eq!(decode(b'I', b"").unwrap(), BackendMessage::EmptyQueryResponse);
    }

    #[test]
    fn decodes_copy_out_and_copy_both() {
        assert_eq!(
            decode(b'H', &[1, 0, 2, 0, 1, 0, 1]).unwrap(),
            BackendMessage::CopyOutResponse(CopyResponse {
                overall_format: Format::Binary,
                column_formats: vec![Format::Binary, Format::Binary],
            })
        );
        assert_eq!(
            decode(b'W', &[0, 0, 0]).unwrap(),
            BackendMessage::CopyBothResponse(CopyResponse {
                overall_format: Format::Text,
                column_formats: vec![],
            })
        );
        assert!(matches!(decode(b'H', &[2, 0, 0]), Err(Error::ProtocolDecode(_))));
    }

    #[test]
    fn decodes_error_and_notice() {
        let message = decode(b'E', b"SERROR\0VERROR\0C42P01\0Mno such table\0\0").unwrap();
        let BackendMessage::ErrorResponse(error) = message else {
            panic!("expected ErrorResponse, got {:?}", message);
        };
        assert_eq!(error.fields.code.as_deref(), Some("42P01"));
        assert_eq!(error.fields.message.as_deref(), Some("no such table"));
        assert!(!error.is_fatal());

        let message = decode(b'N', b"SWARNING\0C01000\0Mcareful\0\0").unwrap();
        let BackendMessage::NoticeResponse(notice) = message else {
            panic!("expected NoticeResponse, got {:?}", message);
        };
        assert_eq!(notice.fields.severity.as_deref(), Some("WARNING"));
        assert_eq!(notice.fields.message.as_deref(), Some("careful"));

        // fields must end with a zero byte
        assert!(matches!(decode(b'E', b"SERROR\0"), Err(Error::ProtocolDecode(_))));
    }

    #[test]
    fn unknown_tag_is_protocol_error() {
        let err = decode(b'?', b"").unwrap_err();
        assert!(matches!(err, Error::ProtocolDecode(_)));
        assert!(err.is_connection_broken());
    }

    #[test]
    fn empty_messages_reject_payload() {
        for tag in [b'1', b'2', b'3', b'n', b's', b'c', b'I'] {
            assert!(
                matches!(decode(tag, b"x"), Err(Error::ProtocolDecode(_))),
                "tag {}",
                tag as char
            );
        }
    }

    #[test]
    fn names_for_logging() {
        let status = decode(b'S', b"TimeZone\0UTC\0").unwrap();
        assert_eq!(status.name(), "ParameterStatus");
        assert_eq!(decode(b'c', b"").unwrap().name(), "CopyDone");
    }
}
