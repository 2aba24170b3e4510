//! Authentication and session-status backend messages.

use bytes::Bytes;
use zerocopy::byteorder::big_endian::U32 as U32BE;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::error::{Error, Result};
use crate::protocol::codec::{expect_consumed, read_bytes, read_cstr, read_i32, read_u8, read_u32};
use crate::protocol::types::TransactionStatus;

/// Authentication method constants.
pub mod auth_type {
    pub const OK: i32 = 0;
    pub const KERBEROS_V5: i32 = 2;
    pub const CLEARTEXT_PASSWORD: i32 = 3;
    pub const MD5_PASSWORD: i32 = 5;
    pub const GSS: i32 = 7;
    pub const GSS_CONTINUE: i32 = 8;
    pub const SSPI: i32 = 9;
    pub const SASL: i32 = 10;
    pub const SASL_CONTINUE: i32 = 11;
    pub const SASL_FINAL: i32 = 12;
}

/// Authentication request or outcome from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// Authentication successful
    Ok,
    /// Kerberos V5 authentication required
    KerberosV5,
    /// Cleartext password required
    CleartextPassword,
    /// MD5 password required (with 4-byte salt)
    Md5Password { salt: [u8; 4] },
    /// GSS authentication
    Gss,
    /// GSS continue (with additional data)
    GssContinue { data: Bytes },
    /// SSPI authentication
    Sspi,
    /// SASL authentication required (with list of mechanisms)
    Sasl { mechanisms: Vec<String> },
    /// SASL continue (with server-first-message)
    SaslContinue { data: Bytes },
    /// SASL final (with server-final-message)
    SaslFinal { data: Bytes },
}

impl Authentication {
    /// Parse an Authentication message from payload bytes.
    pub fn parse(payload: &Bytes) -> Result<Self> {
        let (auth_type, rest) = read_i32(payload)?;

        let bare = |message: Authentication, rest: &[u8]| -> Result<Authentication> {
            expect_consumed("Authentication", rest)?;
            Ok(message)
        };

        match auth_type {
            auth_type::OK => bare(Authentication::Ok, rest),
            auth_type::KERBEROS_V5 => bare(Authentication::KerberosV5, rest),
            auth_type::CLEARTEXT_PASSWORD => bare(Authentication::CleartextPassword, rest),
            auth_type::MD5_PASSWORD => {
                let (salt_bytes, rest) = read_bytes(rest, 4)?;
                expect_consumed("AuthenticationMD5Password", rest)?;
                let mut salt = [0u8; 4];
                salt.copy_from_slice(salt_bytes);
                Ok(Authentication::Md5Password { salt })
            }
            auth_type::GSS => bare(Authentication::Gss, rest),
            auth_type::GSS_CONTINUE => Ok(Authentication::GssContinue {
                data: payload.slice_ref(rest),
            }),
            auth_type::SSPI => bare(Authentication::Sspi, rest),
            auth_type::SASL => {
                let mut mechanisms = Vec::new();
                let mut data = rest;
                loop {
                    if let Some(remaining) = data.strip_prefix(&[0]) {
                        expect_consumed("AuthenticationSASL", remaining)?;
                        break;
                    }
                    let (mechanism, remaining) = read_cstr(data)?;
                    mechanisms.push(mechanism.to_owned());
                    data = remaining;
                }
                Ok(Authentication::Sasl { mechanisms })
            }
            auth_type::SASL_CONTINUE => Ok(Authentication::SaslContinue {
                data: payload.slice_ref(rest),
            }),
            auth_type::SASL_FINAL => Ok(Authentication::SaslFinal {
                data: payload.slice_ref(rest),
            }),
            _ => Err(Error::ProtocolDecode(format!(
                "unknown authentication type: {}",
                auth_type
            ))),
        }
    }
}

#[derive(FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
struct BackendKeyDataWire {
    pid: U32BE,
    secret_key: U32BE,
}

/// BackendKeyData message - process ID and secret key for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendKeyData {
    /// Process ID of the backend
    pub process_id: u32,
    /// Secret key for cancellation
    pub secret_key: u32,
}

impl BackendKeyData {
    /// Parse a BackendKeyData message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let wire = BackendKeyDataWire::read_from_bytes(payload).map_err(|_| {
            Error::ProtocolDecode(format!("BackendKeyData: expected 8 bytes, got {}", payload.len()))
        })?;
        Ok(Self {
            process_id: wire.pid.get(),
            secret_key: wire.secret_key.get(),
        })
    }
}

/// ParameterStatus message - server parameter name and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterStatus {
    /// Parameter name
    pub name: String,
    /// Parameter value
    pub value: String,
}

impl ParameterStatus {
    /// Parse a ParameterStatus message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (name, rest) = read_cstr(payload)?;
        let (value, rest) = read_cstr(rest)?;
        expect_consumed("ParameterStatus", rest)?;
        Ok(Self {
            name: name.to_owned(),
            value: value.to_owned(),
        })
    }
}

/// ReadyForQuery message - the server is idle and waiting for a new request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyForQuery {
    /// Transaction status after the previous request
    pub status: TransactionStatus,
}

impl ReadyForQuery {
    /// Parse a ReadyForQuery message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (byte, rest) = read_u8(payload)?;
        expect_consumed("ReadyForQuery", rest)?;
        let status = TransactionStatus::from_byte(byte).ok_or_else(|| {
            Error::ProtocolDecode(format!("ReadyForQuery: unknown status '{}'", byte as char))
        })?;
        Ok(Self { status })
    }
}

/// NotificationResponse message - asynchronous notification from LISTEN/NOTIFY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResponse {
    /// PID of the notifying backend
    pub pid: u32,
    /// Channel name
    pub channel: String,
    /// Notification payload
    pub payload: String,
}

impl NotificationResponse {
    /// Parse a NotificationResponse message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (pid, rest) = read_u32(payload)?;
        let (channel, rest) = read_cstr(rest)?;
        let (payload_str, rest) = read_cstr(rest)?;
        expect_consumed("NotificationResponse", rest)?;
        Ok(Self {
            pid,
            channel: channel.to_owned(),
            payload: payload_str.to_owned(),
        })
    }
}

/// NegotiateProtocolVersion message - server doesn't support requested protocol features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiateProtocolVersion {
    /// Newest minor protocol version supported
    pub newest_minor_version: u32,
    /// Unrecognized protocol options
    pub unrecognized_options: Vec<String>,
}

impl NegotiateProtocolVersion {
    /// Parse a NegotiateProtocolVersion message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (newest_minor_version, rest) = read_u32(payload)?;
        let (num_options, mut rest) = read_u32(rest)?;

        let mut unrecognized_options = Vec::new();
        for _ in 0..num_options {
            let (option, remaining) = read_cstr(rest)?;
            unrecognized_options.push(option.to_owned());
            rest = remaining;
        }
        expect_consumed("NegotiateProtocolVersion", rest)?;

        Ok(Self {
            newest_minor_version,
            unrecognized_options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_payload(kind: i32, rest: &[u8]) -> Bytes {
        let mut buf = kind.to_be_bytes().to_vec();
        buf.extend_from_slice(rest);
        Bytes::from(buf)
    }

    #[test]
    fn parses_sasl_mechanisms() {
        let payload = auth_payload(auth_type::SASL, b"SCRAM-SHA-256\0SCRAM-SHA-256-PLUS\0\0");
        assert_eq!(
            Authentication::parse(&payload).unwrap(),
            Authentication::Sasl {
                mechanisms: vec!["SCRAM-SHA-256".into(), "SCRAM-SHA-256-PLUS".into()]
            }
        );
    }

    #[test]
    fn sasl_list_requires_terminator() {
        let payload = auth_payload(auth_type::SASL, b"SCRAM-SHA-256\0");
        assert!(matches!(
            Authentication::parse(&payload),
            Err(Error::ProtocolDecode(_))
        ));
    }

    #[test]
    fn md5_salt_must_be_exact() {
        let payload = auth_payload(auth_type::MD5_PASSWORD, &[1, 2, 3, 4]);
        assert_eq!(
            Authentication::parse(&payload).unwrap(),
            Authentication::Md5Password { salt: [1, 2, 3, 4] }
        );

        let short = auth_payload(auth_type::MD5_PASSWORD, &[1, 2, 3]);
        assert!(Authentication::parse(&short).is_err());
        let long = auth_payload(auth_type::MD5_PASSWORD, &[1, 2, 3, 4, 5]);
        assert!(Authentication::parse(&long).is_err());
    }

    #[test]
    fn auth_ok_rejects_trailing_bytes() {
        assert_eq!(
            Authentication::parse(&auth_payload(auth_type::OK, &[])).unwrap(),
            Authentication::Ok
        );
        assert!(Authentication::parse(&auth_payload(auth_type::OK, &[0])).is_err());
        assert!(Authentication::parse(&auth_payload(99, &[])).is_err());
    }

    #[test]
    fn backend_key_data() {
        let mut payload = 42_u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&7_u32.to_be_bytes());
        let key = BackendKeyData::parse(&payload).unwrap();
        assert_eq!(key.process_id, 42);
        assert_eq!(key.secret_key, 7);
        assert!(BackendKeyData::parse(&payload[..7]).is_err());
    }

    #[test]
    fn ready_for_query_status() {
        assert_eq!(
            ReadyForQuery::parse(b"T").unwrap().status,
            TransactionStatus::InTransaction
        );
        assert!(ReadyForQuery::parse(b"Q").is_err());
        assert!(ReadyForQuery::parse(b"II").is_err());
    }

    #[test]
    fn parameter_status() {
        let status = ParameterStatus::parse(b"server_version\x0016.2\0").unwrap();
        assert_eq!(status.name, "server_version");
        assert_eq!(status.value, "16.2");
    }
}
