//! Connection startup and authentication state machine.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::backend::{Authentication, BackendKeyData, BackendMessage};
use crate::protocol::frontend::auth::{SCRAM_SHA_256, ScramClient, md5_password};
use crate::protocol::frontend::{
    FrontendMessage, PasswordMessage, SaslInitialResponse, SaslResponse, Startup,
};
use crate::protocol::types::TransactionStatus;

use super::action::Action;

/// Connection state during startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Initial,
    WaitingAuth,
    SaslInProgress,
    WaitingAuthResult,
    WaitingReady,
    Ready,
    Failed,
}

/// Connection startup state machine.
///
/// Drives the exchange from the startup message to the first `ReadyForQuery`.
pub struct ConnectionStateMachine {
    state: ConnectionState,
    options: Opts,
    backend_key: Option<BackendKeyData>,
    server_params: Vec<(String, String)>,
    transaction_status: TransactionStatus,
    scram_client: Option<ScramClient>,
}

impl ConnectionStateMachine {
    /// Create a new connection state machine.
    pub fn new(options: Opts) -> Self {
        Self {
            state: ConnectionState::Initial,
            options,
            backend_key: None,
            server_params: Vec::new(),
            transaction_status: TransactionStatus::Idle,
            scram_client: None,
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get the backend key data (for cancellation).
    pub fn backend_key(&self) -> Option<&BackendKeyData> {
        self.backend_key.as_ref()
    }

    /// Get server parameters reported during startup.
    pub fn server_params(&self) -> &[(String, String)] {
        &self.server_params
    }

    /// Get the transaction status from the final `ReadyForQuery`.
    pub fn transaction_status(&self) -> TransactionStatus {
        self.transaction_status
    }

    /// Start the connection process.
    pub fn start(&mut self) -> Action {
        self.state = ConnectionState::WaitingAuth;
        Action::WriteAndReadMessage(FrontendMessage::Startup(Startup::new(
            self.options.startup_params(),
        )))
    }

    /// Process a message from the server.
    pub fn step(&mut self, message: BackendMessage) -> Result<Action> {
        let result = self.dispatch(message);
        if result.is_err() {
            self.state = ConnectionState::Failed;
        }
        result
    }

    fn dispatch(&mut self, message: BackendMessage) -> Result<Action> {
        match message {
            BackendMessage::ErrorResponse(error) => return Err(error.into_error()),
            BackendMessage::NoticeResponse(notice) => {
                tracing::debug!(message = ?notice.fields.message, "notice during startup");
                return Ok(Action::ReadMessage);
            }
            BackendMessage::ParameterStatus(param) => {
                match self.server_params.iter_mut().find(|(n, _)| *n == param.name) {
                    Some(entry) => entry.1 = param.value,
                    None => self.server_params.push((param.name, param.value)),
                }
                return Ok(Action::ReadMessage);
            }
            BackendMessage::NegotiateProtocolVersion(negotiate) => {
                tracing::debug!(
                    newest_minor = negotiate.newest_minor_version,
                    "server negotiated protocol version"
                );
                return Ok(Action::ReadMessage);
            }
            _ => {}
        }

        match self.state {
            ConnectionState::WaitingAuth => self.handle_auth_message(message),
            ConnectionState::SaslInProgress => self.handle_sasl_message(message),
            ConnectionState::WaitingAuthResult => self.handle_auth_result(message),
            ConnectionState::WaitingReady => self.handle_ready_message(message),
            _ => Err(Error::ProtocolDecode(format!(
                "unexpected {} in state {:?}",
                message.name(),
                self.state
            ))),
        }
    }

    fn password(&self) -> Result<&str> {
        self.options
            .password
            .as_deref()
            .ok_or_else(|| Error::Auth("password required but not provided".into()))
    }

    fn handle_auth_message(&mut self, message: BackendMessage) -> Result<Action> {
        let auth = match message {
            BackendMessage::Authentication(auth) => auth,
            other => {
                return Err(Error::ProtocolDecode(format!(
                    "expected Authentication, got {}",
                    other.name()
                )));
            }
        };

        match auth {
            Authentication::Ok => {
                tracing::debug!("authenticated");
                self.state = ConnectionState::WaitingReady;
                Ok(Action::ReadMessage)
            }
            Authentication::CleartextPassword => {
                let password = self.password()?.to_owned();
                self.state = ConnectionState::WaitingAuthResult;
                Ok(Action::WriteAndReadMessage(FrontendMessage::Password(
                    PasswordMessage { password },
                )))
            }
            Authentication::Md5Password { salt } => {
                let password = md5_password(&self.options.user, self.password()?, &salt);
                self.state = ConnectionState::WaitingAuthResult;
                Ok(Action::WriteAndReadMessage(FrontendMessage::Password(
                    PasswordMessage { password },
                )))
            }
            Authentication::Sasl { mechanisms } => {
                if !mechanisms.iter().any(|m| m == SCRAM_SHA_256) {
                    return Err(Error::Auth(format!(
                        "no supported SASL mechanism, server offers {:?}",
                        mechanisms
                    )));
                }

                let scram = ScramClient::new(self.password()?);
                let client_first = scram.client_first_message();
                self.scram_client = Some(scram);
                self.state = ConnectionState::SaslInProgress;
                Ok(Action::WriteAndReadMessage(
                    FrontendMessage::SaslInitialResponse(SaslInitialResponse {
                        mechanism: SCRAM_SHA_256.into(),
                        data: Bytes::from(client_first),
                    }),
                ))
            }
            other => Err(Error::Unsupported(format!(
                "authentication method {:?}",
                other
            ))),
        }
    }

    fn handle_sasl_message(&mut self, message: BackendMessage) -> Result<Action> {
        let scram = self
            .scram_client
            .as_mut()
            .ok_or_else(|| Error::Auth("SCRAM exchange not started".into()))?;

        match message {
            BackendMessage::Authentication(Authentication::SaslContinue { data }) => {
                let server_first = simdutf8::compat::from_utf8(&data)
                    .map_err(|e| Error::Auth(format!("invalid server-first-message: {}", e)))?;
                let client_final = scram.process_server_first(server_first)?;
                Ok(Action::WriteAndReadMessage(FrontendMessage::SaslResponse(
                    SaslResponse {
                        data: Bytes::from(client_final),
                    },
                )))
            }
            BackendMessage::Authentication(Authentication::SaslFinal { data }) => {
                let server_final = simdutf8::compat::from_utf8(&data)
                    .map_err(|e| Error::Auth(format!("invalid server-final-message: {}", e)))?;
                scram.verify_server_final(server_final)?;
                self.state = ConnectionState::WaitingAuthResult;
                Ok(Action::ReadMessage)
            }
            other => Err(Error::ProtocolDecode(format!(
                "unexpected {} during SASL exchange",
                other.name()
            ))),
        }
    }

    fn handle_auth_result(&mut self, message: BackendMessage) -> Result<Action> {
        match message {
            BackendMessage::Authentication(Authentication::Ok) => {
                tracing::debug!("authenticated");
                self.state = ConnectionState::WaitingReady;
                Ok(Action::ReadMessage)
            }
            other => Err(Error::Auth(format!(
                "expected AuthenticationOk, got {}",
                other.name()
            ))),
        }
    }

    fn handle_ready_message(&mut self, message: BackendMessage) -> Result<Action> {
        match message {
            BackendMessage::BackendKeyData(key) => {
                self.backend_key = Some(key);
                Ok(Action::ReadMessage)
            }
            BackendMessage::ReadyForQuery(ready) => {
                self.transaction_status = ready.status;
                self.state = ConnectionState::Ready;
                Ok(Action::Finished)
            }
            other => Err(Error::ProtocolDecode(format!(
                "unexpected {} during startup",
                other.name()
            ))),
        }
    }
}
