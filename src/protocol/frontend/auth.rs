//! Authentication messages and password hashing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::protocol::codec::MessageBuilder;

/// SASL mechanism name for SCRAM-SHA-256.
pub const SCRAM_SHA_256: &str = "SCRAM-SHA-256";

/// PasswordMessage (cleartext or MD5 hashed password).
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordMessage {
    /// Password or `md5...` hash
    pub password: String,
}

impl PasswordMessage {
    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mut msg = MessageBuilder::new(buf, super::msg_type::PASSWORD);
        msg.write_cstr(&self.password);
        msg.finish()
    }
}

impl std::fmt::Debug for PasswordMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordMessage").finish_non_exhaustive()
    }
}

/// SASLInitialResponse message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslInitialResponse {
    /// SASL mechanism name (e.g., "SCRAM-SHA-256")
    pub mechanism: String,
    /// Client-first-message for SCRAM
    pub data: Bytes,
}

impl SaslInitialResponse {
    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mut msg = MessageBuilder::new(buf, super::msg_type::PASSWORD);
        msg.write_cstr(&self.mechanism);
        msg.write_i32(self.data.len() as i32);
        msg.write_bytes(&self.data);
        msg.finish()
    }
}

/// SASLResponse message (client-final-message for SCRAM).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslResponse {
    /// Mechanism-specific payload
    pub data: Bytes,
}

impl SaslResponse {
    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mut msg = MessageBuilder::new(buf, super::msg_type::PASSWORD);
        msg.write_bytes(&self.data);
        msg.finish()
    }
}

/// Compute MD5 password hash.
///
/// PostgreSQL MD5 password format: "md5" + md5(md5(password + username) + salt)
pub fn md5_password(username: &str, password: &str, salt: &[u8; 4]) -> String {
    use md5::Md5;

    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(username.as_bytes());
    let inner = format!("{:x}", hasher.finalize());

    let mut hasher = Md5::new();
    hasher.update(inner.as_bytes());
    hasher.update(salt);
    format!("md5{:x}", hasher.finalize())
}

type HmacSha256 = Hmac<Sha256>;

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| Error::Auth(format!("HMAC error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// SCRAM-SHA-256 client (RFC 5802 / RFC 7677) without channel binding.
pub struct ScramClient {
    username: String,
    password: String,
    nonce: String,
    auth_message: Option<String>,
    salted_password: Option<Vec<u8>>,
}

impl ScramClient {
    /// Create a client with a random 24-byte nonce.
    ///
    /// The username is left empty: PostgreSQL takes it from the startup message.
    pub fn new(password: &str) -> Self {
        use rand::Rng;

        let mut nonce_bytes = [0u8; 24];
        rand::rng().fill(&mut nonce_bytes);
        Self::with_nonce("", password, &BASE64.encode(nonce_bytes))
    }

    /// Create a client with a caller-chosen nonce.
    pub fn with_nonce(username: &str, password: &str, nonce: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            nonce: nonce.to_string(),
            auth_message: None,
            salted_password: None,
        }
    }

    fn client_first_bare(&self) -> String {
        format!("n={},r={}", self.username, self.nonce)
    }

    /// The client-first-message, with the `n,,` GS2 header.
    pub fn client_first_message(&self) -> String {
        format!("n,,{}", self.client_first_bare())
    }

    /// Process server-first-message and produce client-final-message.
    pub fn process_server_first(&mut self, server_first: &str) -> Result<String> {
        let mut combined_nonce = None;
        let mut salt = None;
        let mut iterations = None;

        for part in server_first.split(',') {
            if let Some(value) = part.strip_prefix("r=") {
                combined_nonce = Some(value);
            } else if let Some(value) = part.strip_prefix("s=") {
                salt = Some(value);
            } else if let Some(value) = part.strip_prefix("i=") {
                iterations = value.parse::<u32>().ok();
            }
        }

        let missing = |what: &str| Error::Auth(format!("missing {} in server-first-message", what));
        let combined_nonce = combined_nonce.ok_or_else(|| missing("nonce"))?;
        let salt = salt.ok_or_else(|| missing("salt"))?;
        let iterations = iterations.ok_or_else(|| missing("iteration count"))?;

        if !combined_nonce.starts_with(&self.nonce) {
            return Err(Error::Auth(
                "server nonce does not extend the client nonce".into(),
            ));
        }

        let salt = BASE64
            .decode(salt)
            .map_err(|e| Error::Auth(format!("invalid salt: {}", e)))?;

        let mut salted_password = vec![0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            self.password.as_bytes(),
            &salt,
            iterations,
            &mut salted_password,
        );

        let client_key = hmac(&salted_password, b"Client Key")?;
        let stored_key = Sha256::digest(&client_key);

        // base64("n,,") is always "biws"
        let without_proof = format!("c={},r={}", BASE64.encode(b"n,,"), combined_nonce);
        let auth_message = format!(
            "{},{},{}",
            self.client_first_bare(),
            server_first,
            without_proof
        );

        let client_signature = hmac(&stored_key, auth_message.as_bytes())?;
        let proof: Vec<u8> = client_key
            .iter()
            .zip(client_signature.iter())
            .map(|(k, s)| k ^ s)
            .collect();

        self.salted_password = Some(salted_password);
        self.auth_message = Some(auth_message);

        Ok(format!("{},p={}", without_proof, BASE64.encode(proof)))
    }

    /// Verify server-final-message against the expected server signature.
    pub fn verify_server_final(&self, server_final: &str) -> Result<()> {
        if let Some(err) = server_final.strip_prefix("e=") {
            return Err(Error::Auth(format!("server rejected SCRAM exchange: {}", err)));
        }
        let signature = server_final
            .strip_prefix("v=")
            .ok_or_else(|| Error::Auth("invalid server-final-message".into()))?;
        let signature = BASE64
            .decode(signature)
            .map_err(|e| Error::Auth(format!("invalid server signature: {}", e)))?;

        let (salted_password, auth_message) =
            match (&self.salted_password, &self.auth_message) {
                (Some(salted), Some(message)) => (salted, message),
                _ => {
                    return Err(Error::Auth(
                        "server-final-message before server-first-message".into(),
                    ));
                }
            };

        let server_key = hmac(salted_password, b"Server Key")?;
        let expected = hmac(&server_key, auth_message.as_bytes())?;

        if signature != expected {
            return Err(Error::Auth("server signature verification failed".into()));
        }
        Ok(())
    }
}
