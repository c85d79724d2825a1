//! URL-safe timed token signing, used for the session cookie.
//!
//! Tokens have the form `payload.timestamp.signature`, each part
//! base64url without padding. The signing key is derived from the
//! secret and a salt so different subsystems sharing one secret cannot
//! forge each other's tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    /// The token is malformed or its signature does not verify.
    #[error("bad signature")]
    BadSignature,

    /// The signature verified but the token is too old.
    #[error("signature expired: token is {age}s old, max age is {max_age}s")]
    SignatureExpired { age: i64, max_age: i64 },

    /// The signature verified but the payload is not valid JSON.
    #[error("malformed token payload: {0}")]
    BadPayload(String),
}

/// Signs and verifies timestamped JSON tokens.
pub struct TimedSerializer {
    derived_key: Vec<u8>,
}

impl TimedSerializer {
    /// Derive the signing key from the secret and salt.
    #[must_use]
    pub fn new(secret_key: &str, salt: &str) -> Self {
        let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
            .expect("hmac accepts keys of any length");
        mac.update(salt.as_bytes());
        Self {
            derived_key: mac.finalize().into_bytes().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.derived_key).expect("hmac accepts keys of any length")
    }

    /// Serialize and sign a JSON value with the current timestamp.
    #[must_use]
    pub fn dumps(&self, value: &Value) -> String {
        self.dumps_at(value, Utc::now().timestamp())
    }

    fn dumps_at(&self, value: &Value, timestamp: i64) -> String {
        let payload = URL_SAFE_NO_PAD.encode(value.to_string());
        let timestamp = URL_SAFE_NO_PAD.encode(encode_int(timestamp));
        let message = format!("{payload}.{timestamp}");

        let mut mac = self.mac();
        mac.update(message.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{message}.{signature}")
    }

    /// Verify a token and deserialize its payload, rejecting tokens
    /// older than `max_age` seconds.
    pub fn loads(&self, token: &str, max_age: i64) -> Result<Value, SigningError> {
        let (message, signature) = token.rsplit_once('.').ok_or(SigningError::BadSignature)?;
        let provided = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SigningError::BadSignature)?;

        // Constant-time comparison via the mac itself.
        let mut mac = self.mac();
        mac.update(message.as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| SigningError::BadSignature)?;

        let (payload, timestamp) = message.rsplit_once('.').ok_or(SigningError::BadSignature)?;
        let timestamp_bytes = URL_SAFE_NO_PAD
            .decode(timestamp)
            .map_err(|_| SigningError::BadSignature)?;
        let issued = decode_int(&timestamp_bytes).ok_or(SigningError::BadSignature)?;

        let age = Utc::now().timestamp() - issued;
        if age > max_age {
            return Err(SigningError::SignatureExpired { age, max_age });
        }

        let raw = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SigningError::BadSignature)?;
        serde_json::from_slice(&raw).map_err(|err| SigningError::BadPayload(err.to_string()))
    }
}

/// Big-endian bytes with leading zeros stripped.
fn encode_int(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes
        .iter()
        .position(|&byte| byte != 0)
        .unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}

fn decode_int(bytes: &[u8]) -> Option<i64> {
    if bytes.len() > 8 {
        return None;
    }
    Some(
        bytes
            .iter()
            .fold(0i64, |acc, &byte| (acc << 8) | i64::from(byte)),
    )
}
