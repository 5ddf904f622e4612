//! Identity collaborator: resolves a bearer credential to a user id and
//! role.
//!
//! Tokens are issued by the external identity system and verified here
//! against a shared secret. Format:
//!
//! ```text
//! rnt_v1_<user uuid, simple form>.<role>.<hex hmac-sha256>
//! ```
//!
//! The signature covers `<uuid>:<role>`, so neither the subject nor the
//! role can be swapped without invalidating the token. Comparison is
//! constant-time.

use std::str::FromStr;

use hmac::{Hmac, Mac};
use model::Role;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Token identifier prefix.
pub const TOKEN_PREFIX: &str = "rnt";

/// Supported token format version segment.
pub const TOKEN_VERSION: &str = "v1";

/// The authenticated caller, as every service sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("credential format is invalid")]
    InvalidFormat,

    #[error("credential uses an unsupported version")]
    UnsupportedVersion,

    #[error("credential carries an unknown role")]
    UnknownRole,

    #[error("credential signature is invalid")]
    InvalidSignature,
}

/// Verifies (and, for operational tooling, issues) bearer tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenVerifier(**redacted**)")
    }
}

impl TokenVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Produce a signed token for the given subject. The production issuer
    /// lives in the identity system; this exists for seeding and tests.
    pub fn issue(&self, user_id: Uuid, role: Role) -> String {
        format!(
            "{TOKEN_PREFIX}_{TOKEN_VERSION}_{}.{}.{}",
            user_id.simple(),
            role.as_str(),
            encode_hex(&self.sign(user_id, role)),
        )
    }

    /// Resolve a bearer token to its user id and role.
    ///
    /// # Errors
    /// Returns an [`IdentityError`] describing why the token was rejected;
    /// callers surface every variant as an authorization failure.
    pub fn authenticate(&self, token: &str) -> Result<AuthUser, IdentityError> {
        let mut segments = token.splitn(3, '.');
        let prefixed_id = segments.next().ok_or(IdentityError::InvalidFormat)?;
        let role_segment = segments.next().ok_or(IdentityError::InvalidFormat)?;
        let signature_hex = segments.next().ok_or(IdentityError::InvalidFormat)?;

        let mut id_parts = prefixed_id.splitn(3, '_');
        let prefix = id_parts.next().ok_or(IdentityError::InvalidFormat)?;
        let version = id_parts.next().ok_or(IdentityError::InvalidFormat)?;
        let uuid_segment = id_parts.next().ok_or(IdentityError::InvalidFormat)?;

        if prefix != TOKEN_PREFIX {
            return Err(IdentityError::InvalidFormat);
        }
        if version != TOKEN_VERSION {
            return Err(IdentityError::UnsupportedVersion);
        }

        let user_id =
            Uuid::from_str(uuid_segment).map_err(|_| IdentityError::InvalidFormat)?;
        let role = Role::parse(role_segment).ok_or(IdentityError::UnknownRole)?;

        let supplied = decode_hex(signature_hex).ok_or(IdentityError::InvalidFormat)?;
        let expected = self.sign(user_id, role);
        if !constant_time_eq::constant_time_eq(&supplied, &expected) {
            return Err(IdentityError::InvalidSignature);
        }

        Ok(AuthUser { user_id, role })
    }

    fn sign(&self, user_id: Uuid, role: Role) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any size");
        mac.update(format!("{}:{}", user_id.simple(), role.as_str()).as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        encoded.push(HEX[(byte >> 4) as usize] as char);
        encoded.push(HEX[(byte & 0x0f) as usize] as char);
    }
    encoded
}

fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }

    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(input.len() / 2);
    for pair in bytes.chunks(2) {
        let hi = decode_hex_nibble(pair[0])?;
        let lo = decode_hex_nibble(pair[1])?;
        decoded.push((hi << 4) | lo);
    }
    Some(decoded)
}

fn decode_hex_nibble(value: u8) -> Option<u8> {
    match value {
        b'0'..=b'9' => Some(value - b'0'),
        b'a'..=b'f' => Some(value - b'a' + 10),
        b'A'..=b'F' => Some(value - b'A' + 10),
        _ => None,
    }
}
