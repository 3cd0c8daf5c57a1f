//! Authentication header tokens.
//!
//! The service reads the first byte of the header as a protocol version, the
//! second as the mechanism type, and hands the rest verbatim to the matching
//! authentication handler:
//!
//! ```text
//! 0u<oauth access token>
//! 0t<machine identity>
//! 0s<service identity>
//! ```

mod error;

pub use error::TokenError;

use std::fmt;

/// Protocol version marker, always the first byte of a header.
pub const VERSION_BYTE: u8 = b'0';

/// Identity mechanism carried by a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// A human user, authenticated by an OAuth access token.
    User,
    /// A machine, identified by its TLS client certificate.
    Machine,
    /// A service identity.
    Service,
}

impl TokenType {
    /// The type byte written after the version byte.
    pub const fn as_byte(self) -> u8 {
        match self {
            TokenType::User => b'u',
            TokenType::Machine => b't',
            TokenType::Service => b's',
        }
    }

    /// Look up a token type from its wire byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'u' => Some(TokenType::User),
            b't' => Some(TokenType::Machine),
            b's' => Some(TokenType::Service),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::User => "user",
            TokenType::Machine => "machine",
            TokenType::Service => "service",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved credential, ready to be rendered as a header value.
///
/// The payload is a bearer secret, so `Debug` only reports its length and
/// there is deliberately no `Display` implementation.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    token_type: TokenType,
    payload: String,
}

impl AuthToken {
    /// Create a token. Empty payloads are rejected.
    pub fn new(token_type: TokenType, payload: impl Into<String>) -> Result<Self, TokenError> {
        let payload = payload.into();
        if payload.is_empty() {
            return Err(TokenError::EmptyPayload);
        }
        Ok(Self {
            token_type,
            payload,
        })
    }

    /// Parse a header value produced by [`AuthToken::to_header`].
    pub fn parse(header: &str) -> Result<Self, TokenError> {
        let bytes = header.as_bytes();
        if bytes.len() < 2 {
            return Err(TokenError::Truncated);
        }
        if bytes[0] != VERSION_BYTE {
            return Err(TokenError::UnsupportedVersion(bytes[0]));
        }
        let token_type = TokenType::from_byte(bytes[1]).ok_or(TokenError::UnknownType(bytes[1]))?;
        // Both prefix bytes are ASCII, so index 2 is a char boundary.
        Self::new(token_type, &header[2..])
    }

    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Render the `<version><type><payload>` header value.
    pub fn to_header(&self) -> String {
        let mut header = String::with_capacity(self.payload.len() + 2);
        header.push(VERSION_BYTE as char);
        header.push(self.token_type.as_byte() as char);
        header.push_str(&self.payload);
        header
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("token_type", &self.token_type)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
