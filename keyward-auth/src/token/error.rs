//! Token error types.

/// Errors that can occur when building or parsing a token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TokenError {
    /// The identity payload is empty.
    #[error("empty token payload")]
    EmptyPayload,

    /// The header is shorter than the version and type prefix.
    #[error("token header truncated")]
    Truncated,

    /// The version byte is not one this client speaks.
    #[error("unsupported token version byte {0:#04x}")]
    UnsupportedVersion(u8),

    /// The type byte does not name a known mechanism.
    #[error("unknown token type byte {0:#04x}")]
    UnknownType(u8),
}
