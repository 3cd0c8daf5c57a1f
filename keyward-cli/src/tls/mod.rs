//! TLS configuration for the key service connection.
//!
//! Loads the client identity, selects a server verification policy and
//! builds the rustls client config.

mod client;
mod identity;
mod verifier;

pub use client::{build_transport, ServerVerification, TransportConfig, TransportPolicy};
pub use identity::IdentityMaterial;
pub use verifier::RootSource;

/// Errors that can occur while building the transport.
#[derive(Debug, thiserror::Error)]
pub enum TlsConfigError {
    #[error("invalid certificate: {0}")]
    InvalidCert(String),
    #[error("invalid server name: {0:?}")]
    InvalidServerName(String),
    #[error("no trusted root certificates available")]
    NoTrustRoots,
}
