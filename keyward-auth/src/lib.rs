//! Credential resolution for Knox-style key distribution clients.
//!
//! The remote service expects every request to carry an authentication
//! header of the form `<version><type><payload>`. This crate decides which
//! identity mechanism a process presents and builds that header:
//!
//! - [`token`] - The [`AuthToken`] wire format and its type bytes
//! - [`cert`] - Best-effort identity extraction from X.509 certificates
//! - [`cached`] - The cached user token written by the login flow
//! - [`resolve`] - The ordered chain of token sources
//!
//! Environment lookups go through the [`resolve::Environment`] trait so the
//! chain can be exercised without touching the process environment.
//!
//! # Example
//!
//! ```no_run
//! use keyward_auth::resolve::AuthTokenResolver;
//!
//! let resolver = AuthTokenResolver::builder().build();
//! let header = resolver.header();
//! // An empty header means no credential was found.
//! println!("authenticated: {}", !header.is_empty());
//! ```

pub mod cached;
pub mod cert;
pub mod resolve;
pub mod token;

pub use cached::{CachedTokenError, CachedUserToken};
pub use cert::{extract_identity, CertError, ExtractedIdentity, IdentitySource};
pub use resolve::{
    AuthTokenResolver, Environment, PayloadOrigin, ProcessEnv, Resolution, TokenSource,
    TokenSourceKind,
};
pub use token::{AuthToken, TokenError, TokenType, VERSION_BYTE};
