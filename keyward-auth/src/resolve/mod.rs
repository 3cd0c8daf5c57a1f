//! Ordered resolution of the authentication header.
//!
//! The standard chain, highest priority first:
//!
//! 1. `KNOX_USER_AUTH` - user token, type `u`
//! 2. `KNOX_MACHINE_AUTH` - machine identity from the client certificate, type `t`
//! 3. `KNOX_SERVICE_AUTH` - service identity, type `s`
//! 4. `~/.knox_user_auth` - cached OAuth token from the login flow, type `u`
//!
//! The first source that yields a non-empty payload wins. Failures inside a
//! source are absorbed and the next source is tried. When nothing resolves
//! the header is empty and the remote service decides what to do with an
//! unauthenticated request.

mod env;
mod sources;

pub use env::{Environment, ProcessEnv, MACHINE_AUTH_VAR, SERVICE_AUTH_VAR, USER_AUTH_VAR};
pub use sources::{CachedTokenSource, EnvVarSource, MachineCertSource};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cached::default_cached_token_path;
use crate::cert::IdentitySource;
use crate::token::{AuthToken, TokenType};

/// Identifies which source produced a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSourceKind {
    UserEnv,
    MachineEnv,
    ServiceEnv,
    CachedUserToken,
}

impl TokenSourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenSourceKind::UserEnv => "user-env",
            TokenSourceKind::MachineEnv => "machine-env",
            TokenSourceKind::ServiceEnv => "service-env",
            TokenSourceKind::CachedUserToken => "cached-user-token",
        }
    }
}

impl fmt::Display for TokenSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a token's payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadOrigin {
    /// The raw value of the source; may be a bearer secret.
    Verbatim,
    /// A name read from the client certificate.
    Certificate(IdentitySource),
}

/// A single strategy in the resolution chain.
pub trait TokenSource: Send + Sync {
    fn kind(&self) -> TokenSourceKind;

    /// Produce a token, or `None` to defer to the next source.
    fn try_resolve(&self) -> Option<AuthToken>;

    /// Like [`try_resolve`](Self::try_resolve), also reporting the payload origin.
    fn try_resolve_with_origin(&self) -> Option<(AuthToken, PayloadOrigin)> {
        self.try_resolve().map(|token| (token, PayloadOrigin::Verbatim))
    }
}

/// A resolved token together with the source that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub token: AuthToken,
    pub source: TokenSourceKind,
    pub origin: PayloadOrigin,
}

impl Resolution {
    /// True when the payload is a certificate name rather than a raw value.
    pub fn is_enriched(&self) -> bool {
        matches!(self.origin, PayloadOrigin::Certificate(_))
    }
}

/// Walks an ordered list of [`TokenSource`]s.
///
/// Resolution is repeated on every call so that a long-lived client picks up
/// a refreshed cached token.
pub struct AuthTokenResolver {
    sources: Vec<Box<dyn TokenSource>>,
}

impl AuthTokenResolver {
    /// Build a resolver from an explicit chain.
    pub fn new(sources: Vec<Box<dyn TokenSource>>) -> Self {
        Self { sources }
    }

    /// Start building the standard four-source chain.
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    /// Resolve and report which source won.
    pub fn resolve_with_source(&self) -> Option<Resolution> {
        for source in &self.sources {
            if let Some((token, origin)) = source.try_resolve_with_origin() {
                tracing::debug!(
                    source = %source.kind(),
                    token_type = %token.token_type(),
                    ?origin,
                    "Resolved auth token"
                );
                return Some(Resolution {
                    token,
                    source: source.kind(),
                    origin,
                });
            }
            tracing::trace!(source = %source.kind(), "Token source yielded nothing");
        }
        tracing::debug!("No auth token source available");
        None
    }

    pub fn resolve(&self) -> Option<AuthToken> {
        self.resolve_with_source().map(|r| r.token)
    }

    /// Header value for the next request; empty when unauthenticated.
    pub fn header(&self) -> String {
        self.resolve().map(|t| t.to_header()).unwrap_or_default()
    }

    /// Source kinds in priority order.
    pub fn source_kinds(&self) -> Vec<TokenSourceKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }
}

impl fmt::Debug for AuthTokenResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokenResolver")
            .field("sources", &self.source_kinds())
            .finish()
    }
}

/// Builder for the standard resolution chain.
pub struct ResolverBuilder {
    env: Arc<dyn Environment>,
    machine_certificate: Option<Vec<u8>>,
    cached_token_path: Option<PathBuf>,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self {
            env: Arc::new(ProcessEnv),
            machine_certificate: None,
            cached_token_path: default_cached_token_path(),
        }
    }
}

impl ResolverBuilder {
    /// Use a custom environment instead of the process environment.
    pub fn environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = env;
        self
    }

    /// DER-encoded leaf certificate used to name the machine.
    pub fn machine_certificate(mut self, der: Option<Vec<u8>>) -> Self {
        self.machine_certificate = der;
        self
    }

    /// Override the cached token location; `None` disables the source.
    pub fn cached_token_path(mut self, path: Option<PathBuf>) -> Self {
        self.cached_token_path = path;
        self
    }

    pub fn build(self) -> AuthTokenResolver {
        let sources: Vec<Box<dyn TokenSource>> = vec![
            Box::new(EnvVarSource::new(
                TokenSourceKind::UserEnv,
                USER_AUTH_VAR,
                TokenType::User,
                self.env.clone(),
            )),
            Box::new(MachineCertSource::new(
                MACHINE_AUTH_VAR,
                self.env.clone(),
                self.machine_certificate,
            )),
            Box::new(EnvVarSource::new(
                TokenSourceKind::ServiceEnv,
                SERVICE_AUTH_VAR,
                TokenType::Service,
                self.env,
            )),
            Box::new(CachedTokenSource::new(self.cached_token_path)),
        ];
        AuthTokenResolver::new(sources)
    }
}
