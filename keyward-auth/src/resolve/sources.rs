//! The standard token sources.

use std::path::PathBuf;
use std::sync::Arc;

use super::{Environment, PayloadOrigin, TokenSource, TokenSourceKind};
use crate::cached::CachedUserToken;
use crate::cert::{extract_identity, ExtractedIdentity};
use crate::token::{AuthToken, TokenType};

/// Reads the payload verbatim from an environment variable.
pub struct EnvVarSource {
    kind: TokenSourceKind,
    var: &'static str,
    token_type: TokenType,
    env: Arc<dyn Environment>,
}

impl EnvVarSource {
    pub fn new(
        kind: TokenSourceKind,
        var: &'static str,
        token_type: TokenType,
        env: Arc<dyn Environment>,
    ) -> Self {
        Self {
            kind,
            var,
            token_type,
            env,
        }
    }
}

impl TokenSource for EnvVarSource {
    fn kind(&self) -> TokenSourceKind {
        self.kind
    }

    fn try_resolve(&self) -> Option<AuthToken> {
        let value = self.env.var(self.var)?;
        AuthToken::new(self.token_type, value).ok()
    }
}

/// Machine authentication, gated on an environment variable.
///
/// When enabled, the identity is read from the client certificate; the
/// variable's own value is used when no certificate is configured or it
/// carries no usable name.
pub struct MachineCertSource {
    var: &'static str,
    env: Arc<dyn Environment>,
    leaf_certificate: Option<Vec<u8>>,
}

impl MachineCertSource {
    pub fn new(
        var: &'static str,
        env: Arc<dyn Environment>,
        leaf_certificate: Option<Vec<u8>>,
    ) -> Self {
        Self {
            var,
            env,
            leaf_certificate,
        }
    }
}

impl TokenSource for MachineCertSource {
    fn kind(&self) -> TokenSourceKind {
        TokenSourceKind::MachineEnv
    }

    fn try_resolve(&self) -> Option<AuthToken> {
        self.try_resolve_with_origin().map(|(token, _)| token)
    }

    fn try_resolve_with_origin(&self) -> Option<(AuthToken, PayloadOrigin)> {
        let raw = self.env.var(self.var).filter(|v| !v.is_empty())?;
        let (payload, origin) = match &self.leaf_certificate {
            Some(der) => match extract_identity(der, &raw) {
                ExtractedIdentity::Enriched { source, value } => {
                    tracing::debug!(?source, "Machine identity read from certificate");
                    (value, PayloadOrigin::Certificate(source))
                }
                ExtractedIdentity::Fallback(value) => {
                    tracing::debug!("Certificate carries no usable name, using raw machine identity");
                    (value, PayloadOrigin::Verbatim)
                }
            },
            None => {
                tracing::debug!("No client certificate configured, using raw machine identity");
                (raw, PayloadOrigin::Verbatim)
            }
        };
        let token = AuthToken::new(TokenType::Machine, payload).ok()?;
        Some((token, origin))
    }
}

/// The OAuth token cached on disk by the login flow.
pub struct CachedTokenSource {
    path: Option<PathBuf>,
}

impl CachedTokenSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl TokenSource for CachedTokenSource {
    fn kind(&self) -> TokenSourceKind {
        TokenSourceKind::CachedUserToken
    }

    fn try_resolve(&self) -> Option<AuthToken> {
        let path = self.path.as_deref()?;
        let cached = match CachedUserToken::load(path) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::debug!(error = %e, "Cached user token unavailable");
                return None;
            }
        };
        if !cached.error.is_empty() {
            tracing::debug!(error = %cached.error, "Cached user token records a login error");
        }
        AuthToken::new(TokenType::User, cached.access_token).ok()
    }
}
