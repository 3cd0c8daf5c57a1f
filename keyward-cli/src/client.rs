//! Client assembly.
//!
//! Wires the auth token resolver, the TLS transport and the key cache
//! location into a [`KeyClient`] handle for the command layer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use keyward_auth::{AuthTokenResolver, Environment};

use crate::config::ClientSettings;
use crate::tls::{
    build_transport, IdentityMaterial, RootSource, ServerVerification, TransportConfig,
    TransportPolicy,
};

/// Validated `host:port` address of the key service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddr {
    host: String,
    port: u16,
}

impl HostAddr {
    /// Parse `host:port` or `[v6addr]:port`.
    pub fn parse(addr: &str) -> Result<Self> {
        let (host, port) = addr
            .rsplit_once(':')
            .with_context(|| format!("missing port in {addr:?}"))?;
        let bracketed = host.starts_with('[');
        let host = if bracketed {
            host.strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .with_context(|| format!("unbalanced brackets in {addr:?}"))?
        } else {
            host
        };
        if host.contains(['[', ']']) {
            bail!("unbalanced brackets in {addr:?}");
        }
        if host.is_empty() {
            bail!("missing host in {addr:?}");
        }
        if host.contains(':') && !bracketed {
            bail!("IPv6 addresses must be bracketed in {addr:?}");
        }
        let port: u16 = port
            .parse()
            .with_context(|| format!("invalid port in {addr:?}"))?;
        if port == 0 {
            bail!("invalid port in {addr:?}");
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// OAuth endpoint details for the external login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEndpoint {
    pub token_endpoint: String,
    pub client_id: String,
}

/// A fully assembled client. Immutable and shareable across threads.
#[derive(Debug)]
pub struct KeyClient {
    host: HostAddr,
    auth: AuthTokenResolver,
    key_folder: PathBuf,
    transport: TransportConfig,
    login: LoginEndpoint,
}

impl KeyClient {
    pub fn host(&self) -> &HostAddr {
        &self.host
    }

    pub fn resolver(&self) -> &AuthTokenResolver {
        &self.auth
    }

    /// Authentication header for the next request; empty when unauthenticated.
    pub fn auth_header(&self) -> String {
        self.auth.header()
    }

    pub fn key_folder(&self) -> &Path {
        &self.key_folder
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    pub fn login(&self) -> &LoginEndpoint {
        &self.login
    }
}

/// Assemble a client from settings.
///
/// Missing or broken identity material only disables mutual TLS. An invalid
/// host, server name or CA bundle aborts.
pub fn assemble(settings: &ClientSettings, env: Arc<dyn Environment>) -> Result<KeyClient> {
    let host = HostAddr::parse(&settings.host).context("Invalid key service address")?;

    let identity =
        IdentityMaterial::load_optional(settings.cert_path.as_deref(), settings.key_path.as_deref());

    let verification = if settings.insecure_skip_verify {
        ServerVerification::Insecure
    } else {
        let roots = match &settings.ca_path {
            Some(path) => RootSource::from_pem_file(path).context("Failed to load CA bundle")?,
            None => RootSource::Native,
        };
        ServerVerification::WebPki(roots)
    };
    let policy = TransportPolicy {
        server_name: settings.server_name.clone(),
        verification,
    };
    let transport =
        build_transport(identity.as_ref(), &policy).context("Failed to build TLS transport")?;

    let mut resolver = AuthTokenResolver::builder()
        .environment(env)
        .machine_certificate(identity.as_ref().map(|id| id.leaf_der().to_vec()));
    if let Some(path) = &settings.cached_token_path {
        resolver = resolver.cached_token_path(Some(path.clone()));
    }

    tracing::info!(
        host = %host,
        server_name = %settings.server_name,
        client_auth = transport.client_auth(),
        verify_server = transport.verify_server(),
        "Assembled key service client"
    );

    Ok(KeyClient {
        host,
        auth: resolver.build(),
        key_folder: settings.key_folder.clone(),
        transport,
        login: LoginEndpoint {
            token_endpoint: settings.token_endpoint.clone(),
            client_id: settings.client_id.clone(),
        },
    })
}
