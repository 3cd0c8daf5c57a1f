//! TLS client configuration for the key service transport.
//!
//! Provides client-side TLS configuration using rustls 0.23+. A client
//! certificate is attached when usable identity material is available;
//! otherwise the connection proceeds without client authentication.

use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::ClientConfig;

use super::identity::IdentityMaterial;
use super::verifier::{InsecureServerVerifier, RootSource};
use super::TlsConfigError;

/// How the server certificate is checked.
#[derive(Debug, Clone)]
pub enum ServerVerification {
    /// Validate the chain against trust roots and the server name.
    WebPki(RootSource),
    /// Accept any server certificate.
    Insecure,
}

/// Inputs to [`build_transport`] besides the identity material.
#[derive(Debug, Clone)]
pub struct TransportPolicy {
    /// Name sent for SNI and, under WebPKI verification, matched against the certificate.
    pub server_name: String,
    pub verification: ServerVerification,
}

/// Ready-to-use transport configuration. Immutable once built.
#[derive(Clone)]
pub struct TransportConfig {
    server_name: ServerName<'static>,
    client_auth: bool,
    verify_server: bool,
    tls: Arc<ClientConfig>,
}

impl TransportConfig {
    pub fn server_name(&self) -> &ServerName<'static> {
        &self.server_name
    }

    /// Whether a client certificate is presented.
    pub fn client_auth(&self) -> bool {
        self.client_auth
    }

    /// Whether the server certificate is verified.
    pub fn verify_server(&self) -> bool {
        self.verify_server
    }

    pub fn rustls_config(&self) -> Arc<ClientConfig> {
        self.tls.clone()
    }
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConfig")
            .field("server_name", &self.server_name)
            .field("client_auth", &self.client_auth)
            .field("verify_server", &self.verify_server)
            .finish()
    }
}

/// Build the TLS client config for talking to the key service.
///
/// A key pair that rustls refuses degrades to a config without client
/// authentication rather than failing.
///
/// # Errors
///
/// Returns an error if the server name is invalid or a custom CA bundle is unusable.
pub fn build_transport(
    identity: Option<&IdentityMaterial>,
    policy: &TransportPolicy,
) -> Result<TransportConfig, TlsConfigError> {
    let server_name = ServerName::try_from(policy.server_name.clone())
        .map_err(|_| TlsConfigError::InvalidServerName(policy.server_name.clone()))?;

    let builder = ClientConfig::builder();
    let (builder, verify_server) = match &policy.verification {
        ServerVerification::WebPki(roots) => {
            (builder.with_root_certificates(roots.root_store()?), true)
        }
        ServerVerification::Insecure => {
            tracing::warn!(
                server_name = %policy.server_name,
                "Server certificate verification is DISABLED; the server is not authenticated"
            );
            let verifier = Arc::new(InsecureServerVerifier);
            (
                builder
                    .dangerous()
                    .with_custom_certificate_verifier(verifier),
                false,
            )
        }
    };

    let (config, client_auth) = match identity {
        Some(identity) => {
            match builder
                .clone()
                .with_client_auth_cert(identity.cert_chain().to_vec(), identity.private_key())
            {
                Ok(config) => (config, true),
                Err(e) => {
                    tracing::warn!(error = %e, "Client certificate rejected, continuing without mutual TLS");
                    (builder.with_no_client_auth(), false)
                }
            }
        }
        None => (builder.with_no_client_auth(), false),
    };

    tracing::debug!(
        server_name = %policy.server_name,
        client_auth,
        verify_server,
        "Built TLS transport"
    );

    Ok(TransportConfig {
        server_name,
        client_auth,
        verify_server,
        tls: Arc::new(config),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::test_support::generate_identity;

    fn insecure_policy() -> TransportPolicy {
        TransportPolicy {
            server_name: "knox".to_string(),
            verification: ServerVerification::Insecure,
        }
    }

    fn custom_roots_policy() -> TransportPolicy {
        let ca = generate_identity("Test CA", &[]);
        TransportPolicy {
            server_name: "knox".to_string(),
            verification: ServerVerification::WebPki(RootSource::Custom(vec![ca.cert_der.into()])),
        }
    }

    #[test]
    fn test_transport_with_client_certificate() {
        let generated = generate_identity("svcA", &[]);
        let identity =
            IdentityMaterial::from_pem(generated.cert_pem.as_bytes(), generated.key_pem.as_bytes())
                .unwrap();

        let transport = build_transport(Some(&identity), &custom_roots_policy()).unwrap();

        assert!(transport.client_auth());
        assert!(transport.verify_server());
        assert!(transport.rustls_config().client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn test_transport_without_identity() {
        let transport = build_transport(None, &custom_roots_policy()).unwrap();

        assert!(!transport.client_auth());
        assert!(!transport.rustls_config().client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn test_mismatched_key_pair_degrades_to_no_client_auth() {
        let first = generate_identity("first", &[]);
        let second = generate_identity("second", &[]);

        // Mismatched material never becomes an IdentityMaterial.
        let identity =
            IdentityMaterial::from_pem(first.cert_pem.as_bytes(), second.key_pem.as_bytes()).ok();
        let transport = build_transport(identity.as_ref(), &insecure_policy()).unwrap();

        assert!(!transport.client_auth());
    }

    #[test]
    fn test_insecure_policy_reports_unverified() {
        let transport = build_transport(None, &insecure_policy()).unwrap();
        assert!(!transport.verify_server());
        assert_eq!(transport.server_name().to_str(), "knox");
    }

    #[test]
    fn test_invalid_server_name_rejected() {
        let policy = TransportPolicy {
            server_name: "not a hostname!".to_string(),
            verification: ServerVerification::Insecure,
        };
        let result = build_transport(None, &policy);
        assert!(matches!(result, Err(TlsConfigError::InvalidServerName(_))));
    }

    #[test]
    fn test_empty_custom_roots_rejected() {
        let policy = TransportPolicy {
            server_name: "knox".to_string(),
            verification: ServerVerification::WebPki(RootSource::Custom(Vec::new())),
        };
        let result = build_transport(None, &policy);
        assert!(matches!(result, Err(TlsConfigError::NoTrustRoots)));
    }
}
