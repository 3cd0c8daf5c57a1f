//! Server certificate verification policies.
//!
//! # Verifiers
//!
//! - WebPKI chain and hostname validation against a root store (default)
//! - [`InsecureServerVerifier`]: accepts any server certificate; explicit opt-out only

use std::path::Path;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};

use super::TlsConfigError;

/// Where trust anchors for server verification come from.
#[derive(Debug, Clone)]
pub enum RootSource {
    /// The platform's native certificate store.
    Native,
    /// An explicit set of CA certificates, replacing the native store.
    Custom(Vec<CertificateDer<'static>>),
}

impl RootSource {
    /// Read CA certificates from a PEM bundle.
    pub fn from_pem_file(path: &Path) -> Result<Self, TlsConfigError> {
        let certs = CertificateDer::pem_file_iter(path)
            .and_then(|iter| iter.collect::<Result<Vec<_>, _>>())
            .map_err(|e| {
                TlsConfigError::InvalidCert(format!("failed to load CA bundle {}: {e}", path.display()))
            })?;
        if certs.is_empty() {
            return Err(TlsConfigError::NoTrustRoots);
        }
        Ok(Self::Custom(certs))
    }

    /// Build the root store.
    ///
    /// An empty native store is tolerated: commands that never connect keep
    /// working and the handshake fails later. An empty custom bundle is an error.
    pub fn root_store(&self) -> Result<RootCertStore, TlsConfigError> {
        match self {
            RootSource::Native => {
                let loaded = rustls_native_certs::load_native_certs();
                for e in &loaded.errors {
                    tracing::warn!(error = %e, "Error loading native root certificates");
                }
                Ok(native_root_store(loaded.certs))
            }
            RootSource::Custom(certs) => {
                let mut roots = RootCertStore::empty();
                for cert in certs {
                    roots
                        .add(cert.clone())
                        .map_err(|e| TlsConfigError::InvalidCert(e.to_string()))?;
                }
                if roots.is_empty() {
                    return Err(TlsConfigError::NoTrustRoots);
                }
                Ok(roots)
            }
        }
    }
}

/// Unparseable native certificates are skipped.
fn native_root_store(certs: Vec<CertificateDer<'static>>) -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    if roots.is_empty() {
        tracing::warn!(
            ignored,
            "No native root certificates available; server verification will fail"
        );
    } else {
        tracing::debug!(added, ignored, "Loaded native root certificates");
    }
    roots
}

/// Certificate verifier that accepts any server certificate.
///
/// The server is not authenticated: anyone able to intercept the connection
/// can impersonate it. Handshake signatures are still checked, so the peer
/// must hold the key for the certificate it presents.
#[derive(Debug, Default)]
pub struct InsecureServerVerifier;

impl ServerCertVerifier for InsecureServerVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &rustls::crypto::ring::default_provider().signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &rustls::crypto::ring::default_provider().signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
