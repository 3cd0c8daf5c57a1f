//! Client certificate and private key for mutual TLS.

use std::path::Path;

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{
    CertificateDer, PrivateKeyDer, PrivatePkcs1KeyDer, PrivatePkcs8KeyDer, PrivateSec1KeyDer,
};
use rustls::sign::CertifiedKey;
use zeroize::Zeroizing;

/// Errors that can occur while loading identity material.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no certificate found in PEM input")]
    NoCertificate,
    #[error("invalid certificate PEM: {0}")]
    InvalidCert(String),
    #[error("invalid private key PEM: {0}")]
    InvalidKey(String),
    #[error("certificate and private key do not match: {0}")]
    Mismatch(String),
}

#[derive(Debug, Clone, Copy)]
enum KeyFormat {
    Pkcs1,
    Sec1,
    Pkcs8,
}

/// Client TLS identity (certificate chain + private key).
///
/// Only constructed once the key has been checked against the leaf
/// certificate. The private key is zeroized on drop.
#[derive(Clone)]
pub struct IdentityMaterial {
    cert_chain: Vec<CertificateDer<'static>>,
    key_der: Zeroizing<Vec<u8>>,
    key_format: KeyFormat,
}

impl IdentityMaterial {
    /// Parse a PEM certificate chain (leaf first) and a PEM private key.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, IdentityError> {
        let cert_chain = CertificateDer::pem_slice_iter(cert_pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| IdentityError::InvalidCert(e.to_string()))?;
        if cert_chain.is_empty() {
            return Err(IdentityError::NoCertificate);
        }

        let key = PrivateKeyDer::from_pem_slice(key_pem)
            .map_err(|e| IdentityError::InvalidKey(e.to_string()))?;
        let (key_der, key_format) = match &key {
            PrivateKeyDer::Pkcs1(k) => (k.secret_pkcs1_der().to_vec(), KeyFormat::Pkcs1),
            PrivateKeyDer::Sec1(k) => (k.secret_sec1_der().to_vec(), KeyFormat::Sec1),
            PrivateKeyDer::Pkcs8(k) => (k.secret_pkcs8_der().to_vec(), KeyFormat::Pkcs8),
            _ => return Err(IdentityError::InvalidKey("unsupported key format".to_string())),
        };

        check_key_pair(&cert_chain, key)?;

        Ok(Self {
            cert_chain,
            key_der: Zeroizing::new(key_der),
            key_format,
        })
    }

    /// Load a certificate chain and key from PEM files.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, IdentityError> {
        let cert_pem = read(cert_path)?;
        let key_pem = Zeroizing::new(read(key_path)?);
        Self::from_pem(&cert_pem, &key_pem)
    }

    /// Load identity material when both paths are configured.
    ///
    /// Any failure is logged and treated as "no client certificate".
    pub fn load_optional(cert_path: Option<&Path>, key_path: Option<&Path>) -> Option<Self> {
        match (cert_path, key_path) {
            (Some(cert), Some(key)) => match Self::load(cert, key) {
                Ok(identity) => {
                    tracing::info!(cert = %cert.display(), "Loaded client certificate");
                    Some(identity)
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        cert = %cert.display(),
                        "Client certificate unusable, continuing without mutual TLS"
                    );
                    None
                }
            },
            (None, None) => {
                tracing::debug!("No client certificate configured");
                None
            }
            _ => {
                tracing::warn!("Both a certificate and a key are required for mutual TLS");
                None
            }
        }
    }

    pub fn cert_chain(&self) -> &[CertificateDer<'static>] {
        &self.cert_chain
    }

    /// DER bytes of the leaf certificate.
    pub fn leaf_der(&self) -> &[u8] {
        self.cert_chain[0].as_ref()
    }

    pub fn private_key(&self) -> PrivateKeyDer<'static> {
        // Clone the inner Vec from the Zeroizing wrapper
        let der = (*self.key_der).clone();
        match self.key_format {
            KeyFormat::Pkcs1 => PrivateKeyDer::Pkcs1(PrivatePkcs1KeyDer::from(der)),
            KeyFormat::Sec1 => PrivateKeyDer::Sec1(PrivateSec1KeyDer::from(der)),
            KeyFormat::Pkcs8 => PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(der)),
        }
    }
}

impl std::fmt::Debug for IdentityMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityMaterial")
            .field("chain_len", &self.cert_chain.len())
            .field("key_format", &self.key_format)
            .finish()
    }
}

fn read(path: &Path) -> Result<Vec<u8>, IdentityError> {
    std::fs::read(path).map_err(|source| IdentityError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Verify that the private key belongs to the leaf certificate.
fn check_key_pair(
    cert_chain: &[CertificateDer<'static>],
    key: PrivateKeyDer<'static>,
) -> Result<(), IdentityError> {
    let provider = rustls::crypto::ring::default_provider();
    let signing_key = provider
        .key_provider
        .load_private_key(key)
        .map_err(|e| IdentityError::InvalidKey(e.to_string()))?;

    let certified = CertifiedKey::new(cert_chain.to_vec(), signing_key);
    match certified.keys_match() {
        Ok(()) => Ok(()),
        // The key type cannot report its public half; the handshake will tell.
        Err(rustls::Error::InconsistentKeys(rustls::InconsistentKeys::Unknown)) => Ok(()),
        Err(e) => Err(IdentityError::Mismatch(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::test_support::{generate_identity, TestIdentity};

    #[test]
    fn test_from_pem_matching_pair() {
        let TestIdentity { cert_pem, key_pem, .. } = generate_identity("svcA", &[]);
        let identity = IdentityMaterial::from_pem(cert_pem.as_bytes(), key_pem.as_bytes()).unwrap();

        assert_eq!(identity.cert_chain().len(), 1);
        assert!(!identity.leaf_der().is_empty());
        assert!(matches!(identity.private_key(), PrivateKeyDer::Pkcs8(_)));
    }

    #[test]
    fn test_from_pem_rejects_mismatched_key() {
        let first = generate_identity("first", &[]);
        let second = generate_identity("second", &[]);

        let result = IdentityMaterial::from_pem(first.cert_pem.as_bytes(), second.key_pem.as_bytes());
        assert!(matches!(result, Err(IdentityError::Mismatch(_))));
    }

    #[test]
    fn test_from_pem_rejects_garbage() {
        let identity = generate_identity("svcA", &[]);

        let result = IdentityMaterial::from_pem(b"garbage", identity.key_pem.as_bytes());
        assert!(matches!(result, Err(IdentityError::NoCertificate)));

        let result = IdentityMaterial::from_pem(identity.cert_pem.as_bytes(), b"garbage");
        assert!(matches!(result, Err(IdentityError::InvalidKey(_))));
    }

    #[test]
    fn test_load_optional_soft_fails() {
        let dir = tempfile::tempdir().unwrap();
        let first = generate_identity("first", &[]);
        let second = generate_identity("second", &[]);
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        std::fs::write(&cert_path, &first.cert_pem).unwrap();
        std::fs::write(&key_path, &second.key_pem).unwrap();

        assert!(IdentityMaterial::load_optional(Some(&cert_path), Some(&key_path)).is_none());
        assert!(IdentityMaterial::load_optional(Some(&cert_path), None).is_none());
        assert!(IdentityMaterial::load_optional(None, None).is_none());
        assert!(IdentityMaterial::load_optional(
            Some(&dir.path().join("missing.pem")),
            Some(&key_path)
        )
        .is_none());
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let generated = generate_identity("svcA", &["svc.example.com"]);
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        std::fs::write(&cert_path, &generated.cert_pem).unwrap();
        std::fs::write(&key_path, &generated.key_pem).unwrap();

        let identity = IdentityMaterial::load(&cert_path, &key_path).unwrap();
        assert_eq!(identity.leaf_der(), generated.cert_der.as_slice());
    }
}
