//! Identity extraction from X.509 certificates.
//!
//! Machine authentication names the caller by its certificate subject. The
//! extraction is enrichment only: when the certificate is unusable the
//! caller-supplied fallback is returned and no error escapes.
//!
//! # Security
//!
//! - Input is limited to 16KB to prevent DoS
//! - The x509_parser library handles ASN.1 parsing safely

use thiserror::Error;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::*;

/// Maximum certificate size (16KB is generous for a single cert)
pub const MAX_CERT_SIZE: usize = 16 * 1024;

/// Errors that can occur during certificate parsing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CertError {
    #[error("certificate too large: {0} bytes (max {MAX_CERT_SIZE})")]
    TooLarge(usize),

    #[error("failed to parse X.509 certificate: {0}")]
    ParseError(String),
}

/// Certificate field an identity was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// The subject common name.
    CommonName,
    /// The first DNS entry of the subject alternative name extension.
    DnsSan,
}

/// Outcome of [`extract_identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedIdentity {
    /// The certificate supplied the identity.
    Enriched {
        source: IdentitySource,
        value: String,
    },
    /// The certificate was unusable or carried no name; the fallback is returned.
    Fallback(String),
}

impl ExtractedIdentity {
    pub fn value(&self) -> &str {
        match self {
            ExtractedIdentity::Enriched { value, .. } => value,
            ExtractedIdentity::Fallback(value) => value,
        }
    }

    pub fn into_value(self) -> String {
        match self {
            ExtractedIdentity::Enriched { value, .. } => value,
            ExtractedIdentity::Fallback(value) => value,
        }
    }

    pub fn is_enriched(&self) -> bool {
        matches!(self, ExtractedIdentity::Enriched { .. })
    }
}

/// Extract the subject identity of a DER-encoded certificate.
///
/// Preference order: non-empty common name, then the first DNS subject
/// alternative name, then `fallback`. Parse failures also yield `fallback`.
pub fn extract_identity(cert_der: &[u8], fallback: &str) -> ExtractedIdentity {
    match subject_identity(cert_der) {
        Ok(Some((source, value))) => ExtractedIdentity::Enriched { source, value },
        Ok(None) => ExtractedIdentity::Fallback(fallback.to_string()),
        Err(e) => {
            tracing::debug!(error = %e, "Certificate unusable for identity extraction");
            ExtractedIdentity::Fallback(fallback.to_string())
        }
    }
}

/// Read the best subject identity out of a DER-encoded certificate.
///
/// Returns `Ok(None)` for a well-formed certificate without a usable name.
///
/// # Errors
///
/// Returns `CertError::TooLarge` if certificate exceeds 16KB.
/// Returns `CertError::ParseError` if the certificate or its SAN extension is malformed.
pub fn subject_identity(cert_der: &[u8]) -> Result<Option<(IdentitySource, String)>, CertError> {
    // Input size validation (DoS protection)
    if cert_der.len() > MAX_CERT_SIZE {
        return Err(CertError::TooLarge(cert_der.len()));
    }

    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| CertError::ParseError(format!("{:?}", e)))?;

    // With repeated CN attributes the last one wins.
    let common_name = cert
        .subject()
        .iter_common_name()
        .filter_map(|attr| attr.as_str().ok())
        .last()
        .unwrap_or_default();
    if !common_name.is_empty() {
        return Ok(Some((IdentitySource::CommonName, common_name.to_string())));
    }

    let san = cert
        .subject_alternative_name()
        .map_err(|e| CertError::ParseError(format!("{:?}", e)))?;
    let first_dns = san.and_then(|ext| {
        ext.value.general_names.iter().find_map(|name| match name {
            GeneralName::DNSName(dns) => Some(dns.to_string()),
            _ => None,
        })
    });

    Ok(first_dns.map(|dns| (IdentitySource::DnsSan, dns)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, SanType};

    fn build_cert(common_name: Option<&str>, sans: &[&str]) -> Vec<u8> {
        let key_pair = KeyPair::generate().unwrap();
        let mut params = CertificateParams::default();
        params.distinguished_name = DistinguishedName::new();
        if let Some(cn) = common_name {
            params.distinguished_name.push(DnType::CommonName, cn);
        }
        for san in sans {
            params
                .subject_alt_names
                .push(SanType::DnsName(san.to_string().try_into().unwrap()));
        }
        params.self_signed(&key_pair).unwrap().der().to_vec()
    }

    #[test]
    fn test_common_name_preferred() {
        let der = build_cert(Some("svcA"), &["a.example.com"]);
        let identity = extract_identity(&der, "raw");
        assert_eq!(
            identity,
            ExtractedIdentity::Enriched {
                source: IdentitySource::CommonName,
                value: "svcA".to_string(),
            }
        );
    }

    #[test]
    fn test_first_dns_san_when_no_common_name() {
        let der = build_cert(None, &["a.example.com", "b.example.com"]);
        let identity = extract_identity(&der, "raw");
        assert_eq!(
            identity,
            ExtractedIdentity::Enriched {
                source: IdentitySource::DnsSan,
                value: "a.example.com".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_common_name_skipped() {
        let der = build_cert(Some(""), &["a.example.com"]);
        assert_eq!(extract_identity(&der, "raw").value(), "a.example.com");
    }

    #[test]
    fn test_fallback_without_names() {
        let der = build_cert(None, &[]);
        let identity = extract_identity(&der, "raw-env-value");
        assert_eq!(identity, ExtractedIdentity::Fallback("raw-env-value".to_string()));
        assert!(!identity.is_enriched());
    }

    #[test]
    fn test_fallback_on_garbage() {
        let identity = extract_identity(b"not a certificate", "raw");
        assert_eq!(identity, ExtractedIdentity::Fallback("raw".to_string()));
    }

    #[test]
    fn test_cert_too_large() {
        let large_data = vec![0u8; MAX_CERT_SIZE + 1];
        let result = subject_identity(&large_data);
        assert!(matches!(result, Err(CertError::TooLarge(_))));
    }

    #[test]
    fn test_invalid_cert() {
        let invalid_data = b"not a certificate";
        let result = subject_identity(invalid_data);
        assert!(matches!(result, Err(CertError::ParseError(_))));
    }
}
