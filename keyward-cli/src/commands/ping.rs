//! Check that the key service is reachable over the configured transport.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use keyward_auth::extract_identity;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::client::KeyClient;

/// Outcome of a successful handshake.
#[derive(Debug, Clone)]
pub struct PingReport {
    pub address: String,
    pub protocol: String,
    pub cipher_suite: String,
    /// Subject identity of the server's leaf certificate, if it has one
    pub server_identity: Option<String>,
    pub elapsed: Duration,
}

/// Connect and complete a TLS handshake, bounded by `timeout`.
pub async fn ping(client: &KeyClient, timeout: Duration) -> Result<PingReport> {
    let address = client.host().to_string();
    tokio::time::timeout(timeout, handshake(client, &address))
        .await
        .with_context(|| format!("Timed out after {}s connecting to {address}", timeout.as_secs()))?
}

async fn handshake(client: &KeyClient, address: &str) -> Result<PingReport> {
    let started = Instant::now();
    let transport = client.transport();

    let tcp = TcpStream::connect((client.host().host(), client.host().port()))
        .await
        .with_context(|| format!("Failed to connect to {address}"))?;
    tracing::debug!(address, "TCP connected");

    let connector = TlsConnector::from(transport.rustls_config());
    let mut stream = connector
        .connect(transport.server_name().clone(), tcp)
        .await
        .context("TLS handshake failed")?;

    let (_, conn) = stream.get_ref();
    let protocol = conn
        .protocol_version()
        .map(|v| format!("{v:?}"))
        .unwrap_or_else(|| "unknown".to_string());
    let cipher_suite = conn
        .negotiated_cipher_suite()
        .map(|s| format!("{:?}", s.suite()))
        .unwrap_or_else(|| "unknown".to_string());
    let server_identity = conn
        .peer_certificates()
        .and_then(|certs| certs.first())
        .map(|leaf| extract_identity(leaf.as_ref(), ""))
        .filter(|identity| identity.is_enriched())
        .map(|identity| identity.into_value());

    // Best effort; the server may already have closed.
    let _ = stream.shutdown().await;

    let elapsed = started.elapsed();
    tracing::info!(address, protocol = %protocol, elapsed_ms = elapsed.as_millis() as u64, "Handshake complete");

    Ok(PingReport {
        address: address.to_string(),
        protocol,
        cipher_suite,
        server_identity,
        elapsed,
    })
}

pub fn print_report(report: &PingReport, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "address": report.address,
            "protocol": report.protocol,
            "cipher_suite": report.cipher_suite,
            "server_identity": report.server_identity,
            "elapsed_ms": report.elapsed.as_millis() as u64,
        });
        println!("{}", serde_json::to_string(&value)?);
    } else {
        println!("Connected to {} in {:?}", report.address, report.elapsed);
        println!("Protocol: {}", report.protocol);
        println!("Cipher suite: {}", report.cipher_suite);
        if let Some(identity) = &report.server_identity {
            println!("Server identity: {identity}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::assemble;
    use crate::config::ClientSettings;
    use crate::tls::test_support::generate_identity;
    use keyward_auth::Environment;
    use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
    use rustls::ServerConfig;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio_rustls::TlsAcceptor;

    /// Serve a single TLS connection with a fresh self-signed certificate.
    async fn spawn_server(common_name: &str) -> (u16, tokio::task::JoinHandle<()>) {
        let generated = generate_identity(common_name, &["knox"]);
        let cert = CertificateDer::from(generated.cert_der);
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(generated.key_der));
        let config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert], key)
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            if let Ok(mut tls) = acceptor.accept(tcp).await {
                let mut buf = [0u8; 16];
                let _ = tls.read(&mut buf).await;
            }
        });
        (port, handle)
    }

    fn client_for(port: u16, insecure: bool) -> KeyClient {
        let env: Arc<dyn Environment> = Arc::new(HashMap::<String, String>::new());
        let dir = tempfile::tempdir().unwrap();
        let ca_path = dir.path().join("unrelated-ca.pem");
        std::fs::write(&ca_path, generate_identity("Unrelated CA", &[]).cert_pem).unwrap();
        let settings = ClientSettings {
            host: format!("127.0.0.1:{port}"),
            insecure_skip_verify: insecure,
            ca_path: Some(ca_path),
            ..ClientSettings::default()
        };
        assemble(&settings, env).unwrap()
    }

    #[tokio::test]
    async fn test_ping_insecure_handshake() {
        let (port, server) = spawn_server("knox-test-server").await;
        let client = client_for(port, true);

        let report = ping(&client, Duration::from_secs(5)).await.unwrap();

        assert_eq!(report.address, format!("127.0.0.1:{port}"));
        assert_eq!(report.server_identity.as_deref(), Some("knox-test-server"));
        assert_ne!(report.protocol, "unknown");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_ping_rejects_untrusted_server() {
        let (port, _server) = spawn_server("knox-test-server").await;
        let client = client_for(port, false);

        let result = ping(&client, Duration::from_secs(5)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ping_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let client = client_for(port, true);

        let result = ping(&client, Duration::from_secs(5)).await;
        assert!(result.is_err());
    }
}
