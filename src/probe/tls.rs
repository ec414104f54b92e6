//! TLS client configuration for capability probes.
//!
//! Probes only check reachability and advertised features, and many mail
//! servers present self-signed or mismatched certificates, so the handshake
//! accepts any certificate chain.

use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ClientConfig, ServerName};
use std::sync::Arc;
use std::time::SystemTime;
use tokio_rustls::TlsConnector;

struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}

/// Builds a connector that skips certificate verification.
pub fn probe_connector() -> TlsConnector {
    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// Converts a hostname or IP literal into the SNI value rustls expects.
pub(crate) fn server_name(hostname: &str) -> Option<ServerName> {
    ServerName::try_from(hostname.trim_end_matches('.')).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_name_accepts_hosts_and_ips() {
        assert!(server_name("imap.example.com").is_some());
        assert!(server_name("imap.example.com.").is_some());
        assert!(server_name("192.0.2.1").is_some());
        assert!(server_name("not a host").is_none());
    }
}
