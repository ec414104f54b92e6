//! Protocol probe layer.
//!
//! A probe opens one connection to one server for one (protocol, transport)
//! pair, reads the advertised authentication mechanisms, and closes the
//! connection. Any recoverable failure yields `None`.

pub mod capabilities;
pub mod connection;
pub mod imap;
pub mod pop3;
pub mod smtp;
pub mod stream;
pub mod tls;

pub use connection::{ConnectionState, MailConnection};

use crate::core::config::{Config, DEFAULT_PROBE_TIMEOUT};
use crate::core::error::ProbeError;
use crate::core::models::{AuthCapabilities, ProbeTarget, Protocol, Transport};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

/// A whole probe may take this many per-operation timeouts.
const PROBE_DEADLINE_FACTOR: u32 = 3;

/// Seam between the consistency checker and the network.
#[async_trait]
pub trait Prober: Send + Sync {
    /// `Some` when the handshake succeeded (possibly with no parsable
    /// mechanisms), `None` when the server could not be talked to.
    async fn probe(&self, target: &ProbeTarget) -> Option<AuthCapabilities>;
}

/// Probes real servers over TCP.
#[derive(Clone)]
pub struct NetworkProber {
    timeout: Duration,
    client_name: String,
    connector: TlsConnector,
}

impl NetworkProber {
    pub fn new(timeout: Duration, client_name: impl Into<String>) -> Self {
        Self {
            timeout,
            client_name: client_name.into(),
            connector: tls::probe_connector(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.probe_timeout, config.ehlo_name.clone())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probes `hostname` with the given protocol and transport; `port`
    /// defaults per protocol/transport when `None`.
    pub async fn probe_server(
        &self,
        hostname: &str,
        protocol: Protocol,
        transport: Transport,
        port: Option<u16>,
    ) -> Option<AuthCapabilities> {
        self.probe(&ProbeTarget::new(hostname, port, protocol, transport))
            .await
    }

    /// Upper bound on one whole probe: connect, dialogue and goodbye.
    pub fn deadline(&self) -> Duration {
        self.timeout * PROBE_DEADLINE_FACTOR
    }

    /// Like [`Prober::probe`], but reports why the probe failed.
    pub async fn try_probe(&self, target: &ProbeTarget) -> Result<AuthCapabilities, ProbeError> {
        let deadline = self.deadline();
        match timeout(deadline, self.run(target)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(deadline)),
        }
    }

    async fn run(&self, target: &ProbeTarget) -> Result<AuthCapabilities, ProbeError> {
        let mut conn =
            MailConnection::connect(target, &self.client_name, self.timeout, &self.connector)
                .await?;

        let result = async {
            conn.announce_capabilities().await?;
            if target.transport == Transport::StartTls {
                conn.upgrade(&self.connector).await?;
                conn.reannounce_capabilities().await?;
            }
            Ok::<_, ProbeError>(conn.capabilities())
        }
        .await;

        conn.close().await;
        result
    }
}

impl Default for NetworkProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT, "localhost")
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, target: &ProbeTarget) -> Option<AuthCapabilities> {
        match self.try_probe(target).await {
            Ok(capabilities) => {
                tracing::debug!(target: "probe", "{} advertised {:?}", target, capabilities);
                Some(capabilities)
            }
            Err(e) => {
                tracing::debug!(target: "probe", "{} failed: {}", target, e);
                None
            }
        }
    }
}
