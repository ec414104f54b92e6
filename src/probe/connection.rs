//! `MailConnection`: one probe's socket and its STARTTLS state machine.
//!
//! ```text
//! Connected -> CapabilitiesAnnounced -> TlsRequested -> TlsEstablished -> CapabilitiesReannounced
//! ```
//!
//! Every transition returns a [`ProbeError`] on failure; a failed transition
//! leaves the connection unusable except for [`MailConnection::close`].

use crate::core::error::ProbeError;
use crate::core::models::{AuthCapabilities, ProbeTarget, Protocol, Transport};
use crate::probe::capabilities;
use crate::probe::stream::{LineStream, MailStream};
use crate::probe::{imap, pop3, smtp};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    CapabilitiesAnnounced,
    TlsRequested,
    TlsEstablished,
    CapabilitiesReannounced,
}

pub struct MailConnection {
    protocol: Protocol,
    hostname: String,
    client_name: String,
    stream: LineStream,
    state: ConnectionState,
    listing: String,
    /// Advertised STARTTLS/STLS in the last announcement.
    upgrade_offered: bool,
    next_tag: u32,
}

impl MailConnection {
    /// Opens a TCP connection (wrapped in TLS for implicit-TLS targets) and
    /// reads the server greeting.
    pub async fn connect(
        target: &ProbeTarget,
        client_name: &str,
        limit: Duration,
        connector: &TlsConnector,
    ) -> Result<Self, ProbeError> {
        tracing::debug!(target: "probe", "Connecting to {}", target);
        let address = (target.hostname.as_str(), target.port);
        let tcp = match timeout(limit, TcpStream::connect(address)).await {
            Ok(result) => result?,
            Err(_) => return Err(ProbeError::Timeout(limit)),
        };
        let socket: Box<dyn MailStream> = Box::new(tcp);
        let mut stream = LineStream::new(socket, limit, false);
        if target.transport == Transport::Ssl {
            stream.start_tls(connector, &target.hostname).await?;
        }
        Self::establish(target.protocol, &target.hostname, client_name, stream).await
    }

    /// Runs the greeting exchange over an already open stream.
    pub async fn establish(
        protocol: Protocol,
        hostname: &str,
        client_name: &str,
        mut stream: LineStream,
    ) -> Result<Self, ProbeError> {
        match protocol {
            Protocol::Smtp => smtp::greeting(&mut stream).await?,
            Protocol::Imap => imap::greeting(&mut stream).await?,
            Protocol::Pop3 => pop3::greeting(&mut stream).await?,
        }
        Ok(Self {
            protocol,
            hostname: hostname.to_string(),
            client_name: client_name.to_string(),
            stream,
            state: ConnectionState::Connected,
            listing: String::new(),
            upgrade_offered: false,
            next_tag: 0,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_encrypted(&self) -> bool {
        self.stream.is_encrypted()
    }

    fn tag(&mut self) -> String {
        self.next_tag += 1;
        format!("a{:03}", self.next_tag)
    }

    async fn query_capabilities(&mut self) -> Result<(), ProbeError> {
        let (listing, offered) = match self.protocol {
            Protocol::Smtp => match smtp::ehlo(&mut self.stream, &self.client_name).await? {
                Some(reply) => (reply.extensions(), reply.has_extension("STARTTLS")),
                // Nothing advertised, so a STARTTLS upgrade is refused later.
                None => (String::new(), false),
            },
            Protocol::Imap => {
                let tag = self.tag();
                let listing = imap::capability(&mut self.stream, &tag).await?;
                let offered = imap::advertises_starttls(&listing);
                (listing, offered)
            }
            Protocol::Pop3 => {
                let listing = pop3::capa(&mut self.stream).await?;
                let offered = pop3::advertises_stls(&listing);
                (listing, offered)
            }
        };
        self.listing = listing;
        self.upgrade_offered = offered;
        Ok(())
    }

    /// `Connected -> CapabilitiesAnnounced`
    pub async fn announce_capabilities(&mut self) -> Result<(), ProbeError> {
        if self.state != ConnectionState::Connected {
            return Err(ProbeError::Rejected(format!(
                "capabilities already announced ({:?})",
                self.state
            )));
        }
        self.query_capabilities().await?;
        self.state = ConnectionState::CapabilitiesAnnounced;
        Ok(())
    }

    /// `CapabilitiesAnnounced -> TlsRequested -> TlsEstablished`
    ///
    /// IMAP and SMTP servers must have offered the upgrade. POP3 servers are
    /// asked regardless, since CAPA support itself is optional.
    pub async fn upgrade(&mut self, connector: &TlsConnector) -> Result<(), ProbeError> {
        if self.is_encrypted() {
            return Err(ProbeError::AlreadyEncrypted);
        }
        if self.state != ConnectionState::CapabilitiesAnnounced {
            return Err(ProbeError::Rejected(format!(
                "cannot upgrade in state {:?}",
                self.state
            )));
        }
        if !self.upgrade_offered && self.protocol != Protocol::Pop3 {
            return Err(ProbeError::Rejected(format!(
                "STARTTLS extension not supported by {}",
                self.hostname
            )));
        }

        match self.protocol {
            Protocol::Smtp => smtp::starttls(&mut self.stream).await?,
            Protocol::Imap => {
                let tag = self.tag();
                imap::starttls(&mut self.stream, &tag).await?
            }
            Protocol::Pop3 => pop3::stls(&mut self.stream).await?,
        }
        self.state = ConnectionState::TlsRequested;

        self.stream.start_tls(connector, &self.hostname).await?;
        self.state = ConnectionState::TlsEstablished;
        tracing::debug!(target: "probe", "TLS established with {}", self.hostname);
        Ok(())
    }

    /// `TlsEstablished -> CapabilitiesReannounced`
    pub async fn reannounce_capabilities(&mut self) -> Result<(), ProbeError> {
        if self.state != ConnectionState::TlsEstablished {
            return Err(ProbeError::Rejected(format!(
                "cannot re-query capabilities in state {:?}",
                self.state
            )));
        }
        self.query_capabilities().await?;
        self.state = ConnectionState::CapabilitiesReannounced;
        Ok(())
    }

    /// Mechanisms from the most recent capability listing.
    pub fn capabilities(&self) -> AuthCapabilities {
        capabilities::parse(self.protocol, &self.listing)
    }

    /// Says goodbye and closes the socket, ignoring any failure.
    pub async fn close(mut self) {
        match self.protocol {
            Protocol::Smtp => smtp::quit(&mut self.stream).await,
            Protocol::Imap => {
                let tag = self.tag();
                imap::logout(&mut self.stream, &tag).await
            }
            Protocol::Pop3 => pop3::quit(&mut self.stream).await,
        }
        self.stream.shutdown().await;
    }
}
