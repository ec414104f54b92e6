//! Core data types shared by the probe layer and the consistency checker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mail protocols a server can be probed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Smtp,
    Imap,
    Pop3,
}

impl Protocol {
    /// Port used when the caller does not name one.
    pub fn default_port(self, transport: Transport) -> u16 {
        match (self, transport) {
            (Protocol::Imap, Transport::Ssl) => 993,
            (Protocol::Imap, _) => 143,
            (Protocol::Pop3, Transport::Ssl) => 995,
            (Protocol::Pop3, _) => 110,
            (Protocol::Smtp, Transport::Ssl) => 465,
            (Protocol::Smtp, _) => 587,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Smtp => "smtp",
            Protocol::Imap => "imap",
            Protocol::Pop3 => "pop3",
        })
    }
}

/// How the connection is secured.
///
/// Serialized with the socket type names used by the configuration database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    #[serde(rename = "plain", alias = "PLAIN")]
    Plain,
    /// Implicit TLS: encrypted from the first byte.
    #[serde(rename = "SSL", alias = "ssl")]
    Ssl,
    #[serde(rename = "STARTTLS", alias = "starttls")]
    StartTls,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Transport::Plain => "plain",
            Transport::Ssl => "SSL",
            Transport::StartTls => "STARTTLS",
        })
    }
}

/// One server, one protocol, one transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub hostname: String,
    pub port: u16,
    pub protocol: Protocol,
    pub transport: Transport,
}

impl ProbeTarget {
    /// Builds a target, falling back to the protocol/transport default port.
    pub fn new(
        hostname: impl Into<String>,
        port: Option<u16>,
        protocol: Protocol,
        transport: Transport,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port: port
                .filter(|p| *p != 0)
                .unwrap_or_else(|| protocol.default_port(transport)),
            protocol,
            transport,
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@{}:{}",
            self.protocol, self.transport, self.hostname, self.port
        )
    }
}

/// Authentication mechanism families a server may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthCategory {
    Gssapi,
    PasswordEncrypted,
    Ntlm,
    PasswordCleartext,
}

impl AuthCategory {
    /// Order in which a declared method is compared against what the server
    /// offers. Entries before the declared one produce recommendations.
    pub const PRECEDENCE: [AuthCategory; 4] = [
        AuthCategory::Gssapi,
        AuthCategory::PasswordEncrypted,
        AuthCategory::Ntlm,
        AuthCategory::PasswordCleartext,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AuthCategory::Gssapi => "GSSAPI",
            AuthCategory::PasswordEncrypted => "password-encrypted",
            AuthCategory::Ntlm => "NTLM",
            AuthCategory::PasswordCleartext => "password-cleartext",
        }
    }
}

impl fmt::Display for AuthCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication method declared by a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMethod {
    #[serde(rename = "password-cleartext")]
    PasswordCleartext,
    #[serde(rename = "password-encrypted")]
    PasswordEncrypted,
    #[serde(rename = "NTLM")]
    Ntlm,
    #[serde(rename = "GSSAPI")]
    Gssapi,
    /// Authorised by client IP address (outgoing only).
    #[serde(rename = "none")]
    ClientIpAddress,
    /// SMTP-after-POP (outgoing only).
    #[serde(rename = "smtp-after-pop")]
    SmtpAfterPop,
}

impl AuthMethod {
    /// The capability category this method needs, if it is probe-checkable.
    pub fn category(self) -> Option<AuthCategory> {
        match self {
            AuthMethod::PasswordCleartext => Some(AuthCategory::PasswordCleartext),
            AuthMethod::PasswordEncrypted => Some(AuthCategory::PasswordEncrypted),
            AuthMethod::Ntlm => Some(AuthCategory::Ntlm),
            AuthMethod::Gssapi => Some(AuthCategory::Gssapi),
            AuthMethod::ClientIpAddress | AuthMethod::SmtpAfterPop => None,
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category() {
            Some(category) => f.write_str(category.as_str()),
            None if *self == AuthMethod::ClientIpAddress => f.write_str("none"),
            None => f.write_str("smtp-after-pop"),
        }
    }
}

/// Mechanisms a server advertised, one token per category.
///
/// `None` in a field means the category was not observed. A value that has
/// every field unset still means the server was reachable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCapabilities {
    pub password_cleartext: Option<String>,
    pub password_encrypted: Option<String>,
    pub ntlm: Option<String>,
    pub gssapi: Option<String>,
}

impl AuthCapabilities {
    pub fn get(&self, category: AuthCategory) -> Option<&str> {
        match category {
            AuthCategory::PasswordCleartext => self.password_cleartext.as_deref(),
            AuthCategory::PasswordEncrypted => self.password_encrypted.as_deref(),
            AuthCategory::Ntlm => self.ntlm.as_deref(),
            AuthCategory::Gssapi => self.gssapi.as_deref(),
        }
    }

    pub fn supports(&self, category: AuthCategory) -> bool {
        self.get(category).is_some()
    }

    /// Records `token` for `category` unless that category is already filled.
    pub(crate) fn fill(&mut self, category: AuthCategory, token: &str) {
        let slot = match category {
            AuthCategory::PasswordCleartext => &mut self.password_cleartext,
            AuthCategory::PasswordEncrypted => &mut self.password_encrypted,
            AuthCategory::Ntlm => &mut self.ntlm,
            AuthCategory::Gssapi => &mut self.gssapi,
        };
        if slot.is_none() {
            *slot = Some(token.to_ascii_uppercase());
        }
    }

    /// True when nothing could be parsed from the capability listing.
    pub fn is_empty(&self) -> bool {
        AuthCategory::PRECEDENCE.iter().all(|c| !self.supports(*c))
    }
}

/// Settings of one server role as declared by a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub hostname: String,
    pub port: u16,
    pub socket_type: Transport,
    pub authentication: AuthMethod,
}

/// Read-only view of a submitted configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Protocol of the incoming server; `imap` or `pop3`.
    pub incoming_type: Protocol,
    pub incoming: ServerSettings,
    pub outgoing: ServerSettings,
    #[serde(default)]
    pub domains: Vec<String>,
}

/// The two server roles of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Incoming,
    Outgoing,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Incoming => "Incoming",
            Role::Outgoing => "Outgoing",
        })
    }
}

impl ConfigSnapshot {
    /// Parses a snapshot and rejects SMTP as the incoming protocol.
    pub fn from_json(json: &str) -> crate::core::error::Result<Self> {
        let snapshot: ConfigSnapshot = serde_json::from_str(json)?;
        if snapshot.incoming_type == Protocol::Smtp {
            return Err(crate::core::error::AppError::InvalidSnapshot(
                "incoming_type must be imap or pop3".to_string(),
            ));
        }
        Ok(snapshot)
    }

    /// Protocol and settings for a role. Outgoing is always SMTP.
    pub fn server(&self, role: Role) -> (Protocol, &ServerSettings) {
        match role {
            Role::Incoming => (self.incoming_type, &self.incoming),
            Role::Outgoing => (Protocol::Smtp, &self.outgoing),
        }
    }
}

/// Outcome of a sanity check: hard errors and soft warnings, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl CheckResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: String) {
        tracing::debug!(target: "sanity", "error: {}", message);
        self.errors.push(message);
    }

    pub fn warn(&mut self, message: String) {
        tracing::debug!(target: "sanity", "warning: {}", message);
        self.warnings.push(message);
    }

    /// Appends another result, keeping emission order.
    pub fn extend(&mut self, other: CheckResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.errors, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_follow_protocol_and_transport() {
        assert_eq!(Protocol::Imap.default_port(Transport::Ssl), 993);
        assert_eq!(Protocol::Imap.default_port(Transport::StartTls), 143);
        assert_eq!(Protocol::Imap.default_port(Transport::Plain), 143);
        assert_eq!(Protocol::Pop3.default_port(Transport::Ssl), 995);
        assert_eq!(Protocol::Pop3.default_port(Transport::Plain), 110);
        assert_eq!(Protocol::Smtp.default_port(Transport::Ssl), 465);
        assert_eq!(Protocol::Smtp.default_port(Transport::StartTls), 587);
        assert_eq!(Protocol::Smtp.default_port(Transport::Plain), 587);
    }

    #[test]
    fn probe_target_uses_default_port_when_missing() {
        let target = ProbeTarget::new("mail.example.com", None, Protocol::Pop3, Transport::Ssl);
        assert_eq!(target.port, 995);
        let target =
            ProbeTarget::new("mail.example.com", Some(2525), Protocol::Smtp, Transport::Plain);
        assert_eq!(target.port, 2525);
    }

    #[test]
    fn fill_keeps_first_token() {
        let mut capa = AuthCapabilities::default();
        assert!(capa.is_empty());
        capa.fill(AuthCategory::PasswordCleartext, "login");
        capa.fill(AuthCategory::PasswordCleartext, "PLAIN");
        assert_eq!(capa.get(AuthCategory::PasswordCleartext), Some("LOGIN"));
        assert!(!capa.is_empty());
        assert!(!capa.supports(AuthCategory::Gssapi));
    }

    #[test]
    fn snapshot_deserializes_database_values() {
        let json = r#"{
            "incoming_type": "imap",
            "incoming": {"hostname": "imap.example.com", "port": 143,
                         "socket_type": "STARTTLS", "authentication": "password-cleartext"},
            "outgoing": {"hostname": "smtp.example.com", "port": 587,
                         "socket_type": "plain", "authentication": "smtp-after-pop"},
            "domains": ["example.com"]
        }"#;
        let snapshot: ConfigSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.incoming.socket_type, Transport::StartTls);
        assert_eq!(snapshot.outgoing.authentication, AuthMethod::SmtpAfterPop);
        let (protocol, settings) = snapshot.server(Role::Outgoing);
        assert_eq!(protocol, Protocol::Smtp);
        assert_eq!(settings.hostname, "smtp.example.com");
    }

    #[test]
    fn snapshot_with_smtp_incoming_is_rejected() {
        let json = r#"{
            "incoming_type": "smtp",
            "incoming": {"hostname": "a.example.com", "port": 25,
                         "socket_type": "plain", "authentication": "none"},
            "outgoing": {"hostname": "a.example.com", "port": 25,
                         "socket_type": "plain", "authentication": "none"}
        }"#;
        assert!(matches!(
            ConfigSnapshot::from_json(json),
            Err(crate::core::error::AppError::InvalidSnapshot(_))
        ));
        let pop = json.replacen("\"smtp\"", "\"pop3\"", 1);
        let snapshot = ConfigSnapshot::from_json(&pop).unwrap();
        assert!(snapshot.domains.is_empty());
        assert_eq!(snapshot.incoming_type, Protocol::Pop3);
    }

    #[test]
    fn check_result_serializes_to_errors_and_warnings() {
        let mut result = CheckResult::new();
        result.error("bad".to_string());
        result.warn("meh".to_string());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["errors"][0], "bad");
        assert_eq!(value["warnings"][0], "meh");
    }
}
