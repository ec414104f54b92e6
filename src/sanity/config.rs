use super::SanityChecker;
use crate::core::models::{
    AuthCategory, CheckResult, ConfigSnapshot, ProbeTarget, Role, Transport,
};

impl SanityChecker {
    /// Probes the incoming server, then the outgoing server, and compares
    /// what they advertise with what `config` declares.
    pub async fn check_config(&self, config: &ConfigSnapshot) -> CheckResult {
        let mut result = CheckResult::new();
        for role in [Role::Incoming, Role::Outgoing] {
            self.check_server(config, role, &mut result).await;
        }
        result
    }

    async fn check_server(&self, config: &ConfigSnapshot, role: Role, result: &mut CheckResult) {
        let (protocol, server) = config.server(role);
        let host = server.hostname.as_str();
        tracing::debug!(target: "sanity", "Checking {} server {} ({})", role, host, protocol);

        // A stronger transport on its default port?
        if matches!(server.socket_type, Transport::Plain | Transport::StartTls) {
            if self.probe(host, protocol, Transport::Ssl, None).await.is_some() {
                result.warn(format!(
                    "{} server '{}' supports SSL using default port.",
                    role, host
                ));
            } else if server.socket_type == Transport::Plain
                && self
                    .probe(host, protocol, Transport::StartTls, None)
                    .await
                    .is_some()
            {
                result.warn(format!(
                    "{} server '{}' supports STARTTLS using default port.",
                    role, host
                ));
            }
        }

        let target = ProbeTarget::new(host, Some(server.port), protocol, server.socket_type);
        let capabilities = match self.prober.probe(&target).await {
            None => {
                result.error(format!(
                    "{} server '{}' does not support socket type {} on port {}.",
                    role, host, target.transport, target.port
                ));
                return;
            }
            Some(capabilities) if capabilities.is_empty() => {
                result.warn(format!(
                    "Couldn't retrieve supported authentication methods from '{}'.",
                    host
                ));
                return;
            }
            Some(capabilities) => capabilities,
        };

        let declared = server.authentication.category();
        for category in AuthCategory::PRECEDENCE {
            if declared == Some(category) {
                if !capabilities.supports(category) {
                    result.error(format!(
                        "{} server '{}' does not support auth type {}.",
                        role, host, category
                    ));
                }
                break;
            }
            if capabilities.supports(category) {
                result.warn(format!(
                    "{} server '{}' supports auth type {}.",
                    role, host, category
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::models::{
        AuthCapabilities, AuthMethod, ConfigSnapshot, ProbeTarget, Protocol, ServerSettings,
        Transport,
    };
    use crate::sanity::testing::{capabilities, FakeDns, FakeProber};
    use crate::sanity::SanityChecker;
    use crate::utils::suffix::PublicSuffix;
    use std::sync::Arc;

    fn server(
        hostname: &str,
        port: u16,
        socket_type: Transport,
        authentication: AuthMethod,
    ) -> ServerSettings {
        ServerSettings {
            hostname: hostname.to_string(),
            port,
            socket_type,
            authentication,
        }
    }

    fn snapshot(incoming: ServerSettings, outgoing: ServerSettings) -> ConfigSnapshot {
        ConfigSnapshot {
            incoming_type: Protocol::Imap,
            incoming,
            outgoing,
            domains: vec!["test.org".to_string()],
        }
    }

    fn checker(prober: Arc<FakeProber>) -> SanityChecker {
        SanityChecker::new(
            Box::new(FakeDns::default()),
            Box::new(prober),
            PublicSuffix::builtin(),
        )
    }

    fn plain_only() -> AuthCapabilities {
        capabilities(Some("PLAIN"), None, None, None)
    }

    fn ssl_smtp() -> ServerSettings {
        server("smtp.test.org", 465, Transport::Ssl, AuthMethod::PasswordCleartext)
    }

    #[tokio::test]
    async fn every_stronger_method_warns_and_missing_declared_method_errors() {
        let strong = capabilities(None, Some("CRAM-MD5"), Some("NTLM"), Some("GSSAPI"));
        let prober = Arc::new(
            FakeProber::default()
                .answer("imap.test.org", Protocol::Imap, Transport::Plain, strong)
                .answer("smtp.test.org", Protocol::Smtp, Transport::Ssl, plain_only()),
        );
        let config = snapshot(
            server("imap.test.org", 143, Transport::Plain, AuthMethod::PasswordCleartext),
            ssl_smtp(),
        );

        let result = checker(prober).check_config(&config).await;
        assert_eq!(
            result.errors,
            vec!["Incoming server 'imap.test.org' does not support auth type password-cleartext."]
        );
        assert_eq!(
            result.warnings,
            vec![
                "Incoming server 'imap.test.org' supports auth type GSSAPI.",
                "Incoming server 'imap.test.org' supports auth type password-encrypted.",
                "Incoming server 'imap.test.org' supports auth type NTLM.",
            ]
        );
    }

    #[tokio::test]
    async fn declared_method_stops_the_walk() {
        let all = capabilities(Some("PLAIN"), Some("CRAM-MD5"), Some("NTLM"), Some("GSSAPI"));
        let prober = Arc::new(
            FakeProber::default()
                .answer("imap.test.org", Protocol::Imap, Transport::Ssl, all.clone())
                .answer("smtp.test.org", Protocol::Smtp, Transport::Ssl, all),
        );
        let config = snapshot(
            server("imap.test.org", 993, Transport::Ssl, AuthMethod::PasswordEncrypted),
            server("smtp.test.org", 465, Transport::Ssl, AuthMethod::Gssapi),
        );

        let result = checker(prober).check_config(&config).await;
        assert!(result.errors.is_empty());
        assert_eq!(
            result.warnings,
            vec!["Incoming server 'imap.test.org' supports auth type GSSAPI."]
        );
    }

    #[tokio::test]
    async fn starttls_declared_recommends_ssl_without_probing_starttls_default() {
        let cleartext = capabilities(Some("PLAIN"), None, None, None);
        let prober = Arc::new(
            FakeProber::default()
                .answer("imap.test.org", Protocol::Imap, Transport::Ssl, cleartext.clone())
                .answer("imap.test.org", Protocol::Imap, Transport::StartTls, cleartext.clone())
                .answer("smtp.test.org", Protocol::Smtp, Transport::Ssl, cleartext),
        );
        let config = snapshot(
            server("imap.test.org", 143, Transport::StartTls, AuthMethod::PasswordCleartext),
            ssl_smtp(),
        );

        let result = checker(prober.clone()).check_config(&config).await;
        assert!(result.errors.is_empty());
        assert_eq!(
            result.warnings,
            vec!["Incoming server 'imap.test.org' supports SSL using default port."]
        );

        let incoming_calls: Vec<ProbeTarget> = prober
            .calls()
            .into_iter()
            .filter(|t| t.protocol == Protocol::Imap)
            .collect();
        assert_eq!(
            incoming_calls,
            vec![
                ProbeTarget::new("imap.test.org", Some(993), Protocol::Imap, Transport::Ssl),
                ProbeTarget::new("imap.test.org", Some(143), Protocol::Imap, Transport::StartTls),
            ]
        );
    }

    #[tokio::test]
    async fn plain_declared_falls_back_to_starttls_recommendation() {
        let cleartext = capabilities(Some("LOGIN"), None, None, None);
        let prober = Arc::new(
            FakeProber::default()
                .answer("pop.test.org", Protocol::Pop3, Transport::StartTls, cleartext.clone())
                .answer("pop.test.org", Protocol::Pop3, Transport::Plain, cleartext.clone())
                .answer("smtp.test.org", Protocol::Smtp, Transport::Ssl, cleartext),
        );
        let mut config = snapshot(
            server("pop.test.org", 110, Transport::Plain, AuthMethod::PasswordCleartext),
            ssl_smtp(),
        );
        config.incoming_type = Protocol::Pop3;

        let result = checker(prober.clone()).check_config(&config).await;
        assert!(result.errors.is_empty());
        assert_eq!(
            result.warnings,
            vec!["Incoming server 'pop.test.org' supports STARTTLS using default port."]
        );
        let ports: Vec<u16> = prober.calls().iter().take(3).map(|t| t.port).collect();
        assert_eq!(ports, vec![995, 110, 110]);
    }

    #[tokio::test]
    async fn unreachable_declared_server_is_an_error() {
        let prober = Arc::new(FakeProber::default());
        let config = snapshot(
            server("imap.test.org", 1143, Transport::Plain, AuthMethod::PasswordCleartext),
            server("smtp.test.org", 2525, Transport::StartTls, AuthMethod::PasswordEncrypted),
        );

        let result = checker(prober.clone()).check_config(&config).await;
        assert!(result.warnings.is_empty());
        assert_eq!(
            result.errors,
            vec![
                "Incoming server 'imap.test.org' does not support socket type plain on port 1143.",
                "Outgoing server 'smtp.test.org' does not support socket type STARTTLS on port 2525.",
            ]
        );
        // Incoming: SSL, STARTTLS, declared. Outgoing: SSL, declared.
        assert_eq!(prober.calls().len(), 5);
    }

    #[tokio::test]
    async fn unset_port_is_reported_as_the_default_that_was_tried() {
        let prober = Arc::new(FakeProber::default());
        let config = snapshot(
            server("imap.test.org", 0, Transport::Plain, AuthMethod::PasswordCleartext),
            server("smtp.test.org", 0, Transport::Ssl, AuthMethod::PasswordCleartext),
        );

        let result = checker(prober.clone()).check_config(&config).await;
        assert_eq!(
            result.errors,
            vec![
                "Incoming server 'imap.test.org' does not support socket type plain on port 143.",
                "Outgoing server 'smtp.test.org' does not support socket type SSL on port 465.",
            ]
        );
        let declared: Vec<u16> = prober.calls().iter().map(|t| t.port).collect();
        assert_eq!(declared, vec![993, 143, 143, 465]);
    }

    #[tokio::test]
    async fn empty_capabilities_are_a_warning() {
        let prober = Arc::new(
            FakeProber::default()
                .answer("imap.test.org", Protocol::Imap, Transport::Ssl, plain_only())
                .answer("smtp.test.org", Protocol::Smtp, Transport::Ssl, AuthCapabilities::default()),
        );
        let config = snapshot(
            server("imap.test.org", 993, Transport::Ssl, AuthMethod::PasswordCleartext),
            ssl_smtp(),
        );

        let result = checker(prober).check_config(&config).await;
        assert!(result.errors.is_empty());
        assert_eq!(
            result.warnings,
            vec!["Couldn't retrieve supported authentication methods from 'smtp.test.org'."]
        );
    }

    #[tokio::test]
    async fn unprobeable_declared_method_recommends_everything_offered() {
        let prober = Arc::new(
            FakeProber::default()
                .answer("imap.test.org", Protocol::Imap, Transport::Ssl, plain_only())
                .answer(
                    "smtp.test.org",
                    Protocol::Smtp,
                    Transport::Ssl,
                    capabilities(Some("PLAIN"), Some("CRAM-MD5"), None, None),
                ),
        );
        let config = snapshot(
            server("imap.test.org", 993, Transport::Ssl, AuthMethod::PasswordCleartext),
            server("smtp.test.org", 465, Transport::Ssl, AuthMethod::ClientIpAddress),
        );

        let result = checker(prober).check_config(&config).await;
        assert!(result.errors.is_empty());
        assert_eq!(
            result.warnings,
            vec![
                "Outgoing server 'smtp.test.org' supports auth type password-encrypted.",
                "Outgoing server 'smtp.test.org' supports auth type password-cleartext.",
            ]
        );
    }
}
