//! NS and MX lookups used by the domain consistency checks.

use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::IpAddr;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Seam between the consistency checker and DNS.
///
/// Both lookups return `None` when resolution fails, and names are returned
/// lower-cased without the trailing root dot.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn nameservers(&self, domain: &str) -> Option<BTreeSet<String>>;

    /// MX exchanges ordered by preference.
    async fn mx_hosts(&self, domain: &str) -> Option<Vec<String>>;
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}

fn fqdn(domain: &str) -> String {
    format!("{}.", normalize_name(domain))
}

/// Resolves through `trust-dns-resolver`.
pub struct ResolverLookup {
    resolver: TokioAsyncResolver,
}

impl ResolverLookup {
    /// Uses the configured DNS servers, or the system resolver configuration
    /// when none are set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let (resolver_config, mut opts) = if config.dns_servers.is_empty() {
            trust_dns_resolver::system_conf::read_system_conf().map_err(|e| {
                AppError::Initialization(format!("Failed to read system DNS configuration: {}", e))
            })?
        } else {
            let ips = config
                .dns_servers
                .iter()
                .map(|s| s.parse::<IpAddr>())
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let group = NameServerConfigGroup::from_ips_clear(&ips, 53, true);
            (
                ResolverConfig::from_parts(None, vec![], group),
                ResolverOpts::default(),
            )
        };
        opts.timeout = config.dns_timeout;
        opts.attempts = 2;

        tracing::debug!(
            target: "dns",
            "Resolver timeout {:?}, {} configured servers",
            config.dns_timeout,
            config.dns_servers.len()
        );
        Ok(Self {
            resolver: TokioAsyncResolver::tokio(resolver_config, opts),
        })
    }
}

#[async_trait]
impl DnsLookup for ResolverLookup {
    async fn nameservers(&self, domain: &str) -> Option<BTreeSet<String>> {
        match self.resolver.ns_lookup(fqdn(domain)).await {
            Ok(lookup) => {
                let servers: BTreeSet<String> =
                    lookup.iter().map(|ns| normalize_name(&ns.to_string())).collect();
                tracing::debug!(target: "dns", "NS {}: {:?}", domain, servers);
                Some(servers)
            }
            Err(e) => {
                tracing::debug!(target: "dns", "NS lookup for {} failed: {}", domain, e);
                None
            }
        }
    }

    async fn mx_hosts(&self, domain: &str) -> Option<Vec<String>> {
        match self.resolver.mx_lookup(fqdn(domain)).await {
            Ok(lookup) => {
                let mut records: Vec<_> = lookup
                    .iter()
                    .map(|mx| (mx.preference(), normalize_name(&mx.exchange().to_string())))
                    .collect();
                records.sort_by_key(|(preference, _)| *preference);
                let hosts: Vec<String> = records.into_iter().map(|(_, host)| host).collect();
                tracing::debug!(target: "dns", "MX {}: {:?}", domain, hosts);
                Some(hosts)
            }
            Err(e) => {
                tracing::debug!(target: "dns", "MX lookup for {} failed: {}", domain, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_name(" NS1.Test.ORG. "), "ns1.test.org");
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
    }

    #[tokio::test]
    async fn explicit_servers_build_a_resolver() {
        let config = Config {
            dns_servers: vec!["192.0.2.53".to_string()],
            ..Config::default()
        };
        assert!(ResolverLookup::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn invalid_server_address_is_rejected() {
        let config = Config {
            dns_servers: vec!["resolver.example".to_string()],
            ..Config::default()
        };
        assert!(matches!(
            ResolverLookup::from_config(&config),
            Err(AppError::AddrParse(_))
        ));
    }
}
