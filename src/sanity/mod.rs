//! Consistency checks over a submitted configuration.
//!
//! [`SanityChecker::check_domains`] correlates DNS records of the bound
//! domains with the declared hostnames; [`SanityChecker::check_config`]
//! probes the declared servers. Both always return a [`CheckResult`]; network
//! failures become error or warning sentences.

mod config;
mod domains;

use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::models::{
    AuthCapabilities, CheckResult, ConfigSnapshot, ProbeTarget, Protocol, Transport,
};
use crate::probe::{NetworkProber, Prober};
use crate::utils::dns::{DnsLookup, ResolverLookup};
use crate::utils::suffix::PublicSuffix;

pub struct SanityChecker {
    dns: Box<dyn DnsLookup>,
    prober: Box<dyn Prober>,
    suffixes: PublicSuffix,
}

impl SanityChecker {
    pub fn new(dns: Box<dyn DnsLookup>, prober: Box<dyn Prober>, suffixes: PublicSuffix) -> Self {
        Self {
            dns,
            prober,
            suffixes,
        }
    }

    /// Wires the real resolver and network prober from runtime configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let suffixes = match &config.public_suffix_list {
            Some(path) => PublicSuffix::load(path)?,
            None => PublicSuffix::builtin(),
        };
        Ok(Self::new(
            Box::new(ResolverLookup::from_config(config)?),
            Box::new(NetworkProber::from_config(config)),
            suffixes,
        ))
    }

    /// Domain checks followed by server checks, as one result.
    pub async fn check(&self, config: &ConfigSnapshot) -> CheckResult {
        tracing::info!(
            target: "sanity",
            "Running sanity checks for {} / {}",
            config.incoming.hostname,
            config.outgoing.hostname
        );
        let mut result = self.check_domains(config).await;
        result.extend(self.check_config(config).await);
        tracing::info!(
            target: "sanity",
            "Sanity checks finished: {} errors, {} warnings",
            result.errors.len(),
            result.warnings.len()
        );
        result
    }

    async fn probe(
        &self,
        hostname: &str,
        protocol: Protocol,
        transport: Transport,
        port: Option<u16>,
    ) -> Option<AuthCapabilities> {
        self.prober
            .probe(&ProbeTarget::new(hostname, port, protocol, transport))
            .await
    }
}
