use super::SanityChecker;
use crate::core::models::{CheckResult, ConfigSnapshot, Role};
use crate::utils::dns::normalize_name;
use std::collections::HashSet;

impl SanityChecker {
    /// Checks the domains bound to `config` against DNS and against the
    /// declared server hostnames.
    ///
    /// The first domain is the main one: every other domain's name servers
    /// must be a subset of its name servers. Mismatches are warnings. Invalid
    /// domains, domains without MX records, and hostnames outside both the
    /// domains and their MX domains are errors.
    pub async fn check_domains(&self, config: &ConfigSnapshot) -> CheckResult {
        let mut result = CheckResult::new();
        let domains: Vec<String> = config.domains.iter().map(|d| normalize_name(d)).collect();
        let Some(main) = domains.first() else {
            return result;
        };

        match self.dns.nameservers(main).await {
            Some(main_ns) if !main_ns.is_empty() => {
                for domain in &domains[1..] {
                    let matches = self
                        .dns
                        .nameservers(domain)
                        .await
                        .is_some_and(|ns| !ns.is_empty() && ns.is_subset(&main_ns));
                    if !matches {
                        result.warn(format!(
                            "Name servers of domain '{}' differ from name servers of the main domain '{}'.",
                            domain, main
                        ));
                    }
                }
            }
            _ => result.warn(format!(
                "Could not compare name servers because DNS query of the first domain ({}) returned no records.",
                main
            )),
        }

        let mut known = HashSet::new();
        for domain in &domains {
            let valid = self
                .suffixes
                .split(domain)
                .is_some_and(|parts| parts.subdomain.is_empty() && !parts.domain.is_empty());
            if valid {
                known.insert(domain.clone());
            } else {
                result.error(format!("Domain '{}' is not valid.", domain));
            }

            let mx_hosts = self.dns.mx_hosts(domain).await.unwrap_or_default();
            known.extend(
                mx_hosts
                    .iter()
                    .filter_map(|host| self.suffixes.registrable_domain(host)),
            );
            if mx_hosts.is_empty() {
                result.error(format!("Couldn't find MX record for '{}'.", domain));
            }
        }

        for role in [Role::Incoming, Role::Outgoing] {
            let (_, server) = config.server(role);
            let registrable = self
                .suffixes
                .registrable_domain(&server.hostname)
                .unwrap_or_else(|| normalize_name(&server.hostname));
            if !known.contains(&registrable) {
                result.error(format!(
                    "{} server domain '{}' is different from the configured domains and its MX servers domains.",
                    role, registrable
                ));
            }
        }

        result
    }
}
