//! Public Suffix List handling: splits host names into subdomain, registrable
//! label and public suffix.

use crate::core::error::{AppError, Result};
use std::collections::HashSet;
use std::path::Path;

/// The Public Suffix List as published at publicsuffix.org.
const PUBLIC_SUFFIX_LIST: &str = include_str!("../../resources/public_suffix_list.dat");

/// Rules after this marker are registrations by private organisations
/// (hosting and dynamic DNS providers), not registry suffixes.
const PRIVATE_DOMAINS_MARKER: &str = "// ===BEGIN PRIVATE DOMAINS===";

/// The registry (ICANN) section of a list in Public Suffix List format.
fn icann_section(list: &str) -> &str {
    list.split(PRIVATE_DOMAINS_MARKER).next().unwrap_or(list)
}

#[derive(Debug, Clone, Default)]
pub struct PublicSuffix {
    suffixes: HashSet<String>,
    exceptions: HashSet<String>,
    /// Parents of `*.` rules.
    wildcards: HashSet<String>,
}

/// A host name split at its public suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainParts {
    pub subdomain: String,
    /// The label directly left of the suffix; empty when the name is a suffix itself.
    pub domain: String,
    pub suffix: String,
}

impl DomainParts {
    /// `domain.suffix`, if the name has a registrable part.
    pub fn registrable(&self) -> Option<String> {
        (!self.domain.is_empty()).then(|| format!("{}.{}", self.domain, self.suffix))
    }
}

impl From<&str> for PublicSuffix {
    fn from(list: &str) -> Self {
        let mut ps = PublicSuffix::default();
        for line in list.lines() {
            // Rules end at the first whitespace.
            let Some(rule) = line.split_whitespace().next() else {
                continue;
            };
            if rule.starts_with("//") {
                continue;
            }
            let rule = rule.to_lowercase();
            if let Some(parent) = rule.strip_prefix("*.") {
                ps.wildcards.insert(parent.to_string());
            } else if let Some(domain) = rule.strip_prefix('!') {
                ps.exceptions.insert(domain.to_string());
            } else {
                ps.suffixes.insert(rule);
            }
        }
        ps
    }
}

impl PublicSuffix {
    /// The ICANN section of the bundled Public Suffix List.
    pub fn builtin() -> Self {
        Self::from(icann_section(PUBLIC_SUFFIX_LIST))
    }

    /// Reads a list file in Public Suffix List format. Like the bundled list,
    /// only its ICANN section is used.
    pub fn load(path: &Path) -> Result<Self> {
        let list = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read public suffix list '{}': {}",
                path.display(),
                e
            ))
        })?;
        let ps = Self::from(icann_section(&list));
        if ps.suffixes.is_empty() && ps.wildcards.is_empty() {
            return Err(AppError::Config(format!(
                "Public suffix list '{}' contains no rules",
                path.display()
            )));
        }
        tracing::info!(
            "Loaded {} public suffix rules from {}",
            ps.suffixes.len() + ps.wildcards.len() + ps.exceptions.len(),
            path.display()
        );
        Ok(ps)
    }

    fn matches_rule(&self, candidate: &str) -> bool {
        self.suffixes.contains(candidate)
            || candidate
                .split_once('.')
                .is_some_and(|(_, parent)| self.wildcards.contains(parent))
    }

    /// Splits `name` at its longest public suffix. `None` when no rule matches.
    pub fn split(&self, name: &str) -> Option<DomainParts> {
        let name = name.trim().trim_end_matches('.').to_lowercase();
        if name.is_empty() {
            return None;
        }
        let labels: Vec<&str> = name.split('.').collect();
        if labels.iter().any(|l| l.is_empty()) {
            return None;
        }

        let mut suffix_start = None;
        for start in 0..labels.len() {
            let candidate = labels[start..].join(".");
            if self.exceptions.contains(&candidate) {
                // An exception's suffix is the rule minus its leftmost label.
                suffix_start = Some(start + 1);
                break;
            }
            if self.matches_rule(&candidate) {
                suffix_start = Some(start);
                break;
            }
        }
        let start = suffix_start.filter(|s| *s < labels.len())?;

        let (domain, subdomain) = match start.checked_sub(1) {
            Some(d) => (labels[d].to_string(), labels[..d].join(".")),
            None => (String::new(), String::new()),
        };
        Some(DomainParts {
            subdomain,
            domain,
            suffix: labels[start..].join("."),
        })
    }

    /// The registrable domain (public suffix plus one label) of `name`.
    pub fn registrable_domain(&self, name: &str) -> Option<String> {
        self.split(name).and_then(|parts| parts.registrable())
    }
}
