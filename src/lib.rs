//! Sanity checks for submitted mail server configurations.
//!
//! Probes SMTP, IMAP and POP3 servers for the authentication mechanisms
//! they advertise, and correlates DNS (NS, MX) records of the bound domains
//! with the declared server hostnames.

pub mod core;
pub mod probe;
pub mod sanity;
pub mod utils;

pub use crate::core::config::{Config, ConfigBuilder};
pub use crate::core::error::{AppError, ProbeError, Result};
pub use crate::core::models;
pub use crate::core::models::{
    AuthCapabilities, AuthCategory, AuthMethod, CheckResult, ConfigSnapshot, ProbeTarget,
    Protocol, Role, ServerSettings, Transport,
};
pub use crate::probe::{NetworkProber, Prober};
pub use crate::sanity::SanityChecker;
pub use crate::utils::dns::{DnsLookup, ResolverLookup};
pub use crate::utils::suffix::PublicSuffix;
