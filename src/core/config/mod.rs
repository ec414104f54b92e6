//! Defines the core runtime `Config` struct, its defaults, and related utilities.
//! Submodules handle loading, building, and validation.

pub(crate) mod builder;
pub(crate) mod file;
pub(crate) mod loading;
pub(crate) mod validation;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use std::path::PathBuf;
use std::time::Duration;

/// Timeout applied to each probe I/O operation unless configured otherwise.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration settings used by the sanity checker.
#[derive(Clone, Debug)]
pub struct Config {
    pub probe_timeout: Duration,

    pub dns_timeout: Duration,
    pub dns_servers: Vec<String>,

    pub ehlo_name: String,

    pub public_suffix_list: Option<PathBuf>,

    pub loaded_config_path: Option<String>,
}

impl Config {
    fn build_default() -> Self {
        Config {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            dns_timeout: Duration::from_secs(5),
            dns_servers: Vec::new(),
            ehlo_name: "localhost".to_string(),
            public_suffix_list: None,
            loaded_config_path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::build_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert_eq!(config.dns_timeout, Duration::from_secs(5));
        assert!(config.dns_servers.is_empty());
        assert_eq!(config.ehlo_name, "localhost");
        assert!(config.public_suffix_list.is_none());
    }
}
