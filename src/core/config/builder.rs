//! Layered construction of `Config`: defaults, then file, then explicit overrides.

use super::file::ConfigFile;
use super::loading::load_config_file;
use super::validation::validate_config;
use super::Config;
use crate::core::error::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    file: Option<ConfigFile>,
    file_path: Option<String>,
    probe_timeout: Option<Duration>,
    dns_timeout: Option<Duration>,
    dns_servers: Option<Vec<String>>,
    ehlo_name: Option<String>,
    public_suffix_list: Option<PathBuf>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a TOML file; its values sit between defaults and overrides.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        self.file = Some(load_config_file(path)?);
        self.file_path = Some(path.display().to_string());
        Ok(self)
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    pub fn dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = Some(timeout);
        self
    }

    pub fn dns_servers(mut self, servers: Vec<String>) -> Self {
        self.dns_servers = Some(servers);
        self
    }

    pub fn ehlo_name(mut self, name: impl Into<String>) -> Self {
        self.ehlo_name = Some(name.into());
        self
    }

    pub fn public_suffix_list(mut self, path: impl Into<PathBuf>) -> Self {
        self.public_suffix_list = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Config> {
        let mut config = Config::default();

        if let Some(file) = self.file {
            if let Some(secs) = file.network.probe_timeout {
                config.probe_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = file.dns.dns_timeout {
                config.dns_timeout = Duration::from_secs(secs);
            }
            if let Some(servers) = file.dns.dns_servers {
                config.dns_servers = servers;
            }
            if let Some(name) = file.smtp.ehlo_name {
                config.ehlo_name = name;
            }
            if let Some(path) = file.domains.public_suffix_list {
                config.public_suffix_list = Some(PathBuf::from(path));
            }
            config.loaded_config_path = self.file_path;
        }

        if let Some(timeout) = self.probe_timeout {
            config.probe_timeout = timeout;
        }
        if let Some(timeout) = self.dns_timeout {
            config.dns_timeout = timeout;
        }
        if let Some(servers) = self.dns_servers {
            config.dns_servers = servers;
        }
        if let Some(name) = self.ehlo_name {
            config.ehlo_name = name;
        }
        if let Some(path) = self.public_suffix_list {
            config.public_suffix_list = Some(path);
        }

        validate_config(&config)?;
        tracing::debug!("Final configuration: {:?}", config);
        Ok(config)
    }
}
