//! Validation of a fully built `Config`.

use super::Config;
use crate::core::error::{AppError, Result};
use std::net::IpAddr;

pub(crate) fn validate_config(config: &Config) -> Result<()> {
    if config.probe_timeout.is_zero() {
        return Err(AppError::Config(
            "probe_timeout must be greater than zero".to_string(),
        ));
    }
    if config.dns_timeout.is_zero() {
        return Err(AppError::Config(
            "dns_timeout must be greater than zero".to_string(),
        ));
    }
    for server in &config.dns_servers {
        server.parse::<IpAddr>().map_err(|e| {
            AppError::Config(format!("Invalid DNS server '{}': {}", server, e))
        })?;
    }
    if config.ehlo_name.trim().is_empty() || config.ehlo_name.contains(char::is_whitespace) {
        return Err(AppError::Config(format!(
            "Invalid EHLO name '{}'",
            config.ehlo_name
        )));
    }
    Ok(())
}
