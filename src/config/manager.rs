//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::time::Duration;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Builds the effective configuration
pub struct ConfigManager;

impl ConfigManager {
    /// Start from defaults, apply CLI overrides and validate the result
    pub fn from_cli(log_level: Option<&str>, verbose: bool) -> Result<Config> {
        let mut config = Config::default();
        config.merge_with_cli_args(log_level, verbose);

        config
            .validate()
            .context("Configuration validation failed")?;

        match serde_json::to_string(&config) {
            Ok(json) => tracing::debug!(config = %json, "Effective configuration"),
            Err(e) => tracing::warn!("Failed to serialize configuration: {}", e),
        }

        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_network_config()
            .with_context(|| "Network configuration validation failed")?;

        self.validate_relay_config()
            .with_context(|| "Relay configuration validation failed")?;

        self.validate_ui_config()
            .with_context(|| "UI configuration validation failed")?;

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            bail!("logging.level must be one of: {}", VALID_LOG_LEVELS.join(", "));
        }

        Ok(())
    }

    fn validate_network_config(&self) -> Result<()> {
        if self.network.dial_timeout < Duration::from_millis(1) {
            bail!("dial_timeout must be at least 1ms");
        }

        if self.network.dial_timeout > Duration::from_secs(300) {
            bail!("dial_timeout cannot exceed 5 minutes");
        }

        Ok(())
    }

    fn validate_relay_config(&self) -> Result<()> {
        if self.relay.buffer_size < 512 {
            bail!("buffer_size must be at least 512 bytes");
        }

        if self.relay.buffer_size > 1048576 {
            bail!("buffer_size cannot exceed 1MB");
        }

        Ok(())
    }

    fn validate_ui_config(&self) -> Result<()> {
        if self.ui.input_limit == 0 {
            bail!("input_limit must be greater than 0");
        }

        if self.ui.tick_rate.is_zero() {
            bail!("tick_rate must be greater than 0");
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(&mut self, log_level: Option<&str>, verbose: bool) {
        if let Some(level) = log_level {
            self.logging.level = level.to_lowercase();
            tracing::debug!("CLI override: log level set to {}", self.logging.level);
        }

        // --verbose wins over an explicit level
        if verbose {
            self.logging.level = "debug".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network.dial_timeout, Duration::from_secs(10));
        assert_eq!(config.ui.input_limit, 156);
        assert!(config.network.listen_addr.is_unspecified());
        assert!(config.network.listen_addr.is_ipv6());
    }

    #[test]
    fn test_rejects_tiny_buffer() {
        let mut config = Config::default();
        config.relay.buffer_size = 16;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.merge_with_cli_args(Some("chatty"), false);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_verbose_overrides_level() {
        let mut config = Config::default();
        config.merge_with_cli_args(Some("ERROR"), true);
        assert_eq!(config.logging.level, "debug");

        let mut config = Config::default();
        config.merge_with_cli_args(Some("ERROR"), false);
        assert_eq!(config.logging.level, "error");
    }

    #[test]
    fn test_from_cli() {
        let config = ConfigManager::from_cli(Some("info"), false).unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(ConfigManager::from_cli(Some("loud"), false).is_err());
    }
}
