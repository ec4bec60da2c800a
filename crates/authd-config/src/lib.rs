//! Environment-driven configuration for the authentication broker core.
//!
//! Every value is read and validated once, at broker construction, via
//! [`BrokerConfig::from_env`]. Invalid values are rejected immediately
//! rather than discovered later at the first wait or the first session.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Multiplies every internal wait duration. Positive float.
pub const SLEEP_MULTIPLIER_ENV: &str = "AUTHD_EXAMPLE_BROKER_SLEEP_MULTIPLIER";
/// Overrides the synthesized home-directory prefix.
pub const HOME_BASE_DIR_ENV: &str = "AUTHD_EXAMPLE_BROKER_HOME_BASE_DIR";
/// Overrides the daemon's HTTP bind address.
pub const DAEMON_ADDR_ENV: &str = "AUTHD_DAEMON_ADDR";
/// Overrides the directory broker `.conf` snippets are written into.
pub const BROKERS_CONF_DIR_ENV: &str = "AUTHD_BROKERS_CONF_DIR";

const DEFAULT_HOME_BASE_DIR: &str = "/home";
const DEFAULT_DAEMON_ADDR: &str = "127.0.0.1:8891";
const DEFAULT_BROKERS_CONF_DIR: &str = "/etc/authd/brokers.d";

/// Validated broker configuration, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerConfig {
    pub sleep_multiplier: f64,
    pub home_base_dir: String,
    pub daemon_addr: SocketAddr,
    pub brokers_conf_dir: PathBuf,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            sleep_multiplier: 1.0,
            home_base_dir: DEFAULT_HOME_BASE_DIR.to_string(),
            daemon_addr: DEFAULT_DAEMON_ADDR.parse().expect("valid default addr"),
            brokers_conf_dir: PathBuf::from(DEFAULT_BROKERS_CONF_DIR),
        }
    }
}

impl BrokerConfig {
    /// Load and validate configuration from the environment.
    ///
    /// # Errors
    /// Returns an error if `AUTHD_EXAMPLE_BROKER_SLEEP_MULTIPLIER` is set but
    /// is not a positive, finite float, or if `AUTHD_DAEMON_ADDR` is set but
    /// is not a parseable socket address.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(raw) = std::env::var(SLEEP_MULTIPLIER_ENV) {
            let value: f64 = raw
                .parse()
                .with_context(|| format!("{SLEEP_MULTIPLIER_ENV}={raw:?} is not a valid float"))?;
            if !(value.is_finite() && value > 0.0) {
                bail!("{SLEEP_MULTIPLIER_ENV}={value} must be a positive finite float");
            }
            cfg.sleep_multiplier = value;
        }

        if let Ok(raw) = std::env::var(HOME_BASE_DIR_ENV) {
            if raw.is_empty() {
                bail!("{HOME_BASE_DIR_ENV} must not be empty when set");
            }
            cfg.home_base_dir = raw;
        }

        if let Ok(raw) = std::env::var(DAEMON_ADDR_ENV) {
            cfg.daemon_addr = raw
                .parse()
                .with_context(|| format!("{DAEMON_ADDR_ENV}={raw:?} is not a valid socket addr"))?;
        }

        if let Ok(raw) = std::env::var(BROKERS_CONF_DIR_ENV) {
            cfg.brokers_conf_dir = PathBuf::from(raw);
        }

        Ok(cfg)
    }

    /// Scale a base wait duration (milliseconds) by the configured multiplier.
    pub fn scale_wait(&self, base: std::time::Duration) -> std::time::Duration {
        base.mul_f64(self.sleep_multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let cfg = BrokerConfig::default();
        assert_eq!(cfg.sleep_multiplier, 1.0);
        assert_eq!(cfg.home_base_dir, "/home");
    }

    #[test]
    fn scale_wait_multiplies_duration() {
        let mut cfg = BrokerConfig::default();
        cfg.sleep_multiplier = 0.01;
        let scaled = cfg.scale_wait(std::time::Duration::from_secs(4));
        assert_eq!(scaled, std::time::Duration::from_millis(40));
    }
}
