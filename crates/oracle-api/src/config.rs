//! Host configuration
//!
//! Defaults, then an optional YAML file named by `ORACLE_CONFIG`, then
//! individual environment variables.

use oracle_core::OracleError;
use oracle_stages::CatalogSettings;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address
    pub addr: String,

    /// Upper bound on one price-feed request, in seconds
    pub request_timeout: u64,

    /// Price feeds and scoring model
    pub programs: CatalogSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8787".to_string(),
            request_timeout: 30,
            programs: CatalogSettings::default(),
        }
    }
}

impl Config {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, OracleError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| OracleError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, OracleError> {
        serde_yaml::from_str(raw).map_err(|e| OracleError::Config(e.to_string()))
    }

    /// Load configuration from the environment
    pub fn from_env() -> Result<Self, OracleError> {
        let mut config = match env::var("ORACLE_CONFIG") {
            Ok(path) => Self::from_yaml_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(addr) = env::var("ORACLE_ADDR") {
            config.addr = addr;
        }

        if let Ok(timeout) = env::var("ORACLE_REQUEST_TIMEOUT") {
            config.request_timeout = timeout.parse().map_err(|_| {
                OracleError::Config(format!("bad ORACLE_REQUEST_TIMEOUT '{}'", timeout))
            })?;
        }

        let feeds = &mut config.programs;
        if let Ok(url) = env::var("ALPHAVANTAGE_URL") {
            feeds.alpha_vantage.base_url = url;
        }
        if let Ok(key) = env::var("ALPHAVANTAGE_API_KEY") {
            feeds.alpha_vantage.api_key = key;
        }
        if let Ok(url) = env::var("CMC_URL") {
            feeds.coin_market_cap.base_url = url;
        }
        if let Ok(key) = env::var("CMC_API_KEY") {
            feeds.coin_market_cap.api_key = key;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_overrides_defaults() {
        let config = Config::from_yaml_str(
            r#"
addr: "127.0.0.1:9000"
programs:
  alpha_vantage:
    base_url: "http://localhost:1080"
  coin_market_cap:
    base_url: "http://localhost:1081"
    api_key: "secret"
  ltv:
    base: 0.65
    max_ltv: 75
"#,
        )
        .unwrap();

        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.request_timeout, 30);
        assert_eq!(config.programs.alpha_vantage.api_key, "");
        assert_eq!(config.programs.coin_market_cap.api_key, "secret");
        assert_eq!(config.programs.ltv.base, 0.65);
        assert_eq!(config.programs.ltv.max_ltv, 75);
        assert_eq!(config.programs.ltv.min_ltv, 50);
    }

    #[test]
    fn test_bad_yaml_is_config_error() {
        assert!(matches!(
            Config::from_yaml_str("addr: [unterminated"),
            Err(OracleError::Config(_))
        ));
    }
}
