//! Environment-backed CLI configuration.

use anyhow::{Context, Result, bail};
use sompi_core::constants::{DEFAULT_DUST_THRESHOLD, MINIMUM_FEERATE};
use sompi_core::network::NetworkType;

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => bail!("invalid log format {other:?} (must be 'text' or 'json')"),
        }
    }
}

/// Settings shared by every subcommand. Flags override these.
#[derive(Clone, Debug, PartialEq)]
pub struct CliConfig {
    pub network: NetworkType,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Sompi per gram of mass.
    pub fee_rate: f64,
    pub dust_threshold: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            network: NetworkType::Mainnet,
            log_level: "warn".to_string(),
            log_format: LogFormat::Text,
            fee_rate: MINIMUM_FEERATE,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
        }
    }
}

impl CliConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unset variables keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = lookup("SOMPI_NETWORK") {
            config.network = v.parse().with_context(|| format!("SOMPI_NETWORK={v}"))?;
        }
        if let Some(v) = lookup("SOMPI_LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("SOMPI_LOG_FORMAT") {
            config.log_format = LogFormat::parse(&v)?;
        }
        if let Some(v) = lookup("SOMPI_FEE_RATE") {
            let rate: f64 = v.parse().with_context(|| format!("SOMPI_FEE_RATE={v}"))?;
            if !rate.is_finite() || rate < 0.0 {
                bail!("SOMPI_FEE_RATE must be a non-negative number, got {v}");
            }
            config.fee_rate = rate;
        }
        if let Some(v) = lookup("SOMPI_DUST_THRESHOLD") {
            config.dust_threshold = v.parse().with_context(|| format!("SOMPI_DUST_THRESHOLD={v}"))?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = CliConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.dust_threshold, 600);
    }

    #[test]
    fn reads_all_variables() {
        let config = CliConfig::from_lookup(lookup(&[
            ("SOMPI_NETWORK", "testnet"),
            ("SOMPI_LOG_LEVEL", "debug"),
            ("SOMPI_LOG_FORMAT", "json"),
            ("SOMPI_FEE_RATE", "2.5"),
            ("SOMPI_DUST_THRESHOLD", "1000"),
        ]))
        .unwrap();
        assert_eq!(config.network, NetworkType::Testnet);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.fee_rate, 2.5);
        assert_eq!(config.dust_threshold, 1000);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(CliConfig::from_lookup(lookup(&[("SOMPI_NETWORK", "moonnet")])).is_err());
        assert!(CliConfig::from_lookup(lookup(&[("SOMPI_LOG_FORMAT", "xml")])).is_err());
        assert!(CliConfig::from_lookup(lookup(&[("SOMPI_FEE_RATE", "-1")])).is_err());
        assert!(CliConfig::from_lookup(lookup(&[("SOMPI_FEE_RATE", "NaN")])).is_err());
        assert!(CliConfig::from_lookup(lookup(&[("SOMPI_DUST_THRESHOLD", "lots")])).is_err());
    }
}
