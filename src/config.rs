// Configuration management module
// This file handles loading router settings and the demo binary's request
// parameters from ROUTER__* environment variables
//
// Numan Thabit 2025 Nov

use anyhow::{ensure, Context, Result};
use backoff::ExponentialBackoff;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "ROUTER";

/// Hop limit used when the caller does not pass one.
pub const DEFAULT_MAX_HOPS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// Maximum swaps per route.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    /// Total retry budget for reading the supported-token set.
    #[serde(default = "default_registry_retry_ms")]
    pub registry_retry_max_elapsed_ms: u64,
    /// Caller-imposed timeout for each blocking swap or transfer. Unset means
    /// calls may block indefinitely.
    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
}

fn default_max_hops() -> usize {
    DEFAULT_MAX_HOPS
}

fn default_registry_retry_ms() -> u64 {
    2_000
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            registry_retry_max_elapsed_ms: default_registry_retry_ms(),
            call_timeout_ms: None,
        }
    }
}

impl RouterConfig {
    pub fn load() -> Result<Self> {
        let cfg: Self = load_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_hops >= 1, "ROUTER__MAX_HOPS must be at least 1");
        if let Some(ms) = self.call_timeout_ms {
            ensure!(ms > 0, "ROUTER__CALL_TIMEOUT_MS must be positive when set");
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Backoff policy for registry reads that gate the whole graph build.
    pub fn registry_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_millis(500),
            max_elapsed_time: Some(Duration::from_millis(self.registry_retry_max_elapsed_ms)),
            multiplier: 2.0,
            ..Default::default()
        }
    }
}

/// Parameters of the demo binary's single payment request.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    /// YAML venue snapshot to route against.
    pub snapshot_path: PathBuf,
    pub from: String,
    pub to: String,
    pub amount: u64,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    /// Execute the route against the snapshot after quoting it.
    #[serde(default)]
    pub execute: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub router: RouterConfig,
    pub demo: DemoConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let router = RouterConfig::load().context("load router settings")?;
        let demo: DemoConfig = load_env().context("load demo request settings")?;
        if demo.execute {
            ensure!(
                demo.sender.is_some() && demo.recipient.is_some(),
                "ROUTER__SENDER and ROUTER__RECIPIENT are required when ROUTER__EXECUTE is set"
            );
        }
        Ok(Self { router, demo })
    }
}

fn load_env<T: serde::de::DeserializeOwned>() -> Result<T> {
    let cfg = config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;
    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = RouterConfig::default();
        assert_eq!(cfg.max_hops, 3);
        assert!(cfg.call_timeout().is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_hop_limit_is_rejected() {
        let cfg = RouterConfig {
            max_hops: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn backoff_budget_follows_setting() {
        let cfg = RouterConfig {
            registry_retry_max_elapsed_ms: 750,
            ..Default::default()
        };
        assert_eq!(
            cfg.registry_backoff().max_elapsed_time,
            Some(Duration::from_millis(750))
        );
    }
}
