//! Node configuration.
//!
//! Every setting has a default and may be overridden with a `HIVE_*`
//! environment variable. Malformed values are errors, never silently
//! replaced by the default.

use crate::retry::RetryPolicy;
use hive_consensus::Quorum;
use hive_pheromone::Fingerprinter;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A configuration value could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Configuration for a Hive node.
#[derive(Debug, Clone)]
pub struct HiveConfig {
    /// Hard cap on held cells (`None` = unbounded).
    pub max_cells: Option<u64>,

    /// Silence after which an Active member becomes Unreachable.
    pub heartbeat_timeout: Duration,

    /// Further silence after which an Unreachable member departs.
    pub departure_grace: Duration,

    /// How long Departed records are kept before collection.
    pub departed_retention: Duration,

    /// Maintenance tick period.
    pub sweep_interval: Duration,

    /// Pheromone ttl when the caller supplies none.
    pub default_ttl: Duration,

    /// Proposal quorum when the caller supplies none.
    pub default_quorum: Quorum,

    /// Proposal window when the caller supplies none.
    pub proposal_window: Duration,

    /// Keyed hasher for pheromone fingerprints.
    pub fingerprinter: Fingerprinter,

    /// Agent socket path (for hive-ctl and local agents)
    pub agent_socket: PathBuf,

    /// Client retry schedule.
    pub retry: RetryPolicy,
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            max_cells: None,
            heartbeat_timeout: Duration::from_secs(30),
            departure_grace: Duration::from_secs(120),
            departed_retention: Duration::from_secs(3600),
            sweep_interval: Duration::from_millis(1000),
            default_ttl: Duration::from_secs(60),
            default_quorum: Quorum::HALF,
            proposal_window: Duration::from_secs(300),
            fingerprinter: Fingerprinter::random(),
            agent_socket: PathBuf::from("./hive-data/agent.sock"),
            retry: RetryPolicy::default(),
        }
    }
}

impl HiveConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |var: &'static str| lookup(var).map(|v| (var, v));

        if let Some((var, v)) = get("HIVE_MAX_CELLS") {
            config.max_cells = Some(parse_num(var, &v)?);
        }
        if let Some((var, v)) = get("HIVE_HEARTBEAT_TIMEOUT_SECS") {
            config.heartbeat_timeout = Duration::from_secs(parse_positive(var, &v)?);
        }
        if let Some((var, v)) = get("HIVE_DEPARTURE_GRACE_SECS") {
            config.departure_grace = Duration::from_secs(parse_num(var, &v)?);
        }
        if let Some((var, v)) = get("HIVE_DEPARTED_RETENTION_SECS") {
            config.departed_retention = Duration::from_secs(parse_num(var, &v)?);
        }
        if let Some((var, v)) = get("HIVE_SWEEP_INTERVAL_MS") {
            config.sweep_interval = Duration::from_millis(parse_positive(var, &v)?);
        }
        if let Some((var, v)) = get("HIVE_DEFAULT_TTL_SECS") {
            config.default_ttl = Duration::from_secs(parse_positive(var, &v)?);
        }
        if let Some((var, v)) = get("HIVE_DEFAULT_QUORUM") {
            config.default_quorum = v
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|f| Quorum::new(f).ok())
                .ok_or_else(|| invalid(var, &v))?;
        }
        if let Some((var, v)) = get("HIVE_PROPOSAL_WINDOW_SECS") {
            config.proposal_window = Duration::from_secs(parse_positive(var, &v)?);
        }
        if let Some((var, v)) = get("HIVE_FINGERPRINT_SALT") {
            config.fingerprinter = Fingerprinter::from_hex(v.trim()).map_err(|_| invalid(var, &v))?;
        }
        if let Some((_, v)) = get("HIVE_AGENT_SOCKET") {
            config.agent_socket = PathBuf::from(v);
        }
        if let Some((var, v)) = get("HIVE_RETRY_BASE_MS") {
            config.retry.base = Duration::from_millis(parse_num(var, &v)?);
        }
        if let Some((var, v)) = get("HIVE_RETRY_MAX_ATTEMPTS") {
            config.retry.max_attempts = parse_positive(var, &v)?;
        }

        Ok(config)
    }
}

fn invalid(var: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
    }
}

fn parse_num<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(var, value))
}

fn parse_positive<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    let n: T = parse_num(var, value)?;
    if n == T::default() {
        return Err(invalid(var, value));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = HiveConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.max_cells, None);
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(30));
        assert_eq!(config.departure_grace, Duration::from_secs(120));
        assert_eq!(config.departed_retention, Duration::from_secs(3600));
        assert_eq!(config.sweep_interval, Duration::from_millis(1000));
        assert_eq!(config.default_ttl, Duration::from_secs(60));
        assert_eq!(config.default_quorum, Quorum::HALF);
        assert_eq!(config.proposal_window, Duration::from_secs(300));
        assert_eq!(config.agent_socket, PathBuf::from("./hive-data/agent.sock"));
        assert_eq!(config.retry.base, Duration::from_millis(500));
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn overrides_apply() {
        let config = HiveConfig::from_lookup(lookup(&[
            ("HIVE_MAX_CELLS", "19"),
            ("HIVE_HEARTBEAT_TIMEOUT_SECS", "5"),
            ("HIVE_DEFAULT_QUORUM", "0.66"),
            ("HIVE_AGENT_SOCKET", "/tmp/hive.sock"),
            ("HIVE_FINGERPRINT_SALT", &"ab".repeat(32)),
        ]))
        .unwrap();
        assert_eq!(config.max_cells, Some(19));
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(5));
        assert_eq!(config.default_quorum, Quorum::new(0.66).unwrap());
        assert_eq!(config.agent_socket, PathBuf::from("/tmp/hive.sock"));
    }

    #[test]
    fn invalid_values_rejected() {
        let cases = [
            ("HIVE_MAX_CELLS", "lots"),
            ("HIVE_HEARTBEAT_TIMEOUT_SECS", "0"),
            ("HIVE_SWEEP_INTERVAL_MS", "-1"),
            ("HIVE_DEFAULT_QUORUM", "1.5"),
            ("HIVE_DEFAULT_QUORUM", "0"),
            ("HIVE_FINGERPRINT_SALT", "abcd"),
            ("HIVE_RETRY_MAX_ATTEMPTS", "0"),
        ];
        for (var, value) in cases {
            let err = HiveConfig::from_lookup(lookup(&[(var, value)])).unwrap_err();
            assert_eq!(
                err,
                ConfigError::Invalid {
                    var,
                    value: value.to_string()
                }
            );
        }
    }
}
