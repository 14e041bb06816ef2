use crate::breaker::BreakerConfig;
use crate::error::AnalyzerError;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::time::Duration;

/// One configured analyzer: its stable short name (also its hostname, per
/// the `ANALYZERS` convention of "name:port" entries) and RPC port.
#[derive(Debug, Clone)]
pub struct AnalyzerTarget {
    pub name: String,
    pub host: String,
    pub port: u16,
}

/// Parses `ANALYZERS`-style input: comma list of `host:port` entries. The
/// host segment doubles as the analyzer's stable name, matching the source
/// convention where docker-compose service names are both hostname and key.
pub fn parse_analyzers(env: &str) -> Result<Vec<AnalyzerTarget>> {
    let mut out = Vec::new();
    for entry in env.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (host, port) = entry
            .split_once(':')
            .with_context(|| format!("invalid ANALYZERS entry, missing ':': {entry}"))?;
        let port: u16 = port
            .parse()
            .with_context(|| format!("invalid port in ANALYZERS entry: {entry}"))?;
        out.push(AnalyzerTarget {
            name: host.to_string(),
            host: host.to_string(),
            port,
        });
    }
    Ok(out)
}

/// Parses `DEFAULT_WEIGHTS`-style input: comma list of `name:weight` pairs.
pub fn parse_weights(env: &str) -> Result<HashMap<String, f64>> {
    let mut out = HashMap::new();
    if env.is_empty() {
        return Ok(out);
    }
    for pair in env.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (name, weight) = pair
            .split_once(':')
            .with_context(|| format!("broken pair detected: {pair}"))?;
        let weight: f64 = weight
            .trim()
            .parse()
            .with_context(|| format!("invalid weight in pair: {pair}"))?;
        out.insert(name.trim().to_string(), weight);
    }
    Ok(out)
}

/// Distributor runtime configuration, assembled once at startup from the
/// environment and never mutated afterward (the live-tunable pieces —
/// weights, active flags — live in the config store, not here).
#[derive(Debug, Clone)]
pub struct DistributorConfig {
    pub analyzers: Vec<AnalyzerTarget>,
    pub analyzer_timeout: Duration,
    pub default_weights: HashMap<String, f64>,
    pub weight_poll_interval: Duration,
    pub breaker: BreakerConfig,
    pub mongo_uri: String,
}

impl DistributorConfig {
    pub fn load_from_env() -> Result<Self> {
        let analyzers_env = std::env::var("ANALYZERS").unwrap_or_default();
        let analyzers = parse_analyzers(&analyzers_env)?;
        if analyzers.is_empty() {
            bail!("ANALYZERS must list at least one host:port entry");
        }

        let mut seen = std::collections::HashSet::new();
        for a in &analyzers {
            if !seen.insert(a.name.clone()) {
                bail!("duplicate analyzer name in ANALYZERS: {}", a.name);
            }
        }

        let analyzer_timeout_ms = env_u64("ANALYZER_TIMEOUT_MS", 200)?;
        let weight_poll_secs = env_u64("WEIGHT_POLL_SECS", 5)?;
        let cb_failure_threshold = env_u32("CB_FAILURE_THRESHOLD", 3)?;
        let cb_recovery_timeout_secs = env_f64("CB_RECOVERY_TIMEOUT_SEC", 20.0)?;
        let cb_half_open_success_threshold = env_u32("CB_HALF_OPEN_SUCC_THRESHOLD", 50)?;

        let default_weights_env = std::env::var("DEFAULT_WEIGHTS").unwrap_or_default();
        let default_weights = parse_weights(&default_weights_env)?;

        let mongo_uri =
            std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://mongo:27017/".to_string());

        let breaker = BreakerConfig::new(
            cb_failure_threshold,
            Duration::from_secs_f64(cb_recovery_timeout_secs),
            cb_half_open_success_threshold,
        )
        .map_err(anyhow::Error::msg)?;

        Ok(Self {
            analyzers,
            analyzer_timeout: Duration::from_millis(analyzer_timeout_ms),
            default_weights,
            weight_poll_interval: Duration::from_secs(weight_poll_secs),
            breaker,
            mongo_uri,
        })
    }
}

/// Analyzer-side runtime configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub name: String,
    pub mongo_uri: String,
    pub poll_interval: Duration,
    pub graylog_host: Option<String>,
    pub graylog_port: u16,
}

impl AnalyzerConfig {
    /// Fatal on malformed input — returns the analyzer side's typed config
    /// error so the caller can log and abort cleanly rather than panicking.
    pub fn load_from_env() -> Result<Self, AnalyzerError> {
        let name = std::env::var("ANALYZER_NAME").unwrap_or_else(|_| "analyzer1".to_string());
        let mongo_uri =
            std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://mongo:27017/".to_string());
        let poll_secs = env_u64("POLL_SECS", 2).map_err(|e| AnalyzerError::Config(e.to_string()))?;
        let graylog_host = std::env::var("GRAYLOG_HOST").ok();
        let graylog_port =
            env_u16("GRAYLOG_PORT", 12201).map_err(|e| AnalyzerError::Config(e.to_string()))?;

        Ok(Self {
            name,
            mongo_uri,
            poll_interval: Duration::from_secs(poll_secs),
            graylog_host,
            graylog_port,
        })
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(v) => v.parse().with_context(|| format!("invalid {key}: {v}")),
        Err(_) => Ok(default),
    }
}

fn env_u32(key: &str, default: u32) -> Result<u32> {
    match std::env::var(key) {
        Ok(v) => v.parse().with_context(|| format!("invalid {key}: {v}")),
        Err(_) => Ok(default),
    }
}

fn env_u16(key: &str, default: u16) -> Result<u16> {
    match std::env::var(key) {
        Ok(v) => v.parse().with_context(|| format!("invalid {key}: {v}")),
        Err(_) => Ok(default),
    }
}

fn env_f64(key: &str, default: f64) -> Result<f64> {
    match std::env::var(key) {
        Ok(v) => v.parse().with_context(|| format!("invalid {key}: {v}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyzers() {
        let out = parse_analyzers("analyzer1:50051, analyzer2:50052").unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "analyzer1");
        assert_eq!(out[0].port, 50051);
        assert_eq!(out[1].name, "analyzer2");
        assert_eq!(out[1].port, 50052);
    }

    #[test]
    fn rejects_malformed_analyzer_entry() {
        assert!(parse_analyzers("analyzer1").is_err());
        assert!(parse_analyzers("analyzer1:notaport").is_err());
    }

    #[test]
    fn parses_weights() {
        let out = parse_weights("analyzer1:0.4,analyzer2:0.3").unwrap();
        assert_eq!(out.get("analyzer1"), Some(&0.4));
        assert_eq!(out.get("analyzer2"), Some(&0.3));
    }

    #[test]
    fn empty_weights_env_yields_empty_map() {
        assert!(parse_weights("").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_weight_pair() {
        assert!(parse_weights("analyzer1").is_err());
        assert!(parse_weights("analyzer1:notanumber").is_err());
    }
}
