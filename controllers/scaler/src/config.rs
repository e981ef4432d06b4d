//! Process configuration loaded from the environment.

use crate::error::ControllerError;
use scaler_engine::EngineConfig;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

/// Controller settings
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Timing handed to the engine
    pub engine: EngineConfig,
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Listen address for `/metrics`, `/healthz` and `/readyz`
    pub metrics_addr: SocketAddr,
}

impl ControllerConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load through `lookup`, which returns the raw value of a variable
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let defaults = EngineConfig::default();

        let engine = EngineConfig {
            steady_requeue: positive_seconds(&lookup, "STEADY_REQUEUE_SECONDS", defaults.steady_requeue)?,
            error_requeue: positive_seconds(&lookup, "ERROR_REQUEUE_SECONDS", defaults.error_requeue)?,
            run_once_grace: seconds(&lookup, "RUN_ONCE_GRACE_SECONDS", defaults.run_once_grace)?,
            status_update_retries: match lookup("STATUS_UPDATE_RETRIES") {
                Some(raw) => parse_number(&raw, "STATUS_UPDATE_RETRIES")?,
                None => defaults.status_update_retries,
            },
        };
        if engine.status_update_retries == 0 {
            return Err(ControllerError::InvalidConfig(
                "STATUS_UPDATE_RETRIES must be at least 1".to_string(),
            ));
        }

        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());
        let raw_addr = lookup("METRICS_ADDR").unwrap_or_else(|| DEFAULT_METRICS_ADDR.to_string());
        let metrics_addr = raw_addr
            .parse()
            .map_err(|e| ControllerError::InvalidConfig(format!("METRICS_ADDR '{}': {}", raw_addr, e)))?;

        Ok(Self {
            engine,
            namespace,
            metrics_addr,
        })
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: Duration) -> Result<Duration, ControllerError> {
    match lookup(name) {
        Some(raw) => Ok(Duration::from_secs(parse_number(&raw, name)?)),
        None => Ok(default),
    }
}

/// Like `seconds`, but zero is rejected
fn positive_seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: Duration,
) -> Result<Duration, ControllerError> {
    let value = seconds(lookup, name, default)?;
    if value.is_zero() {
        return Err(ControllerError::InvalidConfig(format!("{} must be at least 1", name)));
    }
    Ok(value)
}

fn parse_number<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, ControllerError> {
    raw.trim()
        .parse()
        .map_err(|_| ControllerError::InvalidConfig(format!("{} must be a non-negative integer, got '{}'", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ControllerConfig, ControllerError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ControllerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.namespace, None);
        assert_eq!(config.metrics_addr.to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STEADY_REQUEUE_SECONDS", "120"),
            ("ERROR_REQUEUE_SECONDS", "10"),
            ("RUN_ONCE_GRACE_SECONDS", "0"),
            ("STATUS_UPDATE_RETRIES", "3"),
            ("WATCH_NAMESPACE", "ops"),
            ("METRICS_ADDR", "127.0.0.1:9090"),
        ])
        .unwrap();
        assert_eq!(config.engine.steady_requeue, Duration::from_secs(120));
        assert_eq!(config.engine.error_requeue, Duration::from_secs(10));
        assert_eq!(config.engine.run_once_grace, Duration::ZERO);
        assert_eq!(config.engine.status_update_retries, 3);
        assert_eq!(config.namespace.as_deref(), Some("ops"));
        assert_eq!(config.metrics_addr.port(), 9090);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(load(&[("STEADY_REQUEUE_SECONDS", "soon")]), Err(ControllerError::InvalidConfig(_))));
        assert!(matches!(load(&[("STATUS_UPDATE_RETRIES", "-1")]), Err(ControllerError::InvalidConfig(_))));
        assert!(matches!(load(&[("STATUS_UPDATE_RETRIES", "0")]), Err(ControllerError::InvalidConfig(_))));
        assert!(matches!(load(&[("METRICS_ADDR", "localhost")]), Err(ControllerError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_requeue_intervals_rejected() {
        assert!(matches!(load(&[("STEADY_REQUEUE_SECONDS", "0")]), Err(ControllerError::InvalidConfig(_))));
        assert!(matches!(load(&[("ERROR_REQUEUE_SECONDS", "0")]), Err(ControllerError::InvalidConfig(_))));
        assert_eq!(
            load(&[("STEADY_REQUEUE_SECONDS", "1")]).unwrap().engine.steady_requeue,
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_blank_namespace_means_all() {
        assert_eq!(load(&[("WATCH_NAMESPACE", " ")]).unwrap().namespace, None);
    }
}
