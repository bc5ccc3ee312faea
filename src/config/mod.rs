use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Defaults applied to every circuit breaker
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Backend services
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

/// Backend service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name, used as breaker key and metric label
    pub name: String,
    /// Base URL requests are resolved against
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Path requested by the health check
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Whether one breaker guards the whole service or one per endpoint
    #[serde(default)]
    pub breaker_scope: BreakerScope,
    /// Per-service breaker settings, overriding the global defaults
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

/// Granularity of circuit breakers for a service
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BreakerScope {
    /// One breaker for every call to the service
    #[default]
    Client,
    /// One breaker per method and sanitized path
    Endpoint,
}

fn default_timeout() -> u64 {
    30
}

fn default_health_path() -> String {
    "/health".to_string()
}

impl ServiceConfig {
    /// Create a service configuration with default settings
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            timeout_secs: default_timeout(),
            health_path: default_health_path(),
            breaker_scope: BreakerScope::default(),
            circuit_breaker: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse and check the base URL
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            GuardError::Config(format!(
                "Invalid base URL '{}' for service {}: {}",
                self.base_url, self.name, e
            ))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(GuardError::Config(format!(
                "Base URL must start with http:// or https:// for service: {}",
                self.name
            )));
        }

        Ok(url)
    }
}

impl GuardConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GuardError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GuardError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_breaker(&self.circuit_breaker, "defaults")?;

        let mut names = HashSet::new();
        for service in &self.services {
            if service.name.is_empty() {
                return Err(GuardError::Config(
                    "Service name cannot be empty".to_string(),
                ));
            }

            if !names.insert(service.name.as_str()) {
                return Err(GuardError::Config(format!(
                    "Duplicate service name: {}",
                    service.name
                )));
            }

            service.parsed_base_url()?;

            if service.timeout_secs == 0 {
                return Err(GuardError::Config(format!(
                    "Timeout must be > 0 for service: {}",
                    service.name
                )));
            }

            if let Some(breaker) = &service.circuit_breaker {
                validate_breaker(breaker, &service.name)?;
            }
        }

        Ok(())
    }
}

fn validate_breaker(config: &CircuitBreakerConfig, owner: &str) -> Result<()> {
    if config.failure_threshold == 0 {
        return Err(GuardError::Config(format!(
            "Circuit breaker failure_threshold must be > 0 ({})",
            owner
        )));
    }
    if config.half_open_max_calls == 0 {
        return Err(GuardError::Config(format!(
            "Circuit breaker half_open_max_calls must be > 0 ({})",
            owner
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
circuit_breaker:
  failure_threshold: 4
  reset_timeout_ms: 10000

services:
  - name: campaigns
    base_url: "http://localhost:8000"
    breaker_scope: endpoint
  - name: alerts
    base_url: "https://alerts.internal"
    timeout_secs: 5
    health_path: "/healthz"
    circuit_breaker:
      failure_threshold: 2
"#;

        let config = GuardConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.circuit_breaker.failure_threshold, 4);
        assert_eq!(config.circuit_breaker.reset_timeout_ms, 10_000);
        assert_eq!(config.circuit_breaker.half_open_max_calls, 3);
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].breaker_scope, BreakerScope::Endpoint);
        assert_eq!(config.services[0].timeout_secs, 30);
        assert_eq!(config.services[0].health_path, "/health");
        assert_eq!(config.services[1].timeout(), Duration::from_secs(5));

        let alerts = config.services[1].circuit_breaker.as_ref().unwrap();
        assert_eq!(alerts.failure_threshold, 2);
        assert_eq!(alerts.reset_timeout_ms, 30_000);
        assert!(config.services[0].circuit_breaker.is_none());
    }

    #[test]
    fn test_default_values() {
        let config = GuardConfig::from_yaml("services: []").unwrap();
        assert_eq!(config.circuit_breaker, CircuitBreakerConfig::default());
        assert!(config.services.is_empty());
    }

    #[test]
    fn test_validate_invalid_base_url() {
        let config = GuardConfig {
            services: vec![ServiceConfig::new("campaigns", "invalid-url")],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GuardConfig {
            services: vec![ServiceConfig::new("campaigns", "ftp://files.local")],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_names() {
        let config = GuardConfig {
            services: vec![
                ServiceConfig::new("campaigns", "http://localhost:8000"),
                ServiceConfig::new("campaigns", "http://localhost:8001"),
            ],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate service name"));
    }

    #[test]
    fn test_validate_zero_thresholds() {
        let config = GuardConfig {
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 0,
                ..Default::default()
            },
            services: vec![],
        };
        assert!(config.validate().is_err());

        let mut service = ServiceConfig::new("alerts", "http://localhost:8000");
        service.circuit_breaker = Some(CircuitBreakerConfig {
            half_open_max_calls: 0,
            ..Default::default()
        });
        let config = GuardConfig {
            services: vec![service],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut service = ServiceConfig::new("alerts", "http://localhost:8000");
        service.timeout_secs = 0;
        let config = GuardConfig {
            services: vec![service],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        let err = GuardConfig::from_yaml("services: [").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
