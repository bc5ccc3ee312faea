use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally
    Closed,
    /// Circuit is open, requests are rejected
    Open,
    /// Circuit is half-open, allowing trial requests
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding used by the state gauge
    pub fn as_gauge(&self) -> u8 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of failures before opening the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Milliseconds since the last failure before an open circuit admits a trial request
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,

    /// Number of trial requests to allow in half-open state. The request that
    /// moves an open circuit to half-open is admitted without counting against this.
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_reset_timeout_ms() -> u64 {
    30_000
}

fn default_half_open_max_calls() -> u32 {
    3
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_ms: default_reset_timeout_ms(),
            half_open_max_calls: default_half_open_max_calls(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}

/// Point-in-time snapshot of a circuit breaker, for diagnostics and telemetry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerStats {
    /// Current circuit state
    pub state: CircuitState,
    /// Failures counted toward opening the circuit
    pub failure_count: u32,
    /// Lifetime number of recorded successes
    pub success_count: u64,
    /// Time of the most recent failure, in milliseconds since the Unix epoch
    pub last_failure_time: Option<u64>,
    /// Trial requests admitted in half-open state
    pub half_open_calls: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "CLOSED");
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
    }

    #[test]
    fn test_default_config() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.reset_timeout_ms, 30_000);
        assert_eq!(config.half_open_max_calls, 3);
        assert_eq!(config.reset_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_partial_yaml_uses_defaults() {
        let config: CircuitBreakerConfig = serde_yaml::from_str("failure_threshold: 2").unwrap();
        assert_eq!(config.failure_threshold, 2);
        assert_eq!(config.reset_timeout_ms, 30_000);
        assert_eq!(config.half_open_max_calls, 3);
    }

    #[test]
    fn test_stats_serialize_state_names() {
        let stats = CircuitBreakerStats {
            state: CircuitState::HalfOpen,
            failure_count: 4,
            success_count: 1,
            last_failure_time: Some(1_000),
            half_open_calls: 0,
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["state"], "HALF_OPEN");
        assert_eq!(json["failure_count"], 4);
        assert_eq!(json["last_failure_time"], 1_000);
    }

    #[test]
    fn test_state_gauge_values() {
        assert_eq!(CircuitState::Closed.as_gauge(), 0);
        assert_eq!(CircuitState::Open.as_gauge(), 1);
        assert_eq!(CircuitState::HalfOpen.as_gauge(), 2);
    }
}
