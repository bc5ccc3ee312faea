use crate::circuit_breaker::CircuitBreakerStats;
use reqwest::StatusCode;
use thiserror::Error;

/// Result type for guarded backend operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Backend guard error types
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Admission denied by the circuit breaker; no request was sent
    #[error("Service temporarily unavailable: {service} (circuit {})", .stats.state)]
    CircuitOpen {
        service: String,
        stats: CircuitBreakerStats,
    },

    #[error("Request error: {0}")]
    Request(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Backend error: status {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Request rejected by backend: status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GuardError {
    /// Get the HTTP status code a caller should surface for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GuardError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GuardError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GuardError::Request(_) => StatusCode::BAD_GATEWAY,
            GuardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GuardError::Backend { .. } => StatusCode::BAD_GATEWAY,
            GuardError::Rejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            GuardError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GuardError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GuardError::CircuitOpen { .. })
    }

    /// Breaker snapshot carried by a circuit-open error
    pub fn circuit_stats(&self) -> Option<&CircuitBreakerStats> {
        match self {
            GuardError::CircuitOpen { stats, .. } => Some(stats),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GuardError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GuardError::Timeout(e.to_string())
        } else if e.is_decode() {
            GuardError::Serialization(e.to_string())
        } else {
            GuardError::Request(e.to_string())
        }
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(e: serde_json::Error) -> Self {
        GuardError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitState;

    fn open_stats() -> CircuitBreakerStats {
        CircuitBreakerStats {
            state: CircuitState::Open,
            failure_count: 5,
            success_count: 12,
            last_failure_time: Some(1_700_000_000_000),
            half_open_calls: 0,
        }
    }

    #[test]
    fn test_error_status_codes() {
        let err = GuardError::CircuitOpen {
            service: "campaigns".to_string(),
            stats: open_stats(),
        };
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            GuardError::Timeout("test".to_string()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GuardError::Rejected {
                status: 404,
                body: String::new()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_circuit_open_display_and_stats() {
        let err = GuardError::CircuitOpen {
            service: "campaigns".to_string(),
            stats: open_stats(),
        };
        assert_eq!(
            err.to_string(),
            "Service temporarily unavailable: campaigns (circuit OPEN)"
        );
        assert!(err.is_circuit_open());
        assert_eq!(err.circuit_stats().unwrap().failure_count, 5);

        let other = GuardError::Config("bad".to_string());
        assert!(!other.is_circuit_open());
        assert!(other.circuit_stats().is_none());
    }
}
