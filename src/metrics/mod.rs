use crate::circuit_breaker::CircuitState;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Instant;
use tracing::debug;

/// Register all metrics with descriptions.
///
/// The crate only emits through the `metrics` facade; installing a recorder
/// (Prometheus or otherwise) is left to the embedding application.
pub fn describe_metrics() {
    // Circuit breaker metrics
    describe_gauge!(
        "backend_guard_circuit_breaker_state",
        "Circuit breaker state (0 = closed, 1 = open, 2 = half-open)"
    );
    describe_counter!(
        "backend_guard_circuit_breaker_transitions_total",
        "Total number of circuit breaker state transitions"
    );
    describe_counter!(
        "backend_guard_circuit_breaker_rejections_total",
        "Total number of requests rejected by a circuit breaker"
    );

    // Backend metrics
    describe_counter!(
        "backend_guard_backend_requests_total",
        "Total number of requests sent to backends"
    );
    describe_counter!(
        "backend_guard_backend_errors_total",
        "Total number of backend requests classified as failures"
    );
    describe_histogram!(
        "backend_guard_backend_duration_seconds",
        "Backend request latencies in seconds"
    );

    debug!("All metrics registered with descriptions");
}

/// Record circuit breaker state
pub fn record_circuit_breaker_state(breaker: &str, state: CircuitState) {
    let labels = [("breaker", breaker.to_string())];
    gauge!("backend_guard_circuit_breaker_state", &labels).set(state.as_gauge() as f64);
}

/// Record circuit breaker transition
pub fn record_circuit_breaker_transition(breaker: &str, from: CircuitState, to: CircuitState) {
    let labels = [
        ("breaker", breaker.to_string()),
        ("from", from.to_string()),
        ("to", to.to_string()),
    ];
    counter!("backend_guard_circuit_breaker_transitions_total", &labels).increment(1);
}

/// Record a request rejected without reaching the backend
pub fn record_circuit_breaker_rejection(breaker: &str) {
    let labels = [("breaker", breaker.to_string())];
    counter!("backend_guard_circuit_breaker_rejections_total", &labels).increment(1);
}

/// Record a backend request metric. `status` is 0 when no response arrived.
pub fn record_backend_request(service: &str, method: &str, status: u16, failed: bool, duration: f64) {
    let labels = [
        ("service", service.to_string()),
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];

    counter!("backend_guard_backend_requests_total", &labels).increment(1);
    histogram!("backend_guard_backend_duration_seconds", &labels).record(duration);

    if failed {
        counter!("backend_guard_backend_errors_total", &labels).increment(1);
    }
}

/// Sanitize path to keep label and breaker key cardinality bounded.
/// Replaces path parameters with placeholders and drops the query string.
pub fn sanitize_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or_default();

    path.split('/')
        .map(|seg| {
            if seg.is_empty() {
                String::new()
            } else if is_likely_id(seg) {
                ":id".to_string()
            } else {
                seg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Check if a path segment is likely an ID (numeric, UUID, etc.)
fn is_likely_id(segment: &str) -> bool {
    if segment.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    // UUID-like: hex with hyphens
    if segment.len() >= 32 && segment.contains('-') {
        return segment.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
    }

    // Opaque identifiers mixing letters and digits (customer IDs, hashes)
    if segment.len() > 10 && segment.chars().all(|c| c.is_alphanumeric()) {
        let has_numbers = segment.chars().any(|c| c.is_numeric());
        let has_letters = segment.chars().any(|c| c.is_alphabetic());
        if has_numbers && has_letters {
            return true;
        }
    }

    false
}

/// Timer for measuring backend request duration
pub struct Timer {
    start: Instant,
    service: String,
    method: String,
}

impl Timer {
    /// Start a new timer for a request
    pub fn new(service: &str, method: &str) -> Self {
        Self {
            start: Instant::now(),
            service: service.to_string(),
            method: method.to_string(),
        }
    }

    /// Record the elapsed time with the given status code
    pub fn record(self, status: u16, failed: bool) {
        let duration = self.start.elapsed().as_secs_f64();
        record_backend_request(&self.service, &self.method, status, failed, duration);
    }

    /// Get the elapsed time in seconds
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/api/campaigns/123"), "/api/campaigns/:id");
        assert_eq!(
            sanitize_path("/api/campaigns/abc123def456/assets"),
            "/api/campaigns/:id/assets"
        );
        assert_eq!(
            sanitize_path("/api/accounts/550e8400-e29b-41d4-a716-446655440000"),
            "/api/accounts/:id"
        );
        assert_eq!(sanitize_path("/api/alerts"), "/api/alerts");
        assert_eq!(sanitize_path("/api/alerts?page=2"), "/api/alerts");
    }

    #[test]
    fn test_is_likely_id() {
        assert!(is_likely_id("12345"));
        assert!(is_likely_id("a1b2c3d4e5f6"));
        assert!(!is_likely_id("campaigns"));
        assert!(!is_likely_id("performance"));
    }

    #[test]
    fn test_record_functions_dont_panic() {
        // No recorder installed; the facade must swallow these
        describe_metrics();
        record_circuit_breaker_state("campaigns", CircuitState::Open);
        record_circuit_breaker_transition("campaigns", CircuitState::Closed, CircuitState::Open);
        record_circuit_breaker_rejection("campaigns");
        record_backend_request("campaigns", "GET", 503, true, 0.25);
        Timer::new("campaigns", "GET").record(200, false);
    }
}
