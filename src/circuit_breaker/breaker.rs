use super::clock::{Clock, SystemClock};
use super::types::{CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
use crate::metrics;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Circuit breaker for a single protected backend or endpoint.
///
/// All operations are synchronous and never block on I/O. The OPEN to
/// HALF_OPEN transition is evaluated lazily inside [`CircuitBreaker::can_execute`];
/// no timer runs in the background.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Configuration
    config: CircuitBreakerConfig,
    /// Current state
    state: Mutex<State>,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Breaker identifier, used in logs and metric labels
    name: String,
}

#[derive(Debug)]
struct State {
    circuit_state: CircuitState,
    failure_count: u32,
    success_count: u64,
    last_failure_time: Option<u64>,
    half_open_calls: u32,
}

impl CircuitBreaker {
    /// Create a new circuit breaker reading the system clock
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    /// Create a new circuit breaker with an injected clock
    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let name = name.into();
        info!(
            breaker = %name,
            failure_threshold = config.failure_threshold,
            reset_timeout_ms = config.reset_timeout_ms,
            half_open_max_calls = config.half_open_max_calls,
            "Creating circuit breaker"
        );
        metrics::record_circuit_breaker_state(&name, CircuitState::Closed);

        Self {
            config,
            state: Mutex::new(State {
                circuit_state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
                half_open_calls: 0,
            }),
            clock,
            name,
        }
    }

    /// Check whether a request may be attempted now
    pub fn can_execute(&self) -> bool {
        let mut state = self.state.lock();

        match state.circuit_state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let Some(last_failure) = state.last_failure_time else {
                    warn!(breaker = %self.name, "Circuit open but no failure timestamp");
                    metrics::record_circuit_breaker_rejection(&self.name);
                    return false;
                };

                let elapsed = self.clock.now_millis().saturating_sub(last_failure);
                if elapsed >= self.config.reset_timeout_ms {
                    // The call that trips the transition is the first trial request
                    self.transition(&mut state, CircuitState::HalfOpen);
                    true
                } else {
                    let remaining = self
                        .config
                        .reset_timeout()
                        .saturating_sub(Duration::from_millis(elapsed));
                    debug!(
                        breaker = %self.name,
                        remaining = ?remaining,
                        "Circuit breaker open, rejecting request"
                    );
                    metrics::record_circuit_breaker_rejection(&self.name);
                    false
                }
            }
            CircuitState::HalfOpen => {
                if state.half_open_calls < self.config.half_open_max_calls {
                    state.half_open_calls += 1;
                    debug!(
                        breaker = %self.name,
                        half_open_calls = state.half_open_calls,
                        max = self.config.half_open_max_calls,
                        "Allowing half-open trial request"
                    );
                    true
                } else {
                    debug!(
                        breaker = %self.name,
                        "Max half-open trial requests reached, rejecting"
                    );
                    metrics::record_circuit_breaker_rejection(&self.name);
                    false
                }
            }
        }
    }

    /// Record a successful request
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        state.success_count += 1;

        match state.circuit_state {
            CircuitState::Closed => {
                state.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                debug!(breaker = %self.name, "Half-open trial request succeeded");
                self.transition(&mut state, CircuitState::Closed);
            }
            CircuitState::Open => {
                warn!(breaker = %self.name, "Recording success in open state");
            }
        }
    }

    /// Record a failed request
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure_time = Some(self.clock.now_millis());

        match state.circuit_state {
            CircuitState::Closed => {
                debug!(
                    breaker = %self.name,
                    failure_count = state.failure_count,
                    threshold = self.config.failure_threshold,
                    "Request failed in closed state"
                );

                if state.failure_count >= self.config.failure_threshold {
                    self.transition(&mut state, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                warn!(
                    breaker = %self.name,
                    "Half-open trial request failed, reopening circuit"
                );
                self.transition(&mut state, CircuitState::Open);
            }
            CircuitState::Open => {
                debug!(breaker = %self.name, "Recording failure in open state");
            }
        }
    }

    /// Snapshot of the current state and counters
    pub fn stats(&self) -> CircuitBreakerStats {
        let state = self.state.lock();
        CircuitBreakerStats {
            state: state.circuit_state,
            failure_count: state.failure_count,
            success_count: state.success_count,
            last_failure_time: state.last_failure_time,
            half_open_calls: state.half_open_calls,
        }
    }

    /// Force the circuit closed and clear every counter
    pub fn reset(&self) {
        let mut state = self.state.lock();
        info!(breaker = %self.name, from = %state.circuit_state, "Circuit breaker reset");

        self.transition(&mut state, CircuitState::Closed);
        state.failure_count = 0;
        state.success_count = 0;
        state.last_failure_time = None;
    }

    /// Get current state
    pub fn state(&self) -> CircuitState {
        self.state.lock().circuit_state
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn transition(&self, state: &mut State, to: CircuitState) {
        let from = state.circuit_state;
        state.circuit_state = to;

        match to {
            CircuitState::Closed => {
                state.failure_count = 0;
                state.half_open_calls = 0;
            }
            CircuitState::HalfOpen => {
                state.half_open_calls = 0;
            }
            CircuitState::Open => {}
        }

        if from != to {
            info!(
                breaker = %self.name,
                from = %from,
                to = %to,
                failure_count = state.failure_count,
                "Circuit breaker state change"
            );
            metrics::record_circuit_breaker_transition(&self.name, from, to);
        }
        metrics::record_circuit_breaker_state(&self.name, to);
    }
}
