use super::breaker::CircuitBreaker;
use super::clock::{Clock, SystemClock};
use super::types::{CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry of named circuit breakers.
///
/// Constructed once and handed to every client that needs it; clones share
/// the same breakers.
#[derive(Debug, Clone)]
pub struct CircuitBreakerService {
    /// Circuit breakers per backend
    breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,
    /// Default configuration
    config: CircuitBreakerConfig,
    /// Clock shared by every breaker created here
    clock: Arc<dyn Clock>,
}

impl CircuitBreakerService {
    /// Create a new circuit breaker service
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a service whose breakers read the given clock
    pub fn with_clock(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            breakers: Arc::new(DashMap::new()),
            config,
            clock,
        }
    }

    /// Register a breaker with its own configuration, replacing any existing one
    pub fn register(&self, name: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        let breaker = Arc::new(CircuitBreaker::with_clock(
            name,
            config,
            Arc::clone(&self.clock),
        ));
        self.breakers.insert(name.to_string(), Arc::clone(&breaker));
        breaker
    }

    /// Get or create the circuit breaker for a name
    pub fn breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        self.get_or_create(name, &self.config)
    }

    /// Get or create a breaker, using `config` only if it has to be created
    pub fn breaker_with(&self, name: &str, config: &CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        let breaker = self.get_or_create(name, config);
        if breaker.config() != config {
            warn!(
                breaker = name,
                "Existing circuit breaker has a different configuration, keeping it"
            );
        }
        breaker
    }

    /// Existing breaker for a name, without creating one
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|breaker| Arc::clone(breaker.value()))
    }

    fn get_or_create(&self, name: &str, config: &CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(breaker = name, "Creating new circuit breaker");
                Arc::new(CircuitBreaker::with_clock(
                    name,
                    config.clone(),
                    Arc::clone(&self.clock),
                ))
            })
            .clone()
    }

    pub fn can_execute(&self, name: &str) -> bool {
        self.breaker(name).can_execute()
    }

    pub fn record_success(&self, name: &str) {
        self.breaker(name).record_success();
    }

    pub fn record_failure(&self, name: &str) {
        self.breaker(name).record_failure();
    }

    /// Reset a breaker if it exists
    pub fn reset(&self, name: &str) {
        if let Some(breaker) = self.breakers.get(name) {
            breaker.reset();
        }
    }

    /// Reset every breaker
    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }

    /// State of a breaker; unknown names are closed
    pub fn state(&self, name: &str) -> CircuitState {
        self.breakers
            .get(name)
            .map(|breaker| breaker.state())
            .unwrap_or(CircuitState::Closed)
    }

    pub fn stats(&self, name: &str) -> Option<CircuitBreakerStats> {
        self.breakers.get(name).map(|breaker| breaker.stats())
    }

    /// Default configuration for breakers created on demand
    pub fn default_config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get all breaker names
    pub fn names(&self) -> Vec<String> {
        self.breakers.iter().map(|e| e.key().clone()).collect()
    }

    /// Stats for every breaker, sorted by name
    pub fn all_stats(&self) -> Vec<(String, CircuitBreakerStats)> {
        let mut results: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().stats()))
            .collect();
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }
}
