pub mod circuit_breaker;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;

use crate::circuit_breaker::CircuitBreakerService;
use crate::client::GuardedClient;
use crate::config::GuardConfig;
use crate::error::Result;
use tracing::info;

/// Build the breaker registry and one guarded client per configured service
pub fn build_clients(config: &GuardConfig) -> Result<(CircuitBreakerService, Vec<GuardedClient>)> {
    config.validate()?;
    crate::metrics::describe_metrics();

    let breakers = CircuitBreakerService::new(config.circuit_breaker.clone());
    let clients = config
        .services
        .iter()
        .map(|service| GuardedClient::new(service, breakers.clone()))
        .collect::<Result<Vec<_>>>()?;

    info!("Loaded {} backend services", clients.len());

    Ok((breakers, clients))
}

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend_guard=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();
}
