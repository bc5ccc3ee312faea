use crate::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerService, CircuitBreakerStats,
};
use crate::config::{BreakerScope, ServiceConfig};
use crate::error::{GuardError, Result};
use crate::metrics::{self, Timer};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Outcome of an admitted call.
///
/// Dropping it unresolved, e.g. when the caller cancels the request future,
/// records a failure so a half-open trial cannot hold the breaker forever.
struct Admission {
    breaker: Arc<CircuitBreaker>,
    armed: bool,
}

impl Admission {
    fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            breaker,
            armed: true,
        }
    }

    fn success(mut self) {
        self.armed = false;
        self.breaker.record_success();
    }

    fn failure(mut self) {
        self.armed = false;
        self.breaker.record_failure();
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        if self.armed {
            warn!(
                breaker = %self.breaker.name(),
                "Request dropped before completion, recording failure"
            );
            self.breaker.record_failure();
        }
    }
}

/// HTTP client for one backend service, gated by circuit breakers.
///
/// Every call asks the breaker first and fails fast with
/// [`GuardError::CircuitOpen`] when admission is denied. Admitted calls
/// report exactly one outcome: transport errors and 5xx responses count as
/// failures, everything else as success.
#[derive(Clone)]
pub struct GuardedClient {
    name: String,
    base_url: Url,
    health_path: String,
    scope: BreakerScope,
    breaker_config: CircuitBreakerConfig,
    breakers: CircuitBreakerService,
    http: reqwest::Client,
}

impl std::fmt::Debug for GuardedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedClient")
            .field("name", &self.name)
            .field("base_url", &self.base_url.as_str())
            .field("scope", &self.scope)
            .field("breaker_config", &self.breaker_config)
            .field("http", &"<reqwest::Client>")
            .finish()
    }
}

impl GuardedClient {
    /// Create a client for a service, sharing breakers through `breakers`
    pub fn new(config: &ServiceConfig, breakers: CircuitBreakerService) -> Result<Self> {
        let base_url = config.parsed_base_url()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GuardError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let breaker_config = config
            .circuit_breaker
            .clone()
            .unwrap_or_else(|| breakers.default_config().clone());

        // A service-wide override must win over a breaker created on demand
        if config.breaker_scope == BreakerScope::Client {
            if let Some(service_config) = &config.circuit_breaker {
                match breakers.get(&config.name) {
                    Some(existing) if existing.config() == service_config => {}
                    Some(_) => {
                        warn!(
                            service = %config.name,
                            "Replacing circuit breaker created with default configuration"
                        );
                        breakers.register(&config.name, service_config.clone());
                    }
                    None => {
                        breakers.register(&config.name, service_config.clone());
                    }
                }
            }
        }

        info!(
            service = %config.name,
            base_url = %base_url,
            scope = ?config.breaker_scope,
            "Creating guarded client"
        );

        Ok(Self {
            name: config.name.clone(),
            base_url,
            health_path: config.health_path.clone(),
            scope: config.breaker_scope,
            breaker_config,
            breakers,
            http,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Breaker key for a call
    pub fn breaker_key(&self, method: &Method, path: &str) -> String {
        match self.scope {
            BreakerScope::Client => self.name.clone(),
            BreakerScope::Endpoint => format!(
                "{} {} {}",
                self.name,
                method,
                metrics::sanitize_path(path)
            ),
        }
    }

    /// Breaker guarding a call
    pub fn breaker_for(&self, method: &Method, path: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .breaker_with(&self.breaker_key(method, path), &self.breaker_config)
    }

    /// Snapshot of the breaker guarding a call
    pub fn breaker_stats(&self, method: &Method, path: &str) -> CircuitBreakerStats {
        self.breaker_for(method, path).stats()
    }

    /// Resolve a request path against the base URL, keeping any base path prefix
    pub fn url(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| GuardError::Request(format!("Invalid request path '{}': {}", path, e)))
    }

    /// Send a request through the circuit breaker.
    ///
    /// Returns the response for 1xx-3xx statuses. 4xx responses become
    /// [`GuardError::Rejected`] but still count as a healthy backend.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let url = self.url(path)?;
        let breaker = self.breaker_for(&method, path);

        if !breaker.can_execute() {
            let stats = breaker.stats();
            warn!(
                service = %self.name,
                breaker = %breaker.name(),
                state = %stats.state,
                "Circuit breaker open, rejecting request"
            );
            return Err(GuardError::CircuitOpen {
                service: self.name.clone(),
                stats,
            });
        }
        let admission = Admission::new(breaker);

        let request_id = Uuid::new_v4().to_string();
        let mut request = self
            .http
            .request(method.clone(), url)
            .header(REQUEST_ID_HEADER, &request_id);
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(
            service = %self.name,
            method = %method,
            path = %path,
            request_id = %request_id,
            "Forwarding to backend"
        );

        let timer = Timer::new(&self.name, method.as_str());
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                admission.failure();
                warn!(
                    service = %self.name,
                    request_id = %request_id,
                    latency_ms = timer.elapsed() * 1000.0,
                    error = %e,
                    "Backend request failed"
                );
                timer.record(0, true);
                return Err(e.into());
            }
        };

        let status = response.status();
        if status.is_server_error() {
            admission.failure();
            warn!(
                service = %self.name,
                request_id = %request_id,
                status = %status,
                latency_ms = timer.elapsed() * 1000.0,
                "Backend returned server error"
            );
            timer.record(status.as_u16(), true);
            let body = response.text().await.unwrap_or_default();
            return Err(GuardError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        admission.success();
        debug!(
            service = %self.name,
            request_id = %request_id,
            status = %status,
            latency_ms = timer.elapsed() * 1000.0,
            "Backend request completed"
        );
        timer.record(status.as_u16(), false);

        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(GuardError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    /// GET a path and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(Method::GET, path, None).await?;
        Ok(response.json::<T>().await?)
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self.execute(Method::POST, path, Some(&body)).await?;
        Ok(response.json::<T>().await?)
    }

    /// DELETE a path, discarding the response body
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// Check the configured health path
    pub async fn health_check(&self) -> Result<StatusCode> {
        let response = self.execute(Method::GET, &self.health_path, None).await?;
        Ok(response.status())
    }
}
