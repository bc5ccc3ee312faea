pub mod breaker;
pub mod clock;
pub mod service;
pub mod types;

pub use breaker::CircuitBreaker;
pub use clock::{Clock, ManualClock, SystemClock};
pub use service::CircuitBreakerService;
pub use types::{CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
