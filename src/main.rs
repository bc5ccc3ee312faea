use backend_guard::{build_clients, config::GuardConfig, init_tracing};
use std::env;
use std::process;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    // Initialize tracing
    init_tracing();

    // Get config file path from command line or use default
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config/backends.yaml".to_string());

    // Load configuration
    let config = match GuardConfig::from_file(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", config_path, e);
            eprintln!("Usage: backend-guard [config_file]");
            process::exit(1);
        }
    };

    let (breakers, clients) = match build_clients(&config) {
        Ok(built) => built,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    for client in &clients {
        match client.health_check().await {
            Ok(status) => info!(service = %client.name(), status = %status, "Health check passed"),
            Err(e) => warn!(service = %client.name(), error = %e, "Health check failed"),
        }
    }

    let stats: serde_json::Map<String, serde_json::Value> = breakers
        .all_stats()
        .into_iter()
        .filter_map(|(name, stats)| serde_json::to_value(stats).ok().map(|v| (name, v)))
        .collect();

    match serde_json::to_string_pretty(&stats) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to render breaker stats: {}", e);
            process::exit(1);
        }
    }
}
