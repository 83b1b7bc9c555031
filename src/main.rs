use std::net::SocketAddr;

use tower_http::services::ServeDir;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pv_performance_analyzer::app;
use pv_performance_analyzer::config::Config;
use pv_performance_analyzer::shared_state::SharedState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pv_performance_analyzer=info,tower_http=info")),
        )
        .init();

    // 1. Load configuration
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_owned());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return;
        }
    };
    info!(
        path = %config_path,
        cache_enabled = config.cache.enabled,
        cache_max_entries = config.cache.max_entries,
        commissioning_year = config.defaults.commissioning_year,
        "configuration loaded"
    );

    let addr: SocketAddr = match format!("{}:{}", config.server.bind_address, config.server.port).parse() {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, bind_address = %config.server.bind_address, "invalid bind address");
            return;
        }
    };

    // 2. Build the HTTP application
    let shared = SharedState::new(config);
    let app = app(shared).fallback_service(ServeDir::new("static"));

    info!("API server listening on http://{}", addr);
    info!("Scalar UI: http://{}/scalar", addr);

    if let Err(e) = axum_server::bind(addr).serve(app.into_make_service()).await {
        error!(error = %e, "server stopped");
    }
}
