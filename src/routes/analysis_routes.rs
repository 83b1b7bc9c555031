use axum::{
    routing::{get, post},
    Router,
};

use crate::controllers::analysis_controller::{
    // Service
    get_default_config, health,
    // Analysis
    get_loss_breakdown, run_analysis,
    // Forecasts
    get_long_term_forecast, get_short_term_forecast,
    // Simulator
    simulate_losses,
};
use crate::shared_state::SharedState;

/// Build the `/api/*` sub-router.
/// Handlers extract `State<AppState>` and/or `State<Config>` via
/// `FromRef<SharedState>`.
pub fn api_routes(shared: SharedState) -> Router {
    Router::new()
        .route("/health",                  get(health))
        .route("/config/defaults",         get(get_default_config))
        .route("/analysis",                post(run_analysis))
        .route("/analysis/loss-breakdown", post(get_loss_breakdown))
        .route("/forecast/short-term",     post(get_short_term_forecast))
        .route("/forecast/long-term",      post(get_long_term_forecast))
        .route("/simulator/losses",        post(simulate_losses))
        .with_state(shared)
}
