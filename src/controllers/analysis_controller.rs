use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::config::{AnalysisConfig, Config};
use crate::error::AnalysisError;
use crate::models::api::{
    AnalysisRequest, HealthStatus, LongTermForecastResponse, LossBreakdownQuery,
    ShortTermForecastResponse, SimulatorRequest, SimulatorResponse,
};
use crate::models::report::{AnalysisReport, LossBreakdown};
use crate::services::analysis_service::{self, PreparedRun};
use crate::services::{aggregator, forecast_engine, loss_simulator};
use crate::shared_state::AppState;

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "request rejected");
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": self.to_string()})),
        )
            .into_response()
    }
}

/// Runs CPU-bound analysis work off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, Response>
where
    F: FnOnce() -> Result<T, AnalysisError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.into_response()),
        Err(e) => {
            tracing::error!(error = %e, "analysis task failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "analysis task failed"})),
            )
                .into_response())
        }
    }
}

fn resolve_config(requested: Option<AnalysisConfig>, config: &Config) -> AnalysisConfig {
    requested.unwrap_or_else(|| config.defaults.clone())
}

fn prepare(request: &AnalysisRequest, config: &Config) -> Result<(PreparedRun, AnalysisConfig), AnalysisError> {
    let analysis_config = resolve_config(request.config.clone(), config);
    let run = analysis_service::prepare(&request.actual, &request.baseline, &analysis_config)?;
    Ok((run, analysis_config))
}

/// GET /api/health
/// Service liveness and cache occupancy
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthStatus)
    )
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthStatus {
        status: "ok".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        cache_enabled: state.cache.is_some(),
        cached_runs: state.cached_runs(),
    })
}

/// GET /api/config/defaults
/// Project parameters applied when a request omits `config`
#[utoipa::path(
    get,
    path = "/api/config/defaults",
    responses(
        (status = 200, description = "Default analysis configuration", body = AnalysisConfig)
    )
)]
pub async fn get_default_config(State(config): State<Config>) -> impl IntoResponse {
    Json(config.defaults)
}

/// POST /api/analysis
/// Run a full weather-adjusted performance analysis
///
/// Joins the actual months with the baseline, derives the analysis table and
/// returns insights, loss breakdowns, the yearly guarantee table, both
/// forecasts, anomaly flags and the narrative report. Identical requests are
/// answered from the cache when it is enabled.
#[utoipa::path(
    post,
    path = "/api/analysis",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Analysis report", body = AnalysisReport),
        (status = 422, description = "Invalid input data or configuration"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn run_analysis(
    State(state): State<AppState>,
    State(config): State<Config>,
    Json(request): Json<AnalysisRequest>,
) -> Response {
    let analysis_config = resolve_config(request.config, &config);

    let report = run_blocking(move || match &state.cache {
        Some(cache) => analysis_service::run_cached(
            cache,
            &request.actual,
            &request.baseline,
            &analysis_config,
        ),
        None => analysis_service::run_analysis(&request.actual, &request.baseline, &analysis_config)
            .map(std::sync::Arc::new),
    })
    .await;

    match report {
        Ok(report) => (StatusCode::OK, Json(report.as_ref())).into_response(),
        Err(response) => response,
    }
}

/// POST /api/analysis/loss-breakdown
/// Ideal → temperature → other losses → actual decomposition
#[utoipa::path(
    post,
    path = "/api/analysis/loss-breakdown",
    params(LossBreakdownQuery),
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Loss breakdown in MWh", body = LossBreakdown),
        (status = 422, description = "Unknown period or invalid input data"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_loss_breakdown(
    State(config): State<Config>,
    Query(query): Query<LossBreakdownQuery>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<LossBreakdown>, Response> {
    let breakdown = run_blocking(move || {
        let period = query.period.as_deref().unwrap_or("overall");
        let (run, _) = prepare(&request, &config)?;
        aggregator::loss_breakdown_for(&run.records, &run.summary, period)
    })
    .await?;
    Ok(Json(breakdown))
}

/// POST /api/forecast/short-term
/// Next-month performance index with an 80 % interval
///
/// `available` is false when fewer than six months are supplied.
#[utoipa::path(
    post,
    path = "/api/forecast/short-term",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Forecast or unavailable placeholder", body = ShortTermForecastResponse),
        (status = 422, description = "Invalid input data"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_short_term_forecast(
    State(config): State<Config>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<ShortTermForecastResponse>, Response> {
    let forecast = run_blocking(move || {
        let (run, _) = prepare(&request, &config)?;
        Ok(forecast_engine::short_term_forecast(&run.records))
    })
    .await?;
    Ok(Json(ShortTermForecastResponse {
        available: forecast.is_some(),
        forecast,
    }))
}

/// POST /api/forecast/long-term
/// Multi-year yield projection against the degraded guarantee
///
/// `available` is false without at least one complete calendar year.
#[utoipa::path(
    post,
    path = "/api/forecast/long-term",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Forecast or unavailable placeholder", body = LongTermForecastResponse),
        (status = 422, description = "Invalid input data"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_long_term_forecast(
    State(config): State<Config>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<LongTermForecastResponse>, Response> {
    let forecast = run_blocking(move || {
        let (run, analysis_config) = prepare(&request, &config)?;
        Ok(forecast_engine::long_term_forecast(&run.records, &run.baseline, &analysis_config))
    })
    .await?;
    Ok(Json(LongTermForecastResponse {
        available: forecast.is_some(),
        forecast,
    }))
}

/// POST /api/simulator/losses
/// Loss-chain what-if simulation
///
/// Starts from `start_energy_kwh` or, when omitted, from the mean monthly
/// actual yield of the embedded analysis. With analysis data the net output
/// is compared with the mean expected yield and valued at the tariff.
#[utoipa::path(
    post,
    path = "/api/simulator/losses",
    request_body = SimulatorRequest,
    responses(
        (status = 200, description = "Simulation result", body = SimulatorResponse),
        (status = 422, description = "Factor out of range or missing start energy"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn simulate_losses(
    State(config): State<Config>,
    Json(request): Json<SimulatorRequest>,
) -> Result<Json<SimulatorResponse>, Response> {
    let response = run_blocking(move || simulate(&request, &config)).await?;
    Ok(Json(response))
}

fn simulate(request: &SimulatorRequest, config: &Config) -> Result<SimulatorResponse, AnalysisError> {
    let gain = match (request.start_energy_kwh, &request.analysis) {
        (start, Some(analysis)) => {
            let (run, analysis_config) = prepare(analysis, config)?;
            match start {
                Some(start) => {
                    let simulation = loss_simulator::run(start, &request.factors)?;
                    loss_simulator::price_against_expected(simulation, &run.records, &analysis_config)
                }
                None => loss_simulator::simulate_gain(&run.records, &analysis_config, &request.factors)?,
            }
        }
        (Some(start), None) => {
            let simulation = loss_simulator::run(start, &request.factors)?;
            return Ok(SimulatorResponse {
                waterfall: simulation.waterfall(),
                simulation,
                mean_expected_yield_kwh: None,
                potential_gain_kwh: None,
                potential_revenue: None,
            });
        }
        (None, None) => return Err(AnalysisError::MissingParameter("start_energy_kwh")),
    };

    Ok(SimulatorResponse {
        waterfall: gain.simulation.waterfall(),
        mean_expected_yield_kwh: Some(gain.mean_expected_yield_kwh),
        potential_gain_kwh: Some(gain.potential_gain_kwh),
        potential_revenue: Some(gain.potential_revenue),
        simulation: gain.simulation,
    })
}
