use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::config::AnalysisConfig;
use crate::models::records::{MonthlyActualRecord, MonthlyBaselineRecord};
use crate::models::report::{
    LongTermForecast, LossFactors, LossSimulation, ShortTermForecast, WaterfallBar,
};

// ─── Requests ────────────────────────────────────────────────────────────────

/// Inputs of one analysis run, as handed over by the file loader.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisRequest {
    pub actual: Vec<MonthlyActualRecord>,
    pub baseline: Vec<MonthlyBaselineRecord>,
    /// Falls back to the service defaults when absent
    #[serde(default)]
    pub config: Option<AnalysisConfig>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LossBreakdownQuery {
    /// `overall` or `latest_month`
    pub period: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SimulatorRequest {
    /// Starting energy per month; defaults to the mean actual yield of `analysis`
    #[serde(default)]
    pub start_energy_kwh: Option<f64>,
    #[serde(default)]
    pub factors: LossFactors,
    /// When present the simulated output is compared with the expected yield
    #[serde(default)]
    pub analysis: Option<AnalysisRequest>,
}

// ─── Responses ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ShortTermForecastResponse {
    pub available: bool,
    pub forecast: Option<ShortTermForecast>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LongTermForecastResponse {
    pub available: bool,
    pub forecast: Option<LongTermForecast>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SimulatorResponse {
    pub simulation: LossSimulation,
    pub waterfall: Vec<WaterfallBar>,
    pub mean_expected_yield_kwh: Option<f64>,
    pub potential_gain_kwh: Option<f64>,
    pub potential_revenue: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub cache_enabled: bool,
    pub cached_runs: usize,
}
