use utoipa::OpenApi;
use crate::config;
use crate::controllers::analysis_controller;
use crate::models::{api, records, report};

#[derive(OpenApi)]
#[openapi(
    paths(
        analysis_controller::health,
        analysis_controller::get_default_config,
        analysis_controller::run_analysis,
        analysis_controller::get_loss_breakdown,
        analysis_controller::get_short_term_forecast,
        analysis_controller::get_long_term_forecast,
        analysis_controller::simulate_losses
    ),
    components(
        schemas(
            config::AnalysisConfig,
            records::MonthlyActualRecord,
            records::MonthlyBaselineRecord,
            records::EnrichedMonthRecord,
            records::SensorAlert,
            report::AnalysisReport,
            report::InsightsSummary,
            report::LossBreakdown,
            report::WaterfallBar,
            report::YearlyGuaranteeRow,
            report::ShortTermForecast,
            report::LongTermForecast,
            report::AnomalyFlag,
            report::ReportBlock,
            report::LossFactors,
            report::LossSimulation,
            api::AnalysisRequest,
            api::SimulatorRequest,
            api::SimulatorResponse,
            api::HealthStatus
        )
    ),
    tags(
        (name = "pv-performance-analyzer", description = "Weather-adjusted PV performance analysis API")
    )
)]
pub struct ApiDoc;
