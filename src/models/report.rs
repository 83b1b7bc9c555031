use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::models::records::EnrichedMonthRecord;

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Scalar insights of one analysis run. Energy totals are in MWh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InsightsSummary {
    pub total_actual_yield_mwh: f64,
    pub total_expected_yield_mwh: f64,
    pub total_ideal_yield_mwh: f64,
    pub total_temperature_loss_mwh: f64,
    pub total_other_losses_mwh: f64,
    pub overall_yield_variance_mwh: f64,
    pub overall_yield_variance_pct: f64,
    /// Yield-weighted: 100 × Σactual / Σexpected
    pub average_performance_index_pct: f64,
    pub average_performance_ratio_pct: f64,
    pub sensor_alert_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SummaryRow {
    pub metric: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LossPeriod {
    Overall,
    LatestMonth,
}

impl FromStr for LossPeriod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overall" => Ok(LossPeriod::Overall),
            "latest_month" => Ok(LossPeriod::LatestMonth),
            other => Err(AnalysisError::InvalidPeriod(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BarMeasure {
    Absolute,
    Relative,
    Total,
}

/// One bar of a waterfall chart; relative bars are deltas on the running sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WaterfallBar {
    pub label: String,
    pub value: f64,
    pub measure: BarMeasure,
}

/// Ideal → temperature → other losses → actual decomposition (MWh).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LossBreakdown {
    pub ideal_mwh: f64,
    pub temperature_loss_mwh: f64,
    pub other_loss_mwh: f64,
    pub actual_mwh: f64,
    pub period_label: String,
}

impl LossBreakdown {
    pub fn waterfall(&self) -> Vec<WaterfallBar> {
        vec![
            WaterfallBar {
                label: "Ideal Yield".to_owned(),
                value: self.ideal_mwh,
                measure: BarMeasure::Absolute,
            },
            WaterfallBar {
                label: "Temperature Loss".to_owned(),
                value: self.temperature_loss_mwh,
                measure: BarMeasure::Relative,
            },
            WaterfallBar {
                label: "Other Losses".to_owned(),
                value: -self.other_loss_mwh,
                measure: BarMeasure::Relative,
            },
            WaterfallBar {
                label: "Actual Yield".to_owned(),
                value: self.actual_mwh,
                measure: BarMeasure::Total,
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct YearlyGuaranteeRow {
    pub year: i32,
    /// `None` for years inside the range that have no data
    pub actual_yearly_yield_mwh: Option<f64>,
    pub energy_guarantee_mwh: f64,
    pub expected_yearly_yield_mwh: Option<f64>,
    pub degraded_guarantee_mwh: f64,
}

// ─── Forecasts ───────────────────────────────────────────────────────────────

/// Next-month performance index prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShortTermForecast {
    pub date: NaiveDate,
    /// e.g. "March 2024"
    pub label: String,
    pub predicted_pct: f64,
    pub lower_bound_pct: f64,
    pub upper_bound_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyPiForecast {
    pub date: NaiveDate,
    /// Clipped to the plausible band
    pub predicted_pct: f64,
    pub predicted_yield_kwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ForecastKind {
    Historical,
    Forecast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LongTermForecastRow {
    pub year: i32,
    pub forecasted_yield_mwh: f64,
    pub degraded_guarantee_mwh: f64,
    pub kind: ForecastKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LongTermForecast {
    pub last_full_year: i32,
    pub monthly: Vec<MonthlyPiForecast>,
    pub yearly: Vec<LongTermForecastRow>,
}

// ─── Anomalies & narrative ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnomalyFlag {
    pub date: NaiveDate,
    pub performance_index_pct: f64,
    pub is_anomaly: bool,
}

/// Typed block of the narrative report, rendered in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportBlock {
    Heading { level: u8, text: String },
    Body { text: String },
    Bullet { text: String },
}

// ─── Loss simulator ──────────────────────────────────────────────────────────

/// Loss factors in percent of the running energy.
/// `module_quality_pct` is a gain when positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LossFactors {
    pub module_quality_pct: f64,
    pub lid_pct: f64,
    pub mismatch_pct: f64,
    pub wiring_pct: f64,
    pub inverter_pct: f64,
    pub unavailability_pct: f64,
}

impl Default for LossFactors {
    fn default() -> Self {
        Self {
            module_quality_pct: 0.75,
            lid_pct: 1.50,
            mismatch_pct: 1.10,
            wiring_pct: 1.06,
            inverter_pct: 2.24,
            unavailability_pct: 1.08,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SimulationStep {
    pub step: String,
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FactorImpact {
    pub factor: String,
    /// Negative for a loss
    pub delta_kwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LossSimulation {
    pub start_energy_kwh: f64,
    pub steps: Vec<SimulationStep>,
    pub breakdown: Vec<FactorImpact>,
    pub net_output_kwh: f64,
}

impl LossSimulation {
    /// Initial energy, factor deltas from the largest loss upwards, net output.
    pub fn waterfall(&self) -> Vec<WaterfallBar> {
        let mut deltas = self.breakdown.clone();
        deltas.sort_by(|a, b| a.delta_kwh.total_cmp(&b.delta_kwh));

        let mut bars = Vec::with_capacity(deltas.len() + 2);
        bars.push(WaterfallBar {
            label: "Initial Energy".to_owned(),
            value: self.start_energy_kwh,
            measure: BarMeasure::Absolute,
        });
        bars.extend(deltas.into_iter().map(|d| WaterfallBar {
            label: d.factor,
            value: d.delta_kwh,
            measure: BarMeasure::Relative,
        }));
        bars.push(WaterfallBar {
            label: "Net Energy Output".to_owned(),
            value: self.net_output_kwh,
            measure: BarMeasure::Total,
        });
        bars
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SimulatedGain {
    pub simulation: LossSimulation,
    pub mean_expected_yield_kwh: f64,
    pub potential_gain_kwh: f64,
    pub potential_revenue: f64,
}

// ─── Full run ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<EnrichedMonthRecord>,
    pub insights: InsightsSummary,
    pub summary_table: Vec<SummaryRow>,
    pub overall_losses: LossBreakdown,
    pub latest_month_losses: LossBreakdown,
    pub yearly_guarantee: Vec<YearlyGuaranteeRow>,
    pub short_term_forecast: Option<ShortTermForecast>,
    pub long_term_forecast: Option<LongTermForecast>,
    pub anomalies: Vec<AnomalyFlag>,
    pub narrative: Vec<ReportBlock>,
}
