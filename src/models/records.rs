use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Simulated (vendor baseline) performance for one calendar month.
/// The same twelve entries are reused for every year of operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyBaselineRecord {
    /// Calendar month, 1 = January
    pub month_of_year: u32,
    pub baseline_yield_kwh: f64,
    pub baseline_performance_ratio_pct: f64,
    /// Baseline global horizontal irradiation (kWh/m²)
    pub baseline_irradiance_kwh_m2: f64,
}

/// Measured production and weather for one observed month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyActualRecord {
    /// Any day inside the observed month; normalised to the 1st when joined.
    pub date: NaiveDate,
    pub actual_yield_kwh: f64,
    pub actual_performance_ratio_pct: f64,
    /// Measured global horizontal irradiation (kWh/m²)
    pub actual_irradiance_kwh_m2: f64,
    pub ambient_temp_c: f64,
}

impl MonthlyActualRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

/// An actual month paired with the baseline entry for its calendar month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedMonthRecord {
    pub actual: MonthlyActualRecord,
    pub baseline: MonthlyBaselineRecord,
}

// ─── Derived ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorAlert {
    Ok,
    CheckSensor,
}

/// One row of the analysis table.
///
/// Accounting identity kept by construction:
/// `expected = ideal + temperature_loss` (unless floored),
/// `other_losses = expected - actual`, `yield_variance = -other_losses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnrichedMonthRecord {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    /// Years since commissioning, floored at 0
    pub operating_year: u32,

    // ── Energy accounting (kWh) ─────────────────────────────────────────────
    pub actual_yield_kwh: f64,
    pub expected_yield_kwh: f64,
    /// Baseline yield scaled to the irradiance actually measured
    pub ideal_yield_kwh: f64,
    /// Negative above 25 °C, a gain below
    pub temperature_loss_kwh: f64,
    pub other_losses_kwh: f64,
    pub yield_variance_kwh: f64,
    pub yield_variance_pct: f64,

    // ── Irradiance / sensor health ──────────────────────────────────────────
    pub actual_irradiance_kwh_m2: f64,
    pub baseline_irradiance_kwh_m2: f64,
    pub irradiance_index_pct: f64,
    pub sensor_alert: SensorAlert,

    // ── Ratios ──────────────────────────────────────────────────────────────
    pub performance_index_pct: f64,
    pub actual_performance_ratio_pct: f64,
    pub baseline_performance_ratio_pct: f64,

    pub baseline_yield_kwh: f64,
    pub ambient_temp_c: f64,
}
