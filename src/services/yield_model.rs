//! Per-month yield accounting.
//!
//! Pipeline per joined month:
//!  1. operating year since commissioning
//!  2. irradiance index (actual vs. baseline irradiation) and sensor alert
//!  3. ideal yield: baseline yield scaled to the measured irradiation
//!  4. temperature loss relative to 25 °C
//!  5. expected yield, floored at [`EXPECTED_YIELD_FLOOR_KWH`]
//!  6. performance index and the remaining (other) losses

use crate::config::AnalysisConfig;
use crate::models::records::{EnrichedMonthRecord, JoinedMonthRecord, SensorAlert};

/// Lower bound of the expected yield. A policy constant, not a physical one:
/// it only keeps the performance index denominator positive.
pub const EXPECTED_YIELD_FLOOR_KWH: f64 = 0.01;

/// Module temperature at which the baseline yield applies (STC).
const REFERENCE_TEMP_C: f64 = 25.0;

/// Non-finite input values count as 0.
fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// `numerator / denominator`, or 0 when the quotient is undefined.
pub(crate) fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() { ratio } else { 0.0 }
}

pub fn sensor_alert(irradiance_index_pct: f64, threshold_pct: f64) -> SensorAlert {
    if irradiance_index_pct > 100.0 + threshold_pct || irradiance_index_pct < 100.0 - threshold_pct {
        SensorAlert::CheckSensor
    } else {
        SensorAlert::Ok
    }
}

/// Derives one analysis-table row.
pub fn enrich_month(joined: &JoinedMonthRecord, config: &AnalysisConfig) -> EnrichedMonthRecord {
    let actual = &joined.actual;
    let baseline = &joined.baseline;

    let actual_yield = sanitize(actual.actual_yield_kwh);
    let actual_irr = sanitize(actual.actual_irradiance_kwh_m2);
    let baseline_irr = sanitize(baseline.baseline_irradiance_kwh_m2);
    let baseline_yield = sanitize(baseline.baseline_yield_kwh);
    let ambient = sanitize(actual.ambient_temp_c);

    let year = actual.year();
    let operating_year = u32::try_from(year.saturating_sub(config.commissioning_year)).unwrap_or(0);

    let irradiance_ratio = ratio_or_zero(actual_irr, baseline_irr);
    let irradiance_index_pct = irradiance_ratio * 100.0;
    let alert = sensor_alert(irradiance_index_pct, config.irradiance_alert_threshold_pct);

    let ideal = sanitize(baseline_yield * irradiance_ratio);
    let temperature_loss = sanitize(ideal * config.temp_coeff_fraction() * (ambient - REFERENCE_TEMP_C));
    let expected = sanitize(ideal + temperature_loss).max(EXPECTED_YIELD_FLOOR_KWH);

    let performance_index_pct = ratio_or_zero(actual_yield, expected) * 100.0;
    let other_losses = expected - actual_yield;
    let yield_variance = -other_losses;
    let yield_variance_pct = ratio_or_zero(yield_variance, expected) * 100.0;

    #[cfg(feature = "verbose_log")]
    tracing::debug!(
        date = %actual.date,
        ideal_kwh = ideal,
        temp_loss_kwh = temperature_loss,
        expected_kwh = expected,
        pi_pct = performance_index_pct,
        "derived month"
    );

    EnrichedMonthRecord {
        date: actual.date,
        year,
        month: actual.month(),
        operating_year,
        actual_yield_kwh: actual_yield,
        expected_yield_kwh: expected,
        ideal_yield_kwh: ideal,
        temperature_loss_kwh: temperature_loss,
        other_losses_kwh: other_losses,
        yield_variance_kwh: yield_variance,
        yield_variance_pct,
        actual_irradiance_kwh_m2: actual_irr,
        baseline_irradiance_kwh_m2: baseline_irr,
        irradiance_index_pct,
        sensor_alert: alert,
        performance_index_pct,
        actual_performance_ratio_pct: sanitize(actual.actual_performance_ratio_pct),
        baseline_performance_ratio_pct: sanitize(baseline.baseline_performance_ratio_pct),
        baseline_yield_kwh: baseline_yield,
        ambient_temp_c: ambient,
    }
}

/// Builds the analysis table, ordered by date.
pub fn enrich(joined: &[JoinedMonthRecord], config: &AnalysisConfig) -> Vec<EnrichedMonthRecord> {
    let mut records: Vec<EnrichedMonthRecord> =
        joined.iter().map(|j| enrich_month(j, config)).collect();
    records.sort_by_key(|r| r.date);
    records
}
