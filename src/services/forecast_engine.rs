//! Performance index forecasts.
//!
//! Both forecasts model the performance index rather than energy: yield follows
//! the weather, while the index tracks plant condition. The two operations keep
//! their own windows, thresholds and clipping.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;

use crate::config::AnalysisConfig;
use crate::models::records::EnrichedMonthRecord;
use crate::models::report::{
    ForecastKind, LongTermForecast, LongTermForecastRow, MonthlyPiForecast, ShortTermForecast,
};
use crate::services::aggregator::full_years_only;
use crate::services::record_joiner::BaselineTable;
use crate::services::seasonal_model::{SeasonalTrendModel, SeasonalTrendParams, add_months};

pub const SHORT_TERM_MIN_MONTHS: usize = 6;
pub const SHORT_TERM_WINDOW_MONTHS: usize = 24;
pub const PI_FLOOR_PCT: f64 = 50.0;
pub const PI_CEILING_PCT: f64 = 110.0;

fn pi_series(records: &[EnrichedMonthRecord]) -> Vec<(chrono::NaiveDate, f64)> {
    records
        .iter()
        .map(|r| (r.date, r.performance_index_pct))
        .collect()
}

/// Next-month performance index from the most recent two years.
///
/// `None` when fewer than six months are available.
pub fn short_term_forecast(records: &[EnrichedMonthRecord]) -> Option<ShortTermForecast> {
    if records.len() < SHORT_TERM_MIN_MONTHS {
        return None;
    }
    let recent = &records[records.len().saturating_sub(SHORT_TERM_WINDOW_MONTHS)..];
    let model = SeasonalTrendModel::fit(&pi_series(recent), SeasonalTrendParams::short_term())?;

    let last = recent.iter().map(|r| r.date).max()?;
    let date = add_months(last, 1)?;
    let prediction = model.predict(date);

    Some(ShortTermForecast {
        date,
        label: date.format("%B %Y").to_string(),
        predicted_pct: prediction.yhat,
        lower_bound_pct: prediction.lower,
        upper_bound_pct: prediction.upper,
    })
}

/// Multi-year yield projection against the degraded guarantee.
///
/// Fits complete years only, clips the predicted index to
/// [`PI_FLOOR_PCT`]..=[`PI_CEILING_PCT`], and converts it to energy with the
/// baseline yield of each calendar month. Years with complete actual data
/// report the measured total. `None` without at least one complete year, or
/// when the horizon in months does not fit a `u32`.
pub fn long_term_forecast(
    records: &[EnrichedMonthRecord],
    baseline: &BaselineTable,
    config: &AnalysisConfig,
) -> Option<LongTermForecast> {
    let full = full_years_only(records);
    if full.len() < 12 || baseline.is_empty() {
        return None;
    }
    let model = SeasonalTrendModel::fit(&pi_series(&full), SeasonalTrendParams::long_term())?;

    let history: BTreeSet<_> = full.iter().map(|r| r.date).collect();
    let last_date = *history.iter().next_back()?;
    let horizon = config.forecast_period_years.checked_mul(12)?;
    let future = (1..=horizon).filter_map(|n| add_months(last_date, n));

    let monthly: Vec<MonthlyPiForecast> = history
        .iter()
        .copied()
        .chain(future)
        .map(|date| {
            let pi = model.predict(date).yhat.clamp(PI_FLOOR_PCT, PI_CEILING_PCT);
            let base = baseline
                .get(date.month())
                .map_or(0.0, |b| b.baseline_yield_kwh);
            MonthlyPiForecast {
                date,
                predicted_pct: pi,
                predicted_yield_kwh: base * pi / 100.0,
            }
        })
        .collect();

    let mut forecast_by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for m in &monthly {
        *forecast_by_year.entry(m.date.year()).or_insert(0.0) += m.predicted_yield_kwh;
    }
    let mut actual_by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for r in &full {
        *actual_by_year.entry(r.year).or_insert(0.0) += r.actual_yield_kwh;
    }
    let last_full_year = *actual_by_year.keys().next_back()?;

    let yearly = forecast_by_year
        .into_iter()
        .map(|(year, forecast_kwh)| {
            let kwh = actual_by_year.get(&year).copied().unwrap_or(forecast_kwh);
            LongTermForecastRow {
                year,
                forecasted_yield_mwh: kwh / 1000.0,
                degraded_guarantee_mwh: config.degraded_guarantee(year),
                kind: if year <= last_full_year {
                    ForecastKind::Historical
                } else {
                    ForecastKind::Forecast
                },
            }
        })
        .collect();

    tracing::debug!(
        last_full_year,
        horizon_months = horizon,
        slope_pct_per_year = model.slope_per_year(),
        "long-term forecast fitted"
    );

    Some(LongTermForecast {
        last_full_year,
        monthly,
        yearly,
    })
}
