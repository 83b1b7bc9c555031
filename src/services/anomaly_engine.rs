use crate::models::records::EnrichedMonthRecord;
use crate::models::report::AnomalyFlag;
use crate::services::isolation_forest::{IsolationForest, IsolationForestParams};

pub const MIN_MONTHS: usize = 3;

/// Feature vector per month: performance index, other losses, irradiance index.
fn features(record: &EnrichedMonthRecord) -> [f64; 3] {
    [
        record.performance_index_pct,
        record.other_losses_kwh,
        record.irradiance_index_pct,
    ]
    .map(|v| if v.is_finite() { v } else { 0.0 })
}

/// Flags unusual months with a seeded isolation forest.
///
/// With fewer than [`MIN_MONTHS`] records every month is reported as normal.
pub fn detect(records: &[EnrichedMonthRecord]) -> Vec<AnomalyFlag> {
    let flag = |r: &EnrichedMonthRecord, is_anomaly: bool| AnomalyFlag {
        date: r.date,
        performance_index_pct: r.performance_index_pct,
        is_anomaly,
    };

    if records.len() < MIN_MONTHS {
        return records.iter().map(|r| flag(r, false)).collect();
    }

    let data: Vec<[f64; 3]> = records.iter().map(features).collect();
    let Some(forest) = IsolationForest::fit(&data, IsolationForestParams::default()) else {
        return records.iter().map(|r| flag(r, false)).collect();
    };

    let flags: Vec<AnomalyFlag> = records
        .iter()
        .zip(&data)
        .map(|(r, x)| flag(r, forest.is_outlier(x)))
        .collect();
    tracing::debug!(
        months = records.len(),
        anomalies = flags.iter().filter(|f| f.is_anomaly).count(),
        "anomaly detection finished"
    );
    flags
}
