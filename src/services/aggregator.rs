use std::collections::{BTreeMap, BTreeSet};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::models::records::{EnrichedMonthRecord, SensorAlert};
use crate::models::report::{InsightsSummary, LossBreakdown, LossPeriod, SummaryRow, YearlyGuaranteeRow};
use crate::services::yield_model::ratio_or_zero;

const KWH_PER_MWH: f64 = 1000.0;

pub fn summarize(records: &[EnrichedMonthRecord]) -> InsightsSummary {
    let sum = |f: fn(&EnrichedMonthRecord) -> f64| records.iter().map(f).sum::<f64>();

    let actual_kwh = sum(|r| r.actual_yield_kwh);
    let expected_kwh = sum(|r| r.expected_yield_kwh);
    let total_actual = actual_kwh / KWH_PER_MWH;
    let total_expected = expected_kwh / KWH_PER_MWH;
    let overall_variance = total_actual - total_expected;

    let average_pr = if records.is_empty() {
        0.0
    } else {
        sum(|r| r.actual_performance_ratio_pct) / records.len() as f64
    };

    InsightsSummary {
        total_actual_yield_mwh: total_actual,
        total_expected_yield_mwh: total_expected,
        total_ideal_yield_mwh: sum(|r| r.ideal_yield_kwh) / KWH_PER_MWH,
        total_temperature_loss_mwh: sum(|r| r.temperature_loss_kwh) / KWH_PER_MWH,
        total_other_losses_mwh: sum(|r| r.other_losses_kwh) / KWH_PER_MWH,
        overall_yield_variance_mwh: overall_variance,
        overall_yield_variance_pct: ratio_or_zero(overall_variance, total_expected) * 100.0,
        average_performance_index_pct: ratio_or_zero(actual_kwh, expected_kwh) * 100.0,
        average_performance_ratio_pct: average_pr,
        sensor_alert_count: records
            .iter()
            .filter(|r| r.sensor_alert != SensorAlert::Ok)
            .count(),
    }
}

/// Display rows for the key-insights table.
pub fn summary_table(summary: &InsightsSummary) -> Vec<SummaryRow> {
    let row = |metric: &str, value: String| SummaryRow {
        metric: metric.to_owned(),
        value,
    };
    vec![
        row("Total Actual Yield", format!("{:.2} MWh", summary.total_actual_yield_mwh)),
        row(
            "Total Expected Yield (Weather Adjusted)",
            format!("{:.2} MWh", summary.total_expected_yield_mwh),
        ),
        row(
            "Overall Yield Variance (MWh)",
            format!("{:.2} MWh", summary.overall_yield_variance_mwh),
        ),
        row(
            "Overall Yield Variance (%)",
            format!("{:.2} %", summary.overall_yield_variance_pct),
        ),
        row(
            "Average Performance Index (PI)",
            format!("{:.2} %", summary.average_performance_index_pct),
        ),
        row(
            "Average Actual Performance Ratio (PR)",
            format!("{:.2} %", summary.average_performance_ratio_pct),
        ),
        row("Number of Sensor Alerts", format!("{} Months", summary.sensor_alert_count)),
    ]
}

pub fn loss_breakdown(
    records: &[EnrichedMonthRecord],
    summary: &InsightsSummary,
    period: LossPeriod,
) -> Result<LossBreakdown> {
    let latest = records.last().ok_or(AnalysisError::EmptyRecords("loss breakdown"))?;

    Ok(match period {
        LossPeriod::Overall => LossBreakdown {
            ideal_mwh: summary.total_ideal_yield_mwh,
            temperature_loss_mwh: summary.total_temperature_loss_mwh,
            other_loss_mwh: summary.total_other_losses_mwh,
            actual_mwh: summary.total_actual_yield_mwh,
            period_label: "the entire analysis period".to_owned(),
        },
        LossPeriod::LatestMonth => LossBreakdown {
            ideal_mwh: latest.ideal_yield_kwh / KWH_PER_MWH,
            temperature_loss_mwh: latest.temperature_loss_kwh / KWH_PER_MWH,
            other_loss_mwh: latest.other_losses_kwh / KWH_PER_MWH,
            actual_mwh: latest.actual_yield_kwh / KWH_PER_MWH,
            period_label: latest.date.format("%B %Y").to_string(),
        },
    })
}

/// String-keyed variant for callers that receive the period from outside.
pub fn loss_breakdown_for(
    records: &[EnrichedMonthRecord],
    summary: &InsightsSummary,
    period: &str,
) -> Result<LossBreakdown> {
    loss_breakdown(records, summary, period.parse()?)
}

/// Actual and expected yield per calendar year against the guarantee.
///
/// Every year between the first and last observed one gets a row; years
/// without data keep the guarantee columns and leave the yields empty.
pub fn yearly_guarantee_table(
    records: &[EnrichedMonthRecord],
    config: &AnalysisConfig,
) -> Vec<YearlyGuaranteeRow> {
    let mut per_year: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
    for r in records {
        let entry = per_year.entry(r.year).or_insert((0.0, 0.0));
        entry.0 += r.actual_yield_kwh;
        entry.1 += r.expected_yield_kwh;
    }

    let first = per_year.keys().next().copied().unwrap_or(config.commissioning_year);
    let last = per_year.keys().next_back().copied().unwrap_or(config.commissioning_year);

    (first..=last)
        .map(|year| {
            let totals = per_year.get(&year);
            YearlyGuaranteeRow {
                year,
                actual_yearly_yield_mwh: totals.map(|t| t.0 / KWH_PER_MWH),
                energy_guarantee_mwh: config.energy_guarantee_mwh_per_year,
                expected_yearly_yield_mwh: totals.map(|t| t.1 / KWH_PER_MWH),
                degraded_guarantee_mwh: config.degraded_guarantee(year),
            }
        })
        .collect()
}

/// Calendar years with all twelve months present (duplicates count once).
pub fn full_years(records: &[EnrichedMonthRecord]) -> BTreeSet<i32> {
    let mut months: BTreeMap<i32, BTreeSet<u32>> = BTreeMap::new();
    for r in records {
        months.entry(r.year).or_default().insert(r.month);
    }
    months
        .into_iter()
        .filter(|(_, m)| m.len() == 12)
        .map(|(year, _)| year)
        .collect()
}

/// Records belonging to complete calendar years, in input order.
pub fn full_years_only(records: &[EnrichedMonthRecord]) -> Vec<EnrichedMonthRecord> {
    let years = full_years(records);
    records
        .iter()
        .filter(|r| years.contains(&r.year))
        .cloned()
        .collect()
}

/// Yield-weighted performance index of each complete year.
pub fn yearly_performance_index(records: &[EnrichedMonthRecord]) -> BTreeMap<i32, f64> {
    let mut per_year: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
    for r in full_years_only(records) {
        let entry = per_year.entry(r.year).or_insert((0.0, 0.0));
        entry.0 += r.actual_yield_kwh;
        entry.1 += r.expected_yield_kwh;
    }
    per_year
        .into_iter()
        .map(|(year, (actual, expected))| (year, ratio_or_zero(actual, expected) * 100.0))
        .collect()
}
