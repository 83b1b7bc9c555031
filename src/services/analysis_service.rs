//! One analysis run, end to end.
//!
//! join → enrich → {aggregate, forecast, detect} → narrative. Every stage is a
//! pure function of the inputs, so identical requests may be served from an
//! [`AnalysisCache`].

use std::collections::{HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::models::records::{EnrichedMonthRecord, MonthlyActualRecord, MonthlyBaselineRecord};
use crate::models::report::{AnalysisReport, InsightsSummary, LossPeriod};
use crate::services::record_joiner::{self, BaselineTable};
use crate::services::{aggregator, anomaly_engine, forecast_engine, narrative, yield_model};

/// Validated inputs turned into the analysis table.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub baseline: BaselineTable,
    pub records: Vec<EnrichedMonthRecord>,
    pub summary: InsightsSummary,
}

/// Validates the config, joins and enriches the records and summarises them.
pub fn prepare(
    actual: &[MonthlyActualRecord],
    baseline: &[MonthlyBaselineRecord],
    config: &AnalysisConfig,
) -> Result<PreparedRun> {
    config.validate()?;
    let table = BaselineTable::new(baseline)?;
    let joined = record_joiner::join_with(actual, &table)?;
    let records = yield_model::enrich(&joined, config);
    let summary = aggregator::summarize(&records);
    Ok(PreparedRun {
        baseline: table,
        records,
        summary,
    })
}

pub fn run_analysis(
    actual: &[MonthlyActualRecord],
    baseline: &[MonthlyBaselineRecord],
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    if actual.is_empty() {
        return Err(AnalysisError::EmptyRecords("analysis run"));
    }
    let PreparedRun {
        baseline: table,
        records,
        summary,
    } = prepare(actual, baseline, config)?;

    let overall_losses = aggregator::loss_breakdown(&records, &summary, LossPeriod::Overall)?;
    let latest_month_losses =
        aggregator::loss_breakdown(&records, &summary, LossPeriod::LatestMonth)?;
    let yearly_guarantee = aggregator::yearly_guarantee_table(&records, config);
    let short_term_forecast = forecast_engine::short_term_forecast(&records);
    let long_term_forecast = forecast_engine::long_term_forecast(&records, &table, config);
    let anomalies = anomaly_engine::detect(&records);
    let narrative = narrative::compose(
        &summary,
        &records,
        config,
        short_term_forecast.as_ref(),
        &anomalies,
    );

    let report = AnalysisReport {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        summary_table: aggregator::summary_table(&summary),
        insights: summary,
        overall_losses,
        latest_month_losses,
        yearly_guarantee,
        short_term_forecast,
        long_term_forecast,
        anomalies,
        narrative,
        records,
    };

    tracing::info!(
        run_id = %report.run_id,
        months = report.records.len(),
        sensor_alerts = report.insights.sensor_alert_count,
        anomalies = report.anomalies.iter().filter(|a| a.is_anomaly).count(),
        short_term = report.short_term_forecast.is_some(),
        long_term = report.long_term_forecast.is_some(),
        "analysis run finished"
    );
    Ok(report)
}

#[derive(Debug, Default)]
struct CacheEntries {
    reports: HashMap<u64, Arc<AnalysisReport>>,
    /// Insertion order, oldest first
    order: VecDeque<u64>,
}

/// Bounded memo of finished runs keyed by their exact inputs.
#[derive(Clone, Debug)]
pub struct AnalysisCache {
    entries: Arc<RwLock<CacheEntries>>,
    max_entries: usize,
}

impl AnalysisCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(CacheEntries::default())),
            max_entries,
        }
    }

    /// Hash of the serialised inputs; `None` when they cannot be serialised.
    pub fn key(
        actual: &[MonthlyActualRecord],
        baseline: &[MonthlyBaselineRecord],
        config: &AnalysisConfig,
    ) -> Option<u64> {
        let encoded = serde_json::to_string(&(actual, baseline, config)).ok()?;
        let mut hasher = DefaultHasher::new();
        encoded.hash(&mut hasher);
        Some(hasher.finish())
    }

    pub fn get(&self, key: u64) -> Option<Arc<AnalysisReport>> {
        let entries = self.entries.read().ok()?;
        entries.reports.get(&key).cloned()
    }

    pub fn insert(&self, key: u64, report: Arc<AnalysisReport>) {
        if self.max_entries == 0 {
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            if entries.reports.insert(key, report).is_none() {
                entries.order.push_back(key);
            }
            while entries.order.len() > self.max_entries {
                if let Some(oldest) = entries.order.pop_front() {
                    entries.reports.remove(&oldest);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.reports.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs the analysis, reusing a stored report for identical inputs.
///
/// A cached hit returns the stored report, including its `run_id`.
pub fn run_cached(
    cache: &AnalysisCache,
    actual: &[MonthlyActualRecord],
    baseline: &[MonthlyBaselineRecord],
    config: &AnalysisConfig,
) -> Result<Arc<AnalysisReport>> {
    let key = AnalysisCache::key(actual, baseline, config);
    if let Some(hit) = key.and_then(|k| cache.get(k)) {
        tracing::debug!(run_id = %hit.run_id, "analysis served from cache");
        return Ok(hit);
    }

    let report = Arc::new(run_analysis(actual, baseline, config)?);
    if let Some(k) = key {
        cache.insert(k, Arc::clone(&report));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::records::SensorAlert;
    use crate::models::report::{ForecastKind, ReportBlock};
    use chrono::NaiveDate;

    fn baseline() -> Vec<MonthlyBaselineRecord> {
        (1..=12)
            .map(|m| MonthlyBaselineRecord {
                month_of_year: m,
                baseline_yield_kwh: 100_000.0 + 10_000.0 * f64::from(m % 6),
                baseline_performance_ratio_pct: 80.0,
                baseline_irradiance_kwh_m2: 150.0 + 5.0 * f64::from(m % 6),
            })
            .collect()
    }

    /// `months` actual records starting January 2021 at the given PI, at 25 °C.
    fn actual(months: u32, pi_pct: f64) -> Vec<MonthlyActualRecord> {
        let base = baseline();
        (0..months)
            .map(|i| {
                let year = 2021 + (i / 12) as i32;
                let month = i % 12 + 1;
                let b = &base[(month - 1) as usize];
                MonthlyActualRecord {
                    date: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
                    actual_yield_kwh: b.baseline_yield_kwh * pi_pct / 100.0,
                    actual_performance_ratio_pct: 78.0,
                    actual_irradiance_kwh_m2: b.baseline_irradiance_kwh_m2,
                    ambient_temp_c: 25.0,
                }
            })
            .collect()
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            commissioning_year: 2021,
            degradation_rate_pct: 0.5,
            energy_guarantee_mwh_per_year: 1_600.0,
            forecast_period_years: 2,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_full_run_two_years() {
        let report = run_analysis(&actual(24, 98.0), &baseline(), &config()).unwrap();

        assert_eq!(report.records.len(), 24);
        assert!((report.insights.average_performance_index_pct - 98.0).abs() < 1e-9);
        assert_eq!(report.insights.sensor_alert_count, 0);
        assert_eq!(report.summary_table.len(), 7);
        assert_eq!(report.latest_month_losses.period_label, "December 2022");

        assert_eq!(report.yearly_guarantee.len(), 2);
        assert!((report.yearly_guarantee[1].degraded_guarantee_mwh - 1_592.0).abs() < 1e-9);

        let short = report.short_term_forecast.as_ref().unwrap();
        assert_eq!(short.label, "January 2023");
        let long = report.long_term_forecast.as_ref().unwrap();
        assert_eq!(long.last_full_year, 2022);
        assert_eq!(long.yearly.last().unwrap().kind, ForecastKind::Forecast);

        assert_eq!(report.anomalies.len(), 24);
        assert!(matches!(report.narrative[0], ReportBlock::Heading { level: 3, .. }));
    }

    #[test]
    fn test_short_history_still_reports() {
        let report = run_analysis(&actual(4, 95.0), &baseline(), &config()).unwrap();
        assert!(report.short_term_forecast.is_none());
        assert!(report.long_term_forecast.is_none());
        assert_eq!(report.anomalies.len(), 4);
    }

    #[test]
    fn test_missing_baseline_month_fails() {
        let mut base = baseline();
        base.retain(|b| b.month_of_year != 7);
        let err = run_analysis(&actual(12, 100.0), &base, &config()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MissingBaselineMonth {
                month: 7,
                date: NaiveDate::from_ymd_opt(2021, 7, 1).unwrap(),
            }
        );
    }

    #[test]
    fn test_invalid_config_and_empty_input() {
        let bad = AnalysisConfig {
            irradiance_alert_threshold_pct: 0.0,
            ..config()
        };
        assert!(matches!(
            run_analysis(&actual(3, 100.0), &baseline(), &bad),
            Err(AnalysisError::InvalidConfig {
                field: "irradiance_alert_threshold_pct",
                ..
            })
        ));
        assert_eq!(
            run_analysis(&[], &baseline(), &config()).unwrap_err(),
            AnalysisError::EmptyRecords("analysis run")
        );
    }

    #[test]
    fn test_prepare_flags_sensor_months() {
        let mut records = actual(3, 100.0);
        records[1].actual_irradiance_kwh_m2 *= 0.5;
        let run = prepare(&records, &baseline(), &config()).unwrap();
        assert_eq!(run.records[1].sensor_alert, SensorAlert::CheckSensor);
        assert_eq!(run.summary.sensor_alert_count, 1);
    }

    #[test]
    fn test_cache_reuses_identical_inputs() {
        let cache = AnalysisCache::new(4);
        let a = run_cached(&cache, &actual(12, 99.0), &baseline(), &config()).unwrap();
        let b = run_cached(&cache, &actual(12, 99.0), &baseline(), &config()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        let other = AnalysisConfig {
            degradation_rate_pct: 0.7,
            ..config()
        };
        let c = run_cached(&cache, &actual(12, 99.0), &baseline(), &other).unwrap();
        assert_ne!(a.run_id, c.run_id);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_evicts_oldest() {
        let cache = AnalysisCache::new(2);
        let first = run_cached(&cache, &actual(3, 90.0), &baseline(), &config()).unwrap();
        run_cached(&cache, &actual(3, 91.0), &baseline(), &config()).unwrap();
        run_cached(&cache, &actual(3, 92.0), &baseline(), &config()).unwrap();
        assert_eq!(cache.len(), 2);

        let again = run_cached(&cache, &actual(3, 90.0), &baseline(), &config()).unwrap();
        assert_ne!(first.run_id, again.run_id);
    }

    #[test]
    fn test_zero_sized_cache_stores_nothing() {
        let cache = AnalysisCache::new(0);
        run_cached(&cache, &actual(3, 90.0), &baseline(), &config()).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = AnalysisCache::new(4);
        assert!(run_cached(&cache, &[], &baseline(), &config()).is_err());
        assert!(cache.is_empty());
    }
}
