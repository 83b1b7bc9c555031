use chrono::Datelike;

use crate::error::{AnalysisError, Result};
use crate::models::records::{JoinedMonthRecord, MonthlyActualRecord, MonthlyBaselineRecord};

/// Twelve baseline slots indexed by calendar month.
///
/// Built once per run; also used by the long-term forecast to turn a predicted
/// performance index back into energy.
#[derive(Debug, Clone)]
pub struct BaselineTable {
    slots: [Option<MonthlyBaselineRecord>; 12],
}

impl BaselineTable {
    pub fn new(baseline: &[MonthlyBaselineRecord]) -> Result<Self> {
        let mut slots: [Option<MonthlyBaselineRecord>; 12] = [None; 12];
        for record in baseline {
            let month = record.month_of_year;
            if !(1..=12).contains(&month) {
                return Err(AnalysisError::InvalidBaselineMonth(month));
            }
            let slot = &mut slots[(month - 1) as usize];
            if slot.is_some() {
                return Err(AnalysisError::DuplicateBaselineMonth(month));
            }
            *slot = Some(*record);
        }
        Ok(Self { slots })
    }

    /// Baseline entry for a calendar month (1..=12).
    pub fn get(&self, month: u32) -> Option<&MonthlyBaselineRecord> {
        match month {
            1..=12 => self.slots[(month - 1) as usize].as_ref(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

/// Pairs every actual month with the baseline of its calendar month.
///
/// The input order is kept and dates are normalised to the first day of the month.
pub fn join(
    actual: &[MonthlyActualRecord],
    baseline: &[MonthlyBaselineRecord],
) -> Result<Vec<JoinedMonthRecord>> {
    let table = BaselineTable::new(baseline)?;
    join_with(actual, &table)
}

pub fn join_with(
    actual: &[MonthlyActualRecord],
    table: &BaselineTable,
) -> Result<Vec<JoinedMonthRecord>> {
    actual
        .iter()
        .map(|record| {
            let month = record.month();
            let baseline = table.get(month).ok_or(AnalysisError::MissingBaselineMonth {
                month,
                date: record.date,
            })?;
            let mut normalised = *record;
            normalised.date = record.date.with_day(1).unwrap_or(record.date);
            Ok(JoinedMonthRecord {
                actual: normalised,
                baseline: *baseline,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn baseline_year(yield_kwh: f64, irradiance: f64) -> Vec<MonthlyBaselineRecord> {
        (1..=12)
            .map(|month| MonthlyBaselineRecord {
                month_of_year: month,
                baseline_yield_kwh: yield_kwh,
                baseline_performance_ratio_pct: 80.0,
                baseline_irradiance_kwh_m2: irradiance,
            })
            .collect()
    }

    fn actual(year: i32, month: u32, day: u32) -> MonthlyActualRecord {
        MonthlyActualRecord {
            date: NaiveDate::from_ymd_opt(year, month, day).unwrap(),
            actual_yield_kwh: 1000.0,
            actual_performance_ratio_pct: 79.0,
            actual_irradiance_kwh_m2: 150.0,
            ambient_temp_c: 28.0,
        }
    }

    #[test]
    fn test_baseline_reused_across_years() {
        let mut baseline = baseline_year(100_000.0, 150.0);
        baseline[2].baseline_yield_kwh = 123.0;
        let records = vec![actual(2021, 3, 1), actual(2022, 3, 1), actual(2022, 4, 1)];

        let joined = join(&records, &baseline).unwrap();
        assert_eq!(joined.len(), 3);
        assert_eq!(joined[0].baseline.baseline_yield_kwh, 123.0);
        assert_eq!(joined[1].baseline.baseline_yield_kwh, 123.0);
        assert_eq!(joined[2].baseline.month_of_year, 4);
    }

    #[test]
    fn test_order_is_preserved_and_day_normalised() {
        let baseline = baseline_year(1.0, 1.0);
        let records = vec![actual(2023, 5, 31), actual(2021, 1, 15)];

        let joined = join(&records, &baseline).unwrap();
        assert_eq!(joined[0].actual.date, NaiveDate::from_ymd_opt(2023, 5, 1).unwrap());
        assert_eq!(joined[1].actual.date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
    }

    #[test]
    fn test_missing_month_is_reported() {
        let baseline: Vec<_> = baseline_year(1.0, 1.0)
            .into_iter()
            .filter(|b| b.month_of_year != 7)
            .collect();
        let err = join(&[actual(2022, 7, 1)], &baseline).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MissingBaselineMonth {
                month: 7,
                date: NaiveDate::from_ymd_opt(2022, 7, 1).unwrap(),
            }
        );
    }

    #[test]
    fn test_rejects_malformed_baseline() {
        let mut baseline = baseline_year(1.0, 1.0);
        baseline[0].month_of_year = 13;
        assert_eq!(
            BaselineTable::new(&baseline).unwrap_err(),
            AnalysisError::InvalidBaselineMonth(13)
        );

        let mut baseline = baseline_year(1.0, 1.0);
        baseline[1].month_of_year = 1;
        assert_eq!(
            BaselineTable::new(&baseline).unwrap_err(),
            AnalysisError::DuplicateBaselineMonth(1)
        );
    }
}
