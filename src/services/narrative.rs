use crate::config::AnalysisConfig;
use crate::models::records::EnrichedMonthRecord;
use crate::models::report::{AnomalyFlag, InsightsSummary, ReportBlock, ShortTermForecast};
use crate::services::{aggregator, anomaly_engine, forecast_engine};

const SENSOR_RECOMMENDATION: &str =
    "Inspect Irradiance Sensor: Check the pyranometer for cleanliness and calibration.";

fn heading(level: u8, text: &str) -> ReportBlock {
    ReportBlock::Heading {
        level,
        text: text.to_owned(),
    }
}

fn body(text: impl Into<String>) -> ReportBlock {
    ReportBlock::Body { text: text.into() }
}

fn bullet(text: impl Into<String>) -> ReportBlock {
    ReportBlock::Bullet { text: text.into() }
}

fn performance_verdict(average_pi: f64) -> &'static str {
    if average_pi >= 100.0 {
        "This indicates excellent system performance."
    } else if average_pi >= 97.0 {
        "This indicates good system performance."
    } else {
        "This suggests some level of underperformance. See anomaly report below for details."
    }
}

fn degradation_note(records: &[EnrichedMonthRecord], config: &AnalysisConfig) -> Option<String> {
    let yearly = aggregator::yearly_performance_index(records);
    let (&first_year, &first_pi) = yearly.iter().next()?;
    let (&last_year, &last_pi) = yearly.iter().next_back()?;
    if first_year == last_year {
        return None;
    }
    let per_year = (last_pi - first_pi) / f64::from(last_year - first_year);
    Some(format!(
        "The yield-weighted PI moved from {first_pi:.2}% in {first_year} to {last_pi:.2}% in {last_year} \
         ({per_year:+.2} points per year), against a theoretical degradation of {:.2}% per year.",
        config.degradation_rate_pct
    ))
}

/// Builds the report from already computed forecast and anomaly results.
pub fn compose(
    summary: &InsightsSummary,
    records: &[EnrichedMonthRecord],
    config: &AnalysisConfig,
    short_term: Option<&ShortTermForecast>,
    anomalies: &[AnomalyFlag],
) -> Vec<ReportBlock> {
    let mut blocks = vec![
        heading(3, "Performance Assistant Insights"),
        body(
            "This report compares the plant's monthly production with the weather-adjusted \
             baseline and highlights the months that need attention.",
        ),
        heading(4, "Key Performance Insights"),
    ];

    let average_pi = summary.average_performance_index_pct;
    blocks.push(body(format!(
        "Over the analysis period, your system generated a total of {:.2} MWh, with an average \
         Performance Index (PI) of {average_pi:.2}%. {}",
        summary.total_actual_yield_mwh,
        performance_verdict(average_pi)
    )));

    if let Some(fc) = short_term {
        blocks.push(heading(4, "Next Month Forecast"));
        blocks.push(body(format!(
            "For **{}**, the expected Performance Index (PI) is forecasted to be around **{:.1}%** \
             (with a likely range of {:.1}% to {:.1}%).",
            fc.label, fc.predicted_pct, fc.lower_bound_pct, fc.upper_bound_pct
        )));
    }

    if aggregator::full_years(records).len() > 1 {
        blocks.push(heading(4, "Degradation Trend"));
        blocks.push(body(
            "Degradation trend analysis is based on full years of data to ensure accuracy.",
        ));
        if let Some(note) = degradation_note(records, config) {
            blocks.push(body(note));
        }
    }

    blocks.push(heading(4, "Anomaly Report"));
    let mut recommendations = Vec::new();
    let flagged: Vec<&AnomalyFlag> = anomalies.iter().filter(|a| a.is_anomaly).collect();
    if flagged.is_empty() {
        blocks.push(body("No significant performance anomalies were detected."));
    } else {
        blocks.push(body(
            "The outlier model identified the following months with unusual performance patterns:",
        ));
        for anomaly in flagged {
            let month = anomaly.date.format("%B %Y");
            blocks.push(bullet(format!(
                "**Month: {month}** (PI: {:.1}%)",
                anomaly.performance_index_pct
            )));
            recommendations.push(format!(
                "Investigate Anomaly in {month}: Review O&M logs and system components."
            ));
        }
    }
    recommendations.sort();
    recommendations.dedup();
    if summary.sensor_alert_count > 0 {
        recommendations.insert(0, SENSOR_RECOMMENDATION.to_owned());
    }

    blocks.push(heading(3, "Actionable Recommendations"));
    if recommendations.is_empty() {
        blocks.push(body(
            "The system is performing optimally. Continue with regular preventive maintenance.",
        ));
    } else {
        blocks.extend(recommendations.into_iter().map(bullet));
    }
    blocks
}

/// Runs the forecast and anomaly passes and builds the report.
pub fn generate(
    summary: &InsightsSummary,
    records: &[EnrichedMonthRecord],
    config: &AnalysisConfig,
) -> Vec<ReportBlock> {
    let short_term = forecast_engine::short_term_forecast(records);
    let anomalies = anomaly_engine::detect(records);
    compose(summary, records, config, short_term.as_ref(), &anomalies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::records::SensorAlert;
    use crate::services::aggregator::summarize;
    use crate::services::aggregator::tests::record;
    use chrono::NaiveDate;

    fn texts(blocks: &[ReportBlock]) -> Vec<&str> {
        blocks
            .iter()
            .map(|b| match b {
                ReportBlock::Heading { text, .. } | ReportBlock::Body { text } | ReportBlock::Bullet { text } => {
                    text.as_str()
                }
            })
            .collect()
    }

    fn flag(year: i32, month: u32, pi: f64) -> AnomalyFlag {
        AnomalyFlag {
            date: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
            performance_index_pct: pi,
            is_anomaly: true,
        }
    }

    #[test]
    fn test_verdict_tiers() {
        assert!(performance_verdict(100.0).contains("excellent"));
        assert!(performance_verdict(97.0).contains("good"));
        assert!(performance_verdict(96.99).contains("underperformance"));
    }

    #[test]
    fn test_healthy_plant_report_structure() {
        let records: Vec<_> = (1..=4).map(|m| record(2023, m, 1_000.0, 1_000.0)).collect();
        let summary = summarize(&records);
        let blocks = generate(&summary, &records, &AnalysisConfig::default());

        assert_eq!(blocks[0], heading(3, "Performance Assistant Insights"));
        let t = texts(&blocks);
        assert!(t.iter().any(|s| s.contains("excellent")));
        // four months: no forecast, no degradation section
        assert!(!t.contains(&"Next Month Forecast"));
        assert!(!t.contains(&"Degradation Trend"));
        assert!(t.contains(&"No significant performance anomalies were detected."));
        assert_eq!(
            blocks.last().unwrap(),
            &body("The system is performing optimally. Continue with regular preventive maintenance.")
        );
    }

    #[test]
    fn test_forecast_and_degradation_sections() {
        let mut records: Vec<_> = (1..=12).map(|m| record(2021, m, 1_000.0, 1_000.0)).collect();
        records.extend((1..=12).map(|m| record(2022, m, 990.0, 1_000.0)));
        let summary = summarize(&records);
        let blocks = generate(&summary, &records, &AnalysisConfig::default());
        let t = texts(&blocks);

        let forecast_at = t.iter().position(|s| *s == "Next Month Forecast").unwrap();
        assert!(t[forecast_at + 1].contains("January 2023"));
        assert!(t.contains(&"Degradation Trend"));
        assert!(t.iter().any(|s| s.contains("100.00% in 2021 to 99.00% in 2022")));
    }

    #[test]
    fn test_anomalies_and_sorted_recommendations() {
        let records = vec![record(2023, 1, 500.0, 1_000.0)];
        let mut summary = summarize(&records);
        summary.sensor_alert_count = 1;
        let anomalies = vec![
            flag(2023, 3, 40.0),
            flag(2023, 1, 50.0),
            AnomalyFlag {
                is_anomaly: false,
                ..flag(2023, 2, 99.0)
            },
        ];

        let blocks = compose(&summary, &records, &AnalysisConfig::default(), None, &anomalies);
        let t = texts(&blocks);

        assert!(t.contains(&"**Month: March 2023** (PI: 40.0%)"));
        assert!(t.contains(&"**Month: January 2023** (PI: 50.0%)"));
        assert!(!t.iter().any(|s| s.contains("February 2023")));

        let recs_at = t.iter().position(|s| *s == "Actionable Recommendations").unwrap();
        assert_eq!(
            &t[recs_at + 1..],
            &[
                SENSOR_RECOMMENDATION,
                "Investigate Anomaly in January 2023: Review O&M logs and system components.",
                "Investigate Anomaly in March 2023: Review O&M logs and system components.",
            ]
        );
        assert!(blocks[recs_at + 1..].iter().all(|b| matches!(b, ReportBlock::Bullet { .. })));
    }

    #[test]
    fn test_sensor_alert_alone_still_recommends_inspection() {
        let mut records = vec![record(2023, 1, 1_000.0, 1_000.0)];
        records[0].sensor_alert = SensorAlert::CheckSensor;
        let summary = summarize(&records);
        let blocks = compose(&summary, &records, &AnalysisConfig::default(), None, &[]);
        assert_eq!(blocks.last().unwrap(), &bullet(SENSOR_RECOMMENDATION));
    }
}
