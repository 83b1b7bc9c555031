//! What-if simulator for the plant loss chain.
//!
//! Starting from a monthly energy figure, each factor is applied as a
//! percentage of the energy left after the previous step, in the order of a
//! PVsyst loss diagram.

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::models::records::EnrichedMonthRecord;
use crate::models::report::{FactorImpact, LossFactors, LossSimulation, SimulatedGain, SimulationStep};

/// One link of the chain; `range` is the accepted input in percent.
struct Stage {
    factor: &'static str,
    step: &'static str,
    name: &'static str,
    range: (f64, f64),
}

const STAGES: [Stage; 6] = [
    Stage {
        factor: "Module Quality",
        step: "After Module Quality Adjustment",
        name: "module_quality_pct",
        range: (-2.0, 2.0),
    },
    Stage {
        factor: "LID Loss",
        step: "After LID Loss",
        name: "lid_pct",
        range: (0.0, 5.0),
    },
    Stage {
        factor: "Mismatch Loss",
        step: "After Mismatch Loss",
        name: "mismatch_pct",
        range: (0.0, 5.0),
    },
    Stage {
        factor: "Ohmic Wiring Loss",
        step: "Energy Before Inverter",
        name: "wiring_pct",
        range: (0.0, 4.0),
    },
    Stage {
        factor: "Inverter Loss",
        step: "After Inverter Efficiency Loss",
        name: "inverter_pct",
        range: (1.0, 10.0),
    },
    Stage {
        factor: "System Unavailability",
        step: "Net Energy Output (kWh/month)",
        name: "unavailability_pct",
        range: (0.0, 10.0),
    },
];

/// Signed change factors in stage order; module quality is a gain when
/// positive, every other factor removes energy.
fn signed_fractions(factors: &LossFactors) -> [f64; 6] {
    [
        factors.module_quality_pct / 100.0,
        -factors.lid_pct / 100.0,
        -factors.mismatch_pct / 100.0,
        -factors.wiring_pct / 100.0,
        -factors.inverter_pct / 100.0,
        -factors.unavailability_pct / 100.0,
    ]
}

fn raw_values(factors: &LossFactors) -> [f64; 6] {
    [
        factors.module_quality_pct,
        factors.lid_pct,
        factors.mismatch_pct,
        factors.wiring_pct,
        factors.inverter_pct,
        factors.unavailability_pct,
    ]
}

pub fn validate(factors: &LossFactors) -> Result<()> {
    for (stage, value) in STAGES.iter().zip(raw_values(factors)) {
        let (lo, hi) = stage.range;
        if !value.is_finite() {
            return Err(AnalysisError::InvalidParameter {
                name: stage.name,
                value,
                reason: "must be a finite number",
            });
        }
        if value < lo || value > hi {
            return Err(AnalysisError::InvalidParameter {
                name: stage.name,
                value,
                reason: "outside the accepted range",
            });
        }
    }
    Ok(())
}

/// Applies the loss chain to `start_energy_kwh`.
pub fn run(start_energy_kwh: f64, factors: &LossFactors) -> Result<LossSimulation> {
    if !start_energy_kwh.is_finite() || start_energy_kwh <= 0.0 {
        return Err(AnalysisError::InvalidParameter {
            name: "start_energy_kwh",
            value: start_energy_kwh,
            reason: "must be a positive finite energy",
        });
    }
    validate(factors)?;

    let mut current = start_energy_kwh;
    let mut steps = vec![SimulationStep {
        step: "Initial Actual Energy (kWh/month)".to_owned(),
        energy_kwh: current,
    }];
    let mut breakdown = Vec::with_capacity(STAGES.len());

    for (stage, fraction) in STAGES.iter().zip(signed_fractions(factors)) {
        let delta = current * fraction;
        current += delta;
        breakdown.push(FactorImpact {
            factor: stage.factor.to_owned(),
            delta_kwh: delta,
        });
        steps.push(SimulationStep {
            step: stage.step.to_owned(),
            energy_kwh: current,
        });
    }

    Ok(LossSimulation {
        start_energy_kwh,
        steps,
        breakdown,
        net_output_kwh: current,
    })
}

/// Simulates an average month of the analysed period and values the
/// difference to the mean expected yield at the configured tariff.
pub fn simulate_gain(
    records: &[EnrichedMonthRecord],
    config: &AnalysisConfig,
    factors: &LossFactors,
) -> Result<SimulatedGain> {
    if records.is_empty() {
        return Err(AnalysisError::EmptyRecords("loss simulation"));
    }
    let mean_actual = records.iter().map(|r| r.actual_yield_kwh).sum::<f64>() / records.len() as f64;
    let simulation = run(mean_actual, factors)?;
    Ok(price_against_expected(simulation, records, config))
}

/// Compares a finished simulation with the mean monthly expected yield.
pub fn price_against_expected(
    simulation: LossSimulation,
    records: &[EnrichedMonthRecord],
    config: &AnalysisConfig,
) -> SimulatedGain {
    let mean_expected = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.expected_yield_kwh).sum::<f64>() / records.len() as f64
    };
    let potential_gain_kwh = simulation.net_output_kwh - mean_expected;

    SimulatedGain {
        potential_revenue: potential_gain_kwh * config.electricity_tariff,
        mean_expected_yield_kwh: mean_expected,
        potential_gain_kwh,
        simulation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::BarMeasure;
    use crate::services::aggregator::tests::record;

    fn no_losses() -> LossFactors {
        LossFactors {
            module_quality_pct: 0.0,
            lid_pct: 0.0,
            mismatch_pct: 0.0,
            wiring_pct: 0.0,
            inverter_pct: 1.0,
            unavailability_pct: 0.0,
        }
    }

    #[test]
    fn test_chain_is_multiplicative() {
        let sim = run(10_000.0, &LossFactors::default()).unwrap();
        let expected = 10_000.0
            * 1.0075
            * (1.0 - 0.015)
            * (1.0 - 0.011)
            * (1.0 - 0.0106)
            * (1.0 - 0.0224)
            * (1.0 - 0.0108);
        assert!((sim.net_output_kwh - expected).abs() < 1e-9);
        assert_eq!(sim.steps.len(), 7);
        assert_eq!(sim.steps[0].energy_kwh, 10_000.0);
        assert_eq!(sim.steps[6].energy_kwh, sim.net_output_kwh);
        assert_eq!(sim.steps[4].step, "Energy Before Inverter");
    }

    #[test]
    fn test_breakdown_signs_and_sum() {
        let sim = run(5_000.0, &LossFactors::default()).unwrap();
        assert!(sim.breakdown[0].delta_kwh > 0.0);
        assert!(sim.breakdown[1..].iter().all(|f| f.delta_kwh < 0.0));
        let total: f64 = sim.breakdown.iter().map(|f| f.delta_kwh).sum();
        assert!((sim.start_energy_kwh + total - sim.net_output_kwh).abs() < 1e-9);
    }

    #[test]
    fn test_module_quality_can_be_a_loss() {
        let factors = LossFactors {
            module_quality_pct: -2.0,
            ..no_losses()
        };
        let sim = run(1_000.0, &factors).unwrap();
        assert!((sim.breakdown[0].delta_kwh + 20.0).abs() < 1e-9);
        assert!((sim.steps[1].energy_kwh - 980.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_start_energy() {
        for start in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = run(start, &LossFactors::default()).unwrap_err();
            assert!(matches!(
                err,
                AnalysisError::InvalidParameter {
                    name: "start_energy_kwh",
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_rejects_out_of_range_factors() {
        let too_much_lid = LossFactors {
            lid_pct: 5.5,
            ..LossFactors::default()
        };
        assert!(matches!(
            run(1_000.0, &too_much_lid),
            Err(AnalysisError::InvalidParameter { name: "lid_pct", .. })
        ));

        let inverter_floor = LossFactors {
            inverter_pct: 0.5,
            ..LossFactors::default()
        };
        assert!(matches!(
            run(1_000.0, &inverter_floor),
            Err(AnalysisError::InvalidParameter { name: "inverter_pct", .. })
        ));

        let nan_wiring = LossFactors {
            wiring_pct: f64::NAN,
            ..LossFactors::default()
        };
        assert!(run(1_000.0, &nan_wiring).is_err());
    }

    #[test]
    fn test_range_edges_are_accepted() {
        let edges = LossFactors {
            module_quality_pct: 2.0,
            lid_pct: 5.0,
            mismatch_pct: 0.0,
            wiring_pct: 4.0,
            inverter_pct: 10.0,
            unavailability_pct: 10.0,
        };
        assert!(run(1_000.0, &edges).is_ok());
    }

    #[test]
    fn test_waterfall_orders_deltas() {
        let sim = run(10_000.0, &LossFactors::default()).unwrap();
        let bars = sim.waterfall();

        assert_eq!(bars.len(), 8);
        assert_eq!(bars[0].label, "Initial Energy");
        assert_eq!(bars[0].measure, BarMeasure::Absolute);
        assert_eq!(bars[7].label, "Net Energy Output");
        assert_eq!(bars[7].measure, BarMeasure::Total);

        let deltas: Vec<f64> = bars[1..7].iter().map(|b| b.value).collect();
        assert!(deltas.windows(2).all(|w| w[0] <= w[1]));
        // inverter is the largest loss, module quality the only gain
        assert_eq!(bars[1].label, "Inverter Loss");
        assert_eq!(bars[6].label, "Module Quality");
    }

    #[test]
    fn test_simulate_gain_against_expected() {
        let records = vec![record(2023, 1, 900.0, 1_000.0), record(2023, 2, 1_100.0, 1_200.0)];
        let config = AnalysisConfig {
            electricity_tariff: 4.0,
            ..AnalysisConfig::default()
        };
        let gain = simulate_gain(&records, &config, &no_losses()).unwrap();

        assert_eq!(gain.simulation.start_energy_kwh, 1_000.0);
        assert_eq!(gain.mean_expected_yield_kwh, 1_100.0);
        // only the 1 % inverter floor applies
        assert!((gain.simulation.net_output_kwh - 990.0).abs() < 1e-9);
        assert!((gain.potential_gain_kwh + 110.0).abs() < 1e-9);
        assert!((gain.potential_revenue + 440.0).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_start_priced_against_expected() {
        let records = vec![record(2023, 1, 900.0, 1_000.0)];
        let sim = run(2_000.0, &no_losses()).unwrap();
        let gain = price_against_expected(sim, &records, &AnalysisConfig::default());
        assert!((gain.potential_gain_kwh - 980.0).abs() < 1e-9);
        assert!((gain.potential_revenue - 3_920.0).abs() < 1e-9);
    }

    #[test]
    fn test_simulate_gain_needs_records() {
        assert_eq!(
            simulate_gain(&[], &AnalysisConfig::default(), &LossFactors::default()).unwrap_err(),
            AnalysisError::EmptyRecords("loss simulation")
        );
    }
}
