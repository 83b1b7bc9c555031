use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AnalysisError, ConfigError, Result};

fn default_bind_address() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_cache_enabled() -> bool { true }
fn default_cache_entries() -> usize { 64 }

fn default_commissioning_year() -> i32 { 2020 }
fn default_temp_coeff() -> f64 { -0.38 }
fn default_degradation_rate() -> f64 { 0.5 }
fn default_alert_threshold() -> f64 { 20.0 }
fn default_forecast_period() -> u32 { 10 }
fn default_tariff() -> f64 { 4.0 }

const COMMISSIONING_YEARS: std::ops::RangeInclusive<i32> = 1950..=2100;
const FORECAST_PERIOD_YEARS: std::ops::RangeInclusive<u32> = 1..=50;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Used when an analysis request does not carry its own project config.
    #[serde(default)]
    pub defaults: AnalysisConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            max_entries: default_cache_entries(),
        }
    }
}

/// Per-project parameters of an analysis run.
///
/// Percentages are stored the way analysts type them (`0.5` means 0.5 %/year),
/// the fraction helpers convert them for the formulas.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, ToSchema)]
pub struct AnalysisConfig {
    #[serde(default = "default_commissioning_year")]
    pub commissioning_year: i32,
    /// Power temperature coefficient in %/°C, normally negative.
    #[serde(default = "default_temp_coeff")]
    pub temperature_coefficient_pct_per_c: f64,
    /// Theoretical annual degradation in %/year.
    #[serde(default = "default_degradation_rate")]
    pub degradation_rate_pct: f64,
    /// Half-width of the accepted irradiance index band around 100 %.
    #[serde(default = "default_alert_threshold")]
    pub irradiance_alert_threshold_pct: f64,
    #[serde(default = "default_forecast_period")]
    pub forecast_period_years: u32,
    #[serde(default)]
    pub energy_guarantee_mwh_per_year: f64,
    /// Price per kWh, only used to value simulated gains.
    #[serde(default = "default_tariff")]
    pub electricity_tariff: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            commissioning_year: default_commissioning_year(),
            temperature_coefficient_pct_per_c: default_temp_coeff(),
            degradation_rate_pct: default_degradation_rate(),
            irradiance_alert_threshold_pct: default_alert_threshold(),
            forecast_period_years: default_forecast_period(),
            energy_guarantee_mwh_per_year: 0.0,
            electricity_tariff: default_tariff(),
        }
    }
}

impl AnalysisConfig {
    pub fn temp_coeff_fraction(&self) -> f64 {
        self.temperature_coefficient_pct_per_c / 100.0
    }

    pub fn degradation_fraction(&self) -> f64 {
        self.degradation_rate_pct / 100.0
    }

    /// Annual guarantee compounded down by the theoretical degradation rate.
    pub fn degraded_guarantee(&self, year: i32) -> f64 {
        let exponent = year.saturating_sub(self.commissioning_year);
        self.energy_guarantee_mwh_per_year * (1.0 - self.degradation_fraction()).powi(exponent)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &'static str, value: f64| AnalysisError::InvalidConfig {
            field,
            value: value.to_string(),
        };

        let threshold = self.irradiance_alert_threshold_pct;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(invalid("irradiance_alert_threshold_pct", threshold));
        }
        let rate = self.degradation_rate_pct;
        if !rate.is_finite() || rate < 0.0 {
            return Err(invalid("degradation_rate_pct", rate));
        }
        let guarantee = self.energy_guarantee_mwh_per_year;
        if !guarantee.is_finite() || guarantee < 0.0 {
            return Err(invalid("energy_guarantee_mwh_per_year", guarantee));
        }
        if !self.temperature_coefficient_pct_per_c.is_finite() {
            return Err(invalid(
                "temperature_coefficient_pct_per_c",
                self.temperature_coefficient_pct_per_c,
            ));
        }
        let tariff = self.electricity_tariff;
        if !tariff.is_finite() || tariff < 0.0 {
            return Err(invalid("electricity_tariff", tariff));
        }
        if !COMMISSIONING_YEARS.contains(&self.commissioning_year) {
            return Err(AnalysisError::InvalidConfig {
                field: "commissioning_year",
                value: self.commissioning_year.to_string(),
            });
        }
        if !FORECAST_PERIOD_YEARS.contains(&self.forecast_period_years) {
            return Err(AnalysisError::InvalidConfig {
                field: "forecast_period_years",
                value: self.forecast_period_years.to_string(),
            });
        }
        Ok(())
    }
}

impl Config {
    pub fn load(path: &str) -> std::result::Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.defaults.validate()?;
        Ok(config)
    }
}
