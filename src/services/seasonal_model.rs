//! Seasonal trend regression for monthly series.
//!
//!   y(t) = a + b·t + Σ_k [c_k·cos(2πk·m/12) + d_k·sin(2πk·m/12)]
//!
//! `t` is measured in years from the first observation and `m` is the zero-based
//! calendar month, so the seasonal shape is tied to the calendar rather than to
//! the position in the series. The Fourier coefficients carry a small ridge
//! penalty, which keeps the normal equations solvable for series shorter than
//! the number of parameters. The normal equations are solved by LU
//! decomposition.

use std::f64::consts::PI;

use chrono::{Datelike, Months, NaiveDate};
use nalgebra::{DMatrix, DVector};

/// z-score of a central 80 % interval.
const Z_80: f64 = 1.281_551_565_5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonalTrendParams {
    pub fourier_order: usize,
    pub seasonality_ridge: f64,
    pub interval_z: f64,
}

impl SeasonalTrendParams {
    /// Recency fit used for the next-month outlook.
    pub const fn short_term() -> Self {
        Self {
            fourier_order: 3,
            seasonality_ridge: 0.1,
            interval_z: Z_80,
        }
    }

    /// Full-history fit used for multi-year projections.
    pub const fn long_term() -> Self {
        Self {
            fourier_order: 3,
            seasonality_ridge: 0.1,
            interval_z: Z_80,
        }
    }

    fn n_params(&self) -> usize {
        2 + 2 * self.fourier_order
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub yhat: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone)]
pub struct SeasonalTrendModel {
    params: SeasonalTrendParams,
    origin: i32,
    coefficients: DVector<f64>,
    sigma: f64,
}

fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// First day of the month `n` months after `date`.
pub fn add_months(date: NaiveDate, n: u32) -> Option<NaiveDate> {
    date.with_day(1)?.checked_add_months(Months::new(n))
}

/// Regressors of one month: intercept, years since `origin`, Fourier pairs.
fn design_row(params: &SeasonalTrendParams, origin: i32, index: i32) -> DVector<f64> {
    let t = f64::from(index - origin) / 12.0;
    let m = f64::from(index.rem_euclid(12));
    let mut row = DVector::zeros(params.n_params());
    row[0] = 1.0;
    row[1] = t;
    for k in 1..=params.fourier_order {
        let angle = 2.0 * PI * k as f64 * m / 12.0;
        row[2 * k] = angle.cos();
        row[2 * k + 1] = angle.sin();
    }
    row
}

impl SeasonalTrendModel {
    /// Fits the model by penalised least squares.
    ///
    /// Returns `None` when fewer than two distinct months are given or the
    /// normal equations cannot be solved.
    pub fn fit(points: &[(NaiveDate, f64)], params: SeasonalTrendParams) -> Option<Self> {
        let origin = points.iter().map(|(d, _)| month_index(*d)).min()?;
        let last = points.iter().map(|(d, _)| month_index(*d)).max()?;
        if last == origin {
            return None;
        }

        let p = params.n_params();
        let mut x = DMatrix::<f64>::zeros(points.len(), p);
        let mut y = DVector::<f64>::zeros(points.len());
        for (i, (date, value)) in points.iter().enumerate() {
            x.set_row(i, &design_row(&params, origin, month_index(*date)).transpose());
            y[i] = finite_or_zero(*value);
        }

        let xt = x.transpose();
        let mut normal = &xt * &x;
        // trend terms stay unpenalised
        for i in 2..p {
            normal[(i, i)] += params.seasonality_ridge;
        }
        let coefficients = normal.lu().solve(&(&xt * &y))?;
        if !coefficients.iter().all(|c| c.is_finite()) {
            return None;
        }

        let residuals = &x * &coefficients - &y;
        let sigma = (residuals.norm_squared() / points.len() as f64).sqrt();

        Some(Self {
            params,
            origin,
            coefficients,
            sigma,
        })
    }

    fn evaluate(&self, index: i32) -> f64 {
        design_row(&self.params, self.origin, index).dot(&self.coefficients)
    }

    pub fn predict(&self, date: NaiveDate) -> Prediction {
        let yhat = self.evaluate(month_index(date));
        let half_width = self.params.interval_z * self.sigma;
        Prediction {
            yhat,
            lower: yhat - half_width,
            upper: yhat + half_width,
        }
    }

    /// Trend slope in units per year.
    pub fn slope_per_year(&self) -> f64 {
        self.coefficients[1]
    }
}
