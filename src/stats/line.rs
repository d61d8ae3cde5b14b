//! Simple linear regression `y = a + b·x`.

use nalgebra::DMatrix;

use super::ols::{self, Coefficient, OlsFit};
use crate::error::StatsResult;

pub const INTERCEPT: &str = "(Intercept)";

/// A straight line fitted by OLS together with what is needed to draw its
/// confidence band.
#[derive(Debug, Clone)]
pub struct LineFit {
    pub model: OlsFit,
    band_t: f64,
}

impl LineFit {
    pub fn intercept(&self) -> &Coefficient {
        &self.model.coefficients[0]
    }

    pub fn slope(&self) -> &Coefficient {
        &self.model.coefficients[1]
    }

    pub fn r_squared(&self) -> f64 {
        self.model.r_squared()
    }

    pub fn n_obs(&self) -> usize {
        self.model.n_obs
    }

    pub fn df_resid(&self) -> usize {
        self.model.df_resid
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept().estimate + self.slope().estimate * x
    }

    /// Confidence interval of the mean response at `x`: `(lower, fit, upper)`.
    pub fn band(&self, x: f64) -> (f64, f64, f64) {
        let mid = self.predict(x);
        let half = self.band_t * self.model.mean_std_error(&[1.0, x]);
        (mid - half, mid, mid + half)
    }

    /// Residuals divided by their sample standard deviation.
    pub fn standardized_residuals(&self) -> Vec<f64> {
        let sd = sample_std_dev(&self.model.residuals);
        self.model.residuals.iter().map(|e| e / sd).collect()
    }
}

/// Fit `y` on `x` with an intercept.
pub fn fit_line(x: &[f64], y: &[f64], slope_name: &str, confidence_level: f64) -> StatsResult<LineFit> {
    let design = DMatrix::from_fn(x.len(), 2, |i, j| if j == 0 { 1.0 } else { x[i] });
    let model = ols::fit(&design, y, &[INTERCEPT, slope_name], confidence_level)?;
    let band_t = ols::t_critical(confidence_level, model.df_resid)?;
    Ok(LineFit { model, band_t })
}

/// Sample standard deviation with the `n − 1` denominator.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}
