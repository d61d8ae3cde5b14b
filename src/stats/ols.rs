//! Ordinary least squares on an explicit design matrix.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{StatsError, StatsResult};

/// Coefficient estimate with its inference statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// A fitted linear model `y = Xβ + ε`.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: Vec<Coefficient>,
    /// Unscaled `(XᵀX)⁻¹`; multiply by `sigma²` for `Cov(β)`.
    pub xtx_inv: DMatrix<f64>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Total sum of squares around the mean of `y`.
    pub tss: f64,
    pub df_resid: usize,
    pub n_obs: usize,
    pub confidence_level: f64,
}

impl OlsFit {
    /// Unadjusted coefficient of determination.
    pub fn r_squared(&self) -> f64 {
        if self.tss > 0.0 {
            1.0 - self.rss / self.tss
        } else {
            f64::NAN
        }
    }

    /// Residual variance estimate `RSS / df`.
    pub fn sigma2(&self) -> f64 {
        self.rss / self.df_resid as f64
    }

    pub fn residual_std_error(&self) -> f64 {
        self.sigma2().sqrt()
    }

    /// Standard error of the mean response at a design row `x0`.
    pub fn mean_std_error(&self, x0: &[f64]) -> f64 {
        let v = DVector::from_column_slice(x0);
        let var = (v.transpose() * &self.xtx_inv * &v)[(0, 0)] * self.sigma2();
        var.max(0.0).sqrt()
    }
}

/// Relative tolerance below which a column is treated as a linear
/// combination of the columns before it.
pub const ALIAS_TOLERANCE: f64 = 1e-7;

/// Indices of the columns of `x` that are not linear combinations of earlier
/// columns, in order. When two columns are aliased the earlier one is kept.
///
/// Each column is orthogonalised against the accepted ones (Gram-Schmidt,
/// applied twice) and dropped if what remains is smaller than
/// `ALIAS_TOLERANCE` times its original norm.
pub fn independent_columns(x: &DMatrix<f64>) -> Vec<usize> {
    let mut basis: Vec<DVector<f64>> = Vec::new();
    let mut kept = Vec::new();
    for j in 0..x.ncols() {
        let column = x.column(j).into_owned();
        let norm = column.norm();
        if norm == 0.0 {
            continue;
        }
        let mut rest = column;
        for _ in 0..2 {
            for q in &basis {
                let proj = q.dot(&rest);
                rest -= q * proj;
            }
        }
        let rest_norm = rest.norm();
        if rest_norm > ALIAS_TOLERANCE * norm {
            basis.push(rest / rest_norm);
            kept.push(j);
        }
    }
    kept
}

/// Two-sided critical value of Student's t at the given confidence level.
pub fn t_critical(confidence_level: f64, df: usize) -> StatsResult<f64> {
    let dist = StudentsT::new(0.0, 1.0, df as f64)
        .map_err(|e| StatsError::Distribution(e.to_string()))?;
    Ok(dist.inverse_cdf((1.0 + confidence_level) / 2.0))
}

/// Two-sided p-value `2·(1 − F(|t|))` for a t statistic.
pub fn two_sided_p(t: f64, df: usize) -> StatsResult<f64> {
    if t.is_nan() {
        return Ok(f64::NAN);
    }
    let dist = StudentsT::new(0.0, 1.0, df as f64)
        .map_err(|e| StatsError::Distribution(e.to_string()))?;
    Ok(2.0 * (1.0 - dist.cdf(t.abs())))
}

/// Fit OLS by solving the normal equations with a Cholesky factorisation.
///
/// `x` is `n × p` and must already contain an intercept column if one is
/// wanted. `names` labels the `p` coefficients.
pub fn fit(
    x: &DMatrix<f64>,
    y: &[f64],
    names: &[&str],
    confidence_level: f64,
) -> StatsResult<OlsFit> {
    let n_obs = y.len();
    let n_params = x.ncols();

    if n_obs == 0 {
        return Err(StatsError::EmptyInput { field: "y" });
    }
    if x.nrows() != n_obs {
        return Err(StatsError::DimensionMismatch {
            y_len: n_obs,
            x_rows: x.nrows(),
        });
    }
    if n_obs <= n_params {
        return Err(StatsError::InsufficientData {
            rows: n_obs,
            cols: n_params,
        });
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite { field: "y" });
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite { field: "X" });
    }

    if independent_columns(x).len() < n_params {
        return Err(StatsError::SingularMatrix);
    }

    let y_vec = DVector::from_column_slice(y);
    let xt = x.transpose();
    let chol = (&xt * x).cholesky().ok_or(StatsError::SingularMatrix)?;
    let beta = chol.solve(&(&xt * &y_vec));
    let xtx_inv = chol.inverse();

    if xtx_inv.iter().any(|v| !v.is_finite()) || (0..n_params).any(|j| xtx_inv[(j, j)] <= 0.0) {
        return Err(StatsError::SingularMatrix);
    }

    let fitted_vec = x * &beta;
    let residuals: Vec<f64> = y_vec.iter().zip(fitted_vec.iter()).map(|(a, b)| a - b).collect();
    let rss: f64 = residuals.iter().map(|e| e * e).sum();
    let mean_y = y.iter().sum::<f64>() / n_obs as f64;
    let tss: f64 = y.iter().map(|v| (v - mean_y).powi(2)).sum();
    let df_resid = n_obs - n_params;

    let sigma2 = rss / df_resid as f64;
    let t_crit = t_critical(confidence_level, df_resid)?;

    let coefficients = (0..n_params)
        .map(|j| {
            let estimate = beta[j];
            let std_error = (xtx_inv[(j, j)] * sigma2).sqrt();
            let t_value = estimate / std_error;
            Ok(Coefficient {
                name: names.get(j).map_or_else(|| format!("x{j}"), |s| s.to_string()),
                estimate,
                std_error,
                t_value,
                p_value: two_sided_p(t_value, df_resid)?,
                ci_lower: estimate - t_crit * std_error,
                ci_upper: estimate + t_crit * std_error,
            })
        })
        .collect::<StatsResult<Vec<_>>>()?;

    Ok(OlsFit {
        coefficients,
        xtx_inv,
        fitted: fitted_vec.iter().copied().collect(),
        residuals,
        rss,
        tss,
        df_resid,
        n_obs,
        confidence_level,
    })
}
