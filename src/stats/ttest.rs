use serde::Serialize;

use super::ols::{two_sided_p, Coefficient};
use crate::error::StatsResult;

/// Two-sided t test of `H0: coefficient = reference`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientTest {
    pub reference: f64,
    pub std_error: f64,
    pub t_statistic: f64,
    pub df: usize,
    pub p_value: f64,
}

/// `t = (estimate − reference) / SE`, `p = 2·(1 − T_cdf(|t|, df))`.
pub fn test_coefficient(coef: &Coefficient, reference: f64, df: usize) -> StatsResult<CoefficientTest> {
    let t_statistic = (coef.estimate - reference) / coef.std_error;
    Ok(CoefficientTest {
        reference,
        std_error: coef.std_error,
        t_statistic,
        df,
        p_value: two_sided_p(t_statistic, df)?,
    })
}
