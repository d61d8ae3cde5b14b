//! Analysis of covariance: a continuous covariate crossed with a factor.
//!
//! The model `y ~ x * g` is decomposed with sequential (type I) sums of
//! squares in the order `x`, `g`, `x:g`, matching the usual ANOVA table of a
//! linear model fitted with treatment contrasts.

use std::collections::BTreeSet;

use nalgebra::DMatrix;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use super::ols;
use crate::error::{StatsError, StatsResult};

/// One line of an ANOVA table. The residual line carries no F test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaRow {
    pub term: String,
    pub df: usize,
    pub sum_sq: f64,
    pub mean_sq: f64,
    pub f_value: Option<f64>,
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaTable {
    pub rows: Vec<AnovaRow>,
}

impl AnovaTable {
    pub fn row(&self, term: &str) -> Option<&AnovaRow> {
        self.rows.iter().find(|r| r.term == term)
    }

    pub fn p_value(&self, term: &str) -> Option<f64> {
        self.row(term).and_then(|r| r.p_value)
    }
}

/// Term labels used in the table for a covariate and a factor name.
pub fn term_names(covariate: &str, factor: &str) -> [String; 3] {
    [
        covariate.to_string(),
        factor.to_string(),
        format!("{covariate}:{factor}"),
    ]
}

/// Fit `y ~ x * group` and return its sequential ANOVA table.
///
/// The first (smallest) group level is the reference.
pub fn ancova<G>(x: &[f64], y: &[f64], groups: &[G], covariate: &str, factor: &str) -> StatsResult<AnovaTable>
where
    G: Ord + Copy,
{
    let n = y.len();
    if x.len() != n || groups.len() != n {
        return Err(StatsError::DimensionMismatch {
            y_len: n,
            x_rows: x.len().min(groups.len()),
        });
    }

    let levels: Vec<G> = groups.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    if levels.len() < 2 {
        return Err(StatsError::TooFewGroups(levels.len()));
    }
    let k = levels.len();
    let dummy = |i: usize, level: usize| if groups[i] == levels[level] { 1.0 } else { 0.0 };

    // Columns: 1 | x | D_2..D_k | x·D_2..x·D_k
    let full = DMatrix::from_fn(n, 2 * k, |i, j| match j {
        0 => 1.0,
        1 => x[i],
        j if j < k + 1 => dummy(i, j - 1),
        j => x[i] * dummy(i, j - k),
    });

    // Aliased columns (e.g. the slope dummy of a single-fish level) are
    // dropped, so every term's df is the rank it adds.
    let kept = ols::independent_columns(&full);
    let rank_of = |cols: usize| kept.iter().filter(|&&j| j < cols).count();
    let fit_columns = |cols: usize| -> StatsResult<ols::OlsFit> {
        let selected: Vec<usize> = kept.iter().copied().filter(|&j| j < cols).collect();
        let design = full.select_columns(selected.iter());
        ols::fit(&design, y, &[], 0.95)
    };

    let full_fit = fit_columns(2 * k)?;
    let additive = fit_columns(k + 1)?;
    let covariate_only = fit_columns(2)?;

    let df_resid = full_fit.df_resid;
    let residual_ms = full_fit.rss / df_resid as f64;
    let f_dist = |df: usize| {
        FisherSnedecor::new(df as f64, df_resid as f64)
            .map_err(|e| StatsError::Distribution(e.to_string()))
    };

    let [x_name, g_name, xg_name] = term_names(covariate, factor);
    let steps = [
        (x_name, rank_of(2) - rank_of(1), full_fit.tss - covariate_only.rss),
        (g_name, rank_of(k + 1) - rank_of(2), covariate_only.rss - additive.rss),
        (xg_name, rank_of(2 * k) - rank_of(k + 1), additive.rss - full_fit.rss),
    ];

    let mut rows = Vec::with_capacity(4);
    for (term, df, sum_sq) in steps {
        // A fully aliased term has nothing to test.
        if df == 0 {
            log::debug!("ANCOVA term {term} is aliased and left out of the table");
            continue;
        }
        let sum_sq = sum_sq.max(0.0);
        let mean_sq = sum_sq / df as f64;
        let f_value = mean_sq / residual_ms;
        let p_value = if f_value.is_nan() {
            f64::NAN
        } else {
            1.0 - f_dist(df)?.cdf(f_value)
        };
        rows.push(AnovaRow {
            term,
            df,
            sum_sq,
            mean_sq,
            f_value: Some(f_value),
            p_value: Some(p_value),
        });
    }
    rows.push(AnovaRow {
        term: "Residuals".to_string(),
        df: df_resid,
        sum_sq: full_fit.rss,
        mean_sq: residual_ms,
        f_value: None,
        p_value: None,
    });

    Ok(AnovaTable { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two groups sharing one line, with deterministic ±noise.
    fn parallel_data(slope_b: f64, shift_b: f64) -> (Vec<f64>, Vec<f64>, Vec<i64>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut g = Vec::new();
        for i in 0..30 {
            let xi = 10.0 + i as f64;
            let noise = [0.4, -0.3, 0.1, -0.2, 0.3, -0.3][i % 6];
            x.push(xi);
            y.push(2.0 + 1.2 * xi + noise);
            g.push(1);
            x.push(xi + 0.5);
            y.push(2.0 + shift_b + slope_b * (xi + 0.5) - noise);
            g.push(2);
        }
        (x, y, g)
    }

    #[test]
    fn test_homogeneous_groups_not_significant() {
        let (x, y, g) = parallel_data(1.2, 0.0);
        let table = ancova(&x, &y, &g, "x", "Sex").unwrap();

        assert_eq!(table.rows.len(), 4);
        assert!(table.p_value("x").unwrap() < 1e-10);
        assert!(table.p_value("Sex").unwrap() >= 0.05);
        assert!(table.p_value("x:Sex").unwrap() >= 0.05);
    }

    #[test]
    fn test_slope_difference_detected() {
        let (x, y, g) = parallel_data(1.6, 0.0);
        let table = ancova(&x, &y, &g, "x", "Sex").unwrap();
        assert!(table.p_value("x:Sex").unwrap() < 0.05);
    }

    #[test]
    fn test_sums_of_squares_partition_total() {
        let (x, y, g) = parallel_data(1.3, 2.0);
        let table = ancova(&x, &y, &g, "x", "Sex").unwrap();

        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let tss: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
        let total: f64 = table.rows.iter().map(|r| r.sum_sq).sum();
        assert_relative_eq!(total, tss, max_relative = 1e-9);

        let dfs: Vec<usize> = table.rows.iter().map(|r| r.df).collect();
        assert_eq!(dfs, vec![1, 1, 1, y.len() - 4]);
    }

    #[test]
    fn test_single_group_rejected() {
        let err = ancova(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.5], &[1, 1, 1], "x", "Sex").unwrap_err();
        assert!(matches!(err, StatsError::TooFewGroups(1)));
    }

    #[test]
    fn test_singleton_level_loses_its_slope_df() {
        let (mut x, mut y, mut g) = parallel_data(1.2, 0.0);
        x.push(20.0);
        y.push(26.3);
        g.push(3);
        let table = ancova(&x, &y, &g, "x", "Sex").unwrap();

        assert_eq!(table.row("Sex").unwrap().df, 2);
        assert_eq!(table.row("x:Sex").unwrap().df, 1);
        assert_eq!(table.row("Residuals").unwrap().df, y.len() - 5);

        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let tss: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
        let total: f64 = table.rows.iter().map(|r| r.sum_sq).sum();
        assert_relative_eq!(total, tss, max_relative = 1e-9);
    }

    #[test]
    fn test_three_levels_use_two_df() {
        let x: Vec<f64> = (0..24).map(|i| i as f64).collect();
        let g: Vec<i64> = (0..24).map(|i| (i % 3) as i64).collect();
        let y: Vec<f64> = x
            .iter()
            .zip(&g)
            .map(|(xi, gi)| 1.0 + xi + *gi as f64 * 0.5 + if *xi as i64 % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let table = ancova(&x, &y, &g, "x", "Sex").unwrap();
        assert_eq!(table.row("Sex").unwrap().df, 2);
        assert_eq!(table.row("x:Sex").unwrap().df, 2);
        assert_eq!(table.row("Residuals").unwrap().df, 18);
    }
}
