use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::config::Settings;
use crate::data::model::{Analysis, Dataset, PREDICTOR_COLUMN, Sex};
use crate::stats::line::{LineFit, fit_line};
use crate::stats::ols::Coefficient;
use crate::stats::ttest::{CoefficientTest, test_coefficient};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Which fish a regression was fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Scope {
    General,
    Sex(Sex),
}

impl Scope {
    /// Short, file-name friendly form.
    pub fn slug(&self) -> String {
        match self {
            Scope::General => "general".to_string(),
            Scope::Sex(sex) => format!("sex_{sex}"),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::General => f.write_str("General"),
            Scope::Sex(sex) => write!(f, "Sex {sex}"),
        }
    }
}

/// `a = 10^intercept` with its interval mapped the same way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BackTransformed {
    pub estimate: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRange {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

impl MeasurementRange {
    fn of(column: &str, values: impl Iterator<Item = f64>) -> Self {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        MeasurementRange {
            column: column.to_string(),
            min,
            max,
        }
    }
}

/// Everything reported about one fitted regression.
#[derive(Debug, Clone, Serialize)]
pub struct RegressionResult {
    pub analysis: Analysis,
    pub scope: Scope,
    pub intercept: Coefficient,
    pub slope: Coefficient,
    /// LWR only.
    pub a: Option<BackTransformed>,
    pub r_squared: f64,
    pub n: usize,
    pub df_resid: usize,
    pub residual_std_error: f64,
    /// LWR only: slope against isometric growth.
    pub isometry: Option<CoefficientTest>,
    /// Raw-scale predictor range, then response range.
    pub ranges: Vec<MeasurementRange>,
    #[serde(skip)]
    pub line: LineFit,
    #[serde(skip)]
    pub data: Dataset,
}

pub type GroupedResult = BTreeMap<Sex, RegressionResult>;

/// What the fitter produced for the path chosen by the dimorphism test.
#[derive(Debug, Clone)]
pub enum ModelSet {
    /// `None` when the pooled fit was degenerate.
    Pooled(Option<RegressionResult>),
    /// One entry per sex with a usable fit.
    Split(GroupedResult),
}

impl ModelSet {
    /// All results in reporting order.
    pub fn results(&self) -> Vec<&RegressionResult> {
        match self {
            ModelSet::Pooled(result) => result.iter().collect(),
            ModelSet::Split(groups) => groups.values().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Fitting
// ---------------------------------------------------------------------------

/// Fit one scope. Empty data is skipped silently; a degenerate fit is skipped
/// with a warning.
pub fn fit_scope(dataset: &Dataset, scope: Scope, settings: &Settings) -> Option<RegressionResult> {
    let analysis = dataset.analysis;
    if dataset.is_empty() {
        log::debug!("{analysis} {scope}: no rows, skipped");
        return None;
    }

    let line = match fit_line(
        &dataset.predictor(),
        &dataset.response(),
        &analysis.predictor_label(),
        settings.confidence_level,
    ) {
        Ok(line) => line,
        Err(e) => {
            log::warn!("{analysis} {scope}: regression skipped ({e})");
            return None;
        }
    };

    let intercept = line.intercept().clone();
    let slope = line.slope().clone();

    let (a, isometry) = if analysis.is_log_scale() {
        let a = BackTransformed {
            estimate: analysis.back_transform(intercept.estimate),
            ci_lower: analysis.back_transform(intercept.ci_lower),
            ci_upper: analysis.back_transform(intercept.ci_upper),
        };
        let isometry = match test_coefficient(&slope, settings.isometry_slope, line.df_resid()) {
            Ok(test) => Some(test),
            Err(e) => {
                log::warn!("{analysis} {scope}: isometry test failed ({e})");
                None
            }
        };
        (Some(a), isometry)
    } else {
        (None, None)
    };

    let ranges = vec![
        MeasurementRange::of(PREDICTOR_COLUMN, dataset.observations.iter().map(|o| o.s_length)),
        MeasurementRange::of(analysis.response_column(), dataset.observations.iter().map(|o| o.response)),
    ];

    log::info!(
        "{analysis} {scope}: n = {}, intercept = {:.4}, slope = {:.4}, R² = {:.4}",
        line.n_obs(),
        intercept.estimate,
        slope.estimate,
        line.r_squared()
    );

    Some(RegressionResult {
        analysis,
        scope,
        r_squared: line.r_squared(),
        n: line.n_obs(),
        df_resid: line.df_resid(),
        residual_std_error: line.model.residual_std_error(),
        intercept,
        slope,
        a,
        isometry,
        ranges,
        line,
        data: dataset.clone(),
    })
}

/// Split `dataset` by sex over `levels`. Levels without rows map to an empty
/// dataset.
pub fn partition_by_sex(dataset: &Dataset, levels: &BTreeSet<Sex>) -> BTreeMap<Sex, Dataset> {
    levels
        .iter()
        .map(|&sex| (sex, dataset.filtered(|obs| obs.sex == sex)))
        .collect()
}

/// Fit each sex independently; sexes that yield no result are absent.
pub fn fit_split(sexed: &Dataset, levels: &BTreeSet<Sex>, settings: &Settings) -> GroupedResult {
    partition_by_sex(sexed, levels)
        .into_iter()
        .filter_map(|(sex, part)| fit_scope(&part, Scope::Sex(sex), settings).map(|r| (sex, r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Observation;
    use crate::testutil::{SimpleRng, llr_dataset, lwr_group};
    use approx::assert_relative_eq;
    use statrs::distribution::{ContinuousCDF, StudentsT};

    #[test]
    fn test_lwr_intercept_back_transform_is_exact() {
        let mut rng = SimpleRng::new(1);
        let ds = Dataset::new(Analysis::Lwr, lwr_group(&mut rng, 40, 1, -1.7, 3.1, 0.03));
        let result = fit_scope(&ds, Scope::General, &Settings::default()).unwrap();

        let a = result.a.unwrap();
        assert_eq!(a.estimate, 10f64.powf(result.intercept.estimate));
        assert_eq!(a.ci_lower, 10f64.powf(result.intercept.ci_lower));
        assert!(a.ci_lower < a.estimate && a.estimate < a.ci_upper);
    }

    #[test]
    fn test_isometry_statistic_matches_definition() {
        let mut rng = SimpleRng::new(2);
        let ds = Dataset::new(Analysis::Lwr, lwr_group(&mut rng, 35, 2, -2.0, 3.2, 0.05));
        let result = fit_scope(&ds, Scope::General, &Settings::default()).unwrap();
        let test = result.isometry.unwrap();

        assert_eq!(test.df, result.n - 2);
        assert_relative_eq!(
            test.t_statistic,
            (result.slope.estimate - 3.0) / result.slope.std_error,
            epsilon = 1e-12
        );
        let dist = StudentsT::new(0.0, 1.0, test.df as f64).unwrap();
        assert_relative_eq!(
            test.p_value,
            2.0 * (1.0 - dist.cdf(test.t_statistic.abs())),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_llr_has_no_lwr_extras() {
        let mut rng = SimpleRng::new(4);
        let ds = llr_dataset(&mut rng, 30, &[1]);
        let result = fit_scope(&ds, Scope::General, &Settings::default()).unwrap();
        assert!(result.a.is_none());
        assert!(result.isometry.is_none());
        assert_relative_eq!(result.slope.estimate, 1.15, epsilon = 0.02);
        assert_eq!(result.ranges[1].column, "T_Length");
    }

    #[test]
    fn test_ranges_are_raw_scale() {
        let ds = Dataset::new(
            Analysis::Lwr,
            vec![
                Observation { s_length: 10.0, response: 12.0, sex: Sex(1) },
                Observation { s_length: 20.0, response: 95.0, sex: Sex(1) },
                Observation { s_length: 15.0, response: 41.0, sex: Sex(1) },
            ],
        );
        let result = fit_scope(&ds, Scope::General, &Settings::default()).unwrap();
        assert_eq!(result.ranges[0].min, 10.0);
        assert_eq!(result.ranges[0].max, 20.0);
        assert_eq!(result.ranges[1].max, 95.0);
    }

    #[test]
    fn test_empty_and_degenerate_partitions_are_skipped() {
        let mut rng = SimpleRng::new(8);
        let mut obs = lwr_group(&mut rng, 30, 1, -2.0, 3.0, 0.03);
        obs.extend(lwr_group(&mut rng, 2, 2, -2.0, 3.0, 0.03));
        let ds = Dataset::new(Analysis::Lwr, obs);

        let levels: BTreeSet<Sex> = [Sex(1), Sex(2), Sex(3)].into_iter().collect();
        let grouped = fit_split(&ds, &levels, &Settings::default());
        assert_eq!(grouped.keys().copied().collect::<Vec<_>>(), vec![Sex(1)]);
    }

    #[test]
    fn test_constant_length_partition_is_skipped() {
        let obs: Vec<Observation> = [18.0, 19.5, 21.0, 20.2, 18.7]
            .into_iter()
            .map(|w| Observation { s_length: 12.3, response: w, sex: Sex(2) })
            .collect();
        let ds = Dataset::new(Analysis::Lwr, obs);
        assert!(fit_scope(&ds, Scope::Sex(Sex(2)), &Settings::default()).is_none());

        let mut rng = SimpleRng::new(9);
        let mut mixed = lwr_group(&mut rng, 30, 1, -2.0, 3.0, 0.03);
        mixed.extend(ds.observations.iter().copied());
        let mixed = Dataset::new(Analysis::Lwr, mixed);
        let levels: BTreeSet<Sex> = [Sex(1), Sex(2)].into_iter().collect();
        let grouped = fit_split(&mixed, &levels, &Settings::default());
        assert_eq!(grouped.keys().copied().collect::<Vec<_>>(), vec![Sex(1)]);
    }

    #[test]
    fn test_scope_labels() {
        assert_eq!(Scope::General.to_string(), "General");
        assert_eq!(Scope::Sex(Sex(2)).to_string(), "Sex 2");
        assert_eq!(Scope::Sex(Sex(2)).slug(), "sex_2");
    }
}
