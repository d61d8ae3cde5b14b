use std::fmt;

use serde::Serialize;

use crate::config::Settings;
use crate::data::model::{Dataset, SEX_COLUMN};
use crate::stats::ancova::{AnovaTable, ancova, term_names};

/// Which family of models the fitter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelPath {
    /// Sexes are homogeneous: one regression on all fish.
    Pooled,
    /// Sexes differ in slope or intercept: one regression per sex.
    Split,
}

impl fmt::Display for ModelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelPath::Pooled => f.write_str("pooled"),
            ModelPath::Split => f.write_str("split by sex"),
        }
    }
}

/// Split as soon as either the slope (interaction) or the intercept (sex)
/// term is significant at `alpha`. An undefined p-value never triggers a split.
pub fn decide(p_interaction: f64, p_sex: f64, alpha: f64) -> ModelPath {
    if p_interaction < alpha || p_sex < alpha {
        ModelPath::Split
    } else {
        ModelPath::Pooled
    }
}

/// ANCOVA outcome for `response ~ predictor * Sex`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimorphismTest {
    pub table: AnovaTable,
    pub p_interaction: f64,
    pub p_sex: f64,
    pub alpha: f64,
    pub path: ModelPath,
}

/// Run the ANCOVA on the sex-filtered data. `None` when it cannot be fitted,
/// e.g. only one sex is present.
pub fn test_dimorphism(sexed: &Dataset, settings: &Settings) -> Option<DimorphismTest> {
    let analysis = sexed.analysis;
    let covariate = analysis.predictor_label();

    let table = match ancova(
        &sexed.predictor(),
        &sexed.response(),
        &sexed.sexes(),
        &covariate,
        SEX_COLUMN,
    ) {
        Ok(table) => table,
        Err(e) => {
            log::warn!("{analysis}: dimorphism cannot be tested ({e}); using the pooled model");
            return None;
        }
    };

    let [_, sex_term, interaction_term] = term_names(&covariate, SEX_COLUMN);
    let p_sex = table.p_value(&sex_term).unwrap_or(f64::NAN);
    let p_interaction = table.p_value(&interaction_term).unwrap_or(f64::NAN);
    let path = decide(p_interaction, p_sex, settings.alpha);

    log::info!(
        "{analysis}: ANCOVA p(Sex) = {p_sex:.4}, p({interaction_term}) = {p_interaction:.4} → {path}"
    );

    Some(DimorphismTest {
        table,
        p_interaction,
        p_sex,
        alpha: settings.alpha,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Analysis, Observation, Sex};
    use crate::testutil::{SimpleRng, lwr_group};

    #[test]
    fn test_decision_rule() {
        assert_eq!(decide(0.05, 0.05, 0.05), ModelPath::Pooled);
        assert_eq!(decide(0.8, 0.3, 0.05), ModelPath::Pooled);
        assert_eq!(decide(0.049, 0.9, 0.05), ModelPath::Split);
        assert_eq!(decide(0.9, 0.001, 0.05), ModelPath::Split);
        assert_eq!(decide(f64::NAN, f64::NAN, 0.05), ModelPath::Pooled);
    }

    #[test]
    fn test_different_growth_splits() {
        let mut rng = SimpleRng::new(21);
        let mut obs = lwr_group(&mut rng, 60, 1, -2.0, 3.0, 0.02);
        obs.extend(lwr_group(&mut rng, 60, 2, -2.3, 3.25, 0.02));
        let ds = Dataset::new(Analysis::Lwr, obs);

        let test = test_dimorphism(&ds, &Settings::default()).unwrap();
        assert_eq!(test.path, ModelPath::Split);
        assert!(test.table.row("log10(S_Length):Sex").is_some());
    }

    #[test]
    fn test_single_sex_is_untestable() {
        let ds = Dataset::new(
            Analysis::Llr,
            (0..10)
                .map(|i| Observation { s_length: i as f64, response: 2.0 * i as f64 + (i % 2) as f64, sex: Sex(1) })
                .collect(),
        );
        assert!(test_dimorphism(&ds, &Settings::default()).is_none());
    }
}
