/// Statistical pipeline from a loaded dataset to fitted models.
///
/// ```text
///   Dataset (loaded)
///        │
///        ▼
///   ┌──────────┐
///   │  clean    │  invalid rows, outliers, undefined sex → general / sexed
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ dimorphism  │  ANCOVA on sexed → Pooled | Split
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   fit     │  one regression on general, or one per sex on sexed
///   └──────────┘
/// ```
///
/// Everything here is in-memory; loading and export live in `data` and
/// `report`.
pub mod dimorphism;
pub mod fit;

use std::collections::BTreeSet;

use crate::config::Settings;
use crate::data::filter::{CleanedData, clean};
use crate::data::model::{Dataset, Sex};
use dimorphism::{DimorphismTest, ModelPath, test_dimorphism};
use fit::{ModelSet, Scope, fit_scope, fit_split};

/// Every intermediate product of one analysis, handed explicitly to the
/// reporter.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub loaded: Dataset,
    pub cleaned: CleanedData,
    pub dimorphism: Option<DimorphismTest>,
    pub models: ModelSet,
}

impl AnalysisOutcome {
    pub fn path(&self) -> ModelPath {
        match self.models {
            ModelSet::Pooled(_) => ModelPath::Pooled,
            ModelSet::Split(_) => ModelPath::Split,
        }
    }
}

pub fn run(loaded: Dataset, settings: &Settings) -> AnalysisOutcome {
    let cleaned = clean(&loaded, settings);
    let dimorphism = test_dimorphism(&cleaned.sexed, settings);
    let path = dimorphism.as_ref().map_or(ModelPath::Pooled, |d| d.path);

    let models = match path {
        ModelPath::Pooled => ModelSet::Pooled(fit_scope(&cleaned.general, Scope::General, settings)),
        ModelPath::Split => {
            // Sex levels come from the loaded table, so a sex that lost all of
            // its rows during cleaning is an empty partition.
            let levels: BTreeSet<Sex> = loaded
                .observations
                .iter()
                .map(|obs| obs.sex)
                .filter(|sex| *sex != settings.undefined_sex)
                .collect();
            ModelSet::Split(fit_split(&cleaned.sexed, &levels, settings))
        }
    };

    AnalysisOutcome {
        loaded,
        cleaned,
        dimorphism,
        models,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Analysis, Observation};
    use crate::testutil::{SimpleRng, lwr_group};

    /// 25 lengths, each measured twice with weight errors of ±0.01 in log10.
    /// The errors are orthogonal to the design, so the fitted slope is
    /// exactly 3.
    fn isometric_fish() -> Dataset {
        let mut observations = Vec::new();
        for i in 0..25 {
            let length = 8.0 + i as f64 * 0.75;
            for sign in [1.0, -1.0] {
                let log_w = 3.0 * length.log10() + sign * 0.01;
                observations.push(Observation {
                    s_length: length,
                    response: 10f64.powf(log_w),
                    sex: Sex(1),
                });
            }
        }
        Dataset::new(Analysis::Lwr, observations)
    }

    #[test]
    fn test_isometric_round_trip_takes_pooled_path() {
        let outcome = run(isometric_fish(), &Settings::default());

        assert_eq!(outcome.loaded.len(), 50);
        assert!(outcome.dimorphism.is_none());
        let ModelSet::Pooled(Some(result)) = &outcome.models else {
            panic!("expected a pooled result");
        };
        assert_eq!(result.n, 50);
        assert!(result.r_squared > 0.95);
        assert!((result.slope.estimate - 3.0).abs() < 1e-9);
        assert!(result.isometry.as_ref().unwrap().p_value > 0.05);
    }

    #[test]
    fn test_homogeneous_sexes_take_pooled_path() {
        let mut rng = SimpleRng::new(31);
        let mut obs = lwr_group(&mut rng, 50, 1, -2.0, 3.0, 0.03);
        obs.extend(lwr_group(&mut rng, 50, 2, -2.0, 3.0, 0.03));
        obs.extend(lwr_group(&mut rng, 10, 9, -2.0, 3.0, 0.03));
        let outcome = run(Dataset::new(Analysis::Lwr, obs), &Settings::default());

        let test = outcome.dimorphism.as_ref().unwrap();
        assert!(test.p_interaction >= 0.05);
        assert!(test.p_sex >= 0.05);
        assert_eq!(outcome.path(), ModelPath::Pooled);

        let ModelSet::Pooled(Some(result)) = &outcome.models else {
            panic!("expected a pooled result");
        };
        // Undefined-sex fish count towards the pooled sample.
        let general = &outcome.cleaned.general;
        let undefined = general.observations.iter().filter(|o| o.sex == Sex::UNDEFINED).count();
        assert_eq!(result.n, general.len());
        assert!(undefined > 0);
        assert_eq!(result.n, outcome.cleaned.sexed.len() + undefined);
    }

    #[test]
    fn test_dimorphic_sexes_take_split_path_without_sentinel() {
        let mut rng = SimpleRng::new(13);
        let mut obs = lwr_group(&mut rng, 60, 1, -1.8, 3.0, 0.02);
        obs.extend(lwr_group(&mut rng, 60, 2, -1.6, 3.0, 0.02));
        obs.extend(lwr_group(&mut rng, 15, 9, -1.7, 3.0, 0.02));
        let outcome = run(Dataset::new(Analysis::Lwr, obs), &Settings::default());

        assert_eq!(outcome.path(), ModelPath::Split);
        let ModelSet::Split(groups) = &outcome.models else {
            panic!("expected split results");
        };
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![Sex(1), Sex(2)]);
        assert!(groups.values().all(|r| r.isometry.is_some()));
    }
}
