//! Deterministic synthetic fish for unit tests.

use crate::data::model::{Analysis, Dataset, Observation, Sex};
pub use crate::rng::SimpleRng;

/// `T_Length = 0.8 + 1.15·S_Length + N(0, 0.5)`, sexes assigned round-robin.
pub fn llr_dataset(rng: &mut SimpleRng, n: usize, sexes: &[i64]) -> Dataset {
    let observations = (0..n)
        .map(|i| {
            let s_length = rng.uniform(60.0, 200.0);
            Observation {
                s_length,
                response: 0.8 + 1.15 * s_length + rng.gauss(0.0, 0.5),
                sex: Sex(sexes[i % sexes.len()]),
            }
        })
        .collect();
    Dataset::new(Analysis::Llr, observations)
}

/// `log10(W) = log10(a) + b·log10(S_Length) + N(0, sd)` for one sex.
pub fn lwr_group(rng: &mut SimpleRng, n: usize, sex: i64, log_a: f64, b: f64, sd: f64) -> Vec<Observation> {
    (0..n)
        .map(|_| {
            let s_length = rng.uniform(5.0, 30.0);
            let log_w = log_a + b * s_length.log10() + rng.gauss(0.0, sd);
            Observation {
                s_length,
                response: 10f64.powf(log_w),
                sex: Sex(sex),
            }
        })
        .collect()
}
