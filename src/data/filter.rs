use serde::Serialize;

use super::model::{Analysis, Dataset, PREDICTOR_COLUMN, Sex};
use crate::config::Settings;
use crate::stats::line::{LineFit, fit_line};

// ---------------------------------------------------------------------------
// Cleaning result
// ---------------------------------------------------------------------------

/// Both filtered views produced by [`clean`].
#[derive(Debug, Clone)]
pub struct CleanedData {
    /// Valid rows without outliers; undefined sex is kept. Feeds the pooled fit.
    pub general: Dataset,
    /// `general` without undefined sex. Feeds ANCOVA and the per-sex fits.
    pub sexed: Dataset,
    pub screen: OutlierScreen,
    pub summary: CleaningSummary,
}

/// The single preliminary regression used to flag outliers.
#[derive(Debug, Clone)]
pub struct OutlierScreen {
    /// `None` when the preliminary fit was degenerate and nothing was flagged.
    pub preliminary: Option<LineFit>,
    /// Standardised residual of every row that entered the screen, in order.
    pub scores: Vec<f64>,
    pub threshold: f64,
}

impl OutlierScreen {
    pub fn is_outlier(&self, score: f64) -> bool {
        score.abs() >= self.threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleaningSummary {
    pub loaded: usize,
    pub invalid_removed: usize,
    pub outliers_removed: usize,
    pub undefined_sex_removed: usize,
    pub general_n: usize,
    pub sexed_n: usize,
}

// ---------------------------------------------------------------------------
// Row predicates
// ---------------------------------------------------------------------------

/// Drop biologically impossible rows: zero total length for LLR, and
/// non-positive weight or length for LWR since they have no logarithm.
pub fn drop_invalid(dataset: &Dataset) -> Dataset {
    match dataset.analysis {
        Analysis::Llr => dataset.filtered(|obs| obs.response != 0.0),
        Analysis::Lwr => dataset.filtered(|obs| obs.response > 0.0 && obs.s_length > 0.0),
    }
}

/// Flag outliers from one regression of the response on the predictor, on
/// the fitting scale, and drop rows whose standardised residual reaches the
/// threshold. Detection is done exactly once.
pub fn screen_outliers(dataset: &Dataset, threshold: f64, confidence_level: f64) -> (Dataset, OutlierScreen) {
    let preliminary = match fit_line(
        &dataset.predictor(),
        &dataset.response(),
        PREDICTOR_COLUMN,
        confidence_level,
    ) {
        Ok(fit) => Some(fit),
        Err(e) => {
            log::warn!(
                "{}: preliminary fit for outlier detection failed ({e}); no rows flagged",
                dataset.analysis
            );
            None
        }
    };

    let scores = preliminary
        .as_ref()
        .map(|fit| fit.standardized_residuals())
        .unwrap_or_else(|| vec![0.0; dataset.len()]);

    let screen = OutlierScreen {
        preliminary,
        scores,
        threshold,
    };

    let mut flags = screen.scores.iter().map(|z| screen.is_outlier(*z));
    let kept = dataset.filtered(|obs| {
        let outlier = flags.next().unwrap_or(false);
        if outlier {
            log::debug!(
                "{}: outlier S_Length={} response={} sex={}",
                dataset.analysis,
                obs.s_length,
                obs.response,
                obs.sex
            );
        }
        !outlier
    });

    (kept, screen)
}

pub fn drop_undefined_sex(dataset: &Dataset, undefined: Sex) -> Dataset {
    dataset.filtered(|obs| obs.sex != undefined)
}

// ---------------------------------------------------------------------------
// Full cleaning stage
// ---------------------------------------------------------------------------

pub fn clean(dataset: &Dataset, settings: &Settings) -> CleanedData {
    let valid = drop_invalid(dataset);
    let (general, screen) = screen_outliers(&valid, settings.outlier_threshold, settings.confidence_level);
    let sexed = drop_undefined_sex(&general, settings.undefined_sex);

    let summary = CleaningSummary {
        loaded: dataset.len(),
        invalid_removed: dataset.len() - valid.len(),
        outliers_removed: valid.len() - general.len(),
        undefined_sex_removed: general.len() - sexed.len(),
        general_n: general.len(),
        sexed_n: sexed.len(),
    };

    log::info!(
        "{}: {} loaded, {} invalid, {} outliers, {} undefined sex → {} general / {} by sex",
        dataset.analysis,
        summary.loaded,
        summary.invalid_removed,
        summary.outliers_removed,
        summary.undefined_sex_removed,
        summary.general_n,
        summary.sexed_n
    );

    CleanedData {
        general,
        sexed,
        screen,
        summary,
    }
}
