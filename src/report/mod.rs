/// Export layer: parameter workbooks, charts and a JSON summary.
///
/// Every artifact is rendered to bytes in memory and handed to a [`Sink`],
/// so the statistical code never sees a path.
pub mod chart;
pub mod sink;
pub mod workbook;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::AnalysisOutcome;
use crate::analysis::dimorphism::{DimorphismTest, ModelPath};
use crate::analysis::fit::{ModelSet, RegressionResult, Scope};
use crate::color::ColorMap;
use crate::data::filter::CleaningSummary;
use crate::data::model::{Analysis, PREDICTOR_COLUMN};
use chart::Series;
pub use sink::{DirectorySink, MemorySink, Sink};

/// Machine-readable record of one analysis run.
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub analysis: Analysis,
    pub cleaning: CleaningSummary,
    pub dimorphism: Option<&'a DimorphismTest>,
    pub path: ModelPath,
    pub results: Vec<&'a RegressionResult>,
}

/// Write every artifact the outcome supports. Missing results only skip
/// their own artifacts, with a warning; the names actually written are
/// returned.
pub fn export(outcome: &AnalysisOutcome, prefix: &str, sink: &mut dyn Sink) -> Result<Vec<String>> {
    let analysis = outcome.loaded.analysis;
    let results = outcome.models.results();
    let mut written = Vec::new();

    if results.is_empty() {
        log::warn!("{analysis}: no regression results; parameter workbook and charts skipped");
    } else {
        let bytes = workbook::parameters_workbook(&results).context("building parameter workbook")?;
        emit(sink, &mut written, format!("{prefix}_parameters.xlsx"), &bytes)?;

        let x_title = PREDICTOR_COLUMN;
        let y_title = analysis.response_column();
        let scopes: Vec<Scope> = results.iter().map(|r| r.scope).collect();
        let colors = ColorMap::new(&scopes);
        for result in &results {
            let series = Series::from_result(result, colors.color_for(&result.scope));
            let bytes = chart::render_png(&[series], x_title, y_title)
                .with_context(|| format!("rendering {} chart", result.scope))?;
            emit(sink, &mut written, format!("{prefix}_{}.png", result.scope.slug()), &bytes)?;
        }

        if let ModelSet::Split(_) = outcome.models {
            let series: Vec<Series> = results
                .iter()
                .map(|r| Series::from_result(r, colors.color_for(&r.scope)))
                .collect();
            let bytes = chart::render_png(&series, x_title, y_title).context("rendering combined chart")?;
            emit(sink, &mut written, format!("{prefix}_by_sex.png"), &bytes)?;
        }
    }

    match &outcome.dimorphism {
        Some(test) => {
            let bytes = workbook::ancova_workbook(analysis, test).context("building ANCOVA workbook")?;
            emit(sink, &mut written, format!("{prefix}_ancova.xlsx"), &bytes)?;
        }
        None => log::warn!("{analysis}: no dimorphism test; ANCOVA export skipped"),
    }

    let summary = Summary {
        analysis,
        cleaning: outcome.cleaned.summary,
        dimorphism: outcome.dimorphism.as_ref(),
        path: outcome.path(),
        results,
    };
    let bytes = serde_json::to_vec_pretty(&summary).context("serialising summary")?;
    emit(sink, &mut written, format!("{prefix}_summary.json"), &bytes)?;

    Ok(written)
}

fn emit(sink: &mut dyn Sink, written: &mut Vec<String>, name: String, bytes: &[u8]) -> Result<()> {
    sink.write(&name, bytes)?;
    written.push(name);
    Ok(())
}
