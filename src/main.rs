mod analysis;
mod color;
mod config;
mod data;
mod error;
mod report;
#[cfg(test)]
mod rng;
mod stats;
#[cfg(test)]
mod testutil;

use anyhow::{Context, Result, bail};

use config::AppConfig;
use data::model::{Analysis, Dataset};
use report::DirectorySink;

fn main() -> Result<()> {
    env_logger::init();

    let analyses = match std::env::args().nth(1).as_deref() {
        None | Some("all") => vec![Analysis::Llr, Analysis::Lwr],
        Some("lwr") => vec![Analysis::Lwr],
        Some("llr") => vec![Analysis::Llr],
        Some(other) => bail!("unknown analysis '{other}' (expected lwr, llr or all)"),
    };

    let config = AppConfig::load()?;
    let mut sink = DirectorySink::new(&config.output_dir);

    for kind in analyses {
        run_analysis(kind, &config, &mut sink).with_context(|| format!("{} analysis failed", kind.title()))?;
    }

    log::info!("Outputs in {}", sink.root().display());
    Ok(())
}

fn run_analysis(kind: Analysis, config: &AppConfig, sink: &mut DirectorySink) -> Result<()> {
    let source = config.source(kind);
    log::info!("{kind}: {}", kind.title());

    let path = data::fetch::ensure_local(&source.source, &source.cache, config.download_timeout())?;
    let table = data::loader::load_file(&path, source.sheet.as_deref())?;
    let dataset = Dataset::from_table(kind, &table).with_context(|| format!("reading {kind} columns"))?;

    let outcome = analysis::run(dataset, &config.settings);
    report::export(&outcome, &source.prefix, sink)?;
    Ok(())
}
