use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::{Analysis, Sex};

pub const CONFIG_ENV: &str = "FISH_ALLOMETRY_CONFIG";
pub const OUTPUT_DIR_ENV: &str = "FISH_ALLOMETRY_OUTPUT_DIR";

// ---------------------------------------------------------------------------
// Statistical settings shared by both analyses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Significance level for the dimorphism decision.
    pub alpha: f64,
    /// Rows with |standardised residual| at or above this are outliers.
    pub outlier_threshold: f64,
    /// Sex code meaning "undefined".
    pub undefined_sex: Sex,
    pub confidence_level: f64,
    /// Slope expected under isometric growth (LWR only).
    pub isometry_slope: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            outlier_threshold: 4.0,
            undefined_sex: Sex::UNDEFINED,
            confidence_level: 0.95,
            isometry_slope: 3.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-analysis input/output locations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Local path or http(s) URL of the input spreadsheet.
    pub source: String,
    /// Where a remote source is cached.
    pub cache: PathBuf,
    /// Worksheet to read; the first one when absent.
    #[serde(default)]
    pub sheet: Option<String>,
    /// File-name prefix for every exported artifact.
    pub prefix: String,
}

impl SourceConfig {
    fn default_for(analysis: Analysis) -> Self {
        let name = analysis.short_name();
        Self {
            source: format!("data/{name}_data.xlsx"),
            cache: PathBuf::from(format!("data/{name}_data.xlsx")),
            sheet: None,
            prefix: name.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    /// No timeout when absent.
    pub download_timeout_secs: Option<u64>,
    pub settings: Settings,
    pub lwr: SourceConfig,
    pub llr: SourceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            download_timeout_secs: None,
            settings: Settings::default(),
            lwr: SourceConfig::default_for(Analysis::Lwr),
            llr: SourceConfig::default_for(Analysis::Llr),
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with the JSON file named by `FISH_ALLOMETRY_CONFIG`
    /// and then with `FISH_ALLOMETRY_OUTPUT_DIR`.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(dir) = std::env::var_os(OUTPUT_DIR_ENV) {
            config.output_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn source(&self, analysis: Analysis) -> &SourceConfig {
        match analysis {
            Analysis::Lwr => &self.lwr,
            Analysis::Llr => &self.llr,
        }
    }

    pub fn download_timeout(&self) -> Option<Duration> {
        self.download_timeout_secs.map(Duration::from_secs)
    }
}
