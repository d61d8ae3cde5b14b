use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

pub const PREDICTOR_COLUMN: &str = "S_Length";
pub const SEX_COLUMN: &str = "Sex";

// ---------------------------------------------------------------------------
// CellValue – a single cell of the raw input table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as it comes out of a spreadsheet, CSV, JSON or
/// Parquet reader. Blank cells and `NA` markers become `Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Whether the cell counts as a missing value when dropping incomplete rows.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(v) => v.is_nan(),
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Interpret the cell as a number. Numeric text is accepted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Interpret the cell as an integer category code (`2`, `2.0`, `"2"`).
    pub fn as_code(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            CellValue::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|v| v.fract() == 0.0 && v.is_finite())
                        .map(|v| v as i64)
                })
            }
            _ => None,
        }
    }
}

/// A table as read from disk: header names plus rows of typed cells.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Result<usize, DataError> {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Analysis kind
// ---------------------------------------------------------------------------

/// Which relationship is being modelled. Decides the response column and
/// whether fitting happens on the log10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Analysis {
    /// Length–weight: log10(Weight) ~ log10(S_Length).
    Lwr,
    /// Length–length: T_Length ~ S_Length.
    Llr,
}

impl Analysis {
    pub fn response_column(self) -> &'static str {
        match self {
            Analysis::Lwr => "Weight",
            Analysis::Llr => "T_Length",
        }
    }

    /// Predictor term as it appears in model output.
    pub fn predictor_label(self) -> String {
        match self {
            Analysis::Lwr => format!("log10({PREDICTOR_COLUMN})"),
            Analysis::Llr => PREDICTOR_COLUMN.to_string(),
        }
    }

    pub fn response_label(self) -> String {
        match self {
            Analysis::Lwr => format!("log10({})", self.response_column()),
            Analysis::Llr => self.response_column().to_string(),
        }
    }

    pub fn is_log_scale(self) -> bool {
        matches!(self, Analysis::Lwr)
    }

    /// Map a raw measurement onto the scale the regression is fitted on.
    pub fn transform(self, value: f64) -> f64 {
        match self {
            Analysis::Lwr => value.log10(),
            Analysis::Llr => value,
        }
    }

    /// Inverse of [`Analysis::transform`].
    pub fn back_transform(self, value: f64) -> f64 {
        match self {
            Analysis::Lwr => 10f64.powf(value),
            Analysis::Llr => value,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Analysis::Lwr => "lwr",
            Analysis::Llr => "llr",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Analysis::Lwr => "Length-weight relationship",
            Analysis::Llr => "Length-length relationship",
        }
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name().to_ascii_uppercase())
    }
}

// ---------------------------------------------------------------------------
// Sex – categorical code, 9 means undefined
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sex(pub i64);

impl Sex {
    pub const UNDEFINED: Sex = Sex(9);
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Observation / Dataset
// ---------------------------------------------------------------------------

/// One fish. Measurements are kept on the raw scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    /// Standard length (predictor).
    pub s_length: f64,
    /// Total length (LLR) or weight (LWR).
    pub response: f64,
    pub sex: Sex,
}

/// An ordered, immutable collection of observations for one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub analysis: Analysis,
    pub observations: Vec<Observation>,
}

impl Dataset {
    pub fn new(analysis: Analysis, observations: Vec<Observation>) -> Self {
        Dataset {
            analysis,
            observations,
        }
    }

    /// Extract the analysis columns from a raw table.
    ///
    /// Rows with a missing value in any column are dropped. A present but
    /// non-numeric measurement, or a sex code that is not integer-like, is an
    /// error.
    pub fn from_table(analysis: Analysis, table: &RawTable) -> Result<Self, DataError> {
        let response_column = analysis.response_column();
        let response_idx = table.column_index(response_column)?;
        let predictor_idx = table.column_index(PREDICTOR_COLUMN)?;
        let sex_idx = table.column_index(SEX_COLUMN)?;

        let mut observations = Vec::with_capacity(table.rows.len());
        let mut incomplete = 0usize;

        for (row_no, row) in table.rows.iter().enumerate() {
            let complete = row.len() >= table.headers.len()
                && row.iter().all(|cell| !cell.is_missing());
            if !complete {
                incomplete += 1;
                continue;
            }

            let number = |idx: usize, column: &str| {
                row[idx].as_f64().ok_or_else(|| DataError::InvalidCell {
                    row: row_no,
                    column: column.to_string(),
                    reason: format!("'{}' is not a number", row[idx]),
                })
            };

            let response = number(response_idx, response_column)?;
            let s_length = number(predictor_idx, PREDICTOR_COLUMN)?;
            let sex = row[sex_idx]
                .as_code()
                .map(Sex)
                .ok_or_else(|| DataError::InvalidCell {
                    row: row_no,
                    column: SEX_COLUMN.to_string(),
                    reason: format!("'{}' is not an integer sex code", row[sex_idx]),
                })?;

            observations.push(Observation {
                s_length,
                response,
                sex,
            });
        }

        if incomplete > 0 {
            log::info!("{analysis}: dropped {incomplete} rows with missing values");
        }

        Ok(Dataset::new(analysis, observations))
    }

    /// Derive a new dataset holding only the observations matching `keep`.
    pub fn filtered<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&Observation) -> bool,
    {
        Dataset {
            analysis: self.analysis,
            observations: self
                .observations
                .iter()
                .filter(|obs| keep(obs))
                .copied()
                .collect(),
        }
    }

    /// Predictor values on the fitting scale.
    pub fn predictor(&self) -> Vec<f64> {
        self.observations
            .iter()
            .map(|obs| self.analysis.transform(obs.s_length))
            .collect()
    }

    /// Response values on the fitting scale.
    pub fn response(&self) -> Vec<f64> {
        self.observations
            .iter()
            .map(|obs| self.analysis.transform(obs.response))
            .collect()
    }

    pub fn sexes(&self) -> Vec<Sex> {
        self.observations.iter().map(|obs| obs.sex).collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: Vec<Vec<CellValue>>) -> RawTable {
        RawTable {
            headers: vec!["Sex".into(), "S_Length".into(), "Weight".into(), "Note".into()],
            rows,
        }
    }

    #[test]
    fn test_from_table_drops_incomplete_rows() {
        let t = table(vec![
            vec![CellValue::Integer(1), CellValue::Float(10.0), CellValue::Float(15.0), CellValue::String("a".into())],
            vec![CellValue::Integer(2), CellValue::Null, CellValue::Float(12.0), CellValue::String("b".into())],
            vec![CellValue::Float(9.0), CellValue::Float(11.0), CellValue::Float(20.0), CellValue::Null],
            vec![CellValue::String("2".into()), CellValue::Integer(12), CellValue::Float(25.0), CellValue::String("c".into())],
        ]);

        let ds = Dataset::from_table(Analysis::Lwr, &t).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.observations[0].sex, Sex(1));
        assert_eq!(ds.observations[1].s_length, 12.0);
        assert_eq!(ds.observations[1].sex, Sex(2));
    }

    #[test]
    fn test_from_table_missing_column() {
        let t = table(vec![]);
        let err = Dataset::from_table(Analysis::Llr, &t).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(ref c) if c == "T_Length"));
    }

    #[test]
    fn test_from_table_rejects_non_numeric_measurement() {
        let t = table(vec![vec![
            CellValue::Integer(1),
            CellValue::String("long".into()),
            CellValue::Float(15.0),
            CellValue::String("a".into()),
        ]]);
        let err = Dataset::from_table(Analysis::Lwr, &t).unwrap_err();
        assert!(matches!(err, DataError::InvalidCell { row: 0, .. }));
    }

    #[test]
    fn test_sex_code_parsing() {
        assert_eq!(CellValue::Float(2.0).as_code(), Some(2));
        assert_eq!(CellValue::String(" 9 ".into()).as_code(), Some(9));
        assert_eq!(CellValue::Float(1.5).as_code(), None);
        assert_eq!(CellValue::String("M".into()).as_code(), None);
    }

    #[test]
    fn test_lwr_fits_on_log_scale() {
        let ds = Dataset::new(
            Analysis::Lwr,
            vec![Observation { s_length: 100.0, response: 1000.0, sex: Sex(1) }],
        );
        assert_eq!(ds.predictor(), vec![2.0]);
        assert_eq!(ds.response(), vec![3.0]);
        assert_eq!(Analysis::Lwr.back_transform(2.0), 100.0);
    }
}
