use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::analysis::dimorphism::DimorphismTest;
use crate::analysis::fit::RegressionResult;
use crate::data::model::Analysis;
use crate::stats::ols::Coefficient;

const PARAMETER_HEADER: [&str; 5] = ["Parameter", "Estimate", "Std. Error", "t value", "p value"];

/// One sheet per result, named after its scope (`General`, `Sex 1`, ...).
pub fn parameters_workbook(results: &[&RegressionResult]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for result in results {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(result.scope.to_string())?;
        write_parameter_sheet(worksheet, result, &bold)?;
    }

    workbook.save_to_buffer()
}

fn write_parameter_sheet(ws: &mut Worksheet, result: &RegressionResult, bold: &Format) -> Result<(), XlsxError> {
    ws.set_column_width(0, 30)?;
    ws.write_string_with_format(0, 0, format!("{}: {}", result.analysis.title(), result.scope), bold)?;

    let level = result.line.model.confidence_level;
    let tail = (1.0 - level) / 2.0 * 100.0;
    let mut header: Vec<String> = PARAMETER_HEADER.iter().map(|s| s.to_string()).collect();
    header.push(format!("CI {tail:.1} %"));
    header.push(format!("CI {:.1} %", 100.0 - tail));
    for (col, title) in header.iter().enumerate() {
        ws.write_string_with_format(2, col as u16, title, bold)?;
    }

    let mut row = 3;
    for coef in [&result.intercept, &result.slope] {
        write_coefficient(ws, row, coef)?;
        row += 1;
    }
    if let Some(a) = &result.a {
        ws.write_string(row, 0, "a = 10^(Intercept)")?;
        write_value(ws, row, 1, a.estimate)?;
        write_value(ws, row, 5, a.ci_lower)?;
        write_value(ws, row, 6, a.ci_upper)?;
        row += 1;
    }

    row += 1;
    ws.write_string_with_format(row, 0, "Model", bold)?;
    row += 1;
    for (label, value) in [
        ("R²", result.r_squared),
        ("n", result.n as f64),
        ("Residual df", result.df_resid as f64),
        ("Residual std. error", result.residual_std_error),
    ] {
        ws.write_string(row, 0, label)?;
        write_value(ws, row, 1, value)?;
        row += 1;
    }

    if let Some(test) = &result.isometry {
        row += 1;
        ws.write_string_with_format(row, 0, format!("Isometry test (H0: b = {})", test.reference), bold)?;
        row += 1;
        for (label, value) in [
            ("Std. error of b", test.std_error),
            ("t statistic", test.t_statistic),
            ("df", test.df as f64),
            ("p value", test.p_value),
        ] {
            ws.write_string(row, 0, label)?;
            write_value(ws, row, 1, value)?;
            row += 1;
        }
    }

    row += 1;
    ws.write_string_with_format(row, 0, "Measurement", bold)?;
    ws.write_string_with_format(row, 1, "Min", bold)?;
    ws.write_string_with_format(row, 2, "Max", bold)?;
    row += 1;
    for range in &result.ranges {
        ws.write_string(row, 0, &range.column)?;
        write_value(ws, row, 1, range.min)?;
        write_value(ws, row, 2, range.max)?;
        row += 1;
    }

    Ok(())
}

fn write_coefficient(ws: &mut Worksheet, row: u32, coef: &Coefficient) -> Result<(), XlsxError> {
    ws.write_string(row, 0, &coef.name)?;
    for (col, value) in [
        coef.estimate,
        coef.std_error,
        coef.t_value,
        coef.p_value,
        coef.ci_lower,
        coef.ci_upper,
    ]
    .into_iter()
    .enumerate()
    {
        write_value(ws, row, col as u16 + 1, value)?;
    }
    Ok(())
}

/// The ANCOVA table plus the decision it led to.
pub fn ancova_workbook(analysis: Analysis, test: &DimorphismTest) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let ws = workbook.add_worksheet();
    ws.set_name("ANCOVA")?;
    ws.set_column_width(0, 30)?;

    ws.write_string_with_format(
        0,
        0,
        format!("{} ~ {} * Sex", analysis.response_label(), analysis.predictor_label()),
        &bold,
    )?;
    for (col, title) in ["Term", "Df", "Sum Sq", "Mean Sq", "F value", "Pr(>F)"].iter().enumerate() {
        ws.write_string_with_format(2, col as u16, *title, &bold)?;
    }

    let mut row = 3;
    for line in &test.table.rows {
        ws.write_string(row, 0, &line.term)?;
        write_value(ws, row, 1, line.df as f64)?;
        write_value(ws, row, 2, line.sum_sq)?;
        write_value(ws, row, 3, line.mean_sq)?;
        if let (Some(f), Some(p)) = (line.f_value, line.p_value) {
            write_value(ws, row, 4, f)?;
            write_value(ws, row, 5, p)?;
        }
        row += 1;
    }

    row += 1;
    ws.write_string_with_format(row, 0, "Decision", &bold)?;
    row += 1;
    ws.write_string(row, 0, "alpha")?;
    write_value(ws, row, 1, test.alpha)?;
    row += 1;
    ws.write_string(row, 0, "p (sex)")?;
    write_value(ws, row, 1, test.p_sex)?;
    row += 1;
    ws.write_string(row, 0, "p (interaction)")?;
    write_value(ws, row, 1, test.p_interaction)?;
    row += 1;
    ws.write_string(row, 0, "Model")?;
    ws.write_string(row, 1, test.path.to_string())?;

    workbook.save_to_buffer()
}

/// Excel has no NaN or infinity.
fn write_value(ws: &mut Worksheet, row: u32, col: u16, value: f64) -> Result<(), XlsxError> {
    if value.is_finite() {
        ws.write_number(row, col, value)?;
    } else {
        ws.write_string(row, col, "NA")?;
    }
    Ok(())
}
