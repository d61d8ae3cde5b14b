//! PNG scatter charts with a fitted curve and its confidence band.
//!
//! Drawing is done directly on an `RgbImage`: filled discs for observations,
//! a translucent band, a thick polyline for the fit, a light grid with tick
//! labels, axis titles and a colour legend. Text uses a small uppercase
//! bitmap font.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

use crate::analysis::fit::RegressionResult;

pub const WIDTH: u32 = 900;
pub const HEIGHT: u32 = 640;

const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 60.0;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([228, 228, 228]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);

const CURVE_SAMPLES: usize = 120;

// ---------------------------------------------------------------------------
// Chart data
// ---------------------------------------------------------------------------

/// Mean response and its interval at one predictor value, raw scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPoint {
    pub x: f64,
    pub lower: f64,
    pub fit: f64,
    pub upper: f64,
}

/// One group drawn on a chart.
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub color: Rgb<u8>,
    pub points: Vec<(f64, f64)>,
    pub curve: Vec<BandPoint>,
}

impl Series {
    pub fn from_result(result: &RegressionResult, color: Rgb<u8>) -> Self {
        Series {
            label: result.scope.to_string(),
            color,
            points: result
                .data
                .observations
                .iter()
                .map(|o| (o.s_length, o.response))
                .collect(),
            curve: fitted_curve(result, CURVE_SAMPLES),
        }
    }
}

/// Sample the fitted relation over the observed predictor range. The band is
/// computed on the fitting scale and mapped back, so for LWR it is the
/// back-transformed log-scale interval.
pub fn fitted_curve(result: &RegressionResult, samples: usize) -> Vec<BandPoint> {
    let analysis = result.analysis;
    let Some(range) = result.ranges.first() else {
        return Vec::new();
    };
    let samples = samples.max(2);
    (0..samples)
        .map(|i| {
            let x = range.min + (range.max - range.min) * i as f64 / (samples - 1) as f64;
            let (lo, mid, hi) = result.line.band(analysis.transform(x));
            BandPoint {
                x,
                lower: analysis.back_transform(lo),
                fit: analysis.back_transform(mid),
                upper: analysis.back_transform(hi),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Coordinate frame
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn enclosing(series: &[Series]) -> Frame {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for s in series {
            for &(x, y) in &s.points {
                xs.push(x);
                ys.push(y);
            }
            for p in &s.curve {
                xs.push(p.x);
                ys.extend([p.lower, p.upper]);
            }
        }
        let (x_min, x_max) = padded_bounds(&xs);
        let (y_min, y_max) = padded_bounds(&ys);
        Frame {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    fn px(&self, x: f64) -> f64 {
        MARGIN_LEFT + (x - self.x_min) / (self.x_max - self.x_min) * (WIDTH as f64 - MARGIN_LEFT - MARGIN_RIGHT)
    }

    fn py(&self, y: f64) -> f64 {
        let bottom = HEIGHT as f64 - MARGIN_BOTTOM;
        bottom - (y - self.y_min) / (self.y_max - self.y_min) * (bottom - MARGIN_TOP)
    }
}

fn padded_bounds(values: &[f64]) -> (f64, f64) {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if hi - lo <= f64::EPSILON * lo.abs().max(1.0) {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

/// Tick spacing of 1, 2 or 5 × 10^k giving roughly `target` intervals.
fn nice_step(span: f64, target: usize) -> f64 {
    let raw = span / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let norm = raw / magnitude;
    let factor = if norm < 1.5 {
        1.0
    } else if norm < 3.5 {
        2.0
    } else if norm < 7.5 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

fn ticks(min: f64, max: f64) -> (Vec<f64>, usize) {
    let step = nice_step(max - min, 6);
    let decimals = (-step.log10().floor()).max(0.0) as usize;
    let first = (min / step).ceil() as i64;
    let last = (max / step).floor() as i64;
    ((first..=last).map(|k| k as f64 * step).collect(), decimals)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

struct Canvas {
    img: RgbImage,
}

impl Canvas {
    fn new() -> Self {
        Canvas {
            img: RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND),
        }
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgb<u8>, alpha: f64) {
        if x < 0 || y < 0 || x >= WIDTH as i64 || y >= HEIGHT as i64 {
            return;
        }
        let px = self.img.get_pixel_mut(x as u32, y as u32);
        for c in 0..3 {
            let mixed = px.0[c] as f64 * (1.0 - alpha) + color.0[c] as f64 * alpha;
            px.0[c] = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        self.blend(x, y, color, 1.0);
    }

    fn hline(&mut self, x0: f64, x1: f64, y: f64, color: Rgb<u8>) {
        for x in x0.round() as i64..=x1.round() as i64 {
            self.put(x, y.round() as i64, color);
        }
    }

    fn vline(&mut self, x: f64, y0: f64, y1: f64, color: Rgb<u8>) {
        let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        for y in top.round() as i64..=bottom.round() as i64 {
            self.put(x.round() as i64, y, color);
        }
    }

    fn segment(&mut self, (x0, y0): (f64, f64), (x1, y1): (f64, f64), color: Rgb<u8>, width: i64) {
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as i64;
        let half = width / 2;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = (x0 + (x1 - x0) * t).round() as i64;
            let y = (y0 + (y1 - y0) * t).round() as i64;
            for dx in -half..=half {
                for dy in -half..=half {
                    self.put(x + dx, y + dy, color);
                }
            }
        }
    }

    fn disc(&mut self, cx: f64, cy: f64, radius: f64, color: Rgb<u8>, alpha: f64) {
        let r = radius.ceil() as i64;
        let (cx_i, cy_i) = (cx.round() as i64, cy.round() as i64);
        for dy in -r..=r {
            for dx in -r..=r {
                if ((dx * dx + dy * dy) as f64) <= radius * radius {
                    self.blend(cx_i + dx, cy_i + dy, color, alpha);
                }
            }
        }
    }

    /// Shade between the lower and upper curve, column by column.
    fn band(&mut self, frame: &Frame, curve: &[BandPoint], color: Rgb<u8>) {
        for pair in curve.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (xa, xb) = (frame.px(a.x), frame.px(b.x));
            let start = xa.round() as i64;
            let end = xb.round() as i64;
            for x in start..end.max(start + 1) {
                let t = if xb > xa { ((x as f64 - xa) / (xb - xa)).clamp(0.0, 1.0) } else { 0.0 };
                let upper = frame.py(a.upper + (b.upper - a.upper) * t).round() as i64;
                let lower = frame.py(a.lower + (b.lower - a.lower) * t).round() as i64;
                for y in upper..=lower {
                    self.blend(x, y, color, 0.22);
                }
            }
        }
    }

    fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Rgb<u8>) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.put(xx, yy, color);
            }
        }
    }

    fn text(&mut self, x: f64, y: f64, s: &str, color: Rgb<u8>) {
        let mut cursor = x.round() as i64;
        let top = y.round() as i64;
        for ch in s.chars() {
            if let Some(rows) = glyph(ch.to_ascii_uppercase()) {
                for (ry, bits) in rows.iter().enumerate() {
                    for rx in 0..3 {
                        if bits & (0b100 >> rx) != 0 {
                            for sy in 0..GLYPH_SCALE {
                                for sx in 0..GLYPH_SCALE {
                                    self.put(
                                        cursor + rx * GLYPH_SCALE + sx,
                                        top + ry as i64 * GLYPH_SCALE + sy,
                                        color,
                                    );
                                }
                            }
                        }
                    }
                }
            }
            cursor += GLYPH_ADVANCE;
        }
    }
}

const GLYPH_SCALE: i64 = 2;
const GLYPH_ADVANCE: i64 = 4 * GLYPH_SCALE;
const GLYPH_HEIGHT: i64 = 5 * GLYPH_SCALE;

fn text_width(s: &str) -> i64 {
    s.chars().count() as i64 * GLYPH_ADVANCE - GLYPH_SCALE
}

/// 3×5 bitmap; letters are uppercase only.
fn glyph(ch: char) -> Option<[u8; 5]> {
    Some(match ch {
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        ' ' => [0b000; 5],
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        _ => return None,
    })
}

const SWATCH: i64 = 12;
const LEGEND_ROW: i64 = 20;
const LEGEND_PAD: i64 = 8;

/// Top-left corner of each legend swatch, stacked in the upper-right corner
/// of the plot area.
fn legend_swatches(labels: &[&str]) -> Vec<(i64, i64)> {
    let widest = labels.iter().map(|l| text_width(l)).max().unwrap_or(0);
    let x = (WIDTH as f64 - MARGIN_RIGHT) as i64 - LEGEND_PAD * 2 - widest - SWATCH - LEGEND_PAD;
    let y = MARGIN_TOP as i64 + LEGEND_PAD * 2;
    (0..labels.len() as i64).map(|i| (x, y + i * LEGEND_ROW)).collect()
}

fn draw_legend(canvas: &mut Canvas, series: &[Series]) {
    let labels: Vec<&str> = series.iter().map(|s| s.label.as_str()).collect();
    let swatches = legend_swatches(&labels);
    let Some(&(x0, y0)) = swatches.first() else {
        return;
    };
    let widest = labels.iter().map(|l| text_width(l)).max().unwrap_or(0);
    let w = SWATCH + LEGEND_PAD + widest + LEGEND_PAD * 2;
    let h = labels.len() as i64 * LEGEND_ROW + LEGEND_PAD;
    let (bx, by) = (x0 - LEGEND_PAD, y0 - LEGEND_PAD);
    canvas.fill_rect(bx, by, w, h, BACKGROUND);
    canvas.hline(bx as f64, (bx + w) as f64, by as f64, AXIS);
    canvas.hline(bx as f64, (bx + w) as f64, (by + h) as f64, AXIS);
    canvas.vline(bx as f64, by as f64, (by + h) as f64, AXIS);
    canvas.vline((bx + w) as f64, by as f64, (by + h) as f64, AXIS);

    for (s, &(x, y)) in series.iter().zip(&swatches) {
        canvas.fill_rect(x, y, SWATCH, SWATCH, s.color);
        let text_y = y + (SWATCH - GLYPH_HEIGHT) / 2;
        canvas.text((x + SWATCH + LEGEND_PAD) as f64, text_y as f64, &s.label, AXIS);
    }
}

/// Render all series onto one chart and encode it as PNG. Axes are labelled
/// with the raw-scale column names.
pub fn render_png(series: &[Series], x_title: &str, y_title: &str) -> Result<Vec<u8>, image::ImageError> {
    let frame = Frame::enclosing(series);
    let mut canvas = Canvas::new();

    let left = MARGIN_LEFT;
    let right = WIDTH as f64 - MARGIN_RIGHT;
    let top = MARGIN_TOP;
    let bottom = HEIGHT as f64 - MARGIN_BOTTOM;

    let (x_ticks, x_decimals) = ticks(frame.x_min, frame.x_max);
    let (y_ticks, y_decimals) = ticks(frame.y_min, frame.y_max);

    for &x in &x_ticks {
        let px = frame.px(x);
        canvas.vline(px, top, bottom, GRID);
        canvas.vline(px, bottom, bottom + 6.0, AXIS);
        let label = format!("{x:.x_decimals$}");
        canvas.text(px - text_width(&label) as f64 / 2.0, bottom + 12.0, &label, AXIS);
    }
    for &y in &y_ticks {
        let py = frame.py(y);
        canvas.hline(left, right, py, GRID);
        canvas.hline(left - 6.0, left, py, AXIS);
        let label = format!("{y:.y_decimals$}");
        canvas.text(
            left - 12.0 - text_width(&label) as f64,
            py - GLYPH_HEIGHT as f64 / 2.0,
            &label,
            AXIS,
        );
    }

    for s in series {
        canvas.band(&frame, &s.curve, s.color);
    }
    for s in series {
        for &(x, y) in &s.points {
            canvas.disc(frame.px(x), frame.py(y), 3.5, s.color, 0.65);
        }
    }
    for s in series {
        for pair in s.curve.windows(2) {
            canvas.segment(
                (frame.px(pair[0].x), frame.py(pair[0].fit)),
                (frame.px(pair[1].x), frame.py(pair[1].fit)),
                darken(s.color),
                3,
            );
        }
    }

    canvas.hline(left, right, bottom, AXIS);
    canvas.vline(left, top, bottom, AXIS);

    let x_title_left = (left + right) / 2.0 - text_width(x_title) as f64 / 2.0;
    canvas.text(x_title_left, bottom + 36.0, x_title, AXIS);
    canvas.text(left, top - GLYPH_HEIGHT as f64 - 8.0, y_title, AXIS);
    draw_legend(&mut canvas, series);

    let mut bytes = Vec::new();
    canvas.img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn darken(color: Rgb<u8>) -> Rgb<u8> {
    Rgb(color.0.map(|c| (c as f64 * 0.7) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fit::{Scope, fit_scope};
    use crate::config::Settings;
    use crate::data::model::{Analysis, Dataset};
    use crate::testutil::{SimpleRng, lwr_group};
    use approx::assert_relative_eq;

    fn lwr_result() -> RegressionResult {
        let mut rng = SimpleRng::new(17);
        let ds = Dataset::new(Analysis::Lwr, lwr_group(&mut rng, 40, 1, -2.0, 3.0, 0.04));
        fit_scope(&ds, Scope::General, &Settings::default()).unwrap()
    }

    #[test]
    fn test_lwr_curve_is_back_transformed() {
        let result = lwr_result();
        let curve = fitted_curve(&result, 10);
        assert_eq!(curve.len(), 10);
        assert_relative_eq!(curve[0].x, result.ranges[0].min);
        assert_relative_eq!(curve[9].x, result.ranges[0].max);

        for p in &curve {
            let expected = 10f64.powf(result.intercept.estimate + result.slope.estimate * p.x.log10());
            assert_relative_eq!(p.fit, expected, max_relative = 1e-12);
            assert!(p.lower < p.fit && p.fit < p.upper);
        }
    }

    #[test]
    fn test_render_produces_png() {
        let result = lwr_result();
        let bytes = render_png(&[Series::from_result(&result, Rgb([30, 90, 200]))], "S_Length", "Weight").unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!((img.width(), img.height()), (WIDTH, HEIGHT));
    }

    #[test]
    fn test_nice_ticks() {
        assert_relative_eq!(nice_step(10.0, 5), 2.0, epsilon = 1e-12);
        assert_relative_eq!(nice_step(0.37, 6), 0.05, epsilon = 1e-12);
        let (t, decimals) = ticks(0.0, 10.0);
        assert_eq!(t.first().copied(), Some(0.0));
        assert_eq!(t.last().copied(), Some(10.0));
        assert_eq!(decimals, 0);
    }

    #[test]
    fn test_empty_chart_still_renders() {
        assert!(render_png(&[], "S_Length", "T_Length").is_ok());
    }

    #[test]
    fn test_legend_swatches_carry_series_colors() {
        let result = lwr_result();
        let mut male = Series::from_result(&result, Rgb([200, 40, 40]));
        male.label = "Sex 1".into();
        let mut female = Series::from_result(&result, Rgb([40, 160, 60]));
        female.label = "Sex 2".into();

        let bytes = render_png(&[male, female], "S_Length", "Weight").unwrap();
        let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap().to_rgb8();

        let swatches = legend_swatches(&["Sex 1", "Sex 2"]);
        assert_eq!(swatches.len(), 2);
        assert_eq!(swatches[1].1 - swatches[0].1, LEGEND_ROW);
        for ((x, y), color) in swatches.into_iter().zip([Rgb([200, 40, 40]), Rgb([40, 160, 60])]) {
            let center = img.get_pixel((x + SWATCH / 2) as u32, (y + SWATCH / 2) as u32);
            assert_eq!(*center, color);
        }
    }

    #[test]
    fn test_font_covers_chart_labels() {
        for label in ["S_Length", "T_Length", "Weight", "General", "Sex 9", "-0.25"] {
            assert!(label.chars().all(|c| glyph(c.to_ascii_uppercase()).is_some()), "{label}");
        }
    }
}
