//! Chart rendering
//!
//! Radar chart with fixed background score zones, and the overall-score trend
//! chart over saved analyses. Charts render into RGB buffers via plotters and
//! are returned as PNG bytes for embedding.

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use printpdf::image_crate::{DynamicImage, ImageFormat, RgbImage};

use crate::models::{AnalysisRecord, Category, CategoryStatus, ZONE_BANDS};
use crate::session::Theme;

/// Word tokens per line when wrapping a radar axis label
const LABEL_TOKENS_PER_LINE: usize = 2;

/// Soft-wrap width for the tooltip summary text
const TOOLTIP_WRAP_WIDTH: usize = 35;

/// Fixed prompt line shown in the axis tooltip
const TOOLTIP_PROMPT: &str = "Why this score?";

// ============================================================================
// Theme Palettes
// ============================================================================

/// Chart colors for one theme. Zone geometry never varies with the palette.
pub struct Palette {
    pub background: RGBColor,
    pub grid: RGBAColor,
    pub text: RGBColor,
    pub series: RGBColor,
    zone_good: RGBAColor,
    zone_moderate: RGBAColor,
    zone_bad: RGBAColor,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                background: RGBColor(255, 255, 255),
                grid: RGBColor(0, 0, 0).mix(0.10),
                text: RGBColor(68, 68, 68),
                series: RGBColor(90, 138, 58),
                zone_good: RGBColor(40, 167, 69).mix(0.15),
                zone_moderate: RGBColor(255, 193, 7).mix(0.15),
                zone_bad: RGBColor(220, 53, 69).mix(0.15),
            },
            Theme::Dark => Palette {
                background: RGBColor(30, 30, 30),
                grid: RGBColor(255, 255, 255).mix(0.15),
                text: RGBColor(204, 204, 204),
                series: RGBColor(152, 195, 121),
                zone_good: RGBColor(34, 197, 94).mix(0.10),
                zone_moderate: RGBColor(234, 179, 8).mix(0.10),
                zone_bad: RGBColor(239, 68, 68).mix(0.10),
            },
        }
    }

    fn zone(&self, status: CategoryStatus) -> RGBAColor {
        match status {
            CategoryStatus::Good => self.zone_good,
            CategoryStatus::Moderate => self.zone_moderate,
            CategoryStatus::Bad => self.zone_bad,
        }
    }

    /// Status color used for card borders and table badges
    pub fn status_color(&self, status: CategoryStatus) -> RGBColor {
        match status {
            CategoryStatus::Good => RGBColor(40, 167, 69),
            CategoryStatus::Moderate => RGBColor(255, 165, 0),
            CategoryStatus::Bad => RGBColor(220, 53, 69),
        }
    }
}

// ============================================================================
// Text Wrapping
// ============================================================================

/// Wrap an axis label at a fixed number of word tokens per line, preserving
/// token order.
pub fn wrap_label(tokens: &[String]) -> Vec<String> {
    if tokens.is_empty() {
        return vec![String::new()];
    }
    tokens
        .chunks(LABEL_TOKENS_PER_LINE)
        .map(|chunk| chunk.join(" "))
        .collect()
}

/// Greedy word-wrap at a character width, no hyphenation. A single word
/// longer than the width stays on its own line.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let mut words = text.split(' ');
    let mut lines = Vec::new();
    let mut current = words.next().unwrap_or("").to_string();

    for word in words {
        if current.chars().count() + 1 + word.chars().count() > max_width {
            lines.push(current);
            current = word.to_string();
        } else {
            current.push(' ');
            current.push_str(word);
        }
    }
    lines.push(current);
    lines
}

/// Tooltip lines for a hovered category axis: the score to one decimal, a
/// fixed prompt, and the soft-wrapped summary.
pub fn tooltip_lines(category: &Category) -> Vec<String> {
    let mut lines = vec![
        format!("Score: {:.1} / 10", category.score),
        String::new(),
        TOOLTIP_PROMPT.to_string(),
    ];
    lines.extend(wrap_text(&category.summary, TOOLTIP_WRAP_WIDTH));
    lines
}

// ============================================================================
// Radar Geometry
// ============================================================================

/// Angle of axis `index` out of `count`, starting at twelve o'clock and going
/// clockwise.
fn axis_angle(index: usize, count: usize) -> f64 {
    -std::f64::consts::FRAC_PI_2 + index as f64 * std::f64::consts::TAU / count as f64
}

/// Pixel position on axis `index` for a score value on the fixed [0, 10]
/// domain.
fn point_for_value(
    center: (f64, f64),
    radius: f64,
    index: usize,
    count: usize,
    value: f64,
) -> (i32, i32) {
    let angle = axis_angle(index, count);
    let r = radius * (value / 10.0);
    (
        (center.0 + r * angle.cos()).round() as i32,
        (center.1 + r * angle.sin()).round() as i32,
    )
}

/// Closed polygon through every axis at the same value
fn ring_points(center: (f64, f64), radius: f64, count: usize, value: f64) -> Vec<(i32, i32)> {
    (0..count)
        .map(|i| point_for_value(center, radius, i, count, value))
        .collect()
}

// ============================================================================
// Radar Chart
// ============================================================================

/// Draw the category radar onto a drawing area.
///
/// Zone bands are filled before any data series, iterating from the largest
/// band maximum to the smallest so the smallest band paints last and sits
/// visually on top with its own shade.
pub fn draw_radar(
    root: &DrawingArea<BitMapBackend, Shift>,
    categories: &[Category],
    palette: &Palette,
    font_px: u32,
) -> Result<(), String> {
    if categories.is_empty() {
        return Err("no categories to chart".to_string());
    }

    let (width, height) = root.dim_in_pixel();
    let center = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = (width.min(height) as f64 / 2.0) * 0.70;
    let n = categories.len();

    // Background zones, before data
    for band in ZONE_BANDS {
        let points = ring_points(center, radius, n, band.upper);
        root.draw(&Polygon::new(points, palette.zone(band.status)))
            .map_err(|e| e.to_string())?;
    }

    // Grid rings every 2 points
    for step in 1..=5 {
        let mut points = ring_points(center, radius, n, step as f64 * 2.0);
        points.push(points[0]);
        root.draw(&PathElement::new(points, palette.grid.stroke_width(1)))
            .map_err(|e| e.to_string())?;
    }

    // Axis lines
    for i in 0..n {
        let tip = point_for_value(center, radius, i, n, 10.0);
        root.draw(&PathElement::new(
            vec![(center.0 as i32, center.1 as i32), tip],
            palette.grid.stroke_width(1),
        ))
        .map_err(|e| e.to_string())?;
    }

    // Tick labels along the first axis
    let tick_color = palette.text.mix(0.7);
    let tick_style = TextStyle::from(("sans-serif", (font_px * 3 / 4) as i32))
        .color(&tick_color)
        .pos(Pos::new(HPos::Right, VPos::Center));
    for step in 1..=5 {
        let (x, y) = point_for_value(center, radius, 0, n, step as f64 * 2.0);
        root.draw(&Text::new(format!("{}", step * 2), (x - 4, y), tick_style.clone()))
            .map_err(|e| e.to_string())?;
    }

    // Data polygon and points
    let data_points: Vec<(i32, i32)> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| point_for_value(center, radius, i, n, c.score.clamp(0.0, 10.0)))
        .collect();

    root.draw(&Polygon::new(data_points.clone(), palette.series.mix(0.20)))
        .map_err(|e| e.to_string())?;

    let mut outline = data_points.clone();
    outline.push(outline[0]);
    root.draw(&PathElement::new(outline, palette.series.stroke_width(2)))
        .map_err(|e| e.to_string())?;

    for &(x, y) in &data_points {
        root.draw(&Circle::new((x, y), 4, palette.series.filled()))
            .map_err(|e| e.to_string())?;
    }

    // Axis labels, wrapped two tokens per line
    for (i, category) in categories.iter().enumerate() {
        let angle = axis_angle(i, n);
        let (x, y) = point_for_value(center, radius, i, n, 11.8);
        let hpos = if angle.cos() > 0.3 {
            HPos::Left
        } else if angle.cos() < -0.3 {
            HPos::Right
        } else {
            HPos::Center
        };
        let label_style = TextStyle::from(("sans-serif", font_px as i32))
            .color(&palette.text)
            .pos(Pos::new(hpos, VPos::Center));

        let lines = wrap_label(&category.category_name);
        let line_height = font_px as i32 + 2;
        let top = y - (lines.len() as i32 - 1) * line_height / 2;
        for (line_idx, line) in lines.iter().enumerate() {
            root.draw(&Text::new(
                line.clone(),
                (x, top + line_idx as i32 * line_height),
                label_style.clone(),
            ))
            .map_err(|e| e.to_string())?;
        }
    }

    Ok(())
}

/// Render the radar chart standalone as PNG bytes
pub fn render_radar_chart(
    categories: &[Category],
    theme: Theme,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, String> {
    let palette = Palette::for_theme(theme);
    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&palette.background).map_err(|e| e.to_string())?;
        draw_radar(&root, categories, &palette, 14)?;
        root.present().map_err(|e| e.to_string())?;
    }

    encode_png(buffer, width, height)
}

// ============================================================================
// Trend Chart
// ============================================================================

/// One plotted trend point: its formatted date label and score
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrendPoint {
    pub label: String,
    pub score: f64,
}

/// Date label for a record on the trend X axis
pub fn trend_label(record: &AnalysisRecord) -> String {
    record.date.format("%d/%m/%Y").to_string()
}

/// Trend points for a chronologically ordered history slice
pub fn trend_points(history: &[AnalysisRecord]) -> Vec<TrendPoint> {
    history
        .iter()
        .map(|record| TrendPoint {
            label: trend_label(record),
            score: record.analysis.overall_health_score.score,
        })
        .collect()
}

/// Resolve a plotted point back to its originating record.
///
/// Selection is index-addressed against the same slice the chart was drawn
/// from, so duplicate scores remain individually selectable.
pub fn resolve_selection(history: &[AnalysisRecord], index: usize) -> Option<&AnalysisRecord> {
    history.get(index)
}

/// Render the overall-score trend as PNG bytes.
///
/// `history` must be in chronological order. The Y domain is fixed [0, 100].
pub fn render_trend_chart(
    history: &[AnalysisRecord],
    theme: Theme,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, String> {
    if history.is_empty() {
        return Err("no history to chart".to_string());
    }

    let palette = Palette::for_theme(theme);
    let labels: Vec<String> = history.iter().map(trend_label).collect();
    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&palette.background).map_err(|e| e.to_string())?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(-1..(history.len() as i32), 0.0..100.0)
            .map_err(|e| e.to_string())?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(history.len().min(10))
            .x_label_formatter(&|x| {
                if *x >= 0 && (*x as usize) < labels.len() {
                    labels[*x as usize].clone()
                } else {
                    String::new()
                }
            })
            .y_desc("Overall health score")
            .label_style(TextStyle::from(("sans-serif", 12)).color(&palette.text))
            .draw()
            .map_err(|e| e.to_string())?;

        let points: Vec<(i32, f64)> = history
            .iter()
            .enumerate()
            .map(|(i, r)| (i as i32, r.analysis.overall_health_score.score))
            .collect();

        chart
            .draw_series(LineSeries::new(
                points.clone(),
                palette.series.stroke_width(2),
            ))
            .map_err(|e| e.to_string())?;

        chart
            .draw_series(points.iter().map(|(x, y)| {
                Circle::new((*x, *y), 5, palette.series.filled())
            }))
            .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())?;
    }

    encode_png(buffer, width, height)
}

// ============================================================================
// PNG Encoding
// ============================================================================

/// Convert an RGB buffer to PNG bytes
pub(crate) fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, String> {
    let img = RgbImage::from_raw(width, height, buffer)
        .ok_or("Failed to create image from buffer")?;

    let mut png_bytes = Vec::new();
    let dyn_img = DynamicImage::ImageRgb8(img);
    dyn_img
        .write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| e.to_string())?;

    Ok(png_bytes)
}
