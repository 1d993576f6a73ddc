//! Report composition
//!
//! Lays the report out as an ordered sequence of independent sections and
//! rasterizes each one to a bitmap for export. Sections render at a fixed 2x
//! supersampling factor for print quality.

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::charts::{self, draw_radar, wrap_text, Palette};
use super::view_model::{project, TableOptions};
use crate::error::{ReportError, ReportResult};
use crate::models::{compute_bmi, AnalysisRecord, BmiResult, Classification, Metric};
use crate::session::Theme;

/// Supersampling factor applied to every section raster
pub const SUPERSAMPLE: u32 = 2;

/// Stable section identity, in fixed report order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionId {
    ScoreSummary,
    CategoryOverview,
    MetricsTable,
    Recommendations,
}

impl SectionId {
    /// Fixed composition order
    pub const ORDER: [SectionId; 4] = [
        SectionId::ScoreSummary,
        SectionId::CategoryOverview,
        SectionId::MetricsTable,
        SectionId::Recommendations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::ScoreSummary => "score_summary",
            SectionId::CategoryOverview => "category_overview",
            SectionId::MetricsTable => "metrics_table",
            SectionId::Recommendations => "recommendations",
        }
    }
}

/// A rasterized section ready for placement on a page
pub struct SectionRaster {
    pub id: SectionId,
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A composed report: one analysis record arranged as ordered sections.
///
/// Owned for the duration of one render; not persisted. The transient action
/// controls attached to the view are not a section and never appear in a
/// raster; the exporter hides them while it walks the sections.
pub struct ReportView {
    record: AnalysisRecord,
    bmi: BmiResult,
    table: Vec<Metric>,
    table_options: TableOptions,
    theme: Theme,
    pub actions_visible: bool,
}

/// Compose the full report for one analysis record.
pub fn compose_report(
    record: &AnalysisRecord,
    opts: TableOptions,
    theme: Theme,
) -> ReportResult<ReportView> {
    let bmi = compute_bmi(record.inputs.height_cm, record.inputs.weight_kg)?;
    let table = project(&record.analysis.metrics, opts);

    Ok(ReportView {
        record: record.clone(),
        bmi,
        table,
        table_options: opts,
        theme,
        actions_visible: true,
    })
}

impl ReportView {
    pub fn sections(&self) -> &'static [SectionId] {
        &SectionId::ORDER
    }

    pub fn record(&self) -> &AnalysisRecord {
        &self.record
    }

    pub fn table(&self) -> &[Metric] {
        &self.table
    }

    pub fn table_options(&self) -> TableOptions {
        self.table_options
    }

    /// Re-project the metrics table with new display flags
    pub fn set_table_options(&mut self, opts: TableOptions) {
        self.table = project(&self.record.analysis.metrics, opts);
        self.table_options = opts;
    }

    /// Logical section size in unscaled pixels; height grows with content
    fn section_size(&self, id: SectionId) -> (u32, u32) {
        let analysis = &self.record.analysis;
        match id {
            SectionId::ScoreSummary => (840, 320),
            SectionId::CategoryOverview => {
                let cards = analysis.health_analysis.categories.len() as u32;
                (840, (120 + cards * 100).max(520))
            }
            SectionId::MetricsTable => {
                let rows = self.table.len().max(1) as u32;
                (840, 130 + rows * 30)
            }
            SectionId::Recommendations => {
                let foods = analysis.recommended_foods.len().max(1) as u32;
                (840, 90 + foods * 96)
            }
        }
    }

    /// Rasterize one section at the supersampling factor.
    pub fn rasterize_section(&self, id: SectionId) -> ReportResult<SectionRaster> {
        let (w, h) = self.section_size(id);
        let (pw, ph) = (w * SUPERSAMPLE, h * SUPERSAMPLE);
        let palette = Palette::for_theme(self.theme);

        let raster_err = |reason: String| ReportError::ExportRasterFailure {
            section: id.as_str().to_string(),
            reason,
        };

        let mut buffer = vec![0u8; (pw * ph * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (pw, ph)).into_drawing_area();
            root.fill(&palette.background)
                .map_err(|e| raster_err(e.to_string()))?;

            match id {
                SectionId::ScoreSummary => self.draw_score_summary(&root, &palette),
                SectionId::CategoryOverview => self.draw_category_overview(&root, &palette),
                SectionId::MetricsTable => self.draw_metrics_table(&root, &palette),
                SectionId::Recommendations => self.draw_recommendations(&root, &palette),
            }
            .map_err(raster_err)?;

            root.present().map_err(|e| raster_err(e.to_string()))?;
        }

        let png = charts::encode_png(buffer, pw, ph).map_err(raster_err)?;

        Ok(SectionRaster {
            id,
            png,
            width: pw,
            height: ph,
        })
    }

    // ------------------------------------------------------------------
    // Section drawing
    // ------------------------------------------------------------------

    fn draw_score_summary(
        &self,
        root: &DrawingArea<BitMapBackend, Shift>,
        palette: &Palette,
    ) -> Result<(), String> {
        let analysis = &self.record.analysis;
        let inputs = &self.record.inputs;
        let s = SUPERSAMPLE as i32;

        draw_title(root, palette, "Analysis Results")?;
        text(
            root,
            &format!("Date: {}", self.record.date.format("%d/%m/%Y")),
            (620 * s, 36 * s),
            style(palette.text, 14 * s),
        )?;

        // Health score card
        text(root, "Health Score", (40 * s, 90 * s), bold(palette.text, 16 * s))?;
        let score = analysis.overall_health_score.score;
        text(
            root,
            &format!("{:.0}/100", score),
            (40 * s, 140 * s),
            bold(palette.series, 34 * s),
        )?;
        text(
            root,
            &analysis.overall_health_score.label,
            (40 * s, 175 * s),
            style(palette.text, 15 * s),
        )?;
        draw_wrapped(
            root,
            &analysis.overall_health_score.explanation,
            46,
            (40 * s, 205 * s),
            18 * s,
            style(palette.text, 12 * s),
        )?;

        // Body analysis card
        let x = 440 * s;
        text(root, "Body Analysis", (x, 90 * s), bold(palette.text, 16 * s))?;
        text(
            root,
            &format!("Age: {}    Gender: {}", inputs.age, inputs.gender.display_name()),
            (x, 125 * s),
            style(palette.text, 13 * s),
        )?;
        text(
            root,
            &format!(
                "Height: {:.0} cm    Weight: {:.1} kg",
                inputs.height_cm, inputs.weight_kg
            ),
            (x, 150 * s),
            style(palette.text, 13 * s),
        )?;
        text(
            root,
            &format!("BMI: {:.1} ({})", self.bmi.value, self.bmi.class.display_name()),
            (x, 175 * s),
            bold(palette.series, 14 * s),
        )?;
        draw_wrapped(
            root,
            &analysis.bmi_analysis.summary,
            46,
            (x, 205 * s),
            18 * s,
            style(palette.text, 12 * s),
        )?;

        Ok(())
    }

    fn draw_category_overview(
        &self,
        root: &DrawingArea<BitMapBackend, Shift>,
        palette: &Palette,
    ) -> Result<(), String> {
        let categories = &self.record.analysis.health_analysis.categories;
        let s = SUPERSAMPLE as i32;

        draw_title(root, palette, "Detailed Health Overview")?;

        // Radar on the left, category cards on the right
        let (_, body) = root.split_vertically(70 * s);
        let (chart_area, card_area) = body.split_horizontally(420 * s);
        draw_radar(
            &chart_area.margin(10 * s as u32, 10 * s as u32, 10 * s as u32, 10 * s as u32),
            categories,
            palette,
            12 * SUPERSAMPLE,
        )?;

        let card_w = 380 * s;
        let card_h = 88 * s;
        for (i, category) in categories.iter().enumerate() {
            let y = 10 * s + i as i32 * (card_h + 12 * s);
            let status_color = palette.status_color(category.status());

            card_area
                .draw(&Rectangle::new(
                    [(0, y), (card_w, y + card_h)],
                    status_color.mix(0.12).filled(),
                ))
                .map_err(|e| e.to_string())?;
            card_area
                .draw(&Rectangle::new(
                    [(0, y), (card_w, y + card_h)],
                    status_color.stroke_width(2),
                ))
                .map_err(|e| e.to_string())?;

            card_area
                .draw(&Text::new(
                    category.display_name(),
                    (14 * s, y + 22 * s),
                    bold(palette.text, 14 * s),
                ))
                .map_err(|e| e.to_string())?;
            card_area
                .draw(&Text::new(
                    format!("{:.1}", category.score),
                    (card_w - 46 * s, y + 22 * s),
                    bold(status_color, 15 * s),
                ))
                .map_err(|e| e.to_string())?;

            for (line_idx, line) in wrap_text(&category.summary, 52).iter().take(2).enumerate() {
                card_area
                    .draw(&Text::new(
                        line.clone(),
                        (14 * s, y + (44 + line_idx as i32 * 18) * s),
                        style(palette.text, 11 * s),
                    ))
                    .map_err(|e| e.to_string())?;
            }
        }

        Ok(())
    }

    fn draw_metrics_table(
        &self,
        root: &DrawingArea<BitMapBackend, Shift>,
        palette: &Palette,
    ) -> Result<(), String> {
        let s = SUPERSAMPLE as i32;

        draw_title(root, palette, "Detailed Lab Metrics")?;

        let col_x = [40, 300, 480, 680];
        let headers = ["Metric", "Result", "Reference range", "Status"];
        let header_y = 100 * s;
        for (x, header) in col_x.iter().zip(headers) {
            text(root, header, (x * s, header_y), bold(palette.text, 13 * s))?;
        }
        hline(root, palette, 40 * s, 800 * s, header_y + 10 * s)?;

        for (i, metric) in self.table.iter().enumerate() {
            let y = header_y + (26 + i as i32 * 30) * s;
            let color = classification_color(metric.classification);

            text(root, &metric.name, (col_x[0] * s, y), style(palette.text, 12 * s))?;
            text(
                root,
                &format!("{} {}", metric.value, metric.unit),
                (col_x[1] * s, y),
                style(palette.text, 12 * s),
            )?;
            text(
                root,
                &metric.reference_range,
                (col_x[2] * s, y),
                style(palette.text, 12 * s),
            )?;
            text(
                root,
                metric.classification.as_str(),
                (col_x[3] * s, y),
                bold(color, 12 * s),
            )?;
        }

        if self.table.is_empty() {
            text(
                root,
                "No metrics match the current filters.",
                (40 * s, header_y + 30 * s),
                style(palette.text, 12 * s),
            )?;
        }

        Ok(())
    }

    fn draw_recommendations(
        &self,
        root: &DrawingArea<BitMapBackend, Shift>,
        palette: &Palette,
    ) -> Result<(), String> {
        let foods = &self.record.analysis.recommended_foods;
        let s = SUPERSAMPLE as i32;

        draw_title(root, palette, "Food Suggestions")?;

        for (i, food) in foods.iter().enumerate() {
            let y = (90 + i as i32 * 96) * s;

            text(root, &food.food_name, (40 * s, y), bold(palette.series, 14 * s))?;
            draw_wrapped(
                root,
                &food.benefit,
                90,
                (40 * s, y + 22 * s),
                17 * s,
                style(palette.text, 12 * s),
            )?;
            text(
                root,
                &format!(
                    "Serving: {}    Available at: {}",
                    food.serving_suggestion,
                    food.suggested_store.display_name()
                ),
                (40 * s, y + 62 * s),
                style(palette.text, 11 * s),
            )?;
        }

        if foods.is_empty() {
            text(
                root,
                "No food suggestions in this analysis.",
                (40 * s, 100 * s),
                style(palette.text, 12 * s),
            )?;
        }

        Ok(())
    }
}

// ============================================================================
// Drawing Helpers
// ============================================================================

fn style(color: RGBColor, size: i32) -> TextStyle<'static> {
    let mut s = TextStyle::from(("sans-serif", size)).pos(Pos::new(HPos::Left, VPos::Center));
    s.color = color.to_backend_color();
    s
}

fn bold(color: RGBColor, size: i32) -> TextStyle<'static> {
    let mut s = TextStyle::from(("sans-serif", size).into_font().style(FontStyle::Bold))
        .pos(Pos::new(HPos::Left, VPos::Center));
    s.color = color.to_backend_color();
    s
}

fn text(
    root: &DrawingArea<BitMapBackend, Shift>,
    content: &str,
    pos: (i32, i32),
    style: TextStyle,
) -> Result<(), String> {
    root.draw(&Text::new(content.to_string(), pos, style))
        .map_err(|e| e.to_string())
}

fn draw_title(
    root: &DrawingArea<BitMapBackend, Shift>,
    palette: &Palette,
    title: &str,
) -> Result<(), String> {
    let s = SUPERSAMPLE as i32;
    text(root, title, (40 * s, 36 * s), bold(palette.text, 20 * s))?;
    hline(root, palette, 40 * s, 800 * s, 56 * s)
}

fn hline(
    root: &DrawingArea<BitMapBackend, Shift>,
    palette: &Palette,
    x0: i32,
    x1: i32,
    y: i32,
) -> Result<(), String> {
    root.draw(&PathElement::new(
        vec![(x0, y), (x1, y)],
        palette.grid.stroke_width(1),
    ))
    .map_err(|e| e.to_string())
}

fn draw_wrapped(
    root: &DrawingArea<BitMapBackend, Shift>,
    content: &str,
    width: usize,
    pos: (i32, i32),
    line_height: i32,
    style: TextStyle,
) -> Result<(), String> {
    for (i, line) in wrap_text(content, width).iter().enumerate() {
        root.draw(&Text::new(
            line.clone(),
            (pos.0, pos.1 + i as i32 * line_height),
            style.clone(),
        ))
        .map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Row/badge color for a metric classification
fn classification_color(classification: Classification) -> RGBColor {
    match classification {
        Classification::Normal => RGBColor(40, 167, 69),
        Classification::High => RGBColor(220, 53, 69),
        Classification::Low => RGBColor(0, 112, 192),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AnalysisResponse, BmiAnalysis, BodyProfile, Category, Gender, HealthAnalysis, IconKey,
        OverallScore, RecommendedFood, SuggestedStore,
    };
    use chrono::{TimeZone, Utc};

    fn sample_record() -> AnalysisRecord {
        AnalysisRecord {
            date: Utc.with_ymd_and_hms(2025, 6, 5, 9, 0, 0).unwrap(),
            inputs: BodyProfile {
                age: 34,
                height_cm: 170.0,
                weight_kg: 70.0,
                gender: Gender::Male,
                occupation: "office worker".to_string(),
            },
            analysis: AnalysisResponse {
                overall_health_score: OverallScore {
                    score: 82.0,
                    label: "Good".to_string(),
                    explanation: "Most metrics in range.".to_string(),
                },
                bmi_analysis: BmiAnalysis {
                    summary: "BMI is within the normal range.".to_string(),
                },
                health_analysis: HealthAnalysis {
                    categories: vec![
                        Category {
                            category_name: vec!["Heart".into(), "Health".into()],
                            score: 8.0,
                            summary: "Lipids look fine.".into(),
                            icon: IconKey::HeartPulse,
                        },
                        Category {
                            category_name: vec!["Blood".into(), "Sugar".into()],
                            score: 5.0,
                            summary: "Fasting glucose slightly high.".into(),
                            icon: IconKey::Droplets,
                        },
                        Category {
                            category_name: vec!["Kidney".into(), "Function".into()],
                            score: 9.0,
                            summary: "All in range.".into(),
                            icon: IconKey::Activity,
                        },
                    ],
                },
                metrics: vec![
                    Metric {
                        name: "Glucose".into(),
                        value: "105".into(),
                        unit: "mg/dL".into(),
                        reference_range: "70-99".into(),
                        classification: Classification::High,
                        explanation: String::new(),
                    },
                    Metric {
                        name: "Creatinine".into(),
                        value: "0.9".into(),
                        unit: "mg/dL".into(),
                        reference_range: "0.7-1.3".into(),
                        classification: Classification::Normal,
                        explanation: String::new(),
                    },
                ],
                recommended_foods: vec![RecommendedFood {
                    food_name: "Oats".into(),
                    benefit: "Soluble fiber helps glucose control.".into(),
                    serving_suggestion: "One bowl at breakfast.".into(),
                    suggested_store: SuggestedStore::LotteMart,
                }],
            },
        }
    }

    #[test]
    fn test_compose_fixed_section_order() {
        let view = compose_report(&sample_record(), TableOptions::default(), Theme::Light).unwrap();
        assert_eq!(
            view.sections(),
            &[
                SectionId::ScoreSummary,
                SectionId::CategoryOverview,
                SectionId::MetricsTable,
                SectionId::Recommendations,
            ]
        );
        assert!(view.actions_visible);
    }

    #[test]
    fn test_compose_rejects_invalid_profile() {
        let mut record = sample_record();
        record.inputs.height_cm = 0.0;
        assert!(matches!(
            compose_report(&record, TableOptions::default(), Theme::Light),
            Err(ReportError::InvalidBodyProfile(_))
        ));
    }

    #[test]
    fn test_set_table_options_reprojects() {
        let mut view =
            compose_report(&sample_record(), TableOptions::default(), Theme::Light).unwrap();
        assert_eq!(view.table().len(), 2);

        view.set_table_options(TableOptions {
            sort_abnormal_first: true,
            filter_abnormal_only: true,
        });
        assert_eq!(view.table().len(), 1);
        assert_eq!(view.table()[0].name, "Glucose");
    }

    #[test]
    fn test_rasterize_applies_supersampling() {
        let view = compose_report(&sample_record(), TableOptions::default(), Theme::Light).unwrap();
        for id in SectionId::ORDER {
            let raster = view.rasterize_section(id).unwrap();
            assert_eq!(raster.width % SUPERSAMPLE, 0);
            assert_eq!(raster.height % SUPERSAMPLE, 0);
            assert_eq!(&raster.png[..4], &[0x89, b'P', b'N', b'G']);
        }
    }

    #[test]
    fn test_rasterize_dark_theme() {
        let view = compose_report(&sample_record(), TableOptions::default(), Theme::Dark).unwrap();
        let raster = view.rasterize_section(SectionId::CategoryOverview).unwrap();
        assert_eq!(raster.id, SectionId::CategoryOverview);
    }
}
