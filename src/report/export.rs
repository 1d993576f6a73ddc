//! PDF export
//!
//! Walks the composed report section by section and lays each raster onto its
//! own A4 page, scaled to fit the content box with aspect ratio preserved.
//! The transient action controls are hidden for the duration of the export
//! and restored on every exit path, including failures.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use printpdf::image_crate::ImageFormat;
use printpdf::{Image, ImageTransform, Mm, PdfDocument};

use super::compose::ReportView;
use crate::error::{ReportError, ReportResult};

/// Page geometry in millimeters
#[derive(Debug, Clone, Copy)]
pub struct PageBox {
    pub width_mm: f64,
    pub height_mm: f64,
    pub margin_mm: f64,
}

impl PageBox {
    /// A4 portrait with a uniform 15 mm margin
    pub const A4: PageBox = PageBox {
        width_mm: 210.0,
        height_mm: 297.0,
        margin_mm: 15.0,
    };

    pub fn content_width(&self) -> f64 {
        self.width_mm - 2.0 * self.margin_mm
    }

    pub fn content_height(&self) -> f64 {
        self.height_mm - 2.0 * self.margin_mm
    }
}

/// Outcome of a successful export
#[derive(Debug)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub file_name: String,
    pub pages: usize,
}

/// Scale a bitmap to the content box, preserving aspect ratio.
///
/// Fit-to-width first: scale so the image spans the content width. Only when
/// the resulting height would overflow the content box does the image fall
/// back to fit-to-height.
pub fn fit_to_content(
    bmp_width: u32,
    bmp_height: u32,
    content_w: f64,
    content_h: f64,
) -> (f64, f64) {
    let scaled_h = bmp_height as f64 * content_w / bmp_width as f64;
    if scaled_h <= content_h {
        (content_w, scaled_h)
    } else {
        (bmp_width as f64 * content_h / bmp_height as f64, content_h)
    }
}

/// Restores the action-control visibility when dropped, whatever the export
/// outcome was.
struct ActionsHidden<'a> {
    view: &'a mut ReportView,
    previous: bool,
}

impl<'a> ActionsHidden<'a> {
    fn new(view: &'a mut ReportView) -> Self {
        let previous = view.actions_visible;
        view.actions_visible = false;
        ActionsHidden { view, previous }
    }
}

impl Drop for ActionsHidden<'_> {
    fn drop(&mut self) {
        self.view.actions_visible = self.previous;
    }
}

/// Export filename for today's date (UTC, like every stored timestamp)
pub fn export_file_name() -> String {
    format!("Health-Analysis-Report-{}.pdf", Utc::now().format("%Y-%m-%d"))
}

/// Export a composed report as a paginated PDF under `output_dir`.
///
/// Every section gets its own page, in composition order. The document is
/// assembled fully in memory and written in one step, so a failed export
/// leaves no partial file behind.
pub fn export_report(
    view: Option<&mut ReportView>,
    page: PageBox,
    output_dir: &Path,
) -> ReportResult<ExportSummary> {
    let view = view.ok_or(ReportError::ExportTargetMissing)?;
    let guard = ActionsHidden::new(view);

    let sections = guard.view.sections();
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Health Analysis Report",
        Mm(page.width_mm as f32),
        Mm(page.height_mm as f32),
        "Page 1",
    );

    for (i, &id) in sections.iter().enumerate() {
        let raster = guard.view.rasterize_section(id)?;

        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_idx, layer_idx) =
                doc.add_page(Mm(page.width_mm as f32), Mm(page.height_mm as f32), format!("Page {}", i + 1));
            doc.get_page(page_idx).get_layer(layer_idx)
        };

        let dyn_img = printpdf::image_crate::load_from_memory_with_format(
            &raster.png,
            ImageFormat::Png,
        )
        .map_err(|e| ReportError::ExportRasterFailure {
            section: id.as_str().to_string(),
            reason: e.to_string(),
        })?;
        let image = Image::from_dynamic_image(&dyn_img);

        let (img_w, img_h) =
            fit_to_content(raster.width, raster.height, page.content_width(), page.content_height());

        // Physical size is pixels over dpi, so solve dpi for the fitted width
        let dpi = raster.width as f64 * 25.4 / img_w;

        image.add_to_layer(
            layer,
            ImageTransform {
                // centered horizontally, anchored to the top margin
                translate_x: Some(Mm(((page.width_mm - img_w) / 2.0) as f32)),
                translate_y: Some(Mm((page.height_mm - page.margin_mm - img_h) as f32)),
                dpi: Some(dpi as f32),
                ..Default::default()
            },
        );
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|e| ReportError::ExportRasterFailure {
            section: "document".to_string(),
            reason: e.to_string(),
        })?;

    let file_name = export_file_name();
    let path = output_dir.join(&file_name);
    fs::write(&path, bytes)?;

    Ok(ExportSummary {
        path,
        file_name,
        pages: sections.len(),
    })
}
