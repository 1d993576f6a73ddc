//! Report pipeline
//!
//! Derives the display table, draws the charts, composes the multi-section
//! report, and exports it as a paginated PDF.

pub mod charts;
pub mod compose;
pub mod export;
pub mod view_model;

pub use compose::{compose_report, ReportView, SectionId, SectionRaster, SUPERSAMPLE};
pub use export::{export_report, ExportSummary, PageBox};
pub use view_model::{project, TableOptions};
