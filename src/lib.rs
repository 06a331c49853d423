//! # casereport
//!
//! Paginated PDF reports for service-request case records.
//!
//! Three report kinds share one page-flow engine: a single-record detail
//! report, a batch report (title page plus one record per page run), and a
//! platform statistics report built from boxed breakdown panels.
//!
//! Layout never slices content after the fact. Every block asks the flow for
//! the vertical space it needs *before* it draws, and the flow opens a new
//! page when the request does not fit. Page totals are only known once layout
//! finishes, so page numbers are stamped in a second pass.
//!
//! ## Architecture
//!
//! ```text
//! RecordView / SummaryStatistics (JSON or API)
//!       ↓
//!   [compose]  : Section plan: which blocks, in which order
//!       ↓
//!   [layout]   : Page flow: space checks, page breaks, draw commands
//!       ↓            ↖ [text] wrapping, [font] metrics, [image_loader] fetch + decode
//!   [pdf]      : Serialize pages to PDF bytes
//!       ↓
//!   [export]   : Filenames, clock, atomic file output
//! ```

pub mod compose;
pub mod config;
pub mod error;
pub mod export;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod style;
pub mod text;

pub use config::ExportConfig;
pub use error::ExportError;
pub use export::{Clock, ExportedFile, Exporter, FixedClock, SystemClock};
pub use image_loader::{HttpFetcher, ImageFetcher};
pub use layout::Document;
pub use model::{CountEntry, PageGeometry, RecordView, SummaryStatistics};

/// Render one record as a detail report with default settings.
///
/// Images are fetched over HTTP. Use an [`Exporter`] to swap the fetcher,
/// the clock, or the configuration.
pub fn export_detail(
    record: &RecordView,
    geometry: &PageGeometry,
) -> Result<ExportedFile, ExportError> {
    Exporter::new(ExportConfig::default()).export_detail(record, geometry)
}

/// Render many records into one batch report with default settings.
pub fn export_batch(
    records: &[RecordView],
    geometry: &PageGeometry,
) -> Result<ExportedFile, ExportError> {
    Exporter::new(ExportConfig::default()).export_batch(records, geometry)
}

/// Render aggregate statistics with default settings.
pub fn export_summary_statistics(
    stats: &SummaryStatistics,
    filter_label: &str,
    geometry: &PageGeometry,
) -> Result<ExportedFile, ExportError> {
    Exporter::new(ExportConfig::default()).export_summary_statistics(stats, filter_label, geometry)
}
