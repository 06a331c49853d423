//! Export entry points: compose, serialize, and name the file.
//!
//! An [`Exporter`] owns the configuration and the two outside collaborators
//! (the image fetcher and the clock). Every export call builds its own flow
//! and image cache, so calls share no mutable state.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};

use crate::compose;
use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::image_loader::{HttpFetcher, ImageFetcher, ImageResolver};
use crate::layout::Document;
use crate::model::{PageGeometry, RecordView, SummaryStatistics};
use crate::pdf::PdfWriter;

/// Source of the generation timestamp.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Makes output reproducible.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A finished report: suggested filename plus the PDF bytes.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    /// Write into `dir` under [`filename`](Self::filename).
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let path = dir.as_ref().join(&self.filename);
        self.write_to_path(&path)?;
        Ok(path)
    }

    /// Write to `path` through a temporary sibling that is renamed into
    /// place, so a partially written report is never visible.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.filename.clone());
        let temp_path = parent.join(format!(".{}.{}.tmp", name, std::process::id()));

        let result = (|| -> std::io::Result<()> {
            let mut file = File::create(&temp_path)?;
            file.write_all(&self.bytes)?;
            file.sync_all()?;
            drop(file);
            fs::rename(&temp_path, path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

pub struct Exporter {
    config: ExportConfig,
    fetcher: Box<dyn ImageFetcher>,
    clock: Box<dyn Clock>,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(ExportConfig::default())
    }
}

impl Exporter {
    /// Exporter fetching images over HTTP and stamping the current time.
    pub fn new(config: ExportConfig) -> Self {
        let fetcher = HttpFetcher::new(config.image_timeout());
        Self {
            config,
            fetcher: Box::new(fetcher),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_fetcher(mut self, fetcher: impl ImageFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    fn config_for(&self, geometry: &PageGeometry) -> ExportConfig {
        ExportConfig {
            geometry: *geometry,
            ..self.config.clone()
        }
    }

    fn resolver(&self) -> ImageResolver<'_> {
        ImageResolver::new(self.fetcher.as_ref(), self.config.max_image_bytes)
    }

    // ── Composition only ───────────────────────────────────────

    pub fn compose_detail(
        &self,
        record: &RecordView,
        geometry: &PageGeometry,
    ) -> Result<Document, ExportError> {
        self.detail_at(record, geometry, self.clock.now())
    }

    pub fn compose_batch(
        &self,
        records: &[RecordView],
        geometry: &PageGeometry,
    ) -> Result<Document, ExportError> {
        self.batch_at(records, geometry, self.clock.now())
    }

    pub fn compose_summary_statistics(
        &self,
        stats: &SummaryStatistics,
        filter_label: &str,
        geometry: &PageGeometry,
    ) -> Result<Document, ExportError> {
        self.statistics_at(stats, filter_label, geometry, self.clock.now())
    }

    fn detail_at(
        &self,
        record: &RecordView,
        geometry: &PageGeometry,
        now: DateTime<Utc>,
    ) -> Result<Document, ExportError> {
        let config = self.config_for(geometry);
        let mut resolver = self.resolver();
        compose::compose_detail(record, &config, &mut resolver, now)
    }

    fn batch_at(
        &self,
        records: &[RecordView],
        geometry: &PageGeometry,
        now: DateTime<Utc>,
    ) -> Result<Document, ExportError> {
        let config = self.config_for(geometry);
        let mut resolver = self.resolver();
        compose::compose_batch(records, &config, &mut resolver, now)
    }

    fn statistics_at(
        &self,
        stats: &SummaryStatistics,
        filter_label: &str,
        geometry: &PageGeometry,
        now: DateTime<Utc>,
    ) -> Result<Document, ExportError> {
        let config = self.config_for(geometry);
        let mut resolver = self.resolver();
        compose::compose_statistics(stats, filter_label, &config, &mut resolver, now)
    }

    // ── Full export ────────────────────────────────────────────

    pub fn export_detail(
        &self,
        record: &RecordView,
        geometry: &PageGeometry,
    ) -> Result<ExportedFile, ExportError> {
        let now = self.clock.now();
        let document = self.detail_at(record, geometry, now)?;
        finish(&document, now, detail_filename(record, now.date_naive()))
    }

    pub fn export_batch(
        &self,
        records: &[RecordView],
        geometry: &PageGeometry,
    ) -> Result<ExportedFile, ExportError> {
        let now = self.clock.now();
        let document = self.batch_at(records, geometry, now)?;
        finish(&document, now, batch_filename(now.date_naive()))
    }

    pub fn export_summary_statistics(
        &self,
        stats: &SummaryStatistics,
        filter_label: &str,
        geometry: &PageGeometry,
    ) -> Result<ExportedFile, ExportError> {
        let now = self.clock.now();
        let document = self.statistics_at(stats, filter_label, geometry, now)?;
        finish(
            &document,
            now,
            statistics_filename(filter_label, now.date_naive()),
        )
    }
}

fn finish(
    document: &Document,
    now: DateTime<Utc>,
    filename: String,
) -> Result<ExportedFile, ExportError> {
    let bytes = PdfWriter::new().write(document, Some(now))?;
    log::info!(
        "exported {} ({} page(s), {} bytes)",
        filename,
        document.page_count(),
        bytes.len()
    );
    Ok(ExportedFile { filename, bytes })
}

// ── Filenames ──────────────────────────────────────────────────

/// `Request_{first 8 chars of id}_{YYYY-MM-DD}.pdf`
pub fn detail_filename(record: &RecordView, date: NaiveDate) -> String {
    let short: String = record
        .short_id()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("Request_{}_{}.pdf", short, date.format("%Y-%m-%d"))
}

pub fn batch_filename(date: NaiveDate) -> String {
    format!("service-requests-export-{}.pdf", date.format("%Y-%m-%d"))
}

pub fn statistics_filename(filter_label: &str, date: NaiveDate) -> String {
    format!(
        "platform-reports-{}-{}.pdf",
        slugify(filter_label),
        date.format("%Y-%m-%d")
    )
}

/// Lowercase ASCII alphanumerics; every other run becomes one `-`.
/// An empty result becomes `all`.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for ch in label.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "all".to_string()
    } else {
        slug.to_string()
    }
}
