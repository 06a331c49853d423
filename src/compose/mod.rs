//! # Report Composition
//!
//! Turns resolved input into a laid-out [`Document`].
//!
//! - [`record_blocks`] decides which sections a record gets and in what
//!   order. It is pure: the same record always yields the same blocks.
//! - [`compose_detail`], [`batch::compose_batch`], and
//!   [`stats::compose_statistics`] drive a [`PageFlow`] with those blocks.
//! - [`stamp_footers`] runs last, once the page count is final.

pub mod batch;
pub mod stats;

use chrono::{DateTime, Utc};

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::font::FontContext;
use crate::image_loader::ImageResolver;
use crate::layout::{BlockRenderer, ContentBlock, Document, DrawCommand, PageFlow};
use crate::model::{format_timestamp, present, PageGeometry, RecordView};
use crate::style::{self, Color};

pub use batch::compose_batch;
pub use stats::compose_statistics;

/// Gap inserted between sections.
const SECTION_GAP: f64 = 12.0;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Lay out a single-record detail report and stamp its footers.
pub fn compose_detail(
    record: &RecordView,
    config: &ExportConfig,
    images: &mut ImageResolver<'_>,
    generated_at: DateTime<Utc>,
) -> Result<Document, ExportError> {
    config.geometry.validate()?;
    let mut flow = PageFlow::new(config.geometry);
    let mut renderer = BlockRenderer::new(images);
    renderer.render_all(&mut flow, &record_blocks(record, config));

    log::debug!("record {} laid out on {} page(s)", record.id, flow.page_count());
    let document = Document {
        geometry: config.geometry,
        title: format!("Service Request {}", record.short_id()),
        pages: flow.finish(),
    };
    Ok(stamp_footers(document, generated_at))
}

/// Section sequence for one record.
///
/// Optional sections are left out entirely when the field that drives them
/// is absent. Each section opens with a space check sized for its heading
/// and first body line, so a heading is never stranded at a page bottom.
pub fn record_blocks(record: &RecordView, config: &ExportConfig) -> Vec<ContentBlock> {
    let content_width = config.geometry.content_width();
    let photo = config.profile_photo_size;
    let mut sections = SectionBuilder::default();

    // Title
    sections.open_title("Service Request Details");
    sections.push(ContentBlock::key_value("Request ID", Some(record.id.as_str())));
    sections.push(ContentBlock::key_value("Category", record.category.as_deref()));

    sections.open("Requester");
    sections.push(ContentBlock::key_value("Name", record.requester.name.as_deref()));
    sections.push(ContentBlock::key_value("Email", record.requester.email.as_deref()));
    if let Some(url) = present(record.requester.photo_url.as_deref()) {
        sections.push(ContentBlock::image(url, photo, photo));
    }

    sections.open("Schedule");
    let preferred = record.preferred_date.as_ref().map(format_timestamp);
    sections.push(ContentBlock::key_value("Preferred Date", preferred.as_deref()));
    sections.push(ContentBlock::key_value(
        "Created",
        Some(format_timestamp(&record.created_at).as_str()),
    ));

    sections.open("Description");
    sections.push(ContentBlock::paragraph(record.description.as_deref().unwrap_or_default()));

    if let Some(notes) = present(record.additional_notes.as_deref()) {
        sections.open("Additional Notes");
        sections.push(ContentBlock::paragraph(notes));
    }

    let attachments: Vec<&str> = record
        .attachments
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();
    if !attachments.is_empty() {
        sections.open("Attachments");
        let (pictures, files): (Vec<&str>, Vec<&str>) =
            attachments.into_iter().partition(|url| is_image_url(url));
        for url in pictures {
            sections.push(ContentBlock::image(
                url,
                content_width,
                config.attachment_image_max_height,
            ));
        }
        for (i, url) in files.into_iter().enumerate() {
            sections.push(ContentBlock::FileListEntry {
                ordinal: i + 1,
                display_name: file_name_from_url(url).to_string(),
                url: url.to_string(),
            });
        }
    }

    sections.open("Status");
    sections.push(ContentBlock::StatusBadge {
        text: record.status.clone(),
        fill: style::status_color(&record.status),
    });
    if let Some(count) = record.shortlist_count {
        sections.push(ContentBlock::key_value(
            "Shortlisted Handlers",
            Some(count.to_string().as_str()),
        ));
    }

    if let Some(handler) = record.handler_if_present() {
        sections.open("Assigned Handler");
        sections.push(ContentBlock::key_value("Name", handler.name.as_deref()));
        sections.push(ContentBlock::key_value("Email", handler.email.as_deref()));
    }

    if let Some(assignee) = record.assignee_if_present() {
        sections.open("Assignee");
        sections.push(ContentBlock::key_value("Name", assignee.name.as_deref()));
        sections.push(ContentBlock::key_value("Mobile", assignee.mobile.as_deref()));
        if let Some(url) = present(assignee.photo_url.as_deref()) {
            sections.push(ContentBlock::image(url, photo, photo));
        }
        if let Some(notes) = present(assignee.notes.as_deref()) {
            sections.push(ContentBlock::key_value("Notes", Some(notes)));
        }
    }

    sections.finish()
}

#[derive(Default)]
struct SectionBuilder {
    blocks: Vec<ContentBlock>,
}

impl SectionBuilder {
    fn open_title(&mut self, title: &str) {
        self.open_with(title, style::TITLE_SIZE);
    }

    fn open(&mut self, title: &str) {
        self.blocks.push(ContentBlock::Spacer {
            height: SECTION_GAP,
        });
        self.open_with(title, style::SECTION_HEADING_SIZE);
    }

    fn open_with(&mut self, title: &str, size: f64) {
        let estimate = size * style::HEADING_LINE_FACTOR + style::BODY_LINE_HEIGHT;
        self.blocks.push(ContentBlock::section_break(estimate));
        self.blocks.push(ContentBlock::heading(title, size));
    }

    fn push(&mut self, block: ContentBlock) {
        self.blocks.push(block);
    }

    fn finish(self) -> Vec<ContentBlock> {
        self.blocks
    }
}

/// Path portion of a URL with query and fragment removed.
fn url_path(url: &str) -> &str {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    &url[..end]
}

/// Attachments are classified by extension; data URIs by their MIME type.
pub fn is_image_url(url: &str) -> bool {
    if let Some(rest) = url.strip_prefix("data:") {
        return rest.starts_with("image/");
    }
    let name = file_name_from_url(url);
    match name.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Last path segment of a URL, still percent-encoded.
pub fn file_name_from_url(url: &str) -> &str {
    let path = url_path(url).trim_end_matches('/');
    match path.rsplit_once('/') {
        Some((_, name)) if !name.is_empty() => name,
        _ => path,
    }
}

// ── Footers ────────────────────────────────────────────────────

/// Line box for one furniture line.
fn furniture_line(x: f64, y: f64, text: String, color: Color) -> DrawCommand {
    DrawCommand::Text {
        x,
        y,
        line_height: style::FOOTER_SIZE * style::HEADING_LINE_FACTOR,
        size: style::FOOTER_SIZE,
        text,
        bold: false,
        color,
        link: None,
    }
}

/// Top of the record-identifier line, just below the content area and
/// always a full line above the page-number line.
pub(crate) fn record_footer_y(geometry: &PageGeometry) -> f64 {
    (geometry.content_bottom() + geometry.margin * 0.1)
        .min(page_footer_y(geometry) - style::FOOTER_LINE_HEIGHT)
}

/// Top of the page-number line, in the lower half of the bottom margin.
pub(crate) fn page_footer_y(geometry: &PageGeometry) -> f64 {
    (geometry.content_bottom() + geometry.margin * 0.5)
        .min(geometry.height - style::FOOTER_LINE_HEIGHT)
}

pub(crate) fn record_footer(geometry: &PageGeometry, record_id: &str) -> DrawCommand {
    furniture_line(
        geometry.margin,
        record_footer_y(geometry),
        format!("Request ID: {}", record_id),
        Color::MUTED,
    )
}

/// Stamp `"Page {i} of {N}"` bottom-left and the generation time
/// bottom-right on every page.
///
/// Runs once all pages exist, since `N` is unknown until then.
pub fn stamp_footers(mut document: Document, generated_at: DateTime<Utc>) -> Document {
    let total = document.pages.len();
    let geometry = document.geometry;
    let fonts = FontContext::new();
    let y = page_footer_y(&geometry);
    let stamp = format!("Generated: {}", format_timestamp(&generated_at));
    let stamp_width = fonts.measure_string(&stamp, false, style::FOOTER_SIZE);

    for (i, page) in document.pages.iter_mut().enumerate() {
        page.furniture.push(furniture_line(
            geometry.margin,
            y,
            format!("Page {} of {}", i + 1, total),
            Color::MUTED,
        ));
        page.furniture.push(furniture_line(
            geometry.width - geometry.margin - stamp_width,
            y,
            stamp.clone(),
            Color::MUTED,
        ));
    }
    document
}
