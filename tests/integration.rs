//! Integration tests for the report pipeline.
//!
//! These exercise the public API end to end, from record data to PDF bytes.
//! They verify:
//! - Page counts for uniform content match the line capacity of a page
//! - Nothing drawn in the flow crosses the bottom margin
//! - Images are scaled into their bounds without distortion
//! - Batch reports number every page against the same total
//! - Output is byte-identical for identical input and a fixed clock

use std::cell::Cell;
use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};

use casereport::compose;
use casereport::image_loader::{FetchedBytes, ImageResolver};
use casereport::layout::{BlockRenderer, ContentBlock, DrawCommand, PageFlow};
use casereport::{
    ExportConfig, ExportError, Exporter, FixedClock, ImageFetcher, PageGeometry, RecordView,
    SummaryStatistics,
};

// ─── Helpers ────────────────────────────────────────────────────

fn generated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap()
}

/// Serves canned responses and counts requests.
struct StubFetcher {
    responses: HashMap<String, FetchedBytes>,
    requests: Cell<usize>,
}

impl StubFetcher {
    fn empty() -> Self {
        Self {
            responses: HashMap::new(),
            requests: Cell::new(0),
        }
    }

    fn serving(mut self, url: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(
            url.to_string(),
            FetchedBytes {
                content_type: Some(content_type.to_string()),
                bytes,
            },
        );
        self
    }
}

impl ImageFetcher for StubFetcher {
    fn fetch(&self, url: &str, _max_bytes: u64) -> Result<FetchedBytes, String> {
        self.requests.set(self.requests.get() + 1);
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| "connection refused".to_string())
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(encoder, img.as_raw(), width, height, image::ColorType::Rgb8)
        .unwrap();
    buf
}

fn record(id: &str) -> RecordView {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "requester": { "name": "Dana Whitfield", "email": "dana@example.com" },
        "category": "Plumbing",
        "description": "Kitchen sink drains slowly.",
        "createdAt": "2026-10-14T16:42:00Z",
        "status": "in_progress"
    }))
    .unwrap()
}

fn exporter(fetcher: StubFetcher) -> Exporter {
    Exporter::new(ExportConfig::default())
        .with_fetcher(fetcher)
        .with_clock(FixedClock(generated_at()))
}

fn assert_within_content_area(doc: &casereport::Document) {
    let bottom = doc.geometry.content_bottom();
    for page in &doc.pages {
        for cmd in &page.commands {
            assert!(
                cmd.bottom() <= bottom + 1e-6,
                "page {}: {:?} ends at {} below {}",
                page.index + 1,
                cmd,
                cmd.bottom(),
                bottom
            );
        }
    }
}

// ─── Page flow ──────────────────────────────────────────────────

#[test]
fn uniform_paragraph_fills_pages_to_capacity() {
    let geometry = PageGeometry::a4();
    let per_page = (geometry.usable_height() / 15.0).floor() as usize;

    for n in [1, per_page, per_page + 1, 137] {
        let text: Vec<String> = (0..n).map(|i| format!("Line {}", i)).collect();
        let fetcher = StubFetcher::empty();
        let mut images = ImageResolver::new(&fetcher, 1 << 20);
        let mut renderer = BlockRenderer::new(&mut images);
        let mut flow = PageFlow::new(geometry);
        renderer.render(&mut flow, &ContentBlock::paragraph(text.join("\n")));

        let expected = (n + per_page - 1) / per_page;
        assert_eq!(flow.page_count(), expected, "{} lines", n);
    }
}

#[test]
fn long_record_never_crosses_bottom_margin() {
    let fetcher = StubFetcher::empty()
        .serving("https://cdn.test/wide.png", "image/png", png(1600, 400))
        .serving("https://cdn.test/tall.png", "image/png", png(300, 1200))
        .serving("https://cdn.test/face.png", "image/png", png(64, 64));

    let mut rec = record("0c5e8b2a-long");
    rec.description = Some("The pressure drops whenever the upstairs shower runs. ".repeat(60));
    rec.additional_notes = Some("Call before arriving.\n".repeat(40));
    rec.requester.photo_url = Some("https://cdn.test/face.png".into());
    rec.attachments = vec![
        "https://cdn.test/wide.png".into(),
        "https://cdn.test/tall.png".into(),
        "https://cdn.test/docs/invoice%20march.pdf".into(),
    ];

    let doc = exporter(fetcher)
        .compose_detail(&rec, &PageGeometry::letter())
        .unwrap();
    assert!(doc.page_count() >= 2);
    assert_within_content_area(&doc);

    let total = doc.page_count();
    for (i, page) in doc.pages.iter().enumerate() {
        let expected = format!("Page {} of {}", i + 1, total);
        assert!(page.furniture_lines().any(|l| l == expected));
    }
    assert!(doc.text_lines().contains(&"1. invoice march.pdf"));
}

#[test]
fn attachment_images_keep_aspect_ratio_within_bounds() {
    let config = ExportConfig::default();
    let fetcher = StubFetcher::empty().serving("https://cdn.test/pano.png", "image/png", png(2000, 1000));
    let mut rec = record("pano");
    rec.attachments = vec!["https://cdn.test/pano.png".into()];

    let doc = exporter(fetcher)
        .compose_detail(&rec, &config.geometry)
        .unwrap();
    let (width, height) = doc
        .pages
        .iter()
        .flat_map(|p| p.commands.iter())
        .find_map(|c| match c {
            DrawCommand::Image { width, height, .. } => Some((*width, *height)),
            _ => None,
        })
        .expect("attachment image drawn");

    assert!(width <= config.geometry.content_width() + 1e-6);
    assert!(height <= config.attachment_image_max_height + 1e-6);
    assert!((width / height - 2.0).abs() < 1e-6);
}

#[test]
fn unreachable_images_are_skipped() {
    let mut rec = record("offline");
    rec.requester.photo_url = Some("https://cdn.test/missing.jpg".into());
    rec.attachments = vec!["https://cdn.test/gone.png".into()];

    let doc = exporter(StubFetcher::empty())
        .compose_detail(&rec, &PageGeometry::a4())
        .unwrap();
    let images = doc
        .pages
        .iter()
        .flat_map(|p| p.commands.iter())
        .filter(|c| matches!(c, DrawCommand::Image { .. }))
        .count();
    assert_eq!(images, 0);
    assert!(doc.text_lines().contains(&"Attachments"));
}

#[test]
fn local_paths_in_record_data_are_never_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secret.png");
    std::fs::write(&path, png(8, 8)).unwrap();
    let local = path.to_string_lossy().into_owned();

    let mut rec = record("local");
    rec.requester.photo_url = Some(local.clone());
    rec.attachments = vec![local, format!("file://{}", path.display())];

    let fetcher = StubFetcher::empty();
    let mut images = ImageResolver::new(&fetcher, 1 << 20);
    let doc = compose::compose_detail(&rec, &ExportConfig::default(), &mut images, generated_at())
        .unwrap();
    let drawn = doc
        .pages
        .iter()
        .flat_map(|p| p.commands.iter())
        .filter(|c| matches!(c, DrawCommand::Image { .. }))
        .count();
    assert_eq!(drawn, 0);
    assert_eq!(fetcher.requests.get(), 0);
}

// ─── Detail report content ──────────────────────────────────────

#[test]
fn absent_fields_render_fallback() {
    let mut rec = record("fallback");
    rec.category = None;
    rec.requester.email = None;

    let doc = exporter(StubFetcher::empty())
        .compose_detail(&rec, &PageGeometry::a4())
        .unwrap();
    let lines = doc.text_lines();
    assert!(lines.contains(&"Category: Not specified"));
    assert!(lines.contains(&"Email: Not specified"));
    assert!(lines.contains(&"Preferred Date: Not specified"));
}

#[test]
fn explicit_nulls_render_like_missing_fields() {
    let rec: RecordView = serde_json::from_value(serde_json::json!({
        "id": "nulls",
        "requester": { "name": null, "email": null, "photoUrl": null },
        "category": null,
        "description": null,
        "attachments": null,
        "createdAt": "2026-10-14T16:42:00Z",
        "status": "pending"
    }))
    .unwrap();

    let doc = exporter(StubFetcher::empty())
        .compose_detail(&rec, &PageGeometry::a4())
        .unwrap();
    let lines = doc.text_lines();
    assert!(lines.contains(&"Name: Not specified"));
    let description = lines.iter().position(|l| *l == "Description").unwrap();
    assert_eq!(lines[description + 1], "Status");
    assert!(!lines.contains(&"Attachments"));
}

#[test]
fn empty_description_keeps_section_and_moves_on() {
    let mut rec = record("quiet");
    rec.description = None;
    rec.status = "awaiting_parts".into();

    let doc = exporter(StubFetcher::empty())
        .compose_detail(&rec, &PageGeometry::a4())
        .unwrap();
    assert_eq!(doc.page_count(), 1);

    let lines = doc.text_lines();
    let description = lines.iter().position(|l| *l == "Description").unwrap();
    assert_eq!(lines[description + 1], "Status");
    assert!(lines.contains(&"awaiting_parts"));
}

#[test]
fn invalid_geometry_is_rejected() {
    let geometry = PageGeometry {
        width: 300.0,
        height: 400.0,
        margin: 160.0,
    };
    let err = exporter(StubFetcher::empty())
        .export_detail(&record("x"), &geometry)
        .unwrap_err();
    assert!(matches!(err, ExportError::InvalidGeometry(_)));
}

#[test]
fn geometry_too_small_for_footers_is_rejected() {
    let geometry = PageGeometry {
        width: 595.0,
        height: 842.0,
        margin: 12.0,
    };
    let err = exporter(StubFetcher::empty())
        .export_detail(&record("x"), &geometry)
        .unwrap_err();
    assert!(matches!(err, ExportError::InvalidGeometry(_)));
}

// ─── Batch ──────────────────────────────────────────────────────

#[test]
fn batch_numbers_every_page_against_one_total() {
    let records: Vec<_> = ["a1", "b2", "c3"].iter().map(|id| record(id)).collect();
    let doc = exporter(StubFetcher::empty())
        .compose_batch(&records, &PageGeometry::a4())
        .unwrap();

    assert!(doc.page_count() >= 4);
    let total = doc.page_count();
    for (i, page) in doc.pages.iter().enumerate() {
        let numbers: Vec<_> = page
            .furniture_lines()
            .filter(|l| l.starts_with("Page "))
            .collect();
        assert_eq!(numbers, vec![format!("Page {} of {}", i + 1, total)]);
    }
    assert_within_content_area(&doc);
}

#[test]
fn batch_shares_image_cache_across_records() {
    let url = "https://cdn.test/shared.png";
    let fetcher = StubFetcher::empty().serving(url, "image/png", png(10, 10));
    let mut records: Vec<_> = ["a", "b", "c"].iter().map(|id| record(id)).collect();
    for r in &mut records {
        r.requester.photo_url = Some(url.into());
    }

    let mut images = ImageResolver::new(&fetcher, 1 << 20);
    let doc = compose::compose_batch(&records, &ExportConfig::default(), &mut images, generated_at())
        .unwrap();
    assert_eq!(doc.page_count(), 4);
    assert_eq!(fetcher.requests.get(), 1);
}

// ─── Statistics ─────────────────────────────────────────────────

#[test]
fn statistics_report_exports_with_filter_slug() {
    let stats: SummaryStatistics = serde_json::from_value(serde_json::json!({
        "totalRequests": 7,
        "statusBreakdown": [{ "label": "pending", "count": 7 }],
        "periodLabel": "October 2026"
    }))
    .unwrap();

    let file = exporter(StubFetcher::empty())
        .export_summary_statistics(&stats, "Region: North", &PageGeometry::a4())
        .unwrap();
    assert_eq!(file.filename, "platform-reports-region-north-2026-10-15.pdf");
    assert!(file.bytes.starts_with(b"%PDF-"));
}

// ─── Output ─────────────────────────────────────────────────────

#[test]
fn identical_input_gives_identical_bytes() {
    let records = vec![record("same-1"), record("same-2")];
    let a = exporter(StubFetcher::empty())
        .export_batch(&records, &PageGeometry::a4())
        .unwrap();
    let b = exporter(StubFetcher::empty())
        .export_batch(&records, &PageGeometry::a4())
        .unwrap();
    assert_eq!(a.filename, "service-requests-export-2026-10-15.pdf");
    assert_eq!(a.bytes, b.bytes);
}

#[test]
fn pdf_bytes_are_well_formed() {
    let file = exporter(StubFetcher::empty())
        .export_batch(&[record("r1"), record("r2")], &PageGeometry::a4())
        .unwrap();
    let text = String::from_utf8_lossy(&file.bytes);

    assert!(text.starts_with("%PDF-1.7"));
    assert!(text.trim_end().ends_with("%%EOF"));
    assert!(text.contains("/Type /Catalog"));
    assert!(text.contains("/Count 3"));
    assert!(text.contains("/BaseFont /Helvetica"));
    assert!(text.contains("startxref"));
}

#[test]
fn exported_file_is_written_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let file = exporter(StubFetcher::empty())
        .export_detail(&record("4d2f9c10-aa"), &PageGeometry::a4())
        .unwrap();
    assert_eq!(file.filename, "Request_4d2f9c10_2026-10-15.pdf");

    let path = file.write_to_dir(dir.path()).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), file.bytes);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}
