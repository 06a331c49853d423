//! Multi-record export.
//!
//! A summary title page, then each record starting on a page of its own.
//! Every page a record occupies carries its full identifier in the bottom
//! margin. Page numbers are stamped once all records are laid out.

use chrono::{DateTime, Utc};

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::image_loader::ImageResolver;
use crate::layout::{BlockRenderer, ContentBlock, Document, PageFlow};
use crate::model::{format_timestamp, RecordView};
use crate::style;

use super::{record_blocks, record_footer, stamp_footers};

pub fn compose_batch(
    records: &[RecordView],
    config: &ExportConfig,
    images: &mut ImageResolver<'_>,
    generated_at: DateTime<Utc>,
) -> Result<Document, ExportError> {
    config.geometry.validate()?;
    let geometry = config.geometry;
    let mut flow = PageFlow::new(geometry);
    let mut renderer = BlockRenderer::new(images);

    renderer.render_all(&mut flow, &title_page_blocks(records, generated_at));

    for record in records {
        flow.force_page_break();
        let first_page = flow.cursor().page_index;
        renderer.render_all(&mut flow, &record_blocks(record, config));
        let last_page = flow.cursor().page_index;

        for page in first_page..=last_page {
            flow.draw_furniture(page, record_footer(&geometry, &record.id));
        }
        log::debug!(
            "record {} laid out on pages {}..={}",
            record.id,
            first_page + 1,
            last_page + 1
        );
    }

    let document = Document {
        geometry,
        title: "Service Requests Export".to_string(),
        pages: flow.finish(),
    };
    Ok(stamp_footers(document, generated_at))
}

fn title_page_blocks(records: &[RecordView], generated_at: DateTime<Utc>) -> Vec<ContentBlock> {
    let mut blocks = vec![
        ContentBlock::heading("Service Requests Export", style::TITLE_SIZE),
        ContentBlock::key_value("Total Requests", Some(records.len().to_string().as_str())),
        ContentBlock::key_value("Generated", Some(format_timestamp(&generated_at).as_str())),
    ];

    let breakdown = status_breakdown(records);
    if !breakdown.is_empty() {
        blocks.push(ContentBlock::Spacer { height: 12.0 });
        blocks.push(ContentBlock::heading("By Status", style::SECTION_HEADING_SIZE));
        for (status, count) in breakdown {
            blocks.push(ContentBlock::key_value(status, Some(count.to_string().as_str())));
        }
    }
    blocks
}

/// Count records per raw status, in order of first appearance.
fn status_breakdown(records: &[RecordView]) -> Vec<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for record in records {
        let status = record.status.trim();
        match counts.iter_mut().find(|(s, _)| *s == status) {
            Some((_, n)) => *n += 1,
            None => counts.push((status, 1)),
        }
    }
    counts
}
