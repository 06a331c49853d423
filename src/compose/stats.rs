//! Platform statistics report: a short header and one boxed panel per
//! breakdown. Panels stay on one page when they can; a panel taller than a
//! page is split into continuation panels.

use chrono::{DateTime, Utc};

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::font::FontContext;
use crate::image_loader::ImageResolver;
use crate::layout::{BlockRenderer, ContentBlock, Document, DrawCommand, PageFlow};
use crate::model::{format_timestamp, present, CountEntry, SummaryStatistics};
use crate::style::{self, Color};

use super::stamp_footers;

const PANEL_PADDING: f64 = 10.0;
const PANEL_RADIUS: f64 = 4.0;
const PANEL_TITLE_SIZE: f64 = 12.0;
const ROW_HEIGHT: f64 = 16.0;

pub fn compose_statistics(
    stats: &SummaryStatistics,
    filter_label: &str,
    config: &ExportConfig,
    images: &mut ImageResolver<'_>,
    generated_at: DateTime<Utc>,
) -> Result<Document, ExportError> {
    config.geometry.validate()?;
    let mut flow = PageFlow::new(config.geometry);
    let mut renderer = BlockRenderer::new(images);

    let filter = present(Some(filter_label)).unwrap_or("All");
    renderer.render_all(
        &mut flow,
        &[
            ContentBlock::heading("Platform Reports", style::TITLE_SIZE),
            ContentBlock::key_value("Filter", Some(filter)),
            ContentBlock::key_value("Period", stats.period_label.as_deref()),
            ContentBlock::key_value("Generated", Some(format_timestamp(&generated_at).as_str())),
            ContentBlock::Spacer { height: 12.0 },
        ],
    );

    let overview = [CountEntry::new("Total Requests", stats.total_requests)];
    let panels: [(&str, &[CountEntry]); 4] = [
        ("Overview", &overview),
        ("Requests by Status", &stats.status_breakdown),
        ("Requests by Category", &stats.category_breakdown),
        ("Top Handlers", &stats.top_handlers),
    ];
    let fonts = renderer.fonts().clone();
    for (title, rows) in panels {
        draw_panel(&mut flow, &fonts, title, rows);
    }

    let document = Document {
        geometry: config.geometry,
        title: "Platform Reports".to_string(),
        pages: flow.finish(),
    };
    Ok(stamp_footers(document, generated_at))
}

fn title_line_height() -> f64 {
    PANEL_TITLE_SIZE * style::HEADING_LINE_FACTOR
}

/// Height of a panel holding `rows` rows (an empty panel shows one
/// placeholder row).
pub fn panel_height(rows: usize) -> f64 {
    2.0 * PANEL_PADDING + title_line_height() + ROW_HEIGHT * rows.max(1) as f64
}

fn draw_panel(flow: &mut PageFlow, fonts: &FontContext, title: &str, rows: &[CountEntry]) {
    let mut remaining = rows;
    let mut heading = title.to_string();

    loop {
        flow.ensure_space(panel_height(remaining.len()));

        let chrome = panel_height(0) - ROW_HEIGHT;
        let capacity = ((flow.remaining() - chrome) / ROW_HEIGHT).floor().max(1.0) as usize;
        let take = capacity.min(remaining.len());
        let (chunk, rest) = remaining.split_at(take);

        draw_panel_chunk(flow, fonts, &heading, chunk);
        flow.gap(style::BLOCK_SPACING * 1.5);

        if rest.is_empty() {
            break;
        }
        log::debug!("panel {:?} continues with {} row(s)", title, rest.len());
        remaining = rest;
        heading = format!("{} (continued)", title);
    }
}

fn draw_panel_chunk(flow: &mut PageFlow, fonts: &FontContext, title: &str, rows: &[CountEntry]) {
    let x = flow.content_x();
    let y = flow.y();
    let width = flow.content_width();
    let height = panel_height(rows.len());

    flow.draw(DrawCommand::Rect {
        x,
        y,
        width,
        height,
        radius: PANEL_RADIUS,
        fill: Some(Color::PANEL),
        stroke: Some(Color::RULE),
    });

    let inner_x = x + PANEL_PADDING;
    let inner_width = width - 2.0 * PANEL_PADDING;
    let mut row_y = y + PANEL_PADDING;
    flow.draw(text(inner_x, row_y, title_line_height(), PANEL_TITLE_SIZE, title, true, Color::INK));
    row_y += title_line_height();

    if rows.is_empty() {
        flow.draw(text(inner_x, row_y, ROW_HEIGHT, style::BODY_SIZE, "No data", false, Color::MUTED));
    }
    for row in rows {
        let count = row.count.to_string();
        let count_width = fonts.measure_string(&count, true, style::BODY_SIZE);
        let label_room = (inner_width - count_width - 12.0).max(0.0);
        let label = fit_to_width(fonts, &row.label, style::BODY_SIZE, label_room);

        flow.draw(text(inner_x, row_y, ROW_HEIGHT, style::BODY_SIZE, &label, false, Color::BLACK));
        flow.draw(text(
            inner_x + inner_width - count_width,
            row_y,
            ROW_HEIGHT,
            style::BODY_SIZE,
            &count,
            true,
            Color::BLACK,
        ));
        row_y += ROW_HEIGHT;
    }

    flow.advance(height);
}

fn text(x: f64, y: f64, line_height: f64, size: f64, content: &str, bold: bool, color: Color) -> DrawCommand {
    DrawCommand::Text {
        x,
        y,
        line_height,
        size,
        text: content.to_string(),
        bold,
        color,
        link: None,
    }
}

/// Cut `label` with a trailing "..." so it fits in `max_width`.
fn fit_to_width(fonts: &FontContext, label: &str, size: f64, max_width: f64) -> String {
    if fonts.measure_string(label, false, size) <= max_width {
        return label.to_string();
    }
    let budget = max_width - fonts.measure_string("...", false, size);
    let mut out = String::new();
    let mut width = 0.0;
    for ch in label.chars() {
        let w = fonts.char_width(ch, false, size);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(ch);
    }
    format!("{}...", out.trim_end())
}
