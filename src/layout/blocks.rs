//! Content blocks and the renderer that places them on a [`PageFlow`].
//!
//! Each block asks the flow for space before it draws. Text is checked line
//! by line; key/value lines, file entries, badges, and images are atomic.

use crate::font::FontContext;
use crate::image_loader::{scale_to_fit, ImageResolution, ImageResolver};
use crate::model::display_or_fallback;
use crate::style::{self, Color};
use crate::text::TextLayout;

use super::{DrawCommand, PageFlow};

/// One unit of report content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Bold text with `line_height = size * 1.4`.
    Heading { text: String, size: f64 },
    Paragraph {
        text: String,
        size: f64,
        line_height: f64,
        color: Color,
    },
    /// `"{label}: {value}"`, with the fallback literal for an absent value.
    KeyValueLine { label: String, value: Option<String> },
    Image {
        source_url: String,
        max_width: f64,
        max_height: f64,
    },
    /// Numbered attachment line linking to `url`.
    FileListEntry {
        ordinal: usize,
        display_name: String,
        url: String,
    },
    StatusBadge { text: String, fill: Color },
    /// Break the page now unless `required_space` still fits.
    SectionBreak { required_space: f64 },
    /// Vertical whitespace that never triggers a page break.
    Spacer { height: f64 },
}

impl ContentBlock {
    pub fn heading(text: impl Into<String>, size: f64) -> Self {
        ContentBlock::Heading {
            text: text.into(),
            size,
        }
    }

    /// Body-size paragraph in the default color.
    pub fn paragraph(text: impl Into<String>) -> Self {
        ContentBlock::Paragraph {
            text: text.into(),
            size: style::BODY_SIZE,
            line_height: style::BODY_LINE_HEIGHT,
            color: Color::BLACK,
        }
    }

    pub fn key_value(label: impl Into<String>, value: Option<&str>) -> Self {
        ContentBlock::KeyValueLine {
            label: label.into(),
            value: value.map(str::to_string),
        }
    }

    pub fn image(source_url: impl Into<String>, max_width: f64, max_height: f64) -> Self {
        ContentBlock::Image {
            source_url: source_url.into(),
            max_width,
            max_height,
        }
    }

    pub fn section_break(required_space: f64) -> Self {
        ContentBlock::SectionBreak { required_space }
    }
}

/// Draws blocks onto a flow. Holds the per-export image resolver, so every
/// block of one export shares the same image cache.
pub struct BlockRenderer<'a, 'f> {
    fonts: FontContext,
    text: TextLayout,
    images: &'a mut ImageResolver<'f>,
}

impl<'a, 'f> BlockRenderer<'a, 'f> {
    pub fn new(images: &'a mut ImageResolver<'f>) -> Self {
        Self {
            fonts: FontContext::new(),
            text: TextLayout::new(),
            images,
        }
    }

    pub fn fonts(&self) -> &FontContext {
        &self.fonts
    }

    /// Wrap `text` the same way [`render`](Self::render) would.
    pub fn wrap(&self, text: &str, size: f64, bold: bool, max_width: f64) -> Vec<String> {
        self.text.wrap(&self.fonts, text, size, bold, max_width)
    }

    pub fn render_all(&mut self, flow: &mut PageFlow, blocks: &[ContentBlock]) {
        for block in blocks {
            self.render(flow, block);
        }
    }

    pub fn render(&mut self, flow: &mut PageFlow, block: &ContentBlock) {
        match block {
            ContentBlock::Heading { text, size } => {
                let lines = self.wrap(text, *size, true, flow.content_width());
                let style = LineStyle {
                    size: *size,
                    line_height: size * style::HEADING_LINE_FACTOR,
                    bold: true,
                    color: Color::INK,
                    link: None,
                };
                draw_lines(flow, &lines, &style, false);
            }
            ContentBlock::Paragraph {
                text,
                size,
                line_height,
                color,
            } => {
                let lines = self.wrap(text, *size, false, flow.content_width());
                let style = LineStyle {
                    size: *size,
                    line_height: *line_height,
                    bold: false,
                    color: *color,
                    link: None,
                };
                draw_lines(flow, &lines, &style, false);
            }
            ContentBlock::KeyValueLine { label, value } => {
                let line = format!("{}: {}", label, display_or_fallback(value.as_deref()));
                let lines = self.wrap(&line, style::BODY_SIZE, false, flow.content_width());
                draw_lines(flow, &lines, &LineStyle::body(), true);
            }
            ContentBlock::Image {
                source_url,
                max_width,
                max_height,
            } => self.render_image(flow, source_url, *max_width, *max_height),
            ContentBlock::FileListEntry {
                ordinal,
                display_name,
                url,
            } => {
                let line = format!("{}. {}", ordinal, file_label(display_name));
                let lines = self.wrap(&line, style::BODY_SIZE, false, flow.content_width());
                let style = LineStyle {
                    color: Color::LINK,
                    link: Some(url.clone()),
                    ..LineStyle::body()
                };
                draw_lines(flow, &lines, &style, true);
            }
            ContentBlock::StatusBadge { text, fill } => self.render_badge(flow, text, *fill),
            ContentBlock::SectionBreak { required_space } => {
                flow.ensure_space(*required_space);
            }
            ContentBlock::Spacer { height } => flow.gap(*height),
        }
    }

    fn render_image(&mut self, flow: &mut PageFlow, source: &str, max_width: f64, max_height: f64) {
        let image = match self.images.resolve(source) {
            ImageResolution::Ready(image) => image,
            ImageResolution::Skipped(_) => return,
        };

        let geometry = *flow.geometry();
        let max_w = max_width.min(geometry.content_width());
        let max_h = max_height.min(geometry.usable_height());
        let (width, height) = scale_to_fit(
            image.width_px as f64,
            image.height_px as f64,
            max_w,
            max_h,
        );

        flow.ensure_space(height + style::BLOCK_SPACING);
        flow.draw(DrawCommand::Image {
            x: flow.content_x(),
            y: flow.y(),
            width,
            height,
            image,
        });
        flow.advance(height + style::BLOCK_SPACING);
    }

    fn render_badge(&mut self, flow: &mut PageFlow, text: &str, fill: Color) {
        let label_size = 10.0;
        let label_width = self.fonts.measure_string(text, true, label_size);
        let width = style::BADGE_WIDTH
            .max(label_width + 24.0)
            .min(flow.content_width());

        flow.ensure_space(style::BADGE_HEIGHT + style::BLOCK_SPACING);
        let (x, y) = (flow.content_x(), flow.y());
        flow.draw(DrawCommand::Rect {
            x,
            y,
            width,
            height: style::BADGE_HEIGHT,
            radius: style::BADGE_RADIUS,
            fill: Some(fill),
            stroke: None,
        });
        flow.draw(DrawCommand::Text {
            x: x + ((width - label_width) / 2.0).max(0.0),
            y,
            line_height: style::BADGE_HEIGHT,
            size: label_size,
            text: text.to_string(),
            bold: true,
            color: Color::WHITE,
            link: None,
        });
        flow.advance(style::BADGE_HEIGHT + style::BLOCK_SPACING);
    }
}

struct LineStyle {
    size: f64,
    line_height: f64,
    bold: bool,
    color: Color,
    link: Option<String>,
}

impl LineStyle {
    fn body() -> Self {
        Self {
            size: style::BODY_SIZE,
            line_height: style::BODY_LINE_HEIGHT,
            bold: false,
            color: Color::BLACK,
            link: None,
        }
    }
}

/// Draw pre-wrapped lines. With `atomic`, the whole group is space-checked
/// once so it stays on one page; a group taller than a page falls back to
/// per-line checks.
fn draw_lines(flow: &mut PageFlow, lines: &[String], style: &LineStyle, atomic: bool) {
    if lines.is_empty() {
        return;
    }
    let total = style.line_height * lines.len() as f64;
    let grouped = atomic && total <= flow.geometry().usable_height();
    if grouped {
        flow.ensure_space(total);
    }

    for line in lines {
        if !grouped {
            flow.ensure_space(style.line_height);
        }
        if !line.is_empty() {
            flow.draw(DrawCommand::Text {
                x: flow.content_x(),
                y: flow.y(),
                line_height: style.line_height,
                size: style.size,
                text: line.clone(),
                bold: style.bold,
                color: style.color,
                link: style.link.clone(),
            });
        }
        flow.advance(style.line_height);
    }
}

/// Percent-decode a file name and cut it to the display limit.
pub fn file_label(name: &str) -> String {
    let decoded = urlencoding::decode(name)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| name.to_string());
    truncate_chars(&decoded, style::FILE_NAME_MAX_CHARS)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
