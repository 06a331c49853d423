//! # Text Layout
//!
//! Line breaking and text measurement.
//!
//! Wrapping is greedy over UAX#14 break opportunities and uses the
//! Helvetica metrics from [`FontContext`], so the same input always yields
//! the same line sequence.

use crate::font::FontContext;
use unicode_linebreak::{linebreaks, BreakOpportunity};

pub struct TextLayout;

impl Default for TextLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayout {
    pub fn new() -> Self {
        Self
    }

    /// Break `text` into lines that fit within `max_width`.
    ///
    /// Empty or whitespace-only input yields no lines. Newlines are
    /// mandatory breaks and interior blank lines are kept as empty strings.
    /// A word wider than `max_width` is split at character boundaries.
    /// Returned lines carry no trailing whitespace.
    pub fn wrap(
        &self,
        font_context: &FontContext,
        text: &str,
        font_size: f64,
        bold: bool,
        max_width: f64,
    ) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let measure = |s: &str| font_context.measure_string(s, bold, font_size);

        let mut lines = Vec::new();
        for paragraph in normalized.split('\n') {
            let paragraph = paragraph.trim_end();
            if paragraph.is_empty() {
                lines.push(String::new());
                continue;
            }
            self.wrap_paragraph(paragraph, max_width, &measure, &mut lines);
        }
        lines
    }

    fn wrap_paragraph(
        &self,
        paragraph: &str,
        max_width: f64,
        measure: &dyn Fn(&str) -> f64,
        lines: &mut Vec<String>,
    ) {
        let mut line = String::new();
        let mut segment_start = 0;

        for (offset, opportunity) in linebreaks(paragraph) {
            let segment = &paragraph[segment_start..offset];
            segment_start = offset;

            let candidate = format!("{}{}", line, segment);
            if measure(candidate.trim_end()) <= max_width {
                line = candidate;
            } else if line.trim_end().is_empty() {
                // Segment alone is too wide: split it by characters.
                line = self.force_break(segment, max_width, measure, lines);
            } else {
                lines.push(line.trim_end().to_string());
                line = if measure(segment.trim_end()) <= max_width {
                    segment.to_string()
                } else {
                    self.force_break(segment, max_width, measure, lines)
                };
            }

            if opportunity == BreakOpportunity::Mandatory && offset < paragraph.len() {
                lines.push(line.trim_end().to_string());
                line.clear();
            }
        }

        let rest = line.trim_end();
        if !rest.is_empty() {
            lines.push(rest.to_string());
        }
    }

    /// Emit full-width pieces of `segment` and return the unfinished tail.
    fn force_break(
        &self,
        segment: &str,
        max_width: f64,
        measure: &dyn Fn(&str) -> f64,
        lines: &mut Vec<String>,
    ) -> String {
        let mut piece = String::new();
        for ch in segment.chars() {
            piece.push(ch);
            if measure(piece.trim_end()) > max_width && piece.chars().count() > 1 {
                piece.pop();
                lines.push(piece.trim_end().to_string());
                piece.clear();
                piece.push(ch);
            }
        }
        piece
    }
}
