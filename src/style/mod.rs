//! # Colors and Report Typography
//!
//! The report engine has no style cascade: every block carries the few
//! visual properties it needs. This module holds the shared color type, the
//! fixed status palette, and the typographic constants the composers use.

use serde::{Deserialize, Serialize};

/// An RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
    /// Body text gray used for secondary lines.
    pub const MUTED: Color = Color {
        r: 0.4,
        g: 0.4,
        b: 0.45,
    };
    /// Light fill behind statistics panels.
    pub const PANEL: Color = Color {
        r: 0.96,
        g: 0.97,
        b: 0.98,
    };
    /// Border stroke for statistics panels.
    pub const RULE: Color = Color {
        r: 0.82,
        g: 0.84,
        b: 0.87,
    };

    /// Section headings.
    pub const INK: Color = Color {
        r: 0.12,
        g: 0.16,
        b: 0.23,
    };
    /// Text carrying a link annotation.
    pub const LINK: Color = Color {
        r: 0.15,
        g: 0.39,
        b: 0.92,
    };

    /// Build a color from 8-bit channels.
    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Badge fill for statuses that are not in the palette.
pub const NEUTRAL_STATUS: Color = Color {
    r: 0.42,
    g: 0.45,
    b: 0.50,
};

/// Pick the badge fill for a raw status string.
///
/// Matching ignores case and treats spaces and hyphens as underscores, so
/// `"In Progress"`, `"in-progress"` and `"IN_PROGRESS"` share a color.
pub fn status_color(status: &str) -> Color {
    let key: String = status
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect();

    match key.as_str() {
        "pending" | "open" | "new" => Color::rgb8(245, 158, 11),
        "accepted" | "assigned" => Color::rgb8(59, 130, 246),
        "in_progress" | "ongoing" => Color::rgb8(139, 92, 246),
        "completed" | "resolved" | "closed" => Color::rgb8(34, 197, 94),
        "rejected" | "cancelled" | "canceled" | "declined" => Color::rgb8(239, 68, 68),
        _ => NEUTRAL_STATUS,
    }
}

// ── Typography ─────────────────────────────────────────────────

pub const TITLE_SIZE: f64 = 20.0;
pub const SECTION_HEADING_SIZE: f64 = 14.0;
pub const BODY_SIZE: f64 = 10.5;
pub const BODY_LINE_HEIGHT: f64 = 15.0;
pub const FOOTER_SIZE: f64 = 8.0;
/// Headings use this multiple of their font size as line height.
pub const HEADING_LINE_FACTOR: f64 = 1.4;
pub const FOOTER_LINE_HEIGHT: f64 = FOOTER_SIZE * HEADING_LINE_FACTOR;
/// The bottom margin holds two footer lines.
pub const MIN_MARGIN: f64 = 2.0 * FOOTER_LINE_HEIGHT;
/// Tallest block that is never split: a statistics panel with one row.
pub const MIN_USABLE_HEIGHT: f64 = 56.0;
/// Vertical gap after images, badges, and sections.
pub const BLOCK_SPACING: f64 = 8.0;
pub const BADGE_WIDTH: f64 = 120.0;
pub const BADGE_HEIGHT: f64 = 22.0;
pub const BADGE_RADIUS: f64 = 6.0;
/// File names longer than this many characters are cut and get "...".
pub const FILE_NAME_MAX_CHARS: usize = 50;
