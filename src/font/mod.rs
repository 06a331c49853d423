//! # Font Management
//!
//! Text measurement for the single font family the reports use: the
//! standard PDF Helvetica faces, which need no embedding. The PDF writer
//! references them by name and the layout measures them with AFM widths.

pub mod metrics;

pub use metrics::StandardFontMetrics;

/// The two standard faces the reports draw with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub fn for_weight(bold: bool) -> Self {
        if bold {
            Self::HelveticaBold
        } else {
            Self::Helvetica
        }
    }

    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    pub fn metrics(&self) -> StandardFontMetrics {
        match self {
            Self::Helvetica => StandardFontMetrics::HELVETICA,
            Self::HelveticaBold => StandardFontMetrics::HELVETICA_BOLD,
        }
    }
}

/// Shared font context used by layout and PDF serialization.
///
/// Stateless today; it exists so measurement has one entry point the layout
/// code can be handed, the way a real text backend would be.
#[derive(Debug, Default, Clone)]
pub struct FontContext;

impl FontContext {
    pub fn new() -> Self {
        Self
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, bold: bool, font_size: f64) -> f64 {
        StandardFont::for_weight(bold)
            .metrics()
            .char_width(ch, font_size)
    }

    /// Measure the width of a string in points.
    pub fn measure_string(&self, text: &str, bold: bool, font_size: f64) -> f64 {
        StandardFont::for_weight(bold)
            .metrics()
            .measure_string(text, font_size)
    }
}
