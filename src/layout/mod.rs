//! # Page-Native Layout
//!
//! Reports are laid out directly onto pages of known size. There is no
//! infinite canvas that gets sliced afterwards: before anything that
//! advances the write position is drawn, the flow is asked whether it fits,
//! and a new page is opened first if it does not.
//!
//! - [`flow`] owns the page list and the cursor, and is the only place a
//!   page break is decided.
//! - [`blocks`] turns one [`ContentBlock`](blocks::ContentBlock) into draw
//!   commands on the flow.
//!
//! The output is a [`Document`]: a list of [`RenderedPage`]s, each holding
//! positioned [`DrawCommand`]s in top-left page coordinates. The PDF writer
//! flips y when it serializes.

pub mod blocks;
pub mod flow;

use std::sync::Arc;

use crate::image_loader::LoadedImage;
use crate::model::PageGeometry;
use crate::style::Color;

pub use blocks::{BlockRenderer, ContentBlock};
pub use flow::{Cursor, PageFlow};

/// What to draw, where. Coordinates are points from the top-left corner.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// One line of text. `y` is the top of a line box `line_height` tall.
    Text {
        x: f64,
        y: f64,
        line_height: f64,
        size: f64,
        text: String,
        bold: bool,
        color: Color,
        /// Target of a URI link annotation over the line.
        link: Option<String>,
    },
    /// Rectangle, optionally rounded, filled and/or stroked.
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radius: f64,
        fill: Option<Color>,
        stroke: Option<Color>,
    },
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        image: Arc<LoadedImage>,
    },
}

impl DrawCommand {
    pub fn top(&self) -> f64 {
        match self {
            DrawCommand::Text { y, .. } | DrawCommand::Rect { y, .. } | DrawCommand::Image { y, .. } => *y,
        }
    }

    pub fn bottom(&self) -> f64 {
        match self {
            DrawCommand::Text { y, line_height, .. } => y + line_height,
            DrawCommand::Rect { y, height, .. } | DrawCommand::Image { y, height, .. } => y + height,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            DrawCommand::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// A fully laid-out page ready for PDF serialization.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub index: usize,
    pub width: f64,
    pub height: f64,
    /// Flow content, placed through the flow's space checks.
    pub commands: Vec<DrawCommand>,
    /// Marks in the bottom margin that do not take part in the flow
    /// (record footers, page numbers).
    pub furniture: Vec<DrawCommand>,
}

impl RenderedPage {
    pub fn new(index: usize, geometry: &PageGeometry) -> Self {
        Self {
            index,
            width: geometry.width,
            height: geometry.height,
            commands: Vec::new(),
            furniture: Vec::new(),
        }
    }

    /// Text of every flow line on the page, in draw order.
    pub fn text_lines(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(DrawCommand::text)
    }

    pub fn furniture_lines(&self) -> impl Iterator<Item = &str> {
        self.furniture.iter().filter_map(DrawCommand::text)
    }

    /// Draw order for serialization: flow content, then furniture.
    pub fn all_commands(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter().chain(self.furniture.iter())
    }
}

/// Result of one composition run.
#[derive(Debug, Clone)]
pub struct Document {
    pub geometry: PageGeometry,
    pub title: String,
    pub pages: Vec<RenderedPage>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every flow text line across all pages, in order.
    pub fn text_lines(&self) -> Vec<&str> {
        self.pages.iter().flat_map(|p| p.text_lines()).collect()
    }
}
