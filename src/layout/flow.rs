//! The page flow: page list plus write cursor.
//!
//! [`PageFlow::ensure_space`] is the single place a flow page break is
//! decided. Every block asks it before drawing anything that advances the
//! cursor, so no flow command ever ends below `height - margin`.

use crate::model::PageGeometry;

use super::{DrawCommand, RenderedPage};

const EPSILON: f64 = 1e-6;

/// Current write position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub page_index: usize,
    pub y: f64,
}

pub struct PageFlow {
    geometry: PageGeometry,
    cursor: Cursor,
    pages: Vec<RenderedPage>,
}

impl PageFlow {
    /// Open a flow with one empty page. `geometry` is expected to be
    /// validated already.
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            cursor: Cursor {
                page_index: 0,
                y: geometry.margin,
            },
            pages: vec![RenderedPage::new(0, &geometry)],
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn y(&self) -> f64 {
        self.cursor.y
    }

    pub fn content_x(&self) -> f64 {
        self.geometry.margin
    }

    pub fn content_width(&self) -> f64 {
        self.geometry.content_width()
    }

    /// Space left above the bottom margin on the current page.
    pub fn remaining(&self) -> f64 {
        (self.geometry.content_bottom() - self.cursor.y).max(0.0)
    }

    /// Nothing has advanced the cursor on the current page yet.
    pub fn at_page_top(&self) -> bool {
        self.cursor.y <= self.geometry.margin + EPSILON
    }

    /// Open a new page if `required` points do not fit below the cursor.
    /// Returns whether a page was added.
    ///
    /// A page that is still empty is never abandoned: content taller than
    /// the usable height gets no better by moving.
    pub fn ensure_space(&mut self, required: f64) -> bool {
        if self.cursor.y + required <= self.geometry.content_bottom() + EPSILON {
            return false;
        }
        if self.at_page_top() {
            return false;
        }
        log::debug!(
            "page break before {:.1}pt block at y={:.1} on page {}",
            required,
            self.cursor.y,
            self.cursor.page_index + 1
        );
        self.push_page();
        true
    }

    /// Start a new page unless the current one is still empty.
    pub fn force_page_break(&mut self) -> bool {
        if self.at_page_top() {
            return false;
        }
        self.push_page();
        true
    }

    fn push_page(&mut self) {
        let index = self.pages.len();
        self.pages.push(RenderedPage::new(index, &self.geometry));
        self.cursor = Cursor {
            page_index: index,
            y: self.geometry.margin,
        };
    }

    /// Add a flow command to the current page. The caller has already
    /// reserved its space.
    pub fn draw(&mut self, command: DrawCommand) {
        self.current_page_mut().commands.push(command);
    }

    /// Add a bottom-margin mark to the page at `page_index`.
    pub fn draw_furniture(&mut self, page_index: usize, command: DrawCommand) {
        if let Some(page) = self.pages.get_mut(page_index) {
            page.furniture.push(command);
        }
    }

    pub fn advance(&mut self, dy: f64) {
        self.cursor.y += dy;
    }

    /// Vertical gap that never causes a break; it is clipped at the bottom
    /// margin and dropped at the top of a page.
    pub fn gap(&mut self, dy: f64) {
        if self.at_page_top() {
            return;
        }
        self.cursor.y = (self.cursor.y + dy).min(self.geometry.content_bottom());
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[RenderedPage] {
        &self.pages
    }

    pub fn finish(self) -> Vec<RenderedPage> {
        self.pages
    }

    fn current_page_mut(&mut self) -> &mut RenderedPage {
        let idx = self.cursor.page_index;
        &mut self.pages[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> PageGeometry {
        PageGeometry::new(200.0, 300.0, 50.0).unwrap()
    }

    #[test]
    fn fits_without_break() {
        let mut flow = PageFlow::new(small());
        assert!(!flow.ensure_space(200.0));
        assert_eq!(flow.page_count(), 1);
        assert_eq!(flow.y(), 50.0);
    }

    #[test]
    fn overflow_opens_page_and_resets_cursor() {
        let mut flow = PageFlow::new(small());
        flow.advance(150.0);
        assert!(flow.ensure_space(60.0));
        assert_eq!(flow.page_count(), 2);
        assert_eq!(flow.cursor(), Cursor { page_index: 1, y: 50.0 });
    }

    #[test]
    fn exact_fit_does_not_break() {
        let mut flow = PageFlow::new(small());
        flow.advance(100.0);
        assert!(!flow.ensure_space(100.0));
    }

    #[test]
    fn empty_page_is_not_abandoned() {
        let mut flow = PageFlow::new(small());
        assert!(!flow.ensure_space(500.0));
        assert!(!flow.force_page_break());
        assert_eq!(flow.page_count(), 1);

        flow.advance(10.0);
        assert!(flow.force_page_break());
        assert!(!flow.force_page_break());
        assert_eq!(flow.page_count(), 2);
    }

    #[test]
    fn gap_is_clipped_and_skipped_at_top() {
        let mut flow = PageFlow::new(small());
        flow.gap(20.0);
        assert_eq!(flow.y(), 50.0);
        flow.advance(190.0);
        flow.gap(20.0);
        assert_eq!(flow.y(), 250.0);
        assert_eq!(flow.page_count(), 1);
    }

    #[test]
    fn furniture_targets_given_page() {
        let mut flow = PageFlow::new(small());
        flow.advance(10.0);
        flow.force_page_break();
        flow.draw_furniture(
            0,
            DrawCommand::Rect {
                x: 0.0,
                y: 280.0,
                width: 10.0,
                height: 1.0,
                radius: 0.0,
                fill: None,
                stroke: None,
            },
        );
        let pages = flow.finish();
        assert_eq!(pages[0].furniture.len(), 1);
        assert!(pages[1].furniture.is_empty());
    }
}
