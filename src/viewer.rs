//! Fullscreen viewer state machine.
//!
//! ```text
//! Closed ──open──▶ Open { page, zoom, overlay, bookmarks } ──close / Escape──▶ Closed
//! ```
//!
//! While open, paging and zoom are clamped: stepping past either end is a
//! no-op, never an error and never a wraparound. Zoom is kept as an integer
//! percentage so any number of steps lands exactly on the bounds.
//!
//! Bookmarks live only as long as the viewer is open.

use crate::config::ViewerConfig;
use std::collections::BTreeSet;

/// Side panel shown next to the page. At most one is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overlay {
    #[default]
    None,
    Thumbnails,
    Contents,
}

/// Keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Plus,
    Minus,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerState {
    Closed,
    Open {
        page: usize,
        zoom_pct: u32,
        overlay: Overlay,
        bookmarks: BTreeSet<usize>,
    },
}

/// Zoom bounds in whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    pub min_pct: u32,
    pub max_pct: u32,
    pub step_pct: u32,
}

impl ZoomRange {
    pub fn from_config(config: &ViewerConfig) -> Self {
        let pct = |v: f32| (v * 100.0).round().max(1.0) as u32;
        let min_pct = pct(config.zoom_min);
        Self {
            min_pct,
            max_pct: pct(config.zoom_max).max(min_pct),
            step_pct: pct(config.zoom_step),
        }
    }

    fn clamp(&self, pct: u32) -> u32 {
        pct.clamp(self.min_pct, self.max_pct)
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct Viewer {
    page_count: usize,
    range: ZoomRange,
    state: ViewerState,
}

impl Viewer {
    pub fn new(page_count: usize, range: ZoomRange) -> Self {
        Self {
            page_count,
            range,
            state: ViewerState::Closed,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ViewerState::Open { .. })
    }

    /// Current page index while open.
    pub fn page(&self) -> Option<usize> {
        match &self.state {
            ViewerState::Open { page, .. } => Some(*page),
            ViewerState::Closed => None,
        }
    }

    /// Current zoom factor while open.
    pub fn zoom(&self) -> Option<f32> {
        match &self.state {
            ViewerState::Open { zoom_pct, .. } => Some(*zoom_pct as f32 / 100.0),
            ViewerState::Closed => None,
        }
    }

    pub fn overlay(&self) -> Option<Overlay> {
        match &self.state {
            ViewerState::Open { overlay, .. } => Some(*overlay),
            ViewerState::Closed => None,
        }
    }

    pub fn bookmarks(&self) -> Option<&BTreeSet<usize>> {
        match &self.state {
            ViewerState::Open { bookmarks, .. } => Some(bookmarks),
            ViewerState::Closed => None,
        }
    }

    /// Open at the first page, zoom 1.0, no overlay.
    pub fn open(&mut self) {
        self.open_at(0);
    }

    /// Open at `page` (clamped). An empty document has nothing to show and
    /// stays closed.
    pub fn open_at(&mut self, page: usize) {
        if self.page_count == 0 {
            return;
        }
        self.state = ViewerState::Open {
            page: page.min(self.page_count - 1),
            zoom_pct: self.range.clamp(100),
            overlay: Overlay::None,
            bookmarks: BTreeSet::new(),
        };
    }

    pub fn close(&mut self) {
        self.state = ViewerState::Closed;
    }

    /// The document changed length: keep the current page in range.
    pub fn set_page_count(&mut self, page_count: usize) {
        self.page_count = page_count;
        if page_count == 0 {
            self.close();
            return;
        }
        if let ViewerState::Open {
            page, bookmarks, ..
        } = &mut self.state
        {
            *page = (*page).min(page_count - 1);
            bookmarks.retain(|&b| b < page_count);
        }
    }

    /// Returns whether the page changed.
    pub fn next(&mut self) -> bool {
        let last = self.page_count.saturating_sub(1);
        self.move_page(|page| (page < last).then_some(page + 1))
    }

    /// Returns whether the page changed.
    pub fn prev(&mut self) -> bool {
        self.move_page(|page| page.checked_sub(1))
    }

    /// Jump to `index`, clamped to the last page.
    pub fn jump_to(&mut self, index: usize) -> bool {
        let last = self.page_count.saturating_sub(1);
        self.move_page(|page| {
            let target = index.min(last);
            (target != page).then_some(target)
        })
    }

    fn move_page(&mut self, target: impl FnOnce(usize) -> Option<usize>) -> bool {
        match &mut self.state {
            ViewerState::Open { page, .. } => match target(*page) {
                Some(next) => {
                    *page = next;
                    true
                }
                None => false,
            },
            ViewerState::Closed => false,
        }
    }

    /// Returns whether the zoom changed.
    pub fn zoom_in(&mut self) -> bool {
        let range = self.range;
        self.change_zoom(|pct| range.clamp(pct + range.step_pct))
    }

    /// Returns whether the zoom changed.
    pub fn zoom_out(&mut self) -> bool {
        let range = self.range;
        self.change_zoom(|pct| range.clamp(pct.saturating_sub(range.step_pct)))
    }

    fn change_zoom(&mut self, f: impl FnOnce(u32) -> u32) -> bool {
        match &mut self.state {
            ViewerState::Open { zoom_pct, .. } => {
                let next = f(*zoom_pct);
                let changed = next != *zoom_pct;
                *zoom_pct = next;
                changed
            }
            ViewerState::Closed => false,
        }
    }

    /// Show `overlay`, hiding the other one. Toggling the visible overlay hides it.
    pub fn toggle_overlay(&mut self, which: Overlay) {
        if let ViewerState::Open { overlay, .. } = &mut self.state {
            *overlay = if *overlay == which {
                Overlay::None
            } else {
                which
            };
        }
    }

    /// Add or remove the current page from the bookmarks. Returns whether the
    /// page is bookmarked afterwards.
    pub fn toggle_bookmark(&mut self) -> bool {
        match &mut self.state {
            ViewerState::Open {
                page, bookmarks, ..
            } => {
                if bookmarks.remove(page) {
                    false
                } else {
                    bookmarks.insert(*page);
                    true
                }
            }
            ViewerState::Closed => false,
        }
    }

    /// Keyboard bindings. Ignored while closed.
    pub fn handle_key(&mut self, key: Key) {
        if !self.is_open() {
            return;
        }
        match key {
            Key::ArrowLeft => {
                self.prev();
            }
            Key::ArrowRight => {
                self.next();
            }
            Key::Plus => {
                self.zoom_in();
            }
            Key::Minus => {
                self.zoom_out();
            }
            Key::Escape => self.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_viewer(pages: usize) -> Viewer {
        let mut viewer = Viewer::new(pages, ZoomRange::default());
        viewer.open();
        viewer
    }

    #[test]
    fn starts_closed() {
        let viewer = Viewer::new(4, ZoomRange::default());
        assert!(!viewer.is_open());
        assert_eq!(viewer.page(), None);
        assert_eq!(viewer.zoom(), None);
    }

    #[test]
    fn next_clamps_at_last_page() {
        let mut viewer = open_viewer(4);
        assert!(viewer.next());
        assert!(viewer.next());
        assert!(viewer.next());
        assert_eq!(viewer.page(), Some(3));
        assert!(!viewer.next());
        assert_eq!(viewer.page(), Some(3));
    }

    #[test]
    fn prev_clamps_at_first_page() {
        let mut viewer = open_viewer(4);
        assert!(!viewer.prev());
        assert_eq!(viewer.page(), Some(0));
    }

    #[test]
    fn zoom_stays_in_bounds() {
        let mut viewer = open_viewer(1);
        for _ in 0..50 {
            viewer.zoom_in();
        }
        assert_eq!(viewer.zoom(), Some(2.0));
        assert!(!viewer.zoom_in());
        for _ in 0..50 {
            viewer.zoom_out();
        }
        assert_eq!(viewer.zoom(), Some(0.5));
        assert!(!viewer.zoom_out());
    }

    #[test]
    fn zoom_steps_are_exact() {
        let mut viewer = open_viewer(1);
        for _ in 0..3 {
            viewer.zoom_in();
        }
        assert_eq!(viewer.zoom(), Some(1.3));
    }

    #[test]
    fn overlays_are_exclusive() {
        let mut viewer = open_viewer(4);
        viewer.toggle_overlay(Overlay::Thumbnails);
        assert_eq!(viewer.overlay(), Some(Overlay::Thumbnails));
        viewer.toggle_overlay(Overlay::Contents);
        assert_eq!(viewer.overlay(), Some(Overlay::Contents));
        viewer.toggle_overlay(Overlay::Contents);
        assert_eq!(viewer.overlay(), Some(Overlay::None));
    }

    #[test]
    fn jump_is_clamped() {
        let mut viewer = open_viewer(4);
        assert!(viewer.jump_to(2));
        assert_eq!(viewer.page(), Some(2));
        assert!(viewer.jump_to(100));
        assert_eq!(viewer.page(), Some(3));
        assert!(!viewer.jump_to(3));
    }

    #[test]
    fn bookmarks_toggle() {
        let mut viewer = open_viewer(4);
        viewer.next();
        assert!(viewer.toggle_bookmark());
        assert!(viewer.bookmarks().unwrap().contains(&1));
        assert!(!viewer.toggle_bookmark());
        assert!(viewer.bookmarks().unwrap().is_empty());
    }

    #[test]
    fn reopening_clears_bookmarks() {
        let mut viewer = open_viewer(4);
        viewer.toggle_bookmark();
        viewer.close();
        viewer.open();
        assert!(viewer.bookmarks().unwrap().is_empty());
    }

    #[test]
    fn keys_only_act_while_open() {
        let mut viewer = Viewer::new(4, ZoomRange::default());
        viewer.handle_key(Key::ArrowRight);
        assert_eq!(viewer.state(), &ViewerState::Closed);

        viewer.open();
        viewer.handle_key(Key::ArrowRight);
        viewer.handle_key(Key::Plus);
        assert_eq!(viewer.page(), Some(1));
        assert_eq!(viewer.zoom(), Some(1.1));
        viewer.handle_key(Key::ArrowLeft);
        viewer.handle_key(Key::Minus);
        assert_eq!(viewer.page(), Some(0));
        assert_eq!(viewer.zoom(), Some(1.0));
        viewer.handle_key(Key::Escape);
        assert!(!viewer.is_open());
    }

    #[test]
    fn empty_document_never_opens() {
        let mut viewer = Viewer::new(0, ZoomRange::default());
        viewer.open();
        assert!(!viewer.is_open());
    }

    #[test]
    fn shrinking_document_clamps_page() {
        let mut viewer = open_viewer(5);
        viewer.jump_to(4);
        viewer.toggle_bookmark();
        viewer.set_page_count(3);
        assert_eq!(viewer.page(), Some(2));
        assert!(viewer.bookmarks().unwrap().is_empty());
    }

    #[test]
    fn zoom_range_from_config() {
        let range = ZoomRange::from_config(&ViewerConfig {
            zoom_min: 0.25,
            zoom_max: 3.0,
            zoom_step: 0.25,
        });
        assert_eq!(
            range,
            ZoomRange {
                min_pct: 25,
                max_pct: 300,
                step_pct: 25
            }
        );
    }
}
