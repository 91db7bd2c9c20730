//! Page rendering.
//!
//! Every page renders onto an A4 sheet of fixed pixel size (595×842 CSS px,
//! A4 at 72 dpi). Render modes only change how far that sheet is scaled and
//! where its content comes from:
//!
//! | Mode | Scale | Content source |
//! |---|---|---|
//! | [`RenderMode::EditPreview`] | 0.3 | live draft for the selected page, committed content otherwise |
//! | [`RenderMode::Viewer`] | 0.7 × zoom | committed content |
//! | [`RenderMode::PrintCapture`] | 1.0 | committed content |
//!
//! The sheet keeps its layout size and is shrunk with a CSS transform inside
//! a frame of the scaled size, so text wraps identically at every scale and a
//! print capture looks exactly like the preview.
//!
//! Rendering is pure: a [`Renderer`] borrows the document (and optionally a
//! draft) and produces [Maud](https://maud.lambda.xyz/) markup.
//! [`Renderer::render_viewer`] turns a [`Viewer`] state into one frame of the
//! fullscreen viewer.

use crate::document::{DEFAULT_TOC_PREFIX_LEN, Document};
use crate::layout::{Arrangement, Slot};
use crate::page::{ContentBody, ImageRef, Page, non_empty};
use crate::viewer::{Overlay, Viewer};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::collections::BTreeSet;

const CSS: &str = include_str!("../static/page.css");

/// Scale of the editor's live preview.
pub const EDIT_PREVIEW_SCALE: f32 = 0.3;
/// Scale of the fullscreen viewer at zoom 1.0.
pub const VIEWER_BASE_SCALE: f32 = 0.7;
/// Viewer zoom of the pages in the thumbnail overlay.
pub const THUMBNAIL_ZOOM: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderMode {
    EditPreview,
    Viewer { zoom: f32 },
    PrintCapture,
}

impl RenderMode {
    pub fn scale(&self) -> f32 {
        match self {
            RenderMode::EditPreview => EDIT_PREVIEW_SCALE,
            RenderMode::Viewer { zoom } => VIEWER_BASE_SCALE * zoom,
            RenderMode::PrintCapture => 1.0,
        }
    }

    fn class(&self) -> &'static str {
        match self {
            RenderMode::EditPreview => "edit-preview",
            RenderMode::Viewer { .. } => "viewer",
            RenderMode::PrintCapture => "print-capture",
        }
    }
}

/// Pixel size of an unscaled sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub width: u32,
    pub height: u32,
}

impl PageGeometry {
    /// A4 at 72 dpi.
    pub const A4: PageGeometry = PageGeometry {
        width: 595,
        height: 842,
    };

    fn scaled(&self, scale: f32) -> (u32, u32) {
        (
            (self.width as f32 * scale).round() as u32,
            (self.height as f32 * scale).round() as u32,
        )
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// A single page laid out for print capture.
///
/// `html` is a complete standalone document whose body is exactly
/// `width`×`height` CSS pixels; capture it at `pixel_ratio` device pixels per
/// CSS pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub index: usize,
    pub html: String,
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

pub struct Renderer<'a> {
    document: &'a Document,
    draft: Option<(usize, &'a Page)>,
    geometry: PageGeometry,
    pixel_ratio: f32,
    toc_prefix_len: usize,
}

impl<'a> Renderer<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            draft: None,
            geometry: PageGeometry::A4,
            pixel_ratio: 1.0,
            toc_prefix_len: DEFAULT_TOC_PREFIX_LEN,
        }
    }

    /// Show `page` in place of the committed page at `index` in edit previews.
    pub fn with_draft(mut self, index: usize, page: &'a Page) -> Self {
        self.draft = Some((index, page));
        self
    }

    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f32) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    pub fn with_toc_prefix_len(mut self, len: usize) -> Self {
        self.toc_prefix_len = len;
        self
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    /// The page content a mode shows at `index`.
    pub fn page_source(&self, index: usize, mode: RenderMode) -> Option<&'a Page> {
        match (mode, self.draft) {
            (RenderMode::EditPreview, Some((selected, draft))) if selected == index => {
                Some(draft)
            }
            _ => self.document.page(index),
        }
    }

    /// One framed page. Out-of-range indices render a "No page" sheet.
    pub fn render_page(&self, index: usize, mode: RenderMode) -> Markup {
        let (frame_w, frame_h) = self.geometry.scaled(mode.scale());
        let selected = matches!(
            (mode, self.draft),
            (RenderMode::EditPreview, Some((i, _))) if i == index
        );
        let frame_style = format!("width: {frame_w}px; height: {frame_h}px;");
        let sheet_style = format!(
            "width: {}px; height: {}px; transform: scale({});",
            self.geometry.width,
            self.geometry.height,
            mode.scale()
        );
        let page = self.page_source(index, mode);
        html! {
            div.page.selected[selected] id={ "page-" (index) } data-kind=[page.map(|p| p.kind().to_string())] style=(frame_style) {
                @match page {
                    Some(page) => { (self.sheet(page, &sheet_style)) }
                    None => {
                        div.sheet.no-page style=(sheet_style) {
                            p.placeholder { "No page" }
                        }
                    }
                }
            }
        }
    }

    /// Every page of the document, in order.
    pub fn render_all(&self, mode: RenderMode) -> Markup {
        html! {
            div.pages {
                @for index in 0..self.document.len() {
                    (self.render_page(index, mode))
                }
            }
        }
    }

    /// One frame of the fullscreen viewer: the current page at the viewer's
    /// zoom, the visible overlay and the bookmark marker. `None` while the
    /// viewer is closed.
    pub fn render_viewer(&self, viewer: &Viewer) -> Option<Markup> {
        let page = viewer.page()?;
        let zoom = viewer.zoom()?;
        let overlay = viewer.overlay().unwrap_or_default();
        let bookmarks = viewer.bookmarks()?;
        let zoom_label = format!("{}%", (zoom * 100.0).round() as u32);
        Some(html! {
            div.viewer-frame data-page=(page) {
                header.viewer-bar {
                    span.viewer-position { (page + 1) " / " (self.document.len()) }
                    span.viewer-zoom { (zoom_label) }
                    @if bookmarks.contains(&page) {
                        span.bookmark-marker { "Bookmarked" }
                    }
                }
                div.viewer-body {
                    @match overlay {
                        Overlay::None => {}
                        Overlay::Thumbnails => { (self.thumbnail_overlay(page, bookmarks)) }
                        Overlay::Contents => { (self.contents_overlay(page, bookmarks)) }
                    }
                    div.viewer-page {
                        (self.render_page(page, RenderMode::Viewer { zoom }))
                    }
                }
            }
        })
    }

    fn thumbnail_overlay(&self, current: usize, bookmarks: &BTreeSet<usize>) -> Markup {
        let mode = RenderMode::Viewer {
            zoom: THUMBNAIL_ZOOM,
        };
        html! {
            aside.overlay.thumbnails {
                @for index in 0..self.document.len() {
                    div.thumbnail.current[index == current].bookmarked[bookmarks.contains(&index)]
                        data-page=(index) {
                        (self.render_page(index, mode))
                        span.thumbnail-number { (index + 1) }
                    }
                }
            }
        }
    }

    fn contents_overlay(&self, current: usize, bookmarks: &BTreeSet<usize>) -> Markup {
        html! {
            aside.overlay.contents {
                h2 { "Contents" }
                ol.toc-list {
                    @for entry in self.document.toc_entries(self.toc_prefix_len) {
                        li.current[entry.page_index == current] data-page=(entry.page_index) {
                            span.toc-label { (entry.label) }
                            span.toc-number { (entry.page_index + 1) }
                        }
                    }
                }
                @if !bookmarks.is_empty() {
                    h3 { "Bookmarks" }
                    ul.bookmark-list {
                        @for index in bookmarks {
                            li data-page=(index) { "Page " (index + 1) }
                        }
                    }
                }
            }
        }
    }

    /// A complete HTML document around `body`.
    pub fn html_document(&self, mode: RenderMode, body: Markup) -> String {
        let title = if self.document.title.is_empty() {
            "Ebook"
        } else {
            self.document.title.as_str()
        };
        let markup = html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="UTF-8";
                    title { (title) }
                    style { (PreEscaped(CSS)) }
                }
                body class=(mode.class()) {
                    (body)
                }
            }
        };
        markup.into_string()
    }

    /// The print-capture surface of one page.
    pub fn surface(&self, index: usize) -> Option<Surface> {
        self.document.page(index)?;
        let mode = RenderMode::PrintCapture;
        let body = html! { div.pages { (self.render_page(index, mode)) } };
        Some(Surface {
            index,
            html: self.html_document(mode, body),
            width: self.geometry.width,
            height: self.geometry.height,
            pixel_ratio: self.pixel_ratio,
        })
    }

    fn sheet(&self, page: &Page, style: &str) -> Markup {
        match page {
            Page::Cover(cover) => html! {
                div.sheet.cover style=(style) {
                    (image_slot(cover.cover_image.as_ref(), "No cover image"))
                }
            },
            Page::CompanyIntro(intro) => html! {
                div.sheet.company style=(style) {
                    @if intro.description.trim().is_empty() {
                        p.placeholder { "No content" }
                    } @else {
                        p.text-slot { (intro.description) }
                    }
                }
            },
            Page::TableOfContents(_) => html! {
                div.sheet.toc style=(style) {
                    h2 { "Contents" }
                    ol.toc-list {
                        @for entry in self.document.toc_entries(self.toc_prefix_len) {
                            li {
                                a.toc-label href={ "#page-" (entry.page_index) } { (entry.label) }
                                span.toc-number { (entry.page_index + 1) }
                            }
                        }
                    }
                }
            },
            Page::Content(body) => content_sheet(body, style),
        }
    }
}

fn content_sheet(body: &ContentBody, style: &str) -> Markup {
    let arrangement = body.layout.arrangement();
    let bleed = matches!(arrangement, Arrangement::FullBleed { .. });
    html! {
        div.sheet.content.bleed[bleed] data-layout=(body.layout.id()) style=(style) {
            @match arrangement {
                Arrangement::Stack(slots) => {
                    div.layout-stack {
                        @for slot in slots {
                            (slot_markup(body, *slot))
                        }
                    }
                }
                Arrangement::SideBySide { left, right } => {
                    div.layout-side {
                        div.left { (slot_markup(body, left)) }
                        div.right {
                            @for slot in right {
                                (slot_markup(body, *slot))
                            }
                        }
                    }
                }
                Arrangement::FullBleed { background, caption } => {
                    div.layout-bleed {
                        div.background { (slot_markup(body, background)) }
                        div.caption {
                            @for slot in caption {
                                (slot_markup(body, *slot))
                            }
                        }
                    }
                }
            }
        }
    }
}

fn slot_markup(body: &ContentBody, slot: Slot) -> Markup {
    match slot {
        Slot::Text1 => text_slot(&body.text1, "text1"),
        Slot::Text2 => text_slot(&body.text2, "text2"),
        Slot::Image => image_slot(body.image.as_ref(), "No image"),
    }
}

fn text_slot(text: &Option<String>, name: &str) -> Markup {
    html! {
        @match non_empty(text) {
            Some(text) => { p.text-slot data-slot=(name) { (text) } }
            None => { p.text-slot.placeholder data-slot=(name) { "No text" } }
        }
    }
}

fn image_slot(image: Option<&ImageRef>, placeholder: &str) -> Markup {
    html! {
        div.image-slot {
            @match image {
                Some(image) => { img src=(image.src()) alt=""; }
                None => { span.placeholder { (placeholder) } }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::page::ContentPatch;
    use crate::viewer::ZoomRange;

    fn sample() -> Document {
        let mut doc = Document::new("o");
        doc.pages[1] = Page::company_intro("Hello");
        doc.pages[3].apply(ContentPatch::new().text1("Alpha").text2("Omega"));
        doc
    }

    fn render(doc: &Document, index: usize, mode: RenderMode) -> String {
        Renderer::new(doc).render_page(index, mode).into_string()
    }

    #[test]
    fn mode_scales() {
        assert_eq!(RenderMode::EditPreview.scale(), 0.3);
        assert_eq!(RenderMode::PrintCapture.scale(), 1.0);
        assert!((RenderMode::Viewer { zoom: 2.0 }.scale() - 1.4).abs() < 1e-6);
    }

    #[test]
    fn print_capture_frame_is_full_size() {
        let html = render(&sample(), 0, RenderMode::PrintCapture);
        assert!(html.contains("width: 595px; height: 842px;"));
    }

    #[test]
    fn preview_frame_is_scaled() {
        let html = render(&sample(), 0, RenderMode::EditPreview);
        assert!(html.contains("width: 179px; height: 253px;"));
        assert!(html.contains("scale(0.3)"));
    }

    #[test]
    fn placeholders_for_empty_pages() {
        let doc = Document::new("o");
        assert!(render(&doc, 0, RenderMode::PrintCapture).contains("No cover image"));
        assert!(render(&doc, 1, RenderMode::PrintCapture).contains("No content"));
        let content = render(&doc, 3, RenderMode::PrintCapture);
        assert!(content.contains("No text"));
        assert!(content.contains("No image"));
    }

    #[test]
    fn out_of_range_renders_no_page() {
        let html = render(&sample(), 99, RenderMode::EditPreview);
        assert!(html.contains("No page"));
        assert!(html.contains("id=\"page-99\""));
    }

    #[test]
    fn toc_lists_content_pages() {
        let mut doc = sample();
        let mut second = Page::content();
        second.apply(ContentPatch::new().text1("Beta"));
        doc.pages.push(second);
        let html = render(&doc, 2, RenderMode::Viewer { zoom: 1.0 });
        let alpha = html.find("Alpha").unwrap();
        let beta = html.find("Beta").unwrap();
        assert!(alpha < beta);
        assert!(html.contains("href=\"#page-4\""));
    }

    #[test]
    fn draft_only_shows_in_edit_preview() {
        let doc = sample();
        let mut draft = doc.pages[3].clone();
        draft.apply(ContentPatch::new().text1("Unsaved"));
        let renderer = Renderer::new(&doc).with_draft(3, &draft);

        let preview = renderer.render_page(3, RenderMode::EditPreview).into_string();
        assert!(preview.contains("Unsaved"));
        assert!(preview.contains("selected"));

        for mode in [RenderMode::PrintCapture, RenderMode::Viewer { zoom: 1.0 }] {
            let html = renderer.render_page(3, mode).into_string();
            assert!(html.contains("Alpha"));
            assert!(!html.contains("Unsaved"));
        }
    }

    #[test]
    fn draft_does_not_leak_into_other_pages() {
        let doc = sample();
        let draft = Page::company_intro("Draft intro");
        let renderer = Renderer::new(&doc).with_draft(1, &draft);
        assert_eq!(renderer.page_source(3, RenderMode::EditPreview), doc.page(3));
        assert_eq!(
            renderer.page_source(1, RenderMode::EditPreview),
            Some(&draft)
        );
    }

    #[test]
    fn layout2_hides_second_text() {
        let mut doc = sample();
        doc.pages[3].apply(ContentPatch::new().layout(Layout::Layout2));
        let html = render(&doc, 3, RenderMode::PrintCapture);
        assert!(html.contains("Alpha"));
        assert!(!html.contains("Omega"));
        assert!(html.contains("layout-stack"));
    }

    #[test]
    fn layout3_and_layout4_arrangements() {
        let mut doc = sample();
        doc.pages[3].apply(ContentPatch::new().layout(Layout::Layout3));
        assert!(render(&doc, 3, RenderMode::PrintCapture).contains("layout-side"));

        doc.pages[3].apply(ContentPatch::new().layout(Layout::Layout4));
        let html = render(&doc, 3, RenderMode::PrintCapture);
        assert!(html.contains("layout-bleed"));
        assert!(html.contains("caption"));
        assert!(html.contains("Omega"));
    }

    #[test]
    fn text_is_escaped() {
        let mut doc = sample();
        doc.pages[3].apply(ContentPatch::new().text1("<script>x</script>"));
        let html = render(&doc, 3, RenderMode::PrintCapture);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    fn open_viewer(doc: &Document, page: usize) -> Viewer {
        let mut viewer = Viewer::new(doc.len(), ZoomRange::default());
        viewer.open_at(page);
        viewer
    }

    #[test]
    fn closed_viewer_renders_nothing() {
        let doc = sample();
        let viewer = Viewer::new(doc.len(), ZoomRange::default());
        assert!(Renderer::new(&doc).render_viewer(&viewer).is_none());
    }

    #[test]
    fn viewer_frame_follows_page_and_zoom() {
        let doc = sample();
        let renderer = Renderer::new(&doc);
        let mut viewer = open_viewer(&doc, 3);
        viewer.zoom_in();
        viewer.zoom_in();

        let html = renderer.render_viewer(&viewer).unwrap().into_string();
        assert!(html.contains("4 / 4"));
        assert!(html.contains("120%"));
        assert!(html.contains("id=\"page-3\""));
        assert!(html.contains("Alpha"));
        assert!(!html.contains("overlay"));
        assert!(!html.contains("Bookmarked"));

        viewer.toggle_bookmark();
        let html = renderer.render_viewer(&viewer).unwrap().into_string();
        assert!(html.contains("Bookmarked"));
    }

    #[test]
    fn viewer_shows_committed_content_not_draft() {
        let doc = sample();
        let mut draft = doc.pages[3].clone();
        draft.apply(ContentPatch::new().text1("Unsaved"));
        let renderer = Renderer::new(&doc).with_draft(3, &draft);
        let html = renderer
            .render_viewer(&open_viewer(&doc, 3))
            .unwrap()
            .into_string();
        assert!(html.contains("Alpha"));
        assert!(!html.contains("Unsaved"));
    }

    #[test]
    fn thumbnail_overlay_marks_current_and_bookmarked_pages() {
        let doc = sample();
        let mut viewer = open_viewer(&doc, 0);
        viewer.toggle_bookmark();
        viewer.next();
        viewer.toggle_overlay(Overlay::Thumbnails);

        let html = Renderer::new(&doc)
            .render_viewer(&viewer)
            .unwrap()
            .into_string();
        assert!(html.contains("overlay thumbnails"));
        assert_eq!(html.matches("class=\"thumbnail").count(), 4);
        assert!(html.contains("class=\"thumbnail bookmarked\" data-page=\"0\""));
        assert!(html.contains("class=\"thumbnail current\" data-page=\"1\""));
    }

    #[test]
    fn contents_overlay_lists_toc_and_bookmarks() {
        let doc = sample();
        let mut viewer = open_viewer(&doc, 3);
        viewer.toggle_bookmark();
        viewer.toggle_overlay(Overlay::Contents);

        let html = Renderer::new(&doc)
            .render_viewer(&viewer)
            .unwrap()
            .into_string();
        assert!(html.contains("overlay contents"));
        assert!(html.contains("class=\"current\" data-page=\"3\""));
        assert!(html.contains("Page 4"));
        assert!(!html.contains("thumbnails"));
    }

    #[test]
    fn surface_is_standalone_document() {
        let doc = sample();
        let surface = Renderer::new(&doc)
            .with_pixel_ratio(2.0)
            .surface(1)
            .unwrap();
        assert_eq!((surface.width, surface.height), (595, 842));
        assert_eq!(surface.pixel_ratio, 2.0);
        assert!(surface.html.starts_with("<!DOCTYPE html>"));
        assert!(surface.html.contains("class=\"print-capture\""));
        assert!(surface.html.contains("Hello"));
        assert!(Renderer::new(&doc).surface(4).is_none());
    }
}
