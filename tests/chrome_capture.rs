//! Browser capture tests — needs a local Chrome/Chromium.
//!
//! Run with: `cargo test --test chrome_capture -- --ignored`

use ebook_studio::capture::{ChromeCapture, PageCapture};
use ebook_studio::document::Document;
use ebook_studio::export::{ExportSettings, export_pdf};
use ebook_studio::page::{ContentPatch, Page};
use ebook_studio::render::Renderer;

fn document() -> Document {
    let mut doc = Document::new("chrome-test");
    doc.title = "Capture check".into();
    doc.pages[1] = Page::company_intro("A small studio making quiet books.");
    doc.pages[3].apply(
        ContentPatch::new()
            .text1("First chapter")
            .text2("Second paragraph"),
    );
    doc
}

#[tokio::test]
#[ignore]
async fn screenshot_matches_surface_size_and_ratio() {
    let doc = document();
    let renderer = Renderer::new(&doc).with_pixel_ratio(1.5);
    let capture = ChromeCapture::launch(595, 842).expect("failed to launch Chrome");

    let surface = renderer.surface(1).unwrap();
    let raster = capture.capture(&surface).await.unwrap();
    assert_eq!(raster.width(), (595.0_f32 * 1.5).round() as u32);
    assert_eq!(raster.height(), (842.0_f32 * 1.5).round() as u32);
}

#[tokio::test]
#[ignore]
async fn exports_every_page() {
    let doc = document();
    let renderer = Renderer::new(&doc);
    let capture = ChromeCapture::launch(595, 842).expect("failed to launch Chrome");

    let report = export_pdf(&renderer, &capture, &ExportSettings::default())
        .await
        .unwrap();
    assert_eq!(report.included, vec![0, 1, 2, 3]);
    assert_eq!(report.file_name, "Capture check.pdf");

    let pdf = lopdf::Document::load_mem(&report.pdf).unwrap();
    assert_eq!(pdf.get_pages().len(), 4);
}

#[tokio::test]
#[ignore]
async fn capture_tabs_are_closed() {
    let doc = document();
    let renderer = Renderer::new(&doc);
    let capture = ChromeCapture::launch(595, 842).expect("failed to launch Chrome");
    let before = capture.open_tabs();

    for page in 0..doc.len() {
        capture.capture(&renderer.surface(page).unwrap()).await.unwrap();
    }
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    assert_eq!(capture.open_tabs(), before);
}
