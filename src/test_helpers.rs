//! Shared test utilities for the unit test suite.
//!
//! Provides tiny in-memory images, the reference sample document, and a
//! scripted [`PageCapture`] whose failures are decided per page up front.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let doc = sample_document();
//! let capture = ScriptedCapture::new().always_failing(2);
//! // export doc with capture; page 2 never produces a raster
//! assert_eq!(capture.attempts_for(2), 3);
//! ```

use crate::capture::{CaptureError, PageCapture};
use crate::document::Document;
use crate::page::{ContentPatch, Page};
use crate::render::Surface;
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

// =========================================================================
// Fixtures
// =========================================================================

/// PNG-encoded solid image of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([30, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// `[Cover(empty), CompanyIntro("Hello"), TableOfContents, Content("A", "B")]`
pub fn sample_document() -> Document {
    let mut doc = Document::new("owner-1");
    doc.pages[1] = Page::company_intro("Hello");
    doc.pages[3].apply(ContentPatch::new().text1("A").text2("B"));
    doc
}

// =========================================================================
// Scripted capture
// =========================================================================

#[derive(Default)]
struct Script {
    /// Remaining failures per page; `usize::MAX` never runs out.
    failures: HashMap<usize, usize>,
    calls: Vec<usize>,
}

/// Capture double that produces a `10 + index` pixel wide raster per page,
/// after failing as many times as scripted for that page.
#[derive(Default)]
pub struct ScriptedCapture {
    script: Mutex<Script>,
}

impl ScriptedCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `times` attempts for `page`.
    pub fn failing_times(self, page: usize, times: usize) -> Self {
        self.script.lock().unwrap().failures.insert(page, times);
        self
    }

    /// Fail every attempt for `page`.
    pub fn always_failing(self, page: usize) -> Self {
        self.failing_times(page, usize::MAX)
    }

    /// Page index of every attempt, in call order.
    pub fn calls(&self) -> Vec<usize> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn attempts_for(&self, page: usize) -> usize {
        self.calls().into_iter().filter(|&p| p == page).count()
    }
}

#[async_trait]
impl PageCapture for ScriptedCapture {
    async fn capture(&self, surface: &Surface) -> Result<DynamicImage, CaptureError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(surface.index);
        if let Some(remaining) = script.failures.get_mut(&surface.index) {
            if *remaining > 0 {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                return Err(CaptureError::Screenshot {
                    page: surface.index,
                    message: "scripted failure".into(),
                });
            }
        }
        let width = 10 + surface.index as u32;
        Ok(DynamicImage::ImageRgb8(RgbImage::new(width, 14)))
    }
}
