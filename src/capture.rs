//! Page capture: print surface in, raster out.
//!
//! [`PageCapture`] is the seam between the export pipeline and whatever turns
//! HTML into pixels. Every call is independent, so a failed capture can be
//! retried as is.
//!
//! [`ChromeCapture`] drives a headless Chrome instance: each surface is loaded
//! into a fresh tab as a `data:` URL and screenshotted with a clip of exactly
//! the sheet's size, scaled by the surface's pixel ratio.

use crate::render::Surface;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use headless_chrome::protocol::cdp::Page::{CaptureScreenshotFormatOption, Viewport};
use headless_chrome::{Browser, LaunchOptions, Tab};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("failed to create new tab: {0}")]
    NewTab(String),
    #[error("failed to load page {page}: {message}")]
    Navigate { page: usize, message: String },
    #[error("failed to screenshot page {page}: {message}")]
    Screenshot { page: usize, message: String },
    #[error("captured image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("capture task failed: {0}")]
    Task(String),
}

#[async_trait]
pub trait PageCapture: Send + Sync {
    async fn capture(&self, surface: &Surface) -> Result<DynamicImage, CaptureError>;
}

pub struct ChromeCapture {
    browser: Browser,
}

impl ChromeCapture {
    /// Start a headless browser with a window the size of one sheet.
    #[tracing::instrument]
    pub fn launch(width: u32, height: u32) -> Result<Self, CaptureError> {
        tracing::info!("launching headless chrome for page capture");
        let browser = Browser::new(LaunchOptions {
            window_size: Some((width, height)),
            ..Default::default()
        })
        .map_err(|e| CaptureError::Launch(e.to_string()))?;
        Ok(Self { browser })
    }

    /// Tabs currently open in the browser, including its initial blank tab.
    pub fn open_tabs(&self) -> usize {
        self.browser
            .get_tabs()
            .lock()
            .map(|tabs| tabs.len())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageCapture for ChromeCapture {
    #[tracing::instrument(skip_all, fields(page = surface.index))]
    async fn capture(&self, surface: &Surface) -> Result<DynamicImage, CaptureError> {
        let browser = self.browser.clone();
        let surface = surface.clone();
        // headless_chrome blocks on every CDP round-trip.
        let png = tokio::task::spawn_blocking(move || screenshot(&browser, &surface))
            .await
            .map_err(|e| CaptureError::Task(e.to_string()))??;
        tracing::debug!(bytes = png.len(), "screenshot taken");
        Ok(image::load_from_memory(&png)?)
    }
}

fn screenshot(browser: &Browser, surface: &Surface) -> Result<Vec<u8>, CaptureError> {
    let tab = browser
        .new_tab()
        .map_err(|e| CaptureError::NewTab(e.to_string()))?;
    run_then_close(
        tab,
        |tab| screenshot_in_tab(tab, surface),
        |tab| {
            if let Err(e) = tab.close(true) {
                tracing::debug!(error = %e, "failed to close capture tab");
            }
        },
    )
}

fn screenshot_in_tab(tab: &Tab, surface: &Surface) -> Result<Vec<u8>, CaptureError> {
    let page = surface.index;
    let url = format!(
        "data:text/html;charset=utf-8;base64,{}",
        STANDARD.encode(surface.html.as_bytes())
    );
    tab.navigate_to(&url)
        .and_then(|tab| tab.wait_until_navigated())
        .map_err(|e| CaptureError::Navigate {
            page,
            message: e.to_string(),
        })?;
    let clip = Viewport {
        x: 0.0,
        y: 0.0,
        width: surface.width as f64,
        height: surface.height as f64,
        scale: surface.pixel_ratio as f64,
    };
    tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, Some(clip), true)
        .map_err(|e| CaptureError::Screenshot {
            page,
            message: e.to_string(),
        })
}

/// Run `f` on `resource`, then hand it to `close` whether `f` failed or not.
fn run_then_close<R, T>(resource: R, f: impl FnOnce(&R) -> T, close: impl FnOnce(R)) -> T {
    let out = f(&resource);
    close(resource);
    out
}
