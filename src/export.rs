//! PDF export pipeline.
//!
//! ```text
//! for each page, in document order:
//!     render print surface → capture (with retry) → raster
//! rasters → assemble → PDF bytes
//! ```
//!
//! Pages are captured strictly one after another: page *n+1* is not started
//! before page *n* has either produced a raster or used up its attempts.
//!
//! A page whose capture fails every attempt is handled by the
//! [`FailurePolicy`]: `Skip` leaves it out and keeps going, `FailFast`
//! aborts the export. Either way the [`ExportReport`] names every included
//! and skipped source index, so a short PDF is never silent.

use crate::capture::{CaptureError, PageCapture};
use crate::config::ExportConfig;
use crate::pdf::{self, PdfError};
use crate::render::Renderer;
use crate::retry::{RetryPolicy, retry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Omit pages that could not be captured.
    #[default]
    #[serde(rename = "skip")]
    Skip,
    /// Abort the export at the first page that could not be captured.
    #[serde(rename = "fail")]
    FailFast,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("document has no pages")]
    EmptyDocument,
    #[error("page {page} could not be captured: {source}")]
    CaptureFailed { page: usize, source: CaptureError },
    #[error("no page could be captured ({skipped} failed)")]
    NothingCaptured { skipped: usize },
    #[error(transparent)]
    Pdf(#[from] PdfError),
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub retry: RetryPolicy,
    pub on_failure: FailurePolicy,
    pub jpeg_quality: u8,
    /// File name used when the document has no title.
    pub fallback_file_name: String,
}

impl ExportSettings {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            retry: config.retry.policy(),
            on_failure: config.on_capture_failure,
            jpeg_quality: config.jpeg_quality,
            fallback_file_name: config.file_name.clone(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from_config(&ExportConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub file_name: String,
    pub pdf: Vec<u8>,
    /// Source page indices present in the PDF, in PDF page order.
    pub included: Vec<usize>,
    /// Source page indices left out because capture failed.
    pub skipped: Vec<usize>,
}

/// Capture every page of the renderer's document and assemble the PDF.
#[tracing::instrument(skip_all, fields(pages = renderer.document().len()))]
pub async fn export_pdf(
    renderer: &Renderer<'_>,
    capture: &dyn PageCapture,
    settings: &ExportSettings,
) -> Result<ExportReport, ExportError> {
    let document = renderer.document();
    if document.is_empty() {
        return Err(ExportError::EmptyDocument);
    }

    let mut rasters = Vec::with_capacity(document.len());
    let mut included = Vec::new();
    let mut skipped = Vec::new();

    for index in 0..document.len() {
        let Some(surface) = renderer.surface(index) else {
            continue;
        };
        let result = retry(&settings.retry, |attempt| {
            tracing::debug!(page = index, attempt, "capturing page");
            capture.capture(&surface)
        })
        .await;
        match result {
            Ok(raster) => {
                rasters.push(raster);
                included.push(index);
            }
            Err(source) => match settings.on_failure {
                FailurePolicy::Skip => {
                    tracing::warn!(page = index, error = %source, "page capture failed, skipping page");
                    skipped.push(index);
                }
                FailurePolicy::FailFast => {
                    tracing::error!(page = index, error = %source, "page capture failed, aborting export");
                    return Err(ExportError::CaptureFailed {
                        page: index,
                        source,
                    });
                }
            },
        }
    }

    if rasters.is_empty() {
        return Err(ExportError::NothingCaptured {
            skipped: skipped.len(),
        });
    }

    let pdf = pdf::assemble(&rasters, settings.jpeg_quality, &document.title)?;
    tracing::info!(
        included = included.len(),
        skipped = skipped.len(),
        bytes = pdf.len(),
        "export finished"
    );
    Ok(ExportReport {
        file_name: file_name_for(&document.title, &settings.fallback_file_name),
        pdf,
        included,
        skipped,
    })
}

/// Download file name for a document title.
///
/// Characters that are not allowed in file names on common platforms become
/// `_`; an empty title falls back to `fallback`.
pub fn file_name_for(title: &str, fallback: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches(['.', ' ']);
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    if cleaned.to_lowercase().ends_with(".pdf") {
        cleaned.to_string()
    } else {
        format!("{cleaned}.pdf")
    }
}
