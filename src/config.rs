//! Studio configuration.
//!
//! Every value has a stock default; an `ebook.toml` file overrides only the
//! keys it names. Stock defaults and the user file are merged as TOML tables,
//! deserialized, then validated.
//!
//! ## Configuration Options
//!
//! ```toml
//! [backend]
//! url = "https://<project>.supabase.co"
//! api_key = "<anon key>"
//! ebook_table = "ebooks"
//! asset_bucket = "ebook-images"
//! book_table = "books"
//! book_bucket = "bookimage"
//! event_table = "event"
//! event_bucket = "eventimage"
//!
//! [editor]
//! max_image_bytes = 2097152   # 2 MiB
//! toc_prefix_len = 30
//!
//! [viewer]
//! zoom_min = 0.5
//! zoom_max = 2.0
//! zoom_step = 0.1
//!
//! [export]
//! page_width_px = 595         # A4 at 72 dpi
//! page_height_px = 842
//! pixel_ratio = 1.5
//! jpeg_quality = 80
//! file_name = "ebook.pdf"     # used when the document has no title
//! on_capture_failure = "skip" # or "fail"
//!
//! [export.retry]
//! max_attempts = 3
//! delay_ms = 200
//! backoff = 1.0
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::export::FailurePolicy;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioConfig {
    pub backend: BackendConfig,
    pub editor: EditorConfig,
    pub viewer: ViewerConfig,
    pub export: ExportConfig,
}

/// Hosted backend connection and table/bucket names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Project base URL. Empty means "not configured".
    pub url: String,
    pub api_key: String,
    pub ebook_table: String,
    /// Bucket for images attached in the ebook editor.
    pub asset_bucket: String,
    pub book_table: String,
    pub book_bucket: String,
    pub event_table: String,
    pub event_bucket: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            ebook_table: "ebooks".into(),
            asset_bucket: "ebook-images".into(),
            book_table: "books".into(),
            book_bucket: "bookimage".into(),
            event_table: "event".into(),
            event_bucket: "eventimage".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Largest image file accepted for attachment, in bytes.
    pub max_image_bytes: usize,
    /// Characters of `text1` shown per table-of-contents entry.
    pub toc_prefix_len: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: crate::asset::DEFAULT_MAX_IMAGE_BYTES,
            toc_prefix_len: crate::document::DEFAULT_TOC_PREFIX_LEN,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub zoom_step: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            zoom_min: 0.5,
            zoom_max: 2.0,
            zoom_step: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Print-capture surface width in CSS pixels.
    pub page_width_px: u32,
    pub page_height_px: u32,
    /// Device pixels per CSS pixel when capturing.
    pub pixel_ratio: f32,
    /// JPEG quality of the page images embedded in the PDF (1-100).
    pub jpeg_quality: u8,
    /// Output file name when the document has no title.
    pub file_name: String,
    pub on_capture_failure: FailurePolicy,
    pub retry: RetryConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_width_px: 595,
            page_height_px: 842,
            pixel_ratio: 1.5,
            jpeg_quality: 80,
            file_name: "ebook.pdf".into(),
            on_capture_failure: FailurePolicy::Skip,
            retry: RetryConfig::default(),
        }
    }
}

/// Per-page capture retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 200,
            backoff: 1.0,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
            .with_backoff(self.backoff)
    }
}

impl StudioConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let export = &self.export;
        if export.page_width_px == 0 || export.page_height_px == 0 {
            return Err(ConfigError::Validation(
                "export.page_width_px and export.page_height_px must be non-zero".into(),
            ));
        }
        if !(export.pixel_ratio > 0.0) {
            return Err(ConfigError::Validation(
                "export.pixel_ratio must be positive".into(),
            ));
        }
        if !(1..=100).contains(&export.jpeg_quality) {
            return Err(ConfigError::Validation(
                "export.jpeg_quality must be 1-100".into(),
            ));
        }
        if export.retry.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "export.retry.max_attempts must be at least 1".into(),
            ));
        }
        if !(export.retry.backoff >= 1.0) {
            return Err(ConfigError::Validation(
                "export.retry.backoff must be >= 1.0".into(),
            ));
        }
        let viewer = &self.viewer;
        if !(viewer.zoom_step > 0.0) {
            return Err(ConfigError::Validation(
                "viewer.zoom_step must be positive".into(),
            ));
        }
        if !(viewer.zoom_min > 0.0 && viewer.zoom_min <= 1.0 && 1.0 <= viewer.zoom_max) {
            return Err(ConfigError::Validation(
                "viewer zoom range must satisfy 0 < zoom_min <= 1.0 <= zoom_max".into(),
            ));
        }
        if self.editor.max_image_bytes == 0 {
            return Err(ConfigError::Validation(
                "editor.max_image_bytes must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock default config as a TOML table: the base layer for overrides.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(StudioConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load the config file at `path`, falling back to stock defaults when it
/// does not exist.
pub fn load_config(path: &Path) -> Result<StudioConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = if path.exists() {
        let content = fs::read_to_string(path)?;
        let overlay: toml::Value = toml::from_str(&content)?;
        merge_toml(base, overlay)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using stock defaults");
        base
    };
    let config: StudioConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// A fully-commented stock `ebook.toml`. Printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Ebook Studio Configuration
# ==========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Hosted backend
# ---------------------------------------------------------------------------
[backend]
# Project URL and API key. Both are required for commands that talk to the backend.
url = ""
api_key = ""

# Table holding one ebook document per owner.
ebook_table = "ebooks"
# Bucket receiving images attached in the ebook editor.
asset_bucket = "ebook-images"

# Catalog tables and their image buckets.
book_table = "books"
book_bucket = "bookimage"
event_table = "event"
event_bucket = "eventimage"

# ---------------------------------------------------------------------------
# Editor
# ---------------------------------------------------------------------------
[editor]
# Largest image accepted for attachment (bytes).
max_image_bytes = 2097152
# Characters of a content page's first text shown in the table of contents.
toc_prefix_len = 30

# ---------------------------------------------------------------------------
# Fullscreen viewer
# ---------------------------------------------------------------------------
[viewer]
zoom_min = 0.5
zoom_max = 2.0
zoom_step = 0.1

# ---------------------------------------------------------------------------
# PDF export
# ---------------------------------------------------------------------------
[export]
# Print-capture surface in CSS pixels (A4 at 72 dpi).
page_width_px = 595
page_height_px = 842
# Device pixels per CSS pixel used for the page screenshots.
pixel_ratio = 1.5
# JPEG quality of the embedded page images (1-100).
jpeg_quality = 80
# File name used when the document has no title.
file_name = "ebook.pdf"
# What to do with a page whose capture fails every attempt:
#   "skip" - leave it out of the PDF and continue
#   "fail" - abort the export
on_capture_failure = "skip"

[export.retry]
max_attempts = 3
delay_ms = 200
# Delay multiplier after each failed attempt (1.0 = constant delay).
backoff = 1.0
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_documented_constants() {
        let config = StudioConfig::default();
        assert_eq!(config.export.page_width_px, 595);
        assert_eq!(config.export.page_height_px, 842);
        assert_eq!(config.export.retry.max_attempts, 3);
        assert_eq!(config.export.on_capture_failure, FailurePolicy::Skip);
        assert_eq!(config.viewer.zoom_min, 0.5);
        assert_eq!(config.viewer.zoom_max, 2.0);
        assert_eq!(config.editor.max_image_bytes, 2 * 1024 * 1024);
        assert_eq!(config.backend.ebook_table, "ebooks");
    }

    #[test]
    fn stock_toml_parses_to_defaults() {
        let parsed: StudioConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = StudioConfig::default();
        assert_eq!(parsed.export.jpeg_quality, defaults.export.jpeg_quality);
        assert_eq!(parsed.export.retry.delay_ms, defaults.export.retry.delay_ms);
        assert_eq!(parsed.backend.event_bucket, defaults.backend.event_bucket);
        assert_eq!(parsed.editor.toc_prefix_len, defaults.editor.toc_prefix_len);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let config: StudioConfig = toml::from_str(
            r#"
[export.retry]
max_attempts = 5
"#,
        )
        .unwrap();
        assert_eq!(config.export.retry.max_attempts, 5);
        assert_eq!(config.export.retry.delay_ms, 200);
        assert_eq!(config.export.page_width_px, 595);
    }

    #[test]
    fn parse_failure_policy() {
        let config: StudioConfig = toml::from_str(
            r#"
[export]
on_capture_failure = "fail"
"#,
        )
        .unwrap();
        assert_eq!(config.export.on_capture_failure, FailurePolicy::FailFast);
    }

    #[test]
    fn retry_policy_from_config() {
        let policy = RetryConfig::default().policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_before(2), Duration::from_millis(200));
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("ebook.toml")).unwrap();
        assert_eq!(config.export.file_name, "ebook.pdf");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ebook.toml");
        fs::write(
            &path,
            r#"
[backend]
url = "https://proj.example.co"
api_key = "anon"

[viewer]
zoom_max = 3.0
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.backend.url, "https://proj.example.co");
        assert_eq!(config.viewer.zoom_max, 3.0);
        assert_eq!(config.viewer.zoom_min, 0.5);
        assert_eq!(config.backend.book_table, "books");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ebook.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<StudioConfig, _> = toml::from_str(
            r#"
[export]
jpeg_qualty = 90
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3").unwrap();
        let merged = merge_toml(base, overlay);
        let a = merged.get("a").unwrap();
        assert_eq!(a.get("x").unwrap().as_integer(), Some(1));
        assert_eq!(a.get("y").unwrap().as_integer(), Some(3));
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(StudioConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = StudioConfig::default();
        config.export.retry.max_attempts = 0;
        assert!(config.validate().unwrap_err().to_string().contains("max_attempts"));
    }

    #[test]
    fn validate_rejects_zoom_range_excluding_one() {
        let mut config = StudioConfig::default();
        config.viewer.zoom_min = 1.2;
        assert!(config.validate().is_err());

        let mut config = StudioConfig::default();
        config.viewer.zoom_max = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_quality_out_of_range() {
        let mut config = StudioConfig::default();
        config.export.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.export.jpeg_quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ebook.toml");
        fs::write(&path, "[editor]\nmax_image_bytes = 0\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }
}
