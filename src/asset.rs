//! Locally selected images waiting to be uploaded.
//!
//! Attaching an image does three things up front: rejects files over the size
//! limit, reads the natural pixel dimensions (which also proves the bytes
//! decode), and produces an inline `data:` URL the live preview can show
//! before anything reaches object storage.
//!
//! Uploads are content-addressed: the storage key starts with a SHA-256
//! prefix of the bytes, so re-uploading the same file lands on the same key.

use crate::page::{ImageRef, ImageSize};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, ImageReader};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use thiserror::Error;

pub const DEFAULT_MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Hex characters of the content hash used in storage keys.
const KEY_HASH_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("image is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: usize, max: usize },
    #[error("not a supported image: {0}")]
    Decode(String),
    #[error("malformed data URL")]
    DataUrl,
}

/// An image selected in the editor that is not yet in object storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    bytes: Vec<u8>,
    file_name: String,
    format: ImageFormat,
    size: ImageSize,
}

impl PendingImage {
    /// Validate and wrap raw image bytes.
    pub fn from_bytes(
        bytes: Vec<u8>,
        file_name: impl Into<String>,
        max_bytes: usize,
    ) -> Result<Self, AssetError> {
        if bytes.len() > max_bytes {
            return Err(AssetError::TooLarge {
                size: bytes.len(),
                max: max_bytes,
            });
        }
        let reader = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| AssetError::Decode(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| AssetError::Decode("unrecognized image format".into()))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| AssetError::Decode(e.to_string()))?;
        Ok(Self {
            bytes,
            file_name: file_name.into(),
            format,
            size: ImageSize { width, height },
        })
    }

    /// Recover a pending image from an inline `data:` URL.
    ///
    /// Documents saved by older versions of the console stored previews
    /// inline; this lets a save move them into object storage.
    pub fn from_data_url(
        url: &str,
        file_name: impl Into<String>,
        max_bytes: usize,
    ) -> Result<Self, AssetError> {
        let payload = url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .map(|(_, data)| data)
            .ok_or(AssetError::DataUrl)?;
        let bytes = STANDARD.decode(payload).map_err(|_| AssetError::DataUrl)?;
        Self::from_bytes(bytes, file_name, max_bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Session-local preview handle for the draft.
    pub fn preview(&self) -> ImageRef {
        ImageRef::Pending(format!(
            "data:{};base64,{}",
            self.content_type(),
            STANDARD.encode(&self.bytes)
        ))
    }

    /// Object-storage key: `<hash prefix>-<sanitized file name>`.
    pub fn storage_key(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        let hash: String = digest
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>()
            .chars()
            .take(KEY_HASH_LEN)
            .collect();
        format!("{hash}-{}", self.sanitized_name())
    }

    fn sanitized_name(&self) -> String {
        let name: String = self
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        let name = name.trim_matches(['.', '_']);
        if name.is_empty() {
            let ext = self.format.extensions_str().first().copied().unwrap_or("img");
            format!("image.{ext}")
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::png_bytes;

    #[test]
    fn reads_dimensions() {
        let image = PendingImage::from_bytes(png_bytes(12, 7), "a.png", 1 << 20).unwrap();
        assert_eq!(
            image.size(),
            ImageSize {
                width: 12,
                height: 7
            }
        );
        assert_eq!(image.content_type(), "image/png");
    }

    #[test]
    fn rejects_oversized() {
        let bytes = png_bytes(4, 4);
        let len = bytes.len();
        let err = PendingImage::from_bytes(bytes, "a.png", len - 1).unwrap_err();
        assert!(matches!(err, AssetError::TooLarge { size, max } if size == len && max == len - 1));
    }

    #[test]
    fn rejects_non_images() {
        let err = PendingImage::from_bytes(b"hello world".to_vec(), "a.txt", 1024).unwrap_err();
        assert!(matches!(err, AssetError::Decode(_)));
    }

    #[test]
    fn preview_is_temporary_data_url() {
        let image = PendingImage::from_bytes(png_bytes(2, 2), "a.png", 1 << 20).unwrap();
        let preview = image.preview();
        assert!(preview.is_temporary());
        assert!(preview.src().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn data_url_round_trips() {
        let image = PendingImage::from_bytes(png_bytes(3, 5), "a.png", 1 << 20).unwrap();
        let recovered =
            PendingImage::from_data_url(image.preview().src(), "a.png", 1 << 20).unwrap();
        assert_eq!(recovered.bytes(), image.bytes());
        assert!(PendingImage::from_data_url("https://x/y.png", "y", 10).is_err());
    }

    #[test]
    fn storage_key_is_content_addressed() {
        let a = PendingImage::from_bytes(png_bytes(2, 2), "My Photo.PNG", 1 << 20).unwrap();
        let b = PendingImage::from_bytes(png_bytes(2, 2), "My Photo.PNG", 1 << 20).unwrap();
        let c = PendingImage::from_bytes(png_bytes(3, 2), "My Photo.PNG", 1 << 20).unwrap();
        assert_eq!(a.storage_key(), b.storage_key());
        assert_ne!(a.storage_key(), c.storage_key());
        assert!(a.storage_key().ends_with("-my_photo.png"));
    }

    #[test]
    fn storage_key_falls_back_for_unusable_names() {
        let image = PendingImage::from_bytes(png_bytes(2, 2), "커버", 1 << 20).unwrap();
        assert!(image.storage_key().ends_with("-image.png"));
    }
}
