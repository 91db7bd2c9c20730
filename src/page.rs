//! Page content model.
//!
//! A page is a tagged union: the variant is the page kind and carries only the
//! fields that kind can hold. On the wire a page looks like
//!
//! ```json
//! { "type": "content",
//!   "content": { "layout": "layout1", "text1": "…", "text2": null, "image": "https://…" } }
//! ```
//!
//! which is the row shape the hosted `ebooks` table has always stored, so
//! existing documents load unchanged.

use crate::layout::Layout;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The four kinds of page a document can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Cover,
    CompanyIntro,
    TableOfContents,
    Content,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PageKind::Cover => "cover",
            PageKind::CompanyIntro => "company",
            PageKind::TableOfContents => "toc",
            PageKind::Content => "content",
        })
    }
}

/// Reference to an image shown on a page.
///
/// `Pending` holds an inline `data:` URL that only lives for the current
/// editing session. `Url` is a permanent public URL in object storage.
/// Persisted documents must only contain `Url` references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageRef {
    Pending(String),
    Url(String),
}

impl ImageRef {
    pub fn is_temporary(&self) -> bool {
        matches!(self, ImageRef::Pending(_))
    }

    /// Value usable as an `<img src>`.
    pub fn src(&self) -> &str {
        match self {
            ImageRef::Pending(s) | ImageRef::Url(s) => s,
        }
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        if value.starts_with("data:") {
            ImageRef::Pending(value)
        } else {
            ImageRef::Url(value)
        }
    }
}

impl From<ImageRef> for String {
    fn from(value: ImageRef) -> Self {
        match value {
            ImageRef::Pending(s) | ImageRef::Url(s) => s,
        }
    }
}

/// Natural pixel dimensions of an attached image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Cover {
    #[serde(deserialize_with = "image_or_none")]
    pub cover_image: Option<ImageRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyIntro {
    pub description: String,
}

/// The table of contents has no editable content; entries are derived from
/// the content pages every time it is rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableOfContents {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentBody {
    pub layout: Layout,
    pub text1: Option<String>,
    pub text2: Option<String>,
    #[serde(deserialize_with = "image_or_none")]
    pub image: Option<ImageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<ImageSize>,
}

/// Treat `null` and `""` alike: the admin console wrote both for "no image".
fn image_or_none<'de, D>(deserializer: D) -> Result<Option<ImageRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(ImageRef::from))
}

/// One page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum Page {
    #[serde(rename = "cover")]
    Cover(Cover),
    #[serde(rename = "company")]
    CompanyIntro(CompanyIntro),
    #[serde(rename = "toc")]
    TableOfContents(TableOfContents),
    #[serde(rename = "content")]
    Content(ContentBody),
}

impl Page {
    pub fn cover() -> Self {
        Page::Cover(Cover::default())
    }

    pub fn company_intro(description: impl Into<String>) -> Self {
        Page::CompanyIntro(CompanyIntro {
            description: description.into(),
        })
    }

    pub fn table_of_contents() -> Self {
        Page::TableOfContents(TableOfContents {})
    }

    /// Empty content page with the default layout.
    pub fn content() -> Self {
        Page::Content(ContentBody::default())
    }

    pub fn kind(&self) -> PageKind {
        match self {
            Page::Cover(_) => PageKind::Cover,
            Page::CompanyIntro(_) => PageKind::CompanyIntro,
            Page::TableOfContents(_) => PageKind::TableOfContents,
            Page::Content(_) => PageKind::Content,
        }
    }

    /// The image slot of this page, if the kind has one.
    pub fn image(&self) -> Option<&ImageRef> {
        match self {
            Page::Cover(c) => c.cover_image.as_ref(),
            Page::Content(c) => c.image.as_ref(),
            Page::CompanyIntro(_) | Page::TableOfContents(_) => None,
        }
    }

    /// Whether the kind has an image slot at all.
    pub fn accepts_image(&self) -> bool {
        matches!(self, Page::Cover(_) | Page::Content(_))
    }

    /// Replace the image slot. Returns `false` for kinds without one.
    pub fn set_image(&mut self, image: Option<ImageRef>, size: Option<ImageSize>) -> bool {
        match self {
            Page::Cover(c) => {
                c.cover_image = image;
                true
            }
            Page::Content(c) => {
                c.image = image;
                c.image_size = size;
                true
            }
            Page::CompanyIntro(_) | Page::TableOfContents(_) => false,
        }
    }

    pub fn has_temporary_image(&self) -> bool {
        self.image().is_some_and(ImageRef::is_temporary)
    }

    /// Shallow-merge a patch into this page.
    ///
    /// Fields the page kind does not have are ignored, so a patch carrying a
    /// `description` leaves a content page untouched.
    pub fn apply(&mut self, patch: ContentPatch) {
        match self {
            Page::Cover(c) => {
                if let Some(image) = patch.image {
                    c.cover_image = image;
                }
            }
            Page::CompanyIntro(c) => {
                if let Some(description) = patch.description {
                    c.description = description;
                }
            }
            Page::TableOfContents(_) => {}
            Page::Content(c) => {
                if let Some(layout) = patch.layout {
                    c.layout = layout;
                }
                if let Some(text1) = patch.text1 {
                    c.text1 = text1;
                }
                if let Some(text2) = patch.text2 {
                    c.text2 = text2;
                }
                if let Some(image) = patch.image {
                    c.image = image;
                }
                if let Some(size) = patch.image_size {
                    c.image_size = size;
                }
            }
        }
    }
}

/// Partial update for a page draft.
///
/// `None` means "leave as is"; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentPatch {
    pub description: Option<String>,
    pub layout: Option<Layout>,
    pub text1: Option<Option<String>>,
    pub text2: Option<Option<String>>,
    /// Applies to the cover image on cover pages and the content image otherwise.
    pub image: Option<Option<ImageRef>>,
    pub image_size: Option<Option<ImageSize>>,
}

impl ContentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn text1(mut self, text: impl Into<String>) -> Self {
        self.text1 = Some(Some(text.into()));
        self
    }

    pub fn text2(mut self, text: impl Into<String>) -> Self {
        self.text2 = Some(Some(text.into()));
        self
    }

    pub fn image(mut self, image: Option<ImageRef>) -> Self {
        self.image = Some(image);
        self
    }
}

/// `Some(text)` only when the text has visible content.
pub(crate) fn non_empty(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|t| !t.trim().is_empty())
}
