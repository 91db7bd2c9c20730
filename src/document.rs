//! The ebook document: an ordered sequence of pages owned by one user.
//!
//! By convention the first three pages are the fixed front matter (cover,
//! company intro, table of contents) and every page after them is a content
//! page. Page order is reading order and export order.

use crate::page::{Page, PageKind, non_empty};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of fixed pages at the front of every document.
pub const FRONT_MATTER_LEN: usize = 3;

/// Characters of `text1` shown per table-of-contents entry.
pub const DEFAULT_TOC_PREFIX_LEN: usize = 30;

/// A document row as stored in the hosted `ebooks` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "user_id")]
    pub owner: String,
    #[serde(default)]
    pub title: String,
    pub pages: Vec<Page>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One derived table-of-contents line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// Index of the page in the document.
    pub page_index: usize,
    pub label: String,
}

impl Document {
    /// The document a new owner starts with.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            id: None,
            owner: owner.into(),
            title: String::new(),
            pages: vec![
                Page::cover(),
                Page::company_intro(""),
                Page::table_of_contents(),
                Page::content(),
            ],
            updated_at: None,
        }
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Table-of-contents entries, recomputed from the current page order.
    ///
    /// Every content page after the front matter yields one entry: its
    /// `text1` cut to `prefix_len` characters, or `Content page K` when the
    /// text is empty.
    pub fn toc_entries(&self, prefix_len: usize) -> Vec<TocEntry> {
        self.pages
            .iter()
            .enumerate()
            .skip(FRONT_MATTER_LEN)
            .filter_map(|(index, page)| match page {
                Page::Content(body) => Some((index, body)),
                _ => None,
            })
            .enumerate()
            .map(|(n, (page_index, body))| TocEntry {
                page_index,
                label: match non_empty(&body.text1) {
                    Some(text) => text.chars().take(prefix_len).collect(),
                    None => format!("Content page {}", n + 1),
                },
            })
            .collect()
    }

    /// Indices of pages that still reference a session-local image.
    pub fn temporary_image_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.has_temporary_image())
            .map(|(i, _)| i)
            .collect()
    }

    /// Label for a page in the page list (`1. Cover`, `4. Content page 1`).
    pub fn page_label(&self, index: usize) -> Option<String> {
        let page = self.pages.get(index)?;
        let name = match page.kind() {
            PageKind::Cover => "Cover".to_string(),
            PageKind::CompanyIntro => "Company intro".to_string(),
            PageKind::TableOfContents => "Contents".to_string(),
            PageKind::Content => {
                format!("Content page {}", index.saturating_sub(FRONT_MATTER_LEN - 1))
            }
        };
        Some(format!("{}. {}", index + 1, name))
    }
}
