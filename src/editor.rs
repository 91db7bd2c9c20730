//! Editing session for one owner's document.
//!
//! The editor holds three pieces of state next to the [`Document`]:
//!
//! - **selection**: the page index open for editing;
//! - **draft**: a scratch copy of that page. Edits land here and show up in
//!   the live preview, but the document only changes at [`Editor::commit`];
//! - **pending uploads**: images attached this session, not yet in object
//!   storage. An image attached to the draft travels with the draft and is
//!   lost with it; on commit it joins the page's pending upload. Both show
//!   through an inline preview handle.
//!
//! [`Editor::commit_and_save`] folds the draft in, uploads every pending
//! image, swaps the preview handles for public URLs and then writes the
//! whole document. A document is never written while it still references a
//! preview handle.

use crate::asset::{AssetError, DEFAULT_MAX_IMAGE_BYTES, PendingImage};
use crate::backend::{Backend, BackendError};
use crate::config::StudioConfig;
use crate::document::{DEFAULT_TOC_PREFIX_LEN, Document};
use crate::layout::Layout;
use crate::page::{ContentPatch, ImageRef, Page};
use crate::render::Renderer;
use chrono::Utc;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("no page is selected")]
    NoSelection,
    #[error("page {0} has no image slot")]
    NoImageSlot(usize),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("failed to upload the image of page {page}: {source}")]
    Upload { page: usize, source: BackendError },
    #[error("page {page} still references an unsaved image")]
    TemporaryImage { page: usize },
    #[error("failed to save document: {0}")]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone)]
pub struct EditorSettings {
    pub max_image_bytes: usize,
    pub asset_bucket: String,
    pub toc_prefix_len: usize,
}

impl EditorSettings {
    pub fn from_config(config: &StudioConfig) -> Self {
        Self {
            max_image_bytes: config.editor.max_image_bytes,
            asset_bucket: config.backend.asset_bucket.clone(),
            toc_prefix_len: config.editor.toc_prefix_len,
        }
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            asset_bucket: "ebook-images".into(),
            toc_prefix_len: DEFAULT_TOC_PREFIX_LEN,
        }
    }
}

pub struct Editor {
    document: Document,
    selected: Option<usize>,
    draft: Option<Page>,
    draft_image: Option<PendingImage>,
    pending: BTreeMap<usize, PendingImage>,
    settings: EditorSettings,
}

impl Editor {
    /// Start editing `document` with the first page selected.
    pub fn new(document: Document, settings: EditorSettings) -> Self {
        let mut editor = Self {
            document,
            selected: None,
            draft: None,
            draft_image: None,
            pending: BTreeMap::new(),
            settings,
        };
        editor.select_page(0);
        editor
    }

    /// Load the owner's document, or start from the default document when
    /// the owner has none yet.
    #[tracing::instrument(skip(backend, settings))]
    pub async fn load(
        backend: &dyn Backend,
        owner: &str,
        settings: EditorSettings,
    ) -> Result<Self, BackendError> {
        let document = match backend.get_document(owner).await? {
            Some(document) => {
                tracing::info!(pages = document.len(), "loaded document");
                document
            }
            None => {
                tracing::info!("no document yet, starting from the default");
                Document::new(owner)
            }
        };
        Ok(Self::new(document, settings))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn draft(&self) -> Option<&Page> {
        self.draft.as_ref()
    }

    /// Page indices with an image waiting for upload, including an image
    /// attached to the uncommitted draft.
    pub fn pending_pages(&self) -> Vec<usize> {
        let mut pages: Vec<usize> = self.pending.keys().copied().collect();
        if let (Some(index), Some(_)) = (self.selected, &self.draft_image) {
            if !pages.contains(&index) {
                pages.push(index);
                pages.sort_unstable();
            }
        }
        pages
    }

    /// Make `index` the page under edit. Any uncommitted draft is discarded.
    ///
    /// An out-of-range index leaves nothing selected; previews then show the
    /// "No page" placeholder.
    pub fn select_page(&mut self, index: usize) {
        self.draft_image = None;
        match self.document.page(index) {
            Some(page) => {
                self.selected = Some(index);
                self.draft = Some(page.clone());
            }
            None => {
                tracing::debug!(index, "selected page out of range");
                self.selected = None;
                self.draft = None;
            }
        }
    }

    /// Merge `patch` into the draft. The document is untouched.
    pub fn update_draft(&mut self, patch: ContentPatch) -> Result<(), EditError> {
        let draft = self.draft.as_mut().ok_or(EditError::NoSelection)?;
        draft.apply(patch);
        Ok(())
    }

    pub fn set_layout(&mut self, layout: Layout) -> Result<(), EditError> {
        self.update_draft(ContentPatch::new().layout(layout))
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.document.title = title.into();
    }

    /// Attach an image file to the selected page.
    ///
    /// The draft gets an inline preview immediately; the bytes wait in the
    /// draft until commit, then in the pending uploads until the next save.
    /// Replaces any image attached to the draft earlier.
    pub fn attach_image(&mut self, bytes: Vec<u8>, file_name: &str) -> Result<(), EditError> {
        let index = self.selected.ok_or(EditError::NoSelection)?;
        let draft = self.draft.as_mut().ok_or(EditError::NoSelection)?;
        if !draft.accepts_image() {
            return Err(EditError::NoImageSlot(index));
        }
        let image = PendingImage::from_bytes(bytes, file_name, self.settings.max_image_bytes)
            .inspect_err(|e| tracing::warn!(page = index, error = %e, "image rejected"))?;
        draft.set_image(Some(image.preview()), Some(image.size()));
        tracing::debug!(page = index, key = %image.storage_key(), "image attached");
        self.draft_image = Some(image);
        Ok(())
    }

    /// Remove the draft's image. The page's pending upload goes at commit.
    pub fn clear_image(&mut self) -> Result<(), EditError> {
        let index = self.selected.ok_or(EditError::NoSelection)?;
        let draft = self.draft.as_mut().ok_or(EditError::NoSelection)?;
        if !draft.set_image(None, None) {
            return Err(EditError::NoImageSlot(index));
        }
        self.draft_image = None;
        Ok(())
    }

    /// Append an empty content page and select it. Returns its index.
    pub fn append_content_page(&mut self) -> usize {
        self.document.pages.push(Page::content());
        let index = self.document.len() - 1;
        self.select_page(index);
        index
    }

    /// Fold the draft, and any image attached to it, into the document.
    pub fn commit(&mut self) {
        let (Some(index), Some(draft)) = (self.selected, &self.draft) else {
            return;
        };
        let Some(page) = self.document.pages.get_mut(index) else {
            return;
        };
        *page = draft.clone();
        if let Some(image) = self.draft_image.take() {
            self.pending.insert(index, image);
        }
    }

    /// Renderer showing the draft in place of the selected page.
    pub fn renderer(&self) -> Renderer<'_> {
        let renderer =
            Renderer::new(&self.document).with_toc_prefix_len(self.settings.toc_prefix_len);
        match (self.selected, &self.draft) {
            (Some(index), Some(draft)) => renderer.with_draft(index, draft),
            _ => renderer,
        }
    }

    /// Commit the draft, upload pending images and write the document.
    ///
    /// Stops at the first failure. A failed upload keeps its pending entry so
    /// the next save retries it. Returns the stored document id, which later
    /// saves update in place.
    #[tracing::instrument(skip_all, fields(owner = %self.document.owner))]
    pub async fn commit_and_save(&mut self, backend: &dyn Backend) -> Result<Uuid, SaveError> {
        self.commit();
        self.resolve_pending_images(backend).await?;

        if let Some(page) = self.document.temporary_image_pages().first() {
            return Err(SaveError::TemporaryImage { page: *page });
        }

        let previous = self.document.updated_at;
        self.document.updated_at = Some(Utc::now());
        let id = match backend.upsert_document(&self.document).await {
            Ok(id) => id,
            Err(e) => {
                self.document.updated_at = previous;
                tracing::error!(error = %e, "document save failed");
                return Err(e.into());
            }
        };
        self.document.id = Some(id);
        tracing::info!(%id, pages = self.document.len(), "document saved");
        Ok(id)
    }

    async fn resolve_pending_images(&mut self, backend: &dyn Backend) -> Result<(), SaveError> {
        // Only an entry whose preview is the committed image gets uploaded.
        let document = &self.document;
        self.pending.retain(|index, image| {
            document
                .page(*index)
                .and_then(Page::image)
                .is_some_and(|committed| *committed == image.preview())
        });

        // Inline images without an entry: written by older clients.
        for index in self.document.temporary_image_pages() {
            if self.pending.contains_key(&index) {
                continue;
            }
            let Some(ImageRef::Pending(url)) = self.document.pages[index].image() else {
                continue;
            };
            match PendingImage::from_data_url(url, "image", usize::MAX) {
                Ok(image) => {
                    self.pending.insert(index, image);
                }
                Err(e) => tracing::warn!(page = index, error = %e, "unreadable inline image"),
            }
        }

        let indices: Vec<usize> = self.pending.keys().copied().collect();
        for index in indices {
            let Some(image) = self.pending.get(&index) else {
                continue;
            };
            let key = image.storage_key();
            let url = backend
                .upload_asset(
                    &self.settings.asset_bucket,
                    &key,
                    image.bytes(),
                    image.content_type(),
                )
                .await
                .map_err(|source| {
                    tracing::error!(page = index, error = %source, "image upload failed");
                    SaveError::Upload {
                        page: index,
                        source,
                    }
                })?;
            tracing::info!(page = index, %key, "image uploaded");

            let size = image.size();
            let preview = image.preview();
            let url = ImageRef::Url(url);
            self.document.pages[index].set_image(Some(url.clone()), Some(size));
            if self.selected == Some(index) {
                if let Some(draft) = self.draft.as_mut() {
                    if draft.image() == Some(&preview) {
                        draft.set_image(Some(url), Some(size));
                    }
                }
            }
            self.pending.remove(&index);
        }
        Ok(())
    }
}
