//! # Ebook Studio
//!
//! Page composition, preview and PDF export for a small publishing studio's
//! ebook maker, plus the book and event catalogs of its admin console.
//!
//! A document is an ordered list of A4 pages: cover, company intro, table of
//! contents, then any number of content pages laid out in one of four fixed
//! templates. Documents and images live in a hosted backend; this crate owns
//! everything between loading a document and handing over a finished PDF.
//!
//! # Architecture: Edit, Render, Export
//!
//! ```text
//! Backend ──load──▶ Editor (document + draft + pending images) ──save──▶ Backend
//!                      │
//!                      ▼
//!                  Renderer ──print surface──▶ PageCapture ──raster──▶ pdf::assemble
//! ```
//!
//! - The **editor** is the only thing that mutates a document. Edits go to a
//!   draft of the selected page; the document changes on commit; the backend
//!   sees the whole document on save.
//! - The **renderer** is pure. The same markup serves the editor preview, the
//!   fullscreen viewer and print capture; only the scale and the content
//!   source differ.
//! - The **export pipeline** captures pages one at a time in document order,
//!   with a bounded retry per page, and assembles the rasters into a PDF.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`page`] | Page kinds as a tagged union, image references, draft patches |
//! | [`layout`] | The four content layouts and their slot arrangements |
//! | [`document`] | Ordered pages, default front matter, table-of-contents derivation |
//! | [`editor`] | Selection, draft, pending images, commit and save |
//! | [`asset`] | Image validation, preview handles, content-addressed storage keys |
//! | [`render`] | Maud markup for edit preview, viewer frames and print capture |
//! | [`viewer`] | Fullscreen viewer state machine: paging, zoom, overlays, bookmarks |
//! | [`retry`] | Retry policy and async retry combinator |
//! | [`capture`] | `PageCapture` trait and the headless Chrome implementation |
//! | [`pdf`] | Rasters → A4 PDF with `lopdf` |
//! | [`export`] | Ordered capture loop, failure policy, export report |
//! | [`backend`] | `Backend` trait and the in-memory backend |
//! | [`supabase`] | Hosted backend client: REST tables and object storage |
//! | [`catalog`] | Book and event catalog administration |
//! | [`config`] | `ebook.toml` loading, stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Pages Are a Sum Type
//!
//! Each page kind carries only its own fields, so a cover can't hold a layout
//! and a content page can't hold a description. The wire format stays the
//! `{type, content}` row shape the backend has always stored; serde maps
//! between the two.
//!
//! ## Preview Handles Never Reach the Backend
//!
//! A freshly attached image is shown through an inline `data:` URL until it
//! is uploaded. [`ImageRef`](page::ImageRef) makes the two states distinct
//! types of reference, and [`editor::Editor::commit_and_save`] refuses to
//! write a document that still holds a preview handle.
//!
//! ## One Renderer for Screen and Print
//!
//! Sheets are always laid out at their A4 pixel size and scaled with a CSS
//! transform. What the editor preview shows is what the PDF gets.
//!
//! ## Short PDFs Are Never Silent
//!
//! A page that can't be captured is either skipped or aborts the export,
//! depending on configuration. The export report always lists the skipped
//! source pages.

pub mod asset;
pub mod backend;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod document;
pub mod editor;
pub mod export;
pub mod layout;
pub mod output;
pub mod page;
pub mod pdf;
pub mod render;
pub mod retry;
pub mod supabase;
pub mod viewer;

#[cfg(test)]
pub(crate) mod test_helpers;
