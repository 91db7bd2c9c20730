//! CLI output formatting.
//!
//! Every command has a `format_*` function that returns lines (pure, no
//! I/O) and the binary prints them. Entities follow the same two-level
//! shape everywhere: a header line with a positional index and title, then
//! indented context lines.
//!
//! ```text
//! Spring Catalog (5 pages)
//! 001 Cover
//!     Image: https://…/cover.png
//! 004 Content page 1 [layout3]
//!     Text: "Spring is the season of…"
//!     Image: pending upload
//! ```

use crate::catalog::{Book, Event};
use crate::document::Document;
use crate::export::ExportReport;
use crate::page::{ImageRef, Page, non_empty};

/// Characters of free text shown per context line.
const PREVIEW_LEN: usize = 40;

fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Cut `text` to `max` characters, appending `…` if cut.
fn truncate(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{cut}…")
    }
}

fn image_line(image: Option<&ImageRef>) -> Option<String> {
    image.map(|image| match image {
        ImageRef::Url(url) => format!("{}Image: {url}", indent(1)),
        ImageRef::Pending(_) => format!("{}Image: pending upload", indent(1)),
    })
}

/// Page inventory of a document.
pub fn format_page_list(document: &Document) -> Vec<String> {
    let title = if document.title.is_empty() {
        "(untitled)"
    } else {
        document.title.as_str()
    };
    let mut lines = vec![format!("{title} ({} pages)", document.len())];
    for (index, page) in document.pages.iter().enumerate() {
        let label = document
            .page_label(index)
            .and_then(|l| l.split_once(". ").map(|(_, name)| name.to_string()))
            .unwrap_or_default();
        match page {
            Page::Content(body) => {
                lines.push(format!(
                    "{} {label} [{}]",
                    format_index(index + 1),
                    body.layout
                ));
                for text in [&body.text1, &body.text2] {
                    if let Some(text) = non_empty(text) {
                        lines.push(format!(
                            "{}Text: \"{}\"",
                            indent(1),
                            truncate(text, PREVIEW_LEN)
                        ));
                    }
                }
            }
            Page::CompanyIntro(intro) => {
                lines.push(format!("{} {label}", format_index(index + 1)));
                if !intro.description.trim().is_empty() {
                    lines.push(format!(
                        "{}Text: \"{}\"",
                        indent(1),
                        truncate(&intro.description, PREVIEW_LEN)
                    ));
                }
            }
            Page::Cover(_) | Page::TableOfContents(_) => {
                lines.push(format!("{} {label}", format_index(index + 1)));
            }
        }
        lines.extend(image_line(page.image()));
    }
    lines
}

/// Summary of a finished export.
///
/// ```text
/// Wrote Spring Catalog.pdf (3 pages, 182 KB)
/// Skipped pages: 003
/// ```
pub fn format_export_report(report: &ExportReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Wrote {} ({} pages, {} KB)",
        report.file_name,
        report.included.len(),
        report.pdf.len().div_ceil(1024)
    )];
    if !report.skipped.is_empty() {
        let skipped: Vec<String> = report
            .skipped
            .iter()
            .map(|i| format_index(i + 1))
            .collect();
        lines.push(format!("Skipped pages: {}", skipped.join(", ")));
    }
    lines
}

pub fn format_books(books: &[Book]) -> Vec<String> {
    let mut lines = Vec::new();
    for (pos, book) in books.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(pos + 1),
            book.title,
            book.published_at
        ));
        if let Some(id) = book.id {
            lines.push(format!("{}Id: {id}", indent(1)));
        }
        if !book.genre.is_empty() {
            lines.push(format!("{}Genre: {}", indent(1), book.genre));
        }
        if let Some(url) = book.image_url.as_deref().filter(|u| !u.is_empty()) {
            lines.push(format!("{}Image: {url}", indent(1)));
        }
    }
    if lines.is_empty() {
        lines.push("No books".to_string());
    }
    lines
}

pub fn format_events(events: &[Event]) -> Vec<String> {
    let mut lines = Vec::new();
    for (pos, event) in events.iter().enumerate() {
        let when = match (&event.date, non_empty(&event.time)) {
            (Some(date), Some(time)) => format!(" ({date} {time})"),
            (Some(date), None) => format!(" ({date})"),
            (None, _) => String::new(),
        };
        lines.push(format!("{} {}{when}", format_index(pos + 1), event.title));
        if let Some(id) = event.id {
            lines.push(format!("{}Id: {id}", indent(1)));
        }
        let context = [
            ("Subtitle", &event.subtitle),
            ("Program", &event.program_type),
            ("Location", &event.location),
            ("Link", &event.link),
        ];
        for (name, value) in context {
            if let Some(value) = non_empty(value) {
                lines.push(format!("{}{name}: {}", indent(1), truncate(value, PREVIEW_LEN)));
            }
        }
    }
    if lines.is_empty() {
        lines.push("No events".to_string());
    }
    lines
}
