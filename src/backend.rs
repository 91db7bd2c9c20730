//! Persistence adapter.
//!
//! Everything the studio stores lives in a hosted backend: relational tables
//! for documents, books and events, and object storage for images. The
//! [`Backend`] trait is the only seam between the editor and that service.
//! A backend client is constructed once and handed to whatever needs it.
//!
//! Implementations:
//! - [`SupabaseBackend`](crate::supabase::SupabaseBackend) — the hosted REST
//!   tables and storage buckets.
//! - [`MemoryBackend`] — in-process maps, used by tests and dry runs.

use crate::document::Document;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend is not configured: {0}")]
    NotConfigured(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage upload failed for '{key}': {message}")]
    Storage { key: String, message: String },
    #[error("row not found: {table}/{id}")]
    RowNotFound { table: String, id: String },
}

/// Sort order for row listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch the owner's document. `Ok(None)` when the owner has none yet.
    async fn get_document(&self, owner: &str) -> Result<Option<Document>, BackendError>;

    /// Write the whole document.
    ///
    /// Updates by `document.id` when it is set; otherwise inserts, or
    /// replaces the owner's existing row. Returns the row id.
    async fn upsert_document(&self, document: &Document) -> Result<Uuid, BackendError>;

    /// Store bytes under `bucket/key` and return their public URL.
    async fn upload_asset(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, BackendError>;

    async fn list_rows(
        &self,
        table: &str,
        order: &Order,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, BackendError>;

    /// Insert a row and return it as stored (with its generated id).
    async fn insert_row(&self, table: &str, row: &Value) -> Result<Value, BackendError>;

    async fn delete_row(&self, table: &str, id: i64) -> Result<(), BackendError>;
}

#[derive(Default)]
struct MemoryState {
    documents: HashMap<Uuid, Document>,
    assets: BTreeMap<String, (Vec<u8>, String)>,
    tables: HashMap<String, Vec<Value>>,
    next_row_id: i64,
    failing_uploads: usize,
}

/// Backend held entirely in memory.
///
/// Uploaded assets get `memory://<bucket>/<key>` URLs.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` uploads fail.
    pub fn fail_next_uploads(&self, n: usize) {
        self.lock().failing_uploads = n;
    }

    /// Bytes and content type stored under `bucket/key`.
    pub fn asset(&self, bucket: &str, key: &str) -> Option<(Vec<u8>, String)> {
        self.lock().assets.get(&format!("{bucket}/{key}")).cloned()
    }

    pub fn asset_count(&self) -> usize {
        self.lock().assets.len()
    }

    pub fn document_count(&self) -> usize {
        self.lock().documents.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_document(&self, owner: &str) -> Result<Option<Document>, BackendError> {
        Ok(self
            .lock()
            .documents
            .values()
            .filter(|d| d.owner == owner)
            .max_by_key(|d| d.updated_at)
            .cloned())
    }

    async fn upsert_document(&self, document: &Document) -> Result<Uuid, BackendError> {
        let mut state = self.lock();
        let id = match document.id {
            Some(id) => {
                if !state.documents.contains_key(&id) {
                    return Err(BackendError::RowNotFound {
                        table: "ebooks".into(),
                        id: id.to_string(),
                    });
                }
                id
            }
            None => state
                .documents
                .values()
                .find(|d| d.owner == document.owner)
                .and_then(|d| d.id)
                .unwrap_or_else(Uuid::new_v4),
        };
        let mut stored = document.clone();
        stored.id = Some(id);
        state.documents.insert(id, stored);
        Ok(id)
    }

    async fn upload_asset(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, BackendError> {
        let mut state = self.lock();
        if state.failing_uploads > 0 {
            state.failing_uploads -= 1;
            return Err(BackendError::Storage {
                key: key.to_string(),
                message: "simulated upload failure".into(),
            });
        }
        let path = format!("{bucket}/{key}");
        state
            .assets
            .insert(path.clone(), (bytes.to_vec(), content_type.to_string()));
        Ok(format!("memory://{path}"))
    }

    async fn list_rows(
        &self,
        table: &str,
        order: &Order,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, BackendError> {
        let mut rows = self.lock().tables.get(table).cloned().unwrap_or_default();
        rows.sort_by(|a, b| {
            let ordering = compare_json(&a[&order.column], &b[&order.column]);
            if order.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert_row(&self, table: &str, row: &Value) -> Result<Value, BackendError> {
        let mut state = self.lock();
        state.next_row_id += 1;
        let mut stored = row.clone();
        if let Value::Object(map) = &mut stored {
            map.insert("id".into(), Value::from(state.next_row_id));
        }
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn delete_row(&self, table: &str, id: i64) -> Result<(), BackendError> {
        let mut state = self.lock();
        let rows = state.tables.entry(table.to_string()).or_default();
        let before = rows.len();
        rows.retain(|r| r["id"].as_i64() != Some(id));
        if rows.len() == before {
            return Err(BackendError::RowNotFound {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// Order JSON scalars the way the REST backend orders columns: numbers
/// numerically, everything else by its string form.
fn compare_json(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}
