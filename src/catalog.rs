//! Book and event catalog administration.
//!
//! Both catalogs are plain backend tables with an image bucket next to them.
//! Creating a record uploads its image first (when one is given) and stores
//! the public URL in `image_url`; listings are newest first.

use crate::asset::PendingImage;
use crate::backend::{Backend, BackendError, Order};
use crate::config::BackendConfig;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("title is required")]
    MissingTitle,
    #[error("failed to upload image: {0}")]
    Upload(BackendError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("malformed row: {0}")]
    Json(#[from] serde_json::Error),
}

/// A row type stored in a catalog table.
pub trait Record: Serialize + DeserializeOwned {
    /// Column listings are sorted by, newest first.
    const ORDER_COLUMN: &'static str;

    fn title(&self) -> &str;
    fn set_image_url(&mut self, url: String);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub published_at: NaiveDate,
}

impl Record for Book {
    const ORDER_COLUMN: &'static str = "published_at";

    fn title(&self) -> &str {
        &self.title
    }

    fn set_image_url(&mut self, url: String) {
        self.image_url = Some(url);
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    /// Free-form, e.g. `19:00`.
    pub time: Option<String>,
    pub location: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
    pub program_type: Option<String>,
}

impl Record for Event {
    const ORDER_COLUMN: &'static str = "date";

    fn title(&self) -> &str {
        &self.title
    }

    fn set_image_url(&mut self, url: String) {
        self.image_url = Some(url);
    }
}

/// One catalog table and its image bucket.
pub struct Collection<'a, R> {
    backend: &'a dyn Backend,
    table: String,
    bucket: String,
    _record: PhantomData<fn() -> R>,
}

impl<'a> Collection<'a, Book> {
    pub fn books(backend: &'a dyn Backend, config: &BackendConfig) -> Self {
        Self::new(backend, &config.book_table, &config.book_bucket)
    }
}

impl<'a> Collection<'a, Event> {
    pub fn events(backend: &'a dyn Backend, config: &BackendConfig) -> Self {
        Self::new(backend, &config.event_table, &config.event_bucket)
    }
}

impl<'a, R: Record> Collection<'a, R> {
    pub fn new(backend: &'a dyn Backend, table: &str, bucket: &str) -> Self {
        Self {
            backend,
            table: table.to_string(),
            bucket: bucket.to_string(),
            _record: PhantomData,
        }
    }

    /// Newest first, at most `limit` rows.
    pub async fn list(&self, limit: Option<usize>) -> Result<Vec<R>, CatalogError> {
        let rows = self
            .backend
            .list_rows(&self.table, &Order::desc(R::ORDER_COLUMN), limit)
            .await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(CatalogError::from))
            .collect()
    }

    /// Upload `image` (if any), then insert the record. Returns the stored row.
    #[tracing::instrument(skip_all, fields(table = %self.table))]
    pub async fn create(
        &self,
        mut record: R,
        image: Option<PendingImage>,
    ) -> Result<R, CatalogError> {
        if record.title().trim().is_empty() {
            return Err(CatalogError::MissingTitle);
        }
        if let Some(image) = image {
            let url = self
                .backend
                .upload_asset(
                    &self.bucket,
                    &image.storage_key(),
                    image.bytes(),
                    image.content_type(),
                )
                .await
                .map_err(CatalogError::Upload)?;
            record.set_image_url(url);
        }
        let row = serde_json::to_value(&record)?;
        let stored = self.backend.insert_row(&self.table, &row).await?;
        tracing::info!(id = ?stored.get("id"), "record created");
        Ok(serde_json::from_value(stored)?)
    }

    #[tracing::instrument(skip(self), fields(table = %self.table))]
    pub async fn delete(&self, id: i64) -> Result<(), CatalogError> {
        self.backend.delete_row(&self.table, id).await?;
        tracing::info!("record deleted");
        Ok(())
    }
}
