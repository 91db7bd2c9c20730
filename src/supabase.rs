//! Client for the hosted backend: REST tables under `/rest/v1` and object
//! storage under `/storage/v1`.
//!
//! | Operation | Request |
//! |---|---|
//! | `get_document` | `GET /rest/v1/<ebooks>?user_id=eq.<owner>&order=updated_at.desc&limit=1` |
//! | `upsert_document` (new) | `POST /rest/v1/<ebooks>?on_conflict=user_id` with `Prefer: resolution=merge-duplicates` |
//! | `upsert_document` (known id) | `PATCH /rest/v1/<ebooks>?id=eq.<id>` |
//! | `upload_asset` | `POST /storage/v1/object/<bucket>/<key>` with `x-upsert: true` |
//! | `list_rows` | `GET /rest/v1/<table>?order=<col>.<dir>&limit=<n>` |
//! | `insert_row` | `POST /rest/v1/<table>` |
//! | `delete_row` | `DELETE /rest/v1/<table>?id=eq.<id>` |
//!
//! Every request carries the project API key both as `apikey` and as the
//! bearer token.

use crate::backend::{Backend, BackendError, Order};
use crate::config::BackendConfig;
use crate::document::Document;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use uuid::Uuid;

pub struct SupabaseBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    document_table: String,
}

impl SupabaseBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        document_table: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            document_table: document_table.into(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        if config.url.trim().is_empty() {
            return Err(BackendError::NotConfigured("backend.url is empty".into()));
        }
        if config.api_key.trim().is_empty() {
            return Err(BackendError::NotConfigured("backend.api_key is empty".into()));
        }
        Ok(Self::new(&config.url, &config.api_key, &config.ebook_table))
    }

    /// Public URL of an object in a public bucket.
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{key}", self.base_url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, &format!("/rest/v1/{table}"))
    }
}

/// Turn non-2xx responses into [`BackendError::Status`].
async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

fn first_row(rows: Vec<Value>, table: &str) -> Result<Value, BackendError> {
    rows.into_iter().next().ok_or_else(|| BackendError::RowNotFound {
        table: table.to_string(),
        id: "<returned row>".into(),
    })
}

#[async_trait]
impl Backend for SupabaseBackend {
    #[tracing::instrument(skip(self))]
    async fn get_document(&self, owner: &str) -> Result<Option<Document>, BackendError> {
        let response = self
            .table(Method::GET, &self.document_table)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{owner}")),
                ("order", "updated_at.desc".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<Document> = check(response).await?.json().await?;
        tracing::debug!(found = !rows.is_empty(), "document lookup finished");
        Ok(rows.into_iter().next())
    }

    #[tracing::instrument(skip_all, fields(owner = %document.owner, pages = document.pages.len()))]
    async fn upsert_document(&self, document: &Document) -> Result<Uuid, BackendError> {
        let (builder, prefer) = match document.id {
            Some(id) => (
                self.table(Method::PATCH, &self.document_table)
                    .query(&[("id", format!("eq.{id}"))]),
                "return=representation",
            ),
            None => (
                self.table(Method::POST, &self.document_table)
                    .query(&[("on_conflict", "user_id")]),
                "resolution=merge-duplicates,return=representation",
            ),
        };
        let response = builder
            .header("Prefer", prefer)
            .json(document)
            .send()
            .await?;
        let rows: Vec<Document> = check(response).await?.json().await?;
        let stored = rows
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::RowNotFound {
                table: self.document_table.clone(),
                id: document
                    .id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| document.owner.clone()),
            })?;
        stored.id.ok_or_else(|| BackendError::RowNotFound {
            table: self.document_table.clone(),
            id: "<missing id column>".into(),
        })
    }

    #[tracing::instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    async fn upload_asset(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, BackendError> {
        let response = self
            .request(Method::POST, &format!("/storage/v1/object/{bucket}/{key}"))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes.to_vec())
            .send()
            .await?;
        check(response).await.map_err(|e| BackendError::Storage {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(self.public_url(bucket, key))
    }

    #[tracing::instrument(skip(self))]
    async fn list_rows(
        &self,
        table: &str,
        order: &Order,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, BackendError> {
        let direction = if order.descending { "desc" } else { "asc" };
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", format!("{}.{direction}", order.column)),
        ];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let response = self.table(Method::GET, table).query(&query).send().await?;
        Ok(check(response).await?.json().await?)
    }

    #[tracing::instrument(skip(self, row))]
    async fn insert_row(&self, table: &str, row: &Value) -> Result<Value, BackendError> {
        let response = self
            .table(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let rows: Vec<Value> = check(response).await?.json().await?;
        first_row(rows, table)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_row(&self, table: &str, id: i64) -> Result<(), BackendError> {
        let response = self
            .table(Method::DELETE, table)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
