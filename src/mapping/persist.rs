//! Best-effort cross-run persistence of resolved remote resource ids.
//!
//! The sync run never depends on this channel for correctness (it already
//! holds every resolved id in memory); it exists purely so a later run can
//! upsert by id instead of re-resolving by slug. Callers are required to
//! consume the returned `Result` and log failures instead of propagating
//! them.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::core::models::ResourceIdMapping;
use crate::nuclia::ApiError;

const SECRET_HEADER: &str = "x-sync-secret";

#[async_trait]
pub trait MappingPersist: Send + Sync {
    /// Fetch previously persisted file-to-resource-id mappings for a set of
    /// file ids.
    async fn fetch_known(&self, file_ids: &[String]) -> Result<HashMap<String, String>, ApiError>;

    /// Persist newly resolved mappings.
    async fn flush(&self, entries: &[ResourceIdMapping]) -> Result<(), ApiError>;
}

/// HTTP implementation posting to the sibling persistence endpoints,
/// optionally guarded by a shared-secret header.
pub struct HttpMappingPersist {
    http: Client,
    base_url: String,
    secret: Option<String>,
}

impl HttpMappingPersist {
    #[must_use]
    pub fn new(base_url: String, secret: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), secret }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let mut req = self.http.post(format!("{}{path}", self.base_url)).json(body);
        if let Some(secret) = &self.secret {
            req = req.header(SECRET_HEADER, secret);
        }
        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => return Err(ApiError::Network { message: e.to_string() }),
        };
        let status = resp.status();
        let data: Value = resp.json().await.unwrap_or_else(|_| json!({}));
        if status.is_success() {
            Ok(data)
        } else {
            Err(ApiError::Http { status: status.as_u16(), data })
        }
    }
}

#[async_trait]
impl MappingPersist for HttpMappingPersist {
    async fn fetch_known(&self, file_ids: &[String]) -> Result<HashMap<String, String>, ApiError> {
        if file_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let body = json!({ "fileIds": file_ids });
        let data = self.post("/fetch", &body).await?;

        let mut known = HashMap::new();
        if let Some(entries) = data.get("mappings").and_then(Value::as_array) {
            for entry in entries {
                if let (Some(file_id), Some(resource_id)) = (
                    entry.get("fileId").and_then(Value::as_str),
                    entry.get("nucliaResourceId").and_then(Value::as_str),
                ) {
                    known.insert(file_id.to_string(), resource_id.to_string());
                }
            }
        }
        Ok(known)
    }

    async fn flush(&self, entries: &[ResourceIdMapping]) -> Result<(), ApiError> {
        if entries.is_empty() {
            return Ok(());
        }
        let body = json!({ "mappings": entries });
        self.post("/persist", &body).await?;
        Ok(())
    }
}

/// Used when no persistence endpoint is configured: every run resolves by
/// slug from scratch.
pub struct NoopMappingPersist;

#[async_trait]
impl MappingPersist for NoopMappingPersist {
    async fn fetch_known(&self, _file_ids: &[String]) -> Result<HashMap<String, String>, ApiError> {
        Ok(HashMap::new())
    }

    async fn flush(&self, _entries: &[ResourceIdMapping]) -> Result<(), ApiError> {
        Ok(())
    }
}
