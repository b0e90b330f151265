//! HTTP gateway to the remote knowledge-base service.
//!
//! Every operation normalizes transport and HTTP-level failures into an
//! [`ApiError`](super::ApiError) value; nothing here panics or propagates a
//! crate-level error. A single bearer credential is attached to every
//! request and only ever logged masked.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{ApiError, ApiResult, KbApi};
use crate::core::config::{AppConfig, mask_token};

pub struct NucliaClient {
    http: Client,
    base_url: String,
    token: String,
}

impl NucliaClient {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let mut builder = Client::builder().timeout(Duration::from_secs(30));
        if config.skip_tls_verify {
            warn!("TLS certificate verification disabled; development use only");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build().unwrap_or_else(|_| Client::new());
        debug!(
            "Knowledge-base gateway ready for {} (token {})",
            config.api_base_url,
            mask_token(&config.api_token)
        );
        Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        }
    }

    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResult {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url).bearer_auth(&self.token);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => return Err(ApiError::Network { message: e.to_string() }),
        };

        let status = resp.status();
        let raw = match resp.text().await {
            Ok(raw) => raw,
            Err(e) => return Err(ApiError::Network { message: e.to_string() }),
        };

        // The service sometimes answers with empty or non-JSON bodies; keep
        // whatever came back probe-able.
        let data = if raw.is_empty() {
            json!({})
        } else {
            serde_json::from_str(&raw).unwrap_or_else(|_| json!({ "message": raw }))
        };

        if status.is_success() {
            Ok(data)
        } else {
            Err(ApiError::Http { status: status.as_u16(), data })
        }
    }
}

#[async_trait]
impl KbApi for NucliaClient {
    async fn get_kb_by_slug(&self, slug: &str) -> ApiResult {
        self.request(Method::GET, &format!("/kbs/slug/{slug}"), None).await
    }

    async fn create_kb(&self, payload: &Value) -> ApiResult {
        self.request(Method::POST, "/kbs", Some(payload)).await
    }

    async fn list_resources(&self, kb: &str, page_size: u32) -> ApiResult {
        self.request(Method::GET, &format!("/kb/{kb}/resources?page_size={page_size}"), None)
            .await
    }

    async fn get_resource_by_slug(&self, kb: &str, slug: &str) -> ApiResult {
        self.request(Method::GET, &format!("/kb/{kb}/slug/{slug}"), None).await
    }

    async fn create_resource(&self, kb: &str, payload: &Value) -> ApiResult {
        self.request(Method::POST, &format!("/kb/{kb}/resources"), Some(payload)).await
    }

    async fn patch_resource_by_slug(&self, kb: &str, slug: &str, payload: &Value) -> ApiResult {
        self.request(Method::PATCH, &format!("/kb/{kb}/slug/{slug}"), Some(payload)).await
    }

    async fn patch_resource_by_id(&self, kb: &str, id: &str, payload: &Value) -> ApiResult {
        self.request(Method::PATCH, &format!("/kb/{kb}/resource/{id}"), Some(payload)).await
    }

    async fn put_text_field_by_slug(
        &self,
        kb: &str,
        slug: &str,
        field: &str,
        payload: &Value,
    ) -> ApiResult {
        self.request(Method::PUT, &format!("/kb/{kb}/slug/{slug}/text/{field}"), Some(payload))
            .await
    }

    async fn put_text_field_by_id(
        &self,
        kb: &str,
        id: &str,
        field: &str,
        payload: &Value,
    ) -> ApiResult {
        self.request(Method::PUT, &format!("/kb/{kb}/resource/{id}/text/{field}"), Some(payload))
            .await
    }
}
