//! Remote knowledge-base gateway: the uniform non-throwing result shape,
//! conflict detection over the service's inconsistent response envelopes,
//! and the HTTP client itself.

pub mod client;
pub mod extract;

pub use client::NucliaClient;
pub use extract::extract_resource_id;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Value, json};

/// A gateway-level failure. Never thrown across the gateway boundary:
/// callers receive it as a plain value and implement conflict resolution as
/// conditional logic.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// The remote answered with a non-2xx status; `data` is the decoded body
    /// (or `{"message": <raw text>}` when it wasn't JSON).
    Http { status: u16, data: Value },
    /// The request never produced an HTTP response (DNS, TLS, timeout).
    Network { message: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Http { status, data } => write!(f, "HTTP {status}: {data}"),
            ApiError::Network { message } => write!(f, "network_error: {message}"),
        }
    }
}

pub type ApiResult = Result<Value, ApiError>;

/// View a gateway outcome as the envelope shape callers probe for ids and
/// error codes: HTTP failures become `{"error": <status>, "data": <body>}`,
/// network failures `{"error": "network_error", "message": ...}`, successes
/// stay as-is.
#[must_use]
pub fn outcome_envelope(outcome: &ApiResult) -> Value {
    match outcome {
        Ok(body) => body.clone(),
        Err(ApiError::Http { status, data }) => json!({ "error": status, "data": data }),
        Err(ApiError::Network { message }) => {
            json!({ "error": "network_error", "message": message })
        }
    }
}

/// True iff the outcome carries one of the two observed 409 envelopes:
/// top-level `error == 409` or nested `created.error == 409`. Both must
/// trigger the fetch-by-slug fallback independently.
#[must_use]
pub fn conflict_signalled(outcome: &ApiResult) -> bool {
    let envelope = outcome_envelope(outcome);
    is_409(envelope.get("error")) || is_409(envelope.get("created").and_then(|c| c.get("error")))
}

fn is_409(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Number(n)) => n.as_u64() == Some(409),
        Some(Value::String(s)) => s == "409",
        _ => false,
    }
}

/// One method per remote endpoint the worker depends on. `NucliaClient` is
/// the production implementation; tests script their own.
#[async_trait]
pub trait KbApi: Send + Sync {
    async fn get_kb_by_slug(&self, slug: &str) -> ApiResult;
    async fn create_kb(&self, payload: &Value) -> ApiResult;
    async fn list_resources(&self, kb: &str, page_size: u32) -> ApiResult;
    async fn get_resource_by_slug(&self, kb: &str, slug: &str) -> ApiResult;
    async fn create_resource(&self, kb: &str, payload: &Value) -> ApiResult;
    async fn patch_resource_by_slug(&self, kb: &str, slug: &str, payload: &Value) -> ApiResult;
    async fn patch_resource_by_id(&self, kb: &str, id: &str, payload: &Value) -> ApiResult;
    async fn put_text_field_by_slug(
        &self,
        kb: &str,
        slug: &str,
        field: &str,
        payload: &Value,
    ) -> ApiResult;
    async fn put_text_field_by_id(
        &self,
        kb: &str,
        id: &str,
        field: &str,
        payload: &Value,
    ) -> ApiResult;
}
