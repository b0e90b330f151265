use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One unit of queued sync work. Ephemeral: lives only as long as the
/// in-process queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTask {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub payload: Value,
    #[serde(rename = "retryCount", default)]
    pub retry_count: u32,
}

impl SyncTask {
    #[must_use]
    pub fn new(user_id: &str, payload: Value) -> Self {
        Self {
            id: generate_task_id(),
            user_id: user_id.to_string(),
            payload,
            retry_count: 0,
        }
    }
}

/// Task ids are timestamp-first so log lines sort chronologically.
#[must_use]
pub fn generate_task_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// How a remote resource was obtained during an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Patched,
    Created,
    Exists,
}

/// Result of one run through the patch/create/fetch-on-conflict ladder.
#[derive(Debug, Clone)]
pub struct ResourceUpsert {
    pub action: UpsertAction,
    pub resource_id: String,
    pub resource: Value,
}

/// Final result of a successful sync task.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub action: UpsertAction,
    pub resource: Value,
    #[serde(rename = "textField")]
    pub text_field: Value,
}

/// One cross-service identifier mapping entry, flushed best-effort to the
/// sibling persistence endpoint so later runs can skip slug resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdMapping {
    #[serde(rename = "fileId", skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(rename = "clerkId", skip_serializing_if = "Option::is_none")]
    pub clerk_id: Option<String>,
    #[serde(rename = "nucliaResourceId")]
    pub resource_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}
