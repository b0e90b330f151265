//! The sync task processor: resolve the knowledge base, upsert the per-user
//! profile resource, write its text body, then fan out over attached files.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::core::models::{ResourceIdMapping, ResourceUpsert, SyncOutcome, SyncTask, UpsertAction};
use crate::errors::SyncError;
use crate::kb::{KbResolver, ResolvedKb};
use crate::mapping::persist::MappingPersist;
use crate::nuclia::{KbApi, conflict_signalled, extract_resource_id, outcome_envelope};
use crate::summary;
use crate::utils::slug::{file_slug, user_slug};

/// Text field id on the per-user profile resource.
pub const PROFILE_TEXT_FIELD: &str = "profile";
/// Text field id on file sub-resources.
pub const FILE_TEXT_FIELD: &str = "extracted";

const SYNC_SOURCE_TAG: &str = "studyhub-profile-sync";
const LIST_PAGE_SIZE: u32 = 100;

/// Seam between the queue and the processor; tests drive the queue with
/// scripted handlers.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn process(&self, task: &SyncTask) -> Result<SyncOutcome, SyncError>;
}

pub struct SyncProcessor {
    api: Arc<dyn KbApi>,
    resolver: KbResolver,
    persist: Arc<dyn MappingPersist>,
}

impl SyncProcessor {
    #[must_use]
    pub fn new(api: Arc<dyn KbApi>, resolver: KbResolver, persist: Arc<dyn MappingPersist>) -> Self {
        Self { api, resolver, persist }
    }

    /// Run one full sync for a user: KB resolution, profile upsert, text
    /// write, file fan-out, best-effort id persistence.
    pub async fn process_sync(&self, user_id: &str, payload: &Value) -> Result<SyncOutcome, SyncError> {
        let kb = self.resolver.resolve().await?;
        let slug = user_slug(user_id);
        let resource_payload = build_profile_payload(user_id, &slug, payload);

        let upsert = self.upsert_resource(&kb.id, &slug, &resource_payload, None).await?;
        info!(
            "Profile resource for {user_id} resolved as {} ({:?})",
            upsert.resource_id, upsert.action
        );

        let text = summary::render(user_id, payload);
        let text_payload = json!({ "body": text, "format": "PLAIN" });
        let put = self
            .put_text(&kb.id, Some(&upsert.resource_id), &slug, PROFILE_TEXT_FIELD, &text_payload)
            .await;
        // A resource without its text body is useless to the index, so this
        // failure fails the task.
        let text_field = match put {
            Ok(body) => body,
            Err(e) => {
                return Err(SyncError::TextWriteFailed {
                    target: upsert.resource_id.clone(),
                    detail: e.to_string(),
                });
            }
        };

        self.sync_files(&kb, user_id, &slug, payload, &upsert.resource_id).await;

        Ok(SyncOutcome { action: upsert.action, resource: upsert.resource, text_field })
    }

    /// The idempotent upsert ladder: optional patch-by-id when the remote id
    /// is already known, then patch-by-slug, then create, then
    /// fetch-by-slug when the create reports a conflict. Any sequence of
    /// repeated calls for the same slug converges on one resource id.
    pub async fn upsert_resource(
        &self,
        kb: &str,
        slug: &str,
        payload: &Value,
        known_id: Option<&str>,
    ) -> Result<ResourceUpsert, SyncError> {
        if let Some(id) = known_id {
            match self.api.patch_resource_by_id(kb, id, payload).await {
                Ok(body) => {
                    return Ok(ResourceUpsert {
                        action: UpsertAction::Patched,
                        resource_id: id.to_string(),
                        resource: body,
                    });
                }
                Err(e) => {
                    warn!("Patch by known id {id} failed ({e}); falling back to slug ladder");
                }
            }
        }

        let patched = self.api.patch_resource_by_slug(kb, slug, payload).await;
        let patched_envelope = outcome_envelope(&patched);
        if let Some(id) = extract_resource_id(&patched_envelope) {
            return Ok(ResourceUpsert {
                action: UpsertAction::Patched,
                resource_id: id,
                resource: patched_envelope,
            });
        }

        let created = self.api.create_resource(kb, payload).await;
        let created_envelope = outcome_envelope(&created);
        if let Some(id) = extract_resource_id(&created_envelope) {
            return Ok(ResourceUpsert {
                action: UpsertAction::Created,
                resource_id: id,
                resource: created_envelope,
            });
        }

        if conflict_signalled(&created) {
            let fetched = self.api.get_resource_by_slug(kb, slug).await;
            let fetched_envelope = outcome_envelope(&fetched);
            if let Some(id) = extract_resource_id(&fetched_envelope) {
                return Ok(ResourceUpsert {
                    action: UpsertAction::Exists,
                    resource_id: id,
                    resource: fetched_envelope,
                });
            }
            return Err(SyncError::UnresolvedConflict {
                slug: slug.to_string(),
                diagnostics: json!({ "created": created_envelope, "fetched": fetched_envelope })
                    .to_string(),
            });
        }

        Err(SyncError::UpsertFailed {
            slug: slug.to_string(),
            diagnostics: json!({ "patched": patched_envelope, "created": created_envelope })
                .to_string(),
        })
    }

    /// Read path: the user's resources in the shared knowledge base,
    /// filtered by embedded per-resource `userId` metadata.
    pub async fn list_user_resources(
        &self,
        user_id: &str,
    ) -> Result<(ResolvedKb, Vec<Value>), SyncError> {
        let kb = self.resolver.resolve().await?;
        let body = self
            .api
            .list_resources(&kb.id, LIST_PAGE_SIZE)
            .await
            .map_err(|e| SyncError::HttpError(e.to_string()))?;
        let resources = body
            .get("resources")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|r| resource_user_id(r) == Some(user_id))
            .collect();
        Ok((kb, resources))
    }

    async fn put_text(
        &self,
        kb: &str,
        id: Option<&str>,
        slug: &str,
        field: &str,
        payload: &Value,
    ) -> Result<Value, crate::nuclia::ApiError> {
        match id {
            Some(id) => self.api.put_text_field_by_id(kb, id, field, payload).await,
            None => self.api.put_text_field_by_slug(kb, slug, field, payload).await,
        }
    }

    /// Per-file fan-out. Failures here are fully isolated: a pathological
    /// file is logged and skipped, never aborting the task. The prefetch and
    /// the final flush of id mappings are both fire-and-forget.
    async fn sync_files(
        &self,
        kb: &ResolvedKb,
        user_id: &str,
        user_slug: &str,
        payload: &Value,
        profile_resource_id: &str,
    ) {
        let Some(files) = payload.get("files").and_then(Value::as_array) else {
            return;
        };
        if files.is_empty() {
            return;
        }

        let file_ids: Vec<String> = files
            .iter()
            .filter_map(|f| str_id(f).map(str::to_string))
            .collect();
        let known = match self.persist.fetch_known(&file_ids).await {
            Ok(known) => known,
            Err(e) => {
                warn!("Mapping prefetch failed (ignored): {e}");
                HashMap::new()
            }
        };

        let mut new_entries: Vec<ResourceIdMapping> = Vec::new();
        for (index, file) in files.iter().enumerate() {
            match self.sync_one_file(kb, user_slug, index, file, &known).await {
                Ok(Some(entry)) => new_entries.push(entry),
                Ok(None) => {}
                Err(e) => warn!("File {index} sync failed for user {user_id} (skipped): {e}"),
            }
        }

        if let Some(clerk_id) =
            payload.get("userProfile").and_then(|p| p.get("id")).and_then(Value::as_str)
        {
            new_entries.push(ResourceIdMapping {
                file_id: None,
                clerk_id: Some(clerk_id.to_string()),
                resource_id: profile_resource_id.to_string(),
                slug: Some(user_slug.to_string()),
            });
        }

        if new_entries.is_empty() {
            return;
        }
        if let Err(e) = self.persist.flush(&new_entries).await {
            warn!("Mapping flush failed (ignored): {e}");
        }
    }

    async fn sync_one_file(
        &self,
        kb: &ResolvedKb,
        user_slug: &str,
        index: usize,
        file: &Value,
        known: &HashMap<String, String>,
    ) -> Result<Option<ResourceIdMapping>, SyncError> {
        let file_id = str_id(file);
        let ident = file_id
            .map(str::to_string)
            .or_else(|| file.get("name").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| index.to_string());
        let slug = file_slug(user_slug, &ident);
        let known_id = file_id.and_then(|id| known.get(id)).map(String::as_str);

        let resource_payload = build_file_payload(file, &slug, &ident);
        let upsert = self.upsert_resource(&kb.id, &slug, &resource_payload, known_id).await?;

        if let Some(text) =
            file.get("extractedText").and_then(Value::as_str).filter(|t| !t.is_empty())
        {
            let text_payload = json!({ "body": text, "format": "PLAIN" });
            if let Err(e) = self
                .put_text(&kb.id, Some(&upsert.resource_id), &slug, FILE_TEXT_FIELD, &text_payload)
                .await
            {
                return Err(SyncError::TextWriteFailed {
                    target: upsert.resource_id.clone(),
                    detail: e.to_string(),
                });
            }
        }

        if known_id.is_some() {
            // Nothing newly resolved; the sibling system already knows it.
            return Ok(None);
        }
        Ok(Some(ResourceIdMapping {
            file_id: file_id.map(str::to_string),
            clerk_id: None,
            resource_id: upsert.resource_id,
            slug: Some(slug),
        }))
    }
}

#[async_trait]
impl SyncHandler for SyncProcessor {
    async fn process(&self, task: &SyncTask) -> Result<SyncOutcome, SyncError> {
        self.process_sync(&task.user_id, &task.payload).await
    }
}

fn str_id(file: &Value) -> Option<&str> {
    file.get("id")
        .and_then(Value::as_str)
        .or_else(|| file.get("fileId").and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

fn resource_user_id(resource: &Value) -> Option<&str> {
    resource
        .get("origin")
        .and_then(|o| o.get("metadata"))
        .and_then(|m| m.get("userId"))
        .and_then(Value::as_str)
        .or_else(|| {
            resource.get("metadata").and_then(|m| m.get("userId")).and_then(Value::as_str)
        })
}

fn build_profile_payload(user_id: &str, slug: &str, payload: &Value) -> Value {
    json!({
        "title": format!("Student profile {user_id}"),
        "slug": slug,
        "summary": format!("Synced academic data for user {user_id}"),
        "origin": {
            "metadata": {
                "userId": user_id,
                "userProfile": payload.get("userProfile").cloned().unwrap_or(Value::Null),
            },
        },
        "extra": {
            "metadata": {
                "synced_at": Utc::now().to_rfc3339(),
                "source": SYNC_SOURCE_TAG,
            },
        },
    })
}

fn build_file_payload(file: &Value, slug: &str, ident: &str) -> Value {
    let title = file.get("name").and_then(Value::as_str).unwrap_or(ident);
    json!({
        "title": title,
        "slug": slug,
        "origin": {
            "metadata": {
                "fileId": file.get("id").cloned().unwrap_or(Value::Null),
                "mimeType": file.get("type").cloned().unwrap_or(Value::Null),
            },
        },
        "extra": {
            "metadata": {
                "synced_at": Utc::now().to_rfc3339(),
                "source": SYNC_SOURCE_TAG,
            },
        },
    })
}
