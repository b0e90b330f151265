//! Shared knowledge-base resolution.
//!
//! All users share a single knowledge base; isolation happens at resource
//! level through embedded `userId` metadata. The resolver never trusts a
//! cached remote id without revalidating it, because the remote resource can
//! vanish independent of local state.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::errors::SyncError;
use crate::mapping::{DEFAULT_KB_KEY, DEFAULT_KB_SLUG_KEY, MappingStore};
use crate::nuclia::{KbApi, extract_resource_id, outcome_envelope};

/// Fixed slug for the shared knowledge base; creation is idempotent against
/// it.
pub const DEFAULT_KB_SLUG: &str = "studyhub-knowledge-base";

#[derive(Debug, Clone)]
pub struct ResolvedKb {
    pub id: String,
    pub slug: String,
    /// True when this call created the knowledge base.
    pub created: bool,
    /// True when the handle came from the operator override or the
    /// remembered default mapping rather than create/slug recovery.
    pub from_default: bool,
}

pub struct KbResolver {
    api: Arc<dyn KbApi>,
    store: MappingStore,
    override_kb: Option<String>,
}

impl KbResolver {
    #[must_use]
    pub fn new(api: Arc<dyn KbApi>, store: MappingStore, override_kb: Option<String>) -> Self {
        Self { api, store, override_kb }
    }

    /// Resolve the shared knowledge base: operator override, then remembered
    /// mapping (verified with a cheap probe), then create, then
    /// recover-by-slug on conflict. Exhausting every step is fatal for the
    /// calling task.
    pub async fn resolve(&self) -> Result<ResolvedKb, SyncError> {
        if let Some(id) = &self.override_kb {
            // Persisted only for observability; the override wins even if
            // the stored value differs.
            self.remember(id);
            return Ok(ResolvedKb {
                id: id.clone(),
                slug: DEFAULT_KB_SLUG.to_string(),
                created: false,
                from_default: true,
            });
        }

        let mut mapping = self.store.load();
        if let Some(remembered) = mapping.get(DEFAULT_KB_KEY).cloned() {
            match self.api.list_resources(&remembered, 1).await {
                Ok(_) => {
                    let slug = mapping
                        .get(DEFAULT_KB_SLUG_KEY)
                        .cloned()
                        .unwrap_or_else(|| DEFAULT_KB_SLUG.to_string());
                    return Ok(ResolvedKb {
                        id: remembered,
                        slug,
                        created: false,
                        from_default: true,
                    });
                }
                Err(e) => {
                    warn!("Remembered knowledge base {remembered} failed probe ({e}); discarding stale mapping");
                    mapping.remove(DEFAULT_KB_KEY);
                    mapping.remove(DEFAULT_KB_SLUG_KEY);
                    self.store.save(&mapping);
                }
            }
        }

        let created = self
            .api
            .create_kb(&json!({
                "slug": DEFAULT_KB_SLUG,
                "title": "StudyHub shared knowledge base",
            }))
            .await;
        let created_envelope = outcome_envelope(&created);
        if let Some(id) = extract_resource_id(&created_envelope) {
            info!("Created knowledge base {id} ({DEFAULT_KB_SLUG})");
            self.remember(&id);
            return Ok(ResolvedKb {
                id,
                slug: DEFAULT_KB_SLUG.to_string(),
                created: true,
                from_default: false,
            });
        }

        // Creation did not yield an id (usually a 409 because the slug is
        // taken); recover the existing knowledge base by slug.
        let fetched = self.api.get_kb_by_slug(DEFAULT_KB_SLUG).await;
        let fetched_envelope = outcome_envelope(&fetched);
        if let Some(id) = extract_resource_id(&fetched_envelope) {
            info!("Recovered existing knowledge base {id} ({DEFAULT_KB_SLUG})");
            self.remember(&id);
            return Ok(ResolvedKb {
                id,
                slug: DEFAULT_KB_SLUG.to_string(),
                created: false,
                from_default: false,
            });
        }

        Err(SyncError::NoKbAvailable(format!(
            "create: {created_envelope}, lookup: {fetched_envelope}"
        )))
    }

    fn remember(&self, id: &str) {
        let mut mapping = self.store.load();
        mapping.insert(DEFAULT_KB_KEY.to_string(), id.to_string());
        mapping.insert(DEFAULT_KB_SLUG_KEY.to_string(), DEFAULT_KB_SLUG.to_string());
        self.store.save(&mapping);
    }
}
