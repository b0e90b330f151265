#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use kbsync::core::models::ResourceIdMapping;
use kbsync::mapping::persist::MappingPersist;
use kbsync::nuclia::{ApiError, ApiResult, KbApi};

/// Unique path in the system temp dir for a throwaway mapping file.
pub fn temp_mapping_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("kbsync-test-{tag}-{}.json", uuid::Uuid::new_v4()))
}

/// Scripted in-memory stand-in for the remote knowledge-base service.
#[derive(Default)]
pub struct MockGateway {
    /// The single knowledge base, once created (or pre-seeded).
    pub kb_id: Mutex<Option<String>>,
    /// slug -> resource id.
    pub resources: Mutex<HashMap<String, String>>,
    pub next_resource_id: AtomicUsize,
    pub next_kb_id: AtomicUsize,
    /// Slugs whose create call fails at transport level.
    pub fail_create: Mutex<HashSet<String>>,
    /// When set, patch-by-slug succeeds but its envelope carries no id.
    pub patch_blind: AtomicBool,
    /// When set, 409s arrive as `{"created": {"error": 409}}` bodies instead
    /// of HTTP-level 409s.
    pub conflict_nested: AtomicBool,
    /// When set, every create reports a conflict even for unknown slugs.
    pub force_conflict: AtomicBool,
    pub list_fails: AtomicBool,
    pub kb_create_fails: AtomicBool,
    pub fail_put: AtomicBool,
    pub calls: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn conflict(&self) -> ApiResult {
        if self.conflict_nested.load(Ordering::SeqCst) {
            Ok(json!({"created": {"error": 409}}))
        } else {
            Err(ApiError::Http { status: 409, data: json!({"detail": "already exists"}) })
        }
    }

    fn fresh_resource_id(&self) -> String {
        format!("res-{}", self.next_resource_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn fresh_kb_id(&self) -> String {
        format!("kb-{}", self.next_kb_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl KbApi for MockGateway {
    async fn get_kb_by_slug(&self, slug: &str) -> ApiResult {
        self.record(format!("get_kb_slug:{slug}"));
        match self.kb_id.lock().unwrap().as_ref() {
            Some(id) => Ok(json!({"uuid": id, "slug": slug})),
            None => Err(ApiError::Http { status: 404, data: json!({"detail": "not found"}) }),
        }
    }

    async fn create_kb(&self, _payload: &Value) -> ApiResult {
        self.record("create_kb".to_string());
        if self.kb_create_fails.load(Ordering::SeqCst) {
            return Err(ApiError::Network { message: "connection refused".into() });
        }
        let mut kb = self.kb_id.lock().unwrap();
        if kb.is_some() {
            return self.conflict();
        }
        let id = self.fresh_kb_id();
        *kb = Some(id.clone());
        Ok(json!({"uuid": id}))
    }

    async fn list_resources(&self, kb: &str, _page_size: u32) -> ApiResult {
        self.record(format!("list:{kb}"));
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(ApiError::Http { status: 404, data: json!({"detail": "kb gone"}) });
        }
        Ok(json!({"resources": []}))
    }

    async fn get_resource_by_slug(&self, _kb: &str, slug: &str) -> ApiResult {
        self.record(format!("get_slug:{slug}"));
        match self.resources.lock().unwrap().get(slug) {
            Some(id) => Ok(json!({"uuid": id, "slug": slug})),
            None => Err(ApiError::Http { status: 404, data: json!({"detail": "not found"}) }),
        }
    }

    async fn create_resource(&self, _kb: &str, payload: &Value) -> ApiResult {
        let slug = payload.get("slug").and_then(Value::as_str).unwrap_or("").to_string();
        self.record(format!("create:{slug}"));
        if self.fail_create.lock().unwrap().contains(&slug) {
            return Err(ApiError::Network { message: "connection reset".into() });
        }
        if self.force_conflict.load(Ordering::SeqCst) {
            return self.conflict();
        }
        let mut resources = self.resources.lock().unwrap();
        if resources.contains_key(&slug) {
            return self.conflict();
        }
        let id = self.fresh_resource_id();
        resources.insert(slug.clone(), id.clone());
        Ok(json!({"uuid": id, "slug": slug}))
    }

    async fn patch_resource_by_slug(&self, _kb: &str, slug: &str, _payload: &Value) -> ApiResult {
        self.record(format!("patch_slug:{slug}"));
        if self.patch_blind.load(Ordering::SeqCst) {
            return Ok(json!({}));
        }
        match self.resources.lock().unwrap().get(slug) {
            Some(id) => Ok(json!({"uuid": id})),
            None => Err(ApiError::Http { status: 404, data: json!({"detail": "not found"}) }),
        }
    }

    async fn patch_resource_by_id(&self, _kb: &str, id: &str, _payload: &Value) -> ApiResult {
        self.record(format!("patch_id:{id}"));
        if self.resources.lock().unwrap().values().any(|v| v == id) {
            Ok(json!({}))
        } else {
            Err(ApiError::Http { status: 404, data: json!({"detail": "not found"}) })
        }
    }

    async fn put_text_field_by_slug(
        &self,
        _kb: &str,
        slug: &str,
        field: &str,
        _payload: &Value,
    ) -> ApiResult {
        self.record(format!("put_slug:{slug}:{field}"));
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(ApiError::Http { status: 500, data: json!({"detail": "index down"}) });
        }
        Ok(json!({"status": "ok"}))
    }

    async fn put_text_field_by_id(
        &self,
        _kb: &str,
        id: &str,
        field: &str,
        _payload: &Value,
    ) -> ApiResult {
        self.record(format!("put_id:{id}:{field}"));
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(ApiError::Http { status: 500, data: json!({"detail": "index down"}) });
        }
        Ok(json!({"status": "ok"}))
    }
}

/// Recording stand-in for the sibling mapping-persistence system.
#[derive(Default)]
pub struct RecordingPersist {
    pub known: Mutex<HashMap<String, String>>,
    pub flushed: Mutex<Vec<ResourceIdMapping>>,
    pub fail_fetch: AtomicBool,
}

impl RecordingPersist {
    pub fn flushed(&self) -> Vec<ResourceIdMapping> {
        self.flushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MappingPersist for RecordingPersist {
    async fn fetch_known(&self, file_ids: &[String]) -> Result<HashMap<String, String>, ApiError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ApiError::Network { message: "persistence down".into() });
        }
        let known = self.known.lock().unwrap();
        Ok(file_ids
            .iter()
            .filter_map(|id| known.get(id).map(|r| (id.clone(), r.clone())))
            .collect())
    }

    async fn flush(&self, entries: &[ResourceIdMapping]) -> Result<(), ApiError> {
        self.flushed.lock().unwrap().extend_from_slice(entries);
        Ok(())
    }
}
