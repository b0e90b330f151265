mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{MockGateway, temp_mapping_path};
use kbsync::SyncError;
use kbsync::kb::{DEFAULT_KB_SLUG, KbResolver};
use kbsync::mapping::{DEFAULT_KB_KEY, MappingStore};
use kbsync::nuclia::KbApi;

fn resolver_with(
    gateway: &Arc<MockGateway>,
    store: MappingStore,
    override_kb: Option<String>,
) -> KbResolver {
    let api: Arc<dyn KbApi> = gateway.clone();
    KbResolver::new(api, store, override_kb)
}

#[tokio::test]
async fn operator_override_always_wins() {
    let gateway = Arc::new(MockGateway::default());
    let store = MappingStore::new(temp_mapping_path("override"));
    let mut seeded = store.load();
    seeded.insert(DEFAULT_KB_KEY.to_string(), "remembered-kb".to_string());
    store.save(&seeded);

    let resolver = resolver_with(&gateway, store.clone(), Some("kb-override".to_string()));
    let resolved = resolver.resolve().await.unwrap();

    assert_eq!(resolved.id, "kb-override");
    assert!(resolved.from_default);
    assert!(!resolved.created);
    // The override is persisted for observability.
    assert_eq!(store.load().get(DEFAULT_KB_KEY).map(String::as_str), Some("kb-override"));
    // No remote calls were needed at all.
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn remembered_kb_is_probed_before_reuse() {
    let gateway = Arc::new(MockGateway::default());
    let store = MappingStore::new(temp_mapping_path("probe"));
    let mut seeded = store.load();
    seeded.insert(DEFAULT_KB_KEY.to_string(), "kb-remembered".to_string());
    store.save(&seeded);

    let resolver = resolver_with(&gateway, store, None);
    let resolved = resolver.resolve().await.unwrap();

    assert_eq!(resolved.id, "kb-remembered");
    assert!(resolved.from_default);
    assert_eq!(gateway.calls(), vec!["list:kb-remembered".to_string()]);
}

#[tokio::test]
async fn stale_mapping_self_heals_into_a_new_kb() {
    let gateway = Arc::new(MockGateway::default());
    gateway.list_fails.store(true, Ordering::SeqCst);
    let store = MappingStore::new(temp_mapping_path("stale"));
    let mut seeded = store.load();
    seeded.insert(DEFAULT_KB_KEY.to_string(), "stale-kb".to_string());
    store.save(&seeded);

    let resolver = resolver_with(&gateway, store.clone(), None);
    let resolved = resolver.resolve().await.unwrap();

    assert_eq!(resolved.id, "kb-1");
    assert!(resolved.created);
    assert_eq!(resolved.slug, DEFAULT_KB_SLUG);
    // The stale entry was replaced, not left beside the new one.
    assert_eq!(store.load().get(DEFAULT_KB_KEY).map(String::as_str), Some("kb-1"));

    let calls = gateway.calls();
    assert_eq!(calls, vec!["list:stale-kb".to_string(), "create_kb".to_string()]);
}

#[tokio::test]
async fn create_conflict_recovers_existing_kb_by_slug() {
    let gateway = Arc::new(MockGateway::default());
    *gateway.kb_id.lock().unwrap() = Some("kb-existing".to_string());
    let store = MappingStore::new(temp_mapping_path("recover"));

    let resolver = resolver_with(&gateway, store.clone(), None);
    let resolved = resolver.resolve().await.unwrap();

    assert_eq!(resolved.id, "kb-existing");
    assert!(!resolved.created);
    assert!(!resolved.from_default);
    assert_eq!(store.load().get(DEFAULT_KB_KEY).map(String::as_str), Some("kb-existing"));
}

#[tokio::test]
async fn exhausting_every_step_is_fatal() {
    let gateway = Arc::new(MockGateway::default());
    gateway.kb_create_fails.store(true, Ordering::SeqCst);
    let store = MappingStore::new(temp_mapping_path("fatal"));

    let resolver = resolver_with(&gateway, store, None);
    let err = resolver.resolve().await.unwrap_err();
    assert!(matches!(err, SyncError::NoKbAvailable(_)));
}
