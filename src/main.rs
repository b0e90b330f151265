//! Composition root. The HTTP front door lives elsewhere; this binary reads
//! newline-delimited JSON tasks (`{"userId": ..., "payload": {...}}`) from
//! stdin, enqueues them, and waits for the queue to drain on EOF.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tokio::io::AsyncBufReadExt;
use tracing::{error, info, warn};

use kbsync::core::config::AppConfig;
use kbsync::kb::KbResolver;
use kbsync::mapping::MappingStore;
use kbsync::mapping::persist::{HttpMappingPersist, MappingPersist, NoopMappingPersist};
use kbsync::nuclia::{KbApi, NucliaClient};
use kbsync::worker::{RetryQueue, SyncProcessor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kbsync::setup_logging();

    let config = AppConfig::from_env().map_err(|e| anyhow::anyhow!("Config error: {e}"))?;

    let api: Arc<dyn KbApi> = Arc::new(NucliaClient::new(&config));
    let store = MappingStore::new(&config.mapping_file_path);
    let resolver = KbResolver::new(Arc::clone(&api), store, config.default_kb_id.clone());
    let persist: Arc<dyn MappingPersist> = match &config.mapping_persist_url {
        Some(url) => {
            Arc::new(HttpMappingPersist::new(url.clone(), config.mapping_persist_secret.clone()))
        }
        None => Arc::new(NoopMappingPersist),
    };
    let processor = Arc::new(SyncProcessor::new(api, resolver, persist));
    let queue = RetryQueue::new(processor);

    info!("kbsync worker ready; reading tasks from stdin, one JSON object per line");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => {
                let Some(user_id) = value.get("userId").and_then(Value::as_str) else {
                    warn!("Task line missing userId, skipped");
                    continue;
                };
                let payload = value.get("payload").cloned().unwrap_or(Value::Null);
                queue.enqueue(user_id, payload);
            }
            Err(e) => error!("Invalid task line: {e}"),
        }
    }

    // EOF: let the queue finish its backlog before exiting.
    while !queue.is_idle() || !queue.is_empty() {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    info!("Queue drained, shutting down");
    Ok(())
}
