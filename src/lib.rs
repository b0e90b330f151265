//! kbsync - a background worker that synchronizes per-user academic data
//! into a remote knowledge-base indexing service.
//!
//! The worker queues sync tasks in-process, retries them with linear
//! backoff, and reconciles local identifiers with remote-assigned ones
//! through a persisted mapping file.
//!
//! # Architecture
//!
//! The system uses:
//! - an in-process FIFO retry queue (one consumer, one task in flight)
//! - a reqwest gateway that never throws across its boundary; conflicts and
//!   transport failures come back as plain values
//! - an idempotent patch/create/fetch-on-conflict upsert ladder
//! - a local JSON mapping file as the only persisted state
//! - Tokio for the async runtime
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kbsync::core::config::AppConfig;
//! use kbsync::kb::KbResolver;
//! use kbsync::mapping::MappingStore;
//! use kbsync::mapping::persist::NoopMappingPersist;
//! use kbsync::nuclia::{KbApi, NucliaClient};
//! use kbsync::worker::{RetryQueue, SyncProcessor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     kbsync::setup_logging();
//!
//!     let config = AppConfig::from_env()?;
//!     let api: Arc<dyn KbApi> = Arc::new(NucliaClient::new(&config));
//!     let store = MappingStore::new(&config.mapping_file_path);
//!     let resolver = KbResolver::new(Arc::clone(&api), store, config.default_kb_id.clone());
//!     let processor = Arc::new(SyncProcessor::new(api, resolver, Arc::new(NoopMappingPersist)));
//!     let queue = RetryQueue::new(processor);
//!
//!     let task_id = queue.enqueue("user_1", serde_json::json!({"userProfile": {"id": "c1"}}));
//!     println!("queued {task_id}");
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod errors;
pub mod kb;
pub mod mapping;
pub mod nuclia;
pub mod summary;
pub mod utils;
pub mod worker;

pub use errors::SyncError;

/// Configure structured logging for the worker process.
///
/// Should be called once at process start, before any tasks are enqueued.
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry().with(fmt_layer).init();
}
