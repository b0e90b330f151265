//! In-process single-consumer retry queue.
//!
//! One drain loop runs at a time, guarded by an explicit state enum. A
//! failed task is re-enqueued at the back with an incremented retry count
//! and a linearly increasing delay; after the retry ceiling it is dropped
//! with only a log line (no dead-letter record).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, warn};

use super::processor::SyncHandler;
use crate::core::models::{SyncOutcome, SyncTask};
use crate::errors::SyncError;

/// A task is attempted `1 + MAX_RETRIES` times in total.
pub const MAX_RETRIES: u32 = 3;
/// Delay before retry `n` is `BACKOFF_STEP_MS * n`.
pub const BACKOFF_STEP_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainState {
    Idle,
    Draining,
}

struct QueueInner {
    tasks: VecDeque<SyncTask>,
    state: DrainState,
}

#[derive(Clone)]
pub struct RetryQueue {
    inner: Arc<Mutex<QueueInner>>,
    handler: Arc<dyn SyncHandler>,
}

impl RetryQueue {
    #[must_use]
    pub fn new(handler: Arc<dyn SyncHandler>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner {
                tasks: VecDeque::new(),
                state: DrainState::Idle,
            })),
            handler,
        }
    }

    /// Append a task and start the drain loop if it is idle. Fire-and-forget:
    /// the caller only gets the task id back for log correlation.
    pub fn enqueue(&self, user_id: &str, payload: Value) -> String {
        let task = SyncTask::new(user_id, payload);
        let task_id = task.id.clone();
        let start_drain = {
            let mut inner = self.lock();
            inner.tasks.push_back(task);
            if inner.state == DrainState::Idle {
                inner.state = DrainState::Draining;
                true
            } else {
                false
            }
        };
        info!("Enqueued sync task {task_id} for user {user_id}");
        if start_drain {
            let queue = self.clone();
            tokio::spawn(async move {
                queue.drain().await;
            });
        }
        task_id
    }

    /// Synchronous bypass: process immediately, outside the queue, and
    /// propagate the result to the caller with no retries.
    pub async fn process_now(&self, user_id: &str, payload: Value) -> Result<SyncOutcome, SyncError> {
        let task = SyncTask::new(user_id, payload);
        self.handler.process(&task).await
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().tasks.is_empty()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.lock().state == DrainState::Idle
    }

    async fn drain(&self) {
        loop {
            let task = {
                let mut inner = self.lock();
                match inner.tasks.pop_front() {
                    Some(task) => task,
                    None => {
                        inner.state = DrainState::Idle;
                        return;
                    }
                }
            };

            match self.handler.process(&task).await {
                Ok(outcome) => {
                    info!("Sync task {} completed ({:?})", task.id, outcome.action);
                }
                Err(e) => {
                    let mut task = task;
                    task.retry_count += 1;
                    if task.retry_count <= MAX_RETRIES {
                        let delay =
                            Duration::from_millis(BACKOFF_STEP_MS * u64::from(task.retry_count));
                        warn!(
                            "Sync task {} failed (retry {} of {MAX_RETRIES}): {e}; backing off {delay:?}",
                            task.id, task.retry_count
                        );
                        self.lock().tasks.push_back(task);
                        tokio::time::sleep(delay).await;
                    } else {
                        error!(
                            "Sync task {} for user {} dropped after {MAX_RETRIES} retries: {e}",
                            task.id, task.user_id
                        );
                    }
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
