//! Task processing and the retry queue.

pub mod processor;
pub mod queue;

pub use processor::{SyncHandler, SyncProcessor};
pub use queue::RetryQueue;
