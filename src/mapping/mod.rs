//! Local identifier mapping store.

pub mod persist;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::warn;

/// Reserved key: remote id of the shared default knowledge base.
pub const DEFAULT_KB_KEY: &str = "default_kb";
/// Reserved key: human-readable slug of the shared default knowledge base.
pub const DEFAULT_KB_SLUG_KEY: &str = "default_kb_slug";

pub type Mapping = HashMap<String, String>;

/// Durable local key-to-remote-id table, persisted as one JSON object and
/// rewritten wholesale on every mutation. The read-modify-write cycle is not
/// atomic: the worker assumes single-process deployment, and a second
/// process sharing the file can race. A multi-instance deployment must move
/// this to a transactional store.
#[derive(Debug, Clone)]
pub struct MappingStore {
    path: PathBuf,
}

impl MappingStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the whole table. A missing or unparsable file yields an empty
    /// table; this never fails.
    #[must_use]
    pub fn load(&self) -> Mapping {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Mapping file {} is unreadable, starting empty: {e}", self.path.display());
                Mapping::new()
            }),
            Err(_) => Mapping::new(),
        }
    }

    /// Write the whole table. Best-effort: failures are logged, never
    /// propagated.
    pub fn save(&self, mapping: &Mapping) {
        match serde_json::to_string_pretty(mapping) {
            Ok(raw) => {
                if let Err(e) = fs::write(&self.path, raw) {
                    warn!("Failed to write mapping file {}: {e}", self.path.display());
                }
            }
            Err(e) => warn!("Failed to serialize mapping table: {e}"),
        }
    }
}
