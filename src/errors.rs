use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No knowledge base available: {0}")]
    NoKbAvailable(String),

    #[error("Unresolved conflict for resource slug {slug}: {diagnostics}")]
    UnresolvedConflict { slug: String, diagnostics: String },

    #[error("Upsert for resource slug {slug} yielded no resource id: {diagnostics}")]
    UpsertFailed { slug: String, diagnostics: String },

    #[error("Failed to write text field for {target}: {detail}")]
    TextWriteFailed { target: String, detail: String },

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Failed to serialize payload: {0}")]
    SerializationError(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        SyncError::HttpError(error.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(error: serde_json::Error) -> Self {
        SyncError::SerializationError(error.to_string())
    }
}
