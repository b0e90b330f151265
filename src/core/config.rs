use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    /// Bearer credential, normalized (no `Bearer ` prefix). Log only via
    /// [`mask_token`].
    pub api_token: String,
    /// Operator-supplied knowledge-base override; when set it always wins
    /// over whatever the mapping store remembers.
    pub default_kb_id: Option<String>,
    /// Development only: disables TLS certificate verification.
    pub skip_tls_verify: bool,
    pub mapping_file_path: String,
    pub mapping_persist_url: Option<String>,
    pub mapping_persist_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            api_base_url: env::var("NUCLIA_API_BASE_URL")
                .map_err(|e| format!("NUCLIA_API_BASE_URL: {}", e))?,
            api_token: normalize_token(
                &env::var("NUCLIA_API_TOKEN").map_err(|e| format!("NUCLIA_API_TOKEN: {}", e))?,
            ),
            default_kb_id: env::var("NUCLIA_DEFAULT_KB_ID").ok().filter(|v| !v.is_empty()),
            skip_tls_verify: env::var("NUCLIA_SKIP_TLS_VERIFY")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            mapping_file_path: env::var("MAPPING_FILE_PATH")
                .unwrap_or_else(|_| "kb_mapping.json".to_string()),
            mapping_persist_url: env::var("MAPPING_PERSIST_URL").ok().filter(|v| !v.is_empty()),
            mapping_persist_secret: env::var("MAPPING_PERSIST_SECRET").ok(),
        })
    }
}

/// Strip an optional `Bearer ` prefix and surrounding whitespace from the
/// raw environment-supplied credential.
#[must_use]
pub fn normalize_token(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_prefix("Bearer ").unwrap_or(trimmed).trim().to_string()
}

/// Render a credential with the middle elided, safe for log output.
#[must_use]
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
