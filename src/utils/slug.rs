//! Deterministic slug derivation for users and their synced files.
//!
//! Slugs are the stable lookup key against the remote service before a
//! server-assigned id is known, so the rules here must stay pure: same input,
//! same slug, across runs and processes.

use chrono::Utc;

/// Every per-user slug carries this prefix so user resources are
/// recognizable in the shared knowledge base.
pub const USER_SLUG_PREFIX: &str = "user-";

/// Maximum length of the file-identifier segment inside a file slug.
const FILE_IDENT_MAX: usize = 32;

/// Normalize an arbitrary identifier into a URL-safe slug: lowercase,
/// non-alphanumeric runs collapsed to a single `-`, leading/trailing
/// separators stripped. An input that normalizes to nothing falls back to a
/// millisecond timestamp so the result is never empty.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_sep = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
            pending_sep = false;
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() {
        out = Utc::now().timestamp_millis().to_string();
    }
    out
}

/// Deterministic slug for a user's profile resource.
#[must_use]
pub fn user_slug(user_id: &str) -> String {
    format!("{USER_SLUG_PREFIX}{}", slugify(user_id))
}

/// Slug for a file sub-resource, derived from the owning user's slug plus a
/// best-effort file identifier truncated to keep the slug bounded.
#[must_use]
pub fn file_slug(user_slug: &str, ident: &str) -> String {
    let mut ident = slugify(ident);
    ident.truncate(FILE_IDENT_MAX);
    let ident = ident.trim_end_matches('-');
    format!("{user_slug}-file-{ident}")
}
