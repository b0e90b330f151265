use serde_json::Value;

/// Probe order for resource ids. The remote service's create, patch and
/// error-wrapped envelopes disagree on where the id lives; this list is the
/// single place a newly observed shape gets added.
const ID_PATHS: &[&[&str]] = &[
    &["uuid"],
    &["id"],
    &["patched", "uuid"],
    &["patched", "id"],
    &["created", "uuid"],
    &["created", "id"],
    &["data", "uuid"],
    &["data", "id"],
    &["created", "data", "uuid"],
    &["created", "data", "id"],
];

/// Extract a resource id from a response envelope, trying each known path in
/// order. Returns the first non-empty hit.
#[must_use]
pub fn extract_resource_id(body: &Value) -> Option<String> {
    ID_PATHS.iter().find_map(|path| {
        let mut current = body;
        for key in *path {
            current = current.get(key)?;
        }
        match current {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    })
}
