//! Deterministic identity generation
//!
//! When a desired document omits the resource name, the host derives one
//! from the logical id and the request token. The same inputs always yield
//! the same name, so an idempotent retry of a create addresses the resource
//! it already created instead of making a second one.

/// Number of token-derived characters appended to the logical id.
const SUFFIX_LEN: usize = 12;

/// Derive a resource identity from a logical id and request token.
///
/// The result is lowercased, restricted to `[a-z0-9-]`, and truncated to
/// `max_len`. Truncation trims the logical-id portion and preserves the
/// token-derived suffix, which carries the uniqueness.
#[must_use]
pub fn generate_identity(logical_id: &str, request_token: &str, max_len: usize) -> String {
    let logical = sanitize(logical_id);
    let suffix: String = sanitize(request_token).chars().take(SUFFIX_LEN).collect();

    let name = match (logical.is_empty(), suffix.is_empty()) {
        (false, false) => format!("{logical}-{suffix}"),
        (false, true) => logical,
        (true, false) => suffix.clone(),
        (true, true) => String::from("resource"),
    };

    if name.len() <= max_len {
        return name;
    }
    if suffix.is_empty() || max_len <= suffix.len() + 1 {
        return name.chars().take(max_len).collect();
    }
    // Keep the suffix intact; budget the rest to the logical id.
    let keep = max_len - suffix.len() - 1;
    let head: String = logical.chars().take(keep).collect();
    format!("{head}-{suffix}")
}

fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if (c == '-' || c == '_' || c == ' ') && !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}
