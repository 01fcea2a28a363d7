//! Hash notation shared by the renderer and everything that compares
//! its output.
//!
//! Renderers report hashes either bare or as `sha256:<hex>`, in either
//! case. Every comparison goes through [`normalize_hash`] on both sides.

const PREFIX: &str = "sha256:";

/// Trim, strip any leading `sha256:` prefixes (case-insensitive), lowercase.
///
/// Idempotent: `normalize_hash(normalize_hash(x)) == normalize_hash(x)`.
pub fn normalize_hash(raw: &str) -> String {
    let mut rest = raw.trim();
    while rest.len() >= PREFIX.len()
        && rest.is_char_boundary(PREFIX.len())
        && rest[..PREFIX.len()].eq_ignore_ascii_case(PREFIX)
    {
        rest = rest[PREFIX.len()..].trim_start();
    }
    rest.to_lowercase()
}

/// Equality after normalization. Two empty hashes are never equal.
pub fn hashes_equal(a: &str, b: &str) -> bool {
    let a = normalize_hash(a);
    !a.is_empty() && a == normalize_hash(b)
}
