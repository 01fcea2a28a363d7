//! Bundle validation: structural fields plus per-mode hash requirements.
//!
//! Validation works on raw JSON so a half-written draft still gets a
//! precise list of what is missing instead of a deserializer error.
//!
//! Structural checks, each reported independently:
//! 1. `snapshot` is an object
//! 2. `snapshot.code` is a non-empty string
//! 3. `snapshot.seed` is present and non-null (0 is valid)
//! 4. `snapshot.vars` is an array of exactly 10 values
//!
//! Hash requirements depend on the resolved mode: static needs
//! `baseline.posterHash`, loop needs it and `baseline.animationHash`.
//! Out-of-range vars are left to the submission checks.

use render_client::VARS_LEN;
use serde::Serialize;
use serde_json::Value;

use super::bundle::Bundle;
use super::migration::{upgrade_bundle, BundleVersion};
use super::mode::{resolve_mode_value, ResolvedMode};

pub const FIELD_SNAPSHOT: &str = "snapshot";
pub const FIELD_CODE: &str = "snapshot.code";
pub const FIELD_SEED: &str = "snapshot.seed";
pub const FIELD_VARS: &str = "snapshot.vars";
pub const FIELD_POSTER_HASH: &str = "baseline.posterHash";
pub const FIELD_ANIMATION_HASH: &str = "baseline.animationHash";

/// Outcome of validating one bundle text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Input was empty or whitespace
    pub is_empty: bool,
    /// JSON parser message when the input is not JSON
    pub parse_error: Option<String>,
    /// Every missing field, structural and hash
    pub missing_fields: Vec<String>,
    /// The subset of `missing_fields` that are baseline hashes
    pub missing_hash_fields: Vec<String>,
    pub mode: ResolvedMode,
    pub warnings: Vec<String>,
    /// Generation the input was written in, once parsed as an object
    pub source_version: Option<BundleVersion>,
}

impl ValidationResult {
    fn unparsed() -> Self {
        ValidationResult {
            is_valid: false,
            is_empty: false,
            parse_error: None,
            missing_fields: Vec::new(),
            missing_hash_fields: Vec::new(),
            mode: ResolvedMode::Unknown,
            warnings: Vec::new(),
            source_version: None,
        }
    }

    fn empty() -> Self {
        ValidationResult {
            is_empty: true,
            ..Self::unparsed()
        }
    }

    fn parse_failure(message: String) -> Self {
        ValidationResult {
            parse_error: Some(message),
            ..Self::unparsed()
        }
    }

    pub fn is_parsed(&self) -> bool {
        !self.is_empty && self.parse_error.is_none()
    }

    /// Missing fields that are not baseline hashes.
    pub fn structural_missing(&self) -> Vec<&str> {
        self.missing_fields
            .iter()
            .filter(|f| !self.missing_hash_fields.contains(f))
            .map(String::as_str)
            .collect()
    }

    /// Parsed with a complete snapshot. Drafts without a baseline pass.
    pub fn is_structurally_valid(&self) -> bool {
        self.is_parsed() && self.structural_missing().is_empty()
    }

    /// One-line description for logs and CLI output.
    pub fn summary(&self) -> String {
        if self.is_empty {
            "empty input".to_string()
        } else if let Some(err) = &self.parse_error {
            format!("not valid JSON: {}", err)
        } else if self.is_valid {
            format!("valid {} bundle", self.mode)
        } else {
            format!("missing: {}", self.missing_fields.join(", "))
        }
    }
}

/// Validate bundle text of any supported generation.
pub fn validate(bundle_text: &str) -> ValidationResult {
    if bundle_text.trim().is_empty() {
        return ValidationResult::empty();
    }
    match serde_json::from_str::<Value>(bundle_text) {
        Ok(value) => validate_value(value),
        Err(e) => ValidationResult::parse_failure(e.to_string()),
    }
}

/// Validate an already-parsed JSON value.
pub fn validate_value(value: Value) -> ValidationResult {
    let is_object = value.is_object();
    let upgraded = upgrade_bundle(value);
    let from = is_object.then_some(upgraded.from);
    let value = upgraded.value;

    let snapshot = value.get("snapshot").filter(|s| s.is_object());
    let mode = resolve_mode_value(snapshot);

    let mut missing_fields = structural_missing(snapshot);
    let missing_hash_fields = missing_hashes(&value, mode);
    missing_fields.extend(missing_hash_fields.iter().cloned());

    let mut warnings = Vec::new();
    if flag(&value, "tampered") {
        warnings.push(
            "bundle carries the tamper marker: its inputs were deliberately modified".to_string(),
        );
    }
    if flag(&value, "example") {
        warnings.push("bundle is an example placeholder, not a real claim".to_string());
    }
    if let (Some(declared), Some(resolved)) =
        (value.get("mode").and_then(Value::as_str), mode.mode())
    {
        if declared != resolved.as_str() {
            warnings.push(format!(
                "declared mode '{}' disagrees with the snapshot, which resolves to '{}'",
                declared, resolved
            ));
        }
    }
    match &from {
        Some(BundleVersion::V1) => warnings.push(
            "legacy bundle (version 1) was upgraded to the current schema".to_string(),
        ),
        Some(BundleVersion::Unrecognized(v)) => warnings.push(format!(
            "unrecognized bundleVersion '{}'; validated against the current schema",
            v
        )),
        Some(BundleVersion::V2) | None => {}
    }

    ValidationResult {
        is_valid: missing_fields.is_empty(),
        is_empty: false,
        parse_error: None,
        missing_fields,
        missing_hash_fields,
        mode,
        warnings,
        source_version: from,
    }
}

/// Validate a typed bundle as it would be written.
pub fn validate_bundle(bundle: &Bundle) -> ValidationResult {
    match serde_json::to_value(bundle) {
        Ok(value) => validate_value(value),
        Err(e) => ValidationResult::parse_failure(e.to_string()),
    }
}

fn structural_missing(snapshot: Option<&Value>) -> Vec<String> {
    let Some(snap) = snapshot else {
        return [FIELD_SNAPSHOT, FIELD_CODE, FIELD_SEED, FIELD_VARS]
            .iter()
            .map(|f| f.to_string())
            .collect();
    };

    let mut missing = Vec::new();
    let code_present = snap
        .get("code")
        .and_then(Value::as_str)
        .is_some_and(|c| !c.is_empty());
    if !code_present {
        missing.push(FIELD_CODE.to_string());
    }
    if snap.get("seed").map_or(true, Value::is_null) {
        missing.push(FIELD_SEED.to_string());
    }
    match snap.get("vars").and_then(Value::as_array) {
        Some(vars) if vars.len() == VARS_LEN => {}
        Some(vars) => missing.push(format!(
            "{} (expected {} values, found {})",
            FIELD_VARS,
            VARS_LEN,
            vars.len()
        )),
        None => missing.push(FIELD_VARS.to_string()),
    }
    missing
}

fn missing_hashes(value: &Value, mode: ResolvedMode) -> Vec<String> {
    let Some(mode) = mode.mode() else {
        return Vec::new();
    };
    let baseline = value.get("baseline");
    let mut missing = Vec::new();
    if !has_hash(baseline, "posterHash") {
        missing.push(FIELD_POSTER_HASH.to_string());
    }
    if mode.requires_animation() && !has_hash(baseline, "animationHash") {
        missing.push(FIELD_ANIMATION_HASH.to_string());
    }
    missing
}

/// Absent, null, non-string and blank all count as missing.
fn has_hash(baseline: Option<&Value>, field: &str) -> bool {
    baseline
        .and_then(|b| b.get(field))
        .and_then(Value::as_str)
        .is_some_and(|h| !h.trim().is_empty())
}

fn flag(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn static_bundle() -> Value {
        json!({
            "bundleVersion": "2",
            "mode": "static",
            "snapshot": {
                "code": "draw()",
                "seed": 0,
                "vars": [50, 55, 30, 20, 10, 15, 5, 25, 40, 60],
                "execution": { "frames": 1, "loop": false }
            },
            "baseline": { "posterHash": "sha256:abc", "animationHash": null }
        })
    }

    #[test]
    fn test_valid_static_bundle() {
        let result = validate_value(static_bundle());
        assert!(result.is_valid, "{:?}", result);
        assert_eq!(result.mode, ResolvedMode::Static);
        assert!(result.warnings.is_empty());
        assert_eq!(result.source_version, Some(BundleVersion::V2));
    }

    #[test]
    fn test_empty_input() {
        let result = validate("  \n ");
        assert!(result.is_empty);
        assert!(!result.is_valid);
        assert!(result.missing_fields.is_empty());
        assert!(result.parse_error.is_none());
    }

    #[test]
    fn test_parse_error_not_folded_into_missing() {
        let result = validate("{ not json");
        assert!(!result.is_valid);
        assert!(result.parse_error.is_some());
        assert!(result.missing_fields.is_empty());
        assert_eq!(result.mode, ResolvedMode::Unknown);
    }

    #[test]
    fn test_absent_snapshot_reports_all_four() {
        let result = validate_value(json!({ "bundleVersion": "2" }));
        assert_eq!(
            result.missing_fields,
            vec![FIELD_SNAPSHOT, FIELD_CODE, FIELD_SEED, FIELD_VARS]
        );
        assert_eq!(result.mode, ResolvedMode::Unknown);
        assert!(result.missing_hash_fields.is_empty());
    }

    #[test]
    fn test_null_seed_missing_but_zero_present() {
        let mut bundle = static_bundle();
        bundle["snapshot"]["seed"] = Value::Null;
        let result = validate_value(bundle);
        assert_eq!(result.missing_fields, vec![FIELD_SEED]);
    }

    #[test]
    fn test_empty_poster_hash_counts_as_missing() {
        let mut bundle = static_bundle();
        bundle["baseline"]["posterHash"] = json!("");
        let result = validate_value(bundle);
        assert_eq!(result.missing_hash_fields, vec![FIELD_POSTER_HASH]);
        assert!(result.is_structurally_valid());
        assert!(!result.is_valid);
    }

    #[test]
    fn test_mode_drift_is_a_warning() {
        let mut bundle = static_bundle();
        bundle["mode"] = json!("loop");
        let result = validate_value(bundle);
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|w| w.contains("declared mode")));
    }

    #[test]
    fn test_markers_warn() {
        let mut bundle = static_bundle();
        bundle["tampered"] = json!(true);
        bundle["example"] = json!(true);
        let result = validate_value(bundle);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_unrecognized_version_warns() {
        let mut bundle = static_bundle();
        bundle["bundleVersion"] = json!("9");
        let result = validate_value(bundle);
        assert!(result.warnings.iter().any(|w| w.contains("'9'")));
    }

    #[test]
    fn test_non_object_has_no_version() {
        let result = validate("[1, 2, 3]");
        assert_eq!(result.source_version, None);
        assert!(result.warnings.is_empty());
        assert!(result.missing_fields.contains(&FIELD_SNAPSHOT.to_string()));
    }

    #[test]
    fn test_summary_lists_missing() {
        let result = validate_value(json!({ "bundleVersion": "2" }));
        assert!(result.summary().starts_with("missing: snapshot"));
    }
}
