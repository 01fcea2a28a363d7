//! Versioned upgrade of legacy bundle generations.
//!
//! Generation 1 bundles predate the `baseline` block: hashes live at the
//! top level (`expectedImageHash`/`posterHash`/`imageHash`,
//! `expectedAnimationHash`/`animationHash`) and the statement may be a
//! `strategy` object instead of a `claim`. They are read, never written.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::bundle::BUNDLE_VERSION;

const LEGACY_POSTER_KEYS: [&str; 3] = ["expectedImageHash", "posterHash", "imageHash"];
const LEGACY_ANIMATION_KEYS: [&str; 2] = ["expectedAnimationHash", "animationHash"];

/// Schema generation a bundle was written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleVersion {
    V1,
    V2,
    Unrecognized(String),
}

impl BundleVersion {
    /// Read `bundleVersion`; absent or null means generation 1.
    ///
    /// Only meaningful for JSON objects; callers check that first.
    pub fn detect(value: &Value) -> Self {
        match value.get("bundleVersion") {
            None | Some(Value::Null) => BundleVersion::V1,
            Some(Value::String(s)) => Self::parse(s),
            Some(Value::Number(n)) => match n.as_f64() {
                // `2.0` names the same generation as `2`
                Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                    Self::parse(&(f as i64).to_string())
                }
                _ => Self::parse(&n.to_string()),
            },
            Some(other) => BundleVersion::Unrecognized(other.to_string()),
        }
    }

    fn parse(s: &str) -> Self {
        match s.trim() {
            "1" => BundleVersion::V1,
            "2" => BundleVersion::V2,
            other => BundleVersion::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BundleVersion::V1 => "1",
            BundleVersion::V2 => "2",
            BundleVersion::Unrecognized(s) => s,
        }
    }

    pub fn is_legacy(&self) -> bool {
        *self == BundleVersion::V1
    }
}

impl Serialize for BundleVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for BundleVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`upgrade_bundle`].
#[derive(Debug, Clone, PartialEq)]
pub struct Upgraded {
    pub value: Value,
    /// Generation the input was written in
    pub from: BundleVersion,
}

impl Upgraded {
    pub fn was_upgraded(&self) -> bool {
        self.from.is_legacy()
    }
}

/// Map any supported generation into the canonical layout.
///
/// Canonical and unrecognized versions pass through untouched; non-object
/// values are returned as-is for the caller to reject.
pub fn upgrade_bundle(value: Value) -> Upgraded {
    let from = BundleVersion::detect(&value);
    match (from.clone(), value) {
        (BundleVersion::V1, Value::Object(map)) => {
            debug!("upgrading generation 1 bundle");
            Upgraded {
                value: Value::Object(upgrade_v1(map)),
                from,
            }
        }
        (BundleVersion::V2, Value::Object(mut map)) => {
            // `2` and `"2"` are both accepted on input
            map.insert(
                "bundleVersion".to_string(),
                Value::String(BUNDLE_VERSION.to_string()),
            );
            Upgraded {
                value: Value::Object(map),
                from,
            }
        }
        (_, value) => Upgraded { value, from },
    }
}

fn upgrade_v1(mut map: Map<String, Value>) -> Map<String, Value> {
    let poster = take_first(&mut map, &LEGACY_POSTER_KEYS);
    let animation = take_first(&mut map, &LEGACY_ANIMATION_KEYS);

    let mut baseline = match map.remove("baseline") {
        Some(Value::Object(existing)) => existing,
        _ => Map::new(),
    };
    if let Some(poster) = poster {
        fill_blank(&mut baseline, "posterHash", poster);
    }
    if let Some(animation) = animation {
        fill_blank(&mut baseline, "animationHash", animation);
    }
    baseline
        .entry("posterHash")
        .or_insert_with(|| Value::String(String::new()));
    baseline.entry("animationHash").or_insert(Value::Null);
    map.insert("baseline".to_string(), Value::Object(baseline));

    if let Some(strategy) = map.remove("strategy") {
        if !map.contains_key("claim") {
            map.insert("claim".to_string(), claim_from_strategy(&strategy));
        }
    }

    map.insert(
        "bundleVersion".to_string(),
        Value::String(BUNDLE_VERSION.to_string()),
    );
    map
}

/// Set `key` unless it already holds a non-blank value.
fn fill_blank(map: &mut Map<String, Value>, key: &str, value: Value) {
    if map.get(key).map_or(true, is_blank) {
        map.insert(key.to_string(), value);
    }
}

fn is_blank(v: &Value) -> bool {
    v.is_null() || v.as_str().is_some_and(|s| s.trim().is_empty())
}

/// First non-empty value among `keys`, removing all of them.
fn take_first(map: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    let mut found = None;
    for key in keys {
        if let Some(v) = map.remove(*key) {
            if found.is_none() && !is_blank(&v) {
                found = Some(v);
            }
        }
    }
    found
}

fn claim_from_strategy(strategy: &Value) -> Value {
    let text = |key: &str| {
        strategy
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    json!({
        "type": "generic",
        "title": text("name"),
        "statement": text("description"),
        "notes": text("notes"),
        "details": { "criteria": "" },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_versions() {
        assert_eq!(BundleVersion::detect(&json!({})), BundleVersion::V1);
        assert_eq!(
            BundleVersion::detect(&json!({ "bundleVersion": "1" })),
            BundleVersion::V1
        );
        assert_eq!(
            BundleVersion::detect(&json!({ "bundleVersion": 2 })),
            BundleVersion::V2
        );
        assert_eq!(
            BundleVersion::detect(&json!({ "bundleVersion": 2.0 })),
            BundleVersion::V2
        );
        assert_eq!(
            BundleVersion::detect(&json!({ "bundleVersion": 2.5 })),
            BundleVersion::Unrecognized("2.5".to_string())
        );
        assert_eq!(
            BundleVersion::detect(&json!({ "bundleVersion": "7" })),
            BundleVersion::Unrecognized("7".to_string())
        );
    }

    #[test]
    fn moves_top_level_hashes_into_baseline() {
        let up = upgrade_bundle(json!({
            "expectedImageHash": "sha256:abc",
            "expectedAnimationHash": "sha256:def",
            "snapshot": { "code": "x", "seed": 1, "vars": [] }
        }));
        assert!(up.was_upgraded());
        assert_eq!(up.value["bundleVersion"], "2");
        assert_eq!(up.value["baseline"]["posterHash"], "sha256:abc");
        assert_eq!(up.value["baseline"]["animationHash"], "sha256:def");
        assert!(up.value.get("expectedImageHash").is_none());
    }

    #[test]
    fn falls_through_empty_legacy_keys() {
        let up = upgrade_bundle(json!({ "expectedImageHash": "", "imageHash": "abc" }));
        assert_eq!(up.value["baseline"]["posterHash"], "abc");
        assert_eq!(up.value["baseline"]["animationHash"], Value::Null);
    }

    #[test]
    fn legacy_hash_fills_blank_baseline() {
        let up = upgrade_bundle(json!({
            "baseline": { "posterHash": " ", "animationHash": "sha256:kept" },
            "expectedImageHash": "sha256:abc",
            "expectedAnimationHash": "sha256:ignored"
        }));
        assert_eq!(up.value["baseline"]["posterHash"], "sha256:abc");
        assert_eq!(up.value["baseline"]["animationHash"], "sha256:kept");
    }

    #[test]
    fn strategy_becomes_generic_claim() {
        let up = upgrade_bundle(json!({
            "strategy": { "name": "Momentum", "description": "Buy winners" }
        }));
        assert_eq!(up.value["claim"]["type"], "generic");
        assert_eq!(up.value["claim"]["title"], "Momentum");
        assert_eq!(up.value["claim"]["statement"], "Buy winners");
        assert!(up.value.get("strategy").is_none());
    }

    #[test]
    fn canonical_bundle_passes_through() {
        let input = json!({ "bundleVersion": "2", "posterHash": "kept" });
        let up = upgrade_bundle(input.clone());
        assert!(!up.was_upgraded());
        assert_eq!(up.value, input);
    }
}
