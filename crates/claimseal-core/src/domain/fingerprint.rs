//! Canonical JSON and the payload fingerprint over snapshot inputs.
//!
//! Canonicalization is RFC 8785-class:
//! - UTF-16 code unit ordering for object keys
//! - integer-valued floats render as integers; NaN/Infinity rejected
//! - array order preserved
//!
//! The fingerprint lets a session notice a renderer handing back the
//! same output for different inputs (a cache returning a stale render).

use render_client::Snapshot;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use super::error::{ClaimsealError, Result};
use super::hash::hashes_equal;

/// Recursively sort JSON object keys using UTF-16 code unit ordering.
fn sort_keys_utf16(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));

            let mut sorted = Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.to_string(), sort_keys_utf16(v));
                }
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys_utf16).collect()),
        other => other.clone(),
    }
}

/// Normalize numbers: integer-valued floats → integer repr.
fn normalize_value(value: &Value) -> Result<Value> {
    match value {
        Value::Object(map) => {
            let mut normalized = Map::new();
            for (k, v) in map {
                normalized.insert(k.clone(), normalize_value(v)?);
            }
            Ok(Value::Object(normalized))
        }
        Value::Array(arr) => Ok(Value::Array(
            arr.iter().map(normalize_value).collect::<Result<Vec<_>>>()?,
        )),
        Value::Number(n) if !(n.is_i64() || n.is_u64()) => {
            let Some(f) = n.as_f64() else {
                return Ok(Value::Number(n.clone()));
            };
            if !f.is_finite() {
                return Err(ClaimsealError::Fingerprint(
                    "NaN/Infinity not permitted in canonical JSON".to_string(),
                ));
            }
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Ok(Value::Number(Number::from(f as i64)))
            } else {
                Ok(Value::Number(n.clone()))
            }
        }
        other => Ok(other.clone()),
    }
}

/// Convert a JSON value to canonical form: normalize numbers → sort keys → compact JSON.
pub fn canonical_json(value: &Value) -> Result<String> {
    let normalized = normalize_value(value)?;
    let sorted = sort_keys_utf16(&normalized);
    Ok(serde_json::to_string(&sorted)?)
}

/// SHA-256 over the canonical form of the snapshot inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Bare lowercase hex digest.
    pub fn hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}

/// Fingerprint `[code, seed, vars, loop]`.
///
/// Fails on non-finite vars, which have no JSON representation.
pub fn compute_fingerprint(
    code: &str,
    seed: i64,
    vars: &[f64],
    is_loop: bool,
) -> Result<Fingerprint> {
    let mut numbers = Vec::with_capacity(vars.len());
    for (index, &v) in vars.iter().enumerate() {
        let n = Number::from_f64(v).ok_or_else(|| {
            ClaimsealError::Fingerprint(format!("vars[{}] is not a finite number", index))
        })?;
        numbers.push(Value::Number(n));
    }
    let payload = Value::Array(vec![
        Value::String(code.to_string()),
        Value::Number(seed.into()),
        Value::Array(numbers),
        Value::Bool(is_loop),
    ]);

    let canonical = canonical_json(&payload)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

pub fn fingerprint_snapshot(snapshot: &Snapshot) -> Result<Fingerprint> {
    compute_fingerprint(
        &snapshot.code,
        snapshot.seed,
        &snapshot.vars,
        snapshot.execution.is_loop,
    )
}

/// Inputs and output of one completed render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderObservation {
    pub fingerprint: Fingerprint,
    pub poster_hash: String,
}

impl RenderObservation {
    pub fn new(fingerprint: Fingerprint, poster_hash: impl Into<String>) -> Self {
        RenderObservation {
            fingerprint,
            poster_hash: poster_hash.into(),
        }
    }
}

/// Warn when different inputs produced the same poster hash.
pub fn detect_stale_render(
    previous: &RenderObservation,
    current: &RenderObservation,
) -> Option<String> {
    if previous.fingerprint != current.fingerprint
        && hashes_equal(&previous.poster_hash, &current.poster_hash)
    {
        Some(format!(
            "renderer returned poster hash {} for changed inputs ({} -> {}); the output may be cached",
            current.poster_hash, previous.fingerprint, current.fingerprint
        ))
    } else {
        None
    }
}
