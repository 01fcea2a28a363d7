//! Deterministic mutations used to demonstrate that verification catches
//! altered inputs.
//!
//! Snapshot mutations always change the payload fingerprint. Hash flips
//! leave the snapshot alone and always change the comparison outcome.

use render_client::VAR_MAX;
use serde::{Deserialize, Serialize};

use crate::domain::bundle::Bundle;

const TAMPER_COMMENT: &str = "\n// tampered";
const HASH_PREFIX: &str = "sha256:";

/// Which part of a bundle to alter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tamper {
    Seed,
    FirstVar,
    Code,
    PosterHash,
    AnimationHash,
}

impl Tamper {
    pub const ALL: [Tamper; 5] = [
        Tamper::Seed,
        Tamper::FirstVar,
        Tamper::Code,
        Tamper::PosterHash,
        Tamper::AnimationHash,
    ];

    /// Whether the mutation touches the snapshot rather than the baseline.
    pub fn alters_snapshot(self) -> bool {
        matches!(self, Tamper::Seed | Tamper::FirstVar | Tamper::Code)
    }
}

pub fn bump_seed(seed: i64) -> i64 {
    seed.wrapping_add(1)
}

/// `vars[0] + 1`, clamped to the var range. At the ceiling it steps down
/// instead so the value still changes. An empty vector gains one entry.
pub fn bump_first_var(vars: &mut Vec<f64>) {
    match vars.first_mut() {
        Some(first) if *first >= VAR_MAX => *first = VAR_MAX - 1.0,
        Some(first) => *first = (*first + 1.0).min(VAR_MAX),
        None => vars.push(1.0),
    }
}

pub fn append_code_comment(code: &str) -> String {
    format!("{}{}", code, TAMPER_COMMENT)
}

/// Flip the first digest character between `a` and `b`; anything else
/// becomes `a`. A `sha256:` prefix is kept as written.
pub fn flip_hash(hash: &str) -> String {
    let split = if hash.len() >= HASH_PREFIX.len()
        && hash.is_char_boundary(HASH_PREFIX.len())
        && hash[..HASH_PREFIX.len()].eq_ignore_ascii_case(HASH_PREFIX)
    {
        HASH_PREFIX.len()
    } else {
        0
    };
    let (prefix, body) = hash.split_at(split);

    let mut chars = body.chars();
    let flipped = match chars.next() {
        Some('a') => 'b',
        Some('A') => 'B',
        Some('b') => 'a',
        Some('B') => 'A',
        Some(_) => 'a',
        None => return format!("{}a", prefix),
    };
    format!("{}{}{}", prefix, flipped, chars.as_str())
}

/// Copy of `bundle` with one mutation applied and the tamper marker set.
///
/// Flipping an absent animation hash yields a flipped empty hash (`a`),
/// which still disagrees with whatever the renderer computes.
pub fn tamper_bundle(bundle: &Bundle, tamper: Tamper) -> Bundle {
    let mut out = bundle.clone();
    match tamper {
        Tamper::Seed => out.snapshot.seed = bump_seed(out.snapshot.seed),
        Tamper::FirstVar => bump_first_var(&mut out.snapshot.vars),
        Tamper::Code => out.snapshot.code = append_code_comment(&out.snapshot.code),
        Tamper::PosterHash => out.baseline.poster_hash = flip_hash(&out.baseline.poster_hash),
        Tamper::AnimationHash => {
            let current = out.baseline.animation_hash.take().unwrap_or_default();
            out.baseline.animation_hash = Some(flip_hash(&current));
        }
    }
    out.tampered = true;
    out
}
