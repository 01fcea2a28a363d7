//! Expected-vs-computed hash comparison.
//!
//! Normalization itself lives in `render_client` so the stub renderer and
//! the comparisons here agree on notation.

use serde::Serialize;

pub use render_client::{hashes_equal, normalize_hash};

/// Which baseline hash a comparison is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HashKind {
    Poster,
    Animation,
}

impl HashKind {
    /// Name of the baseline field holding this hash.
    pub fn field(self) -> &'static str {
        match self {
            HashKind::Poster => "posterHash",
            HashKind::Animation => "animationHash",
        }
    }
}

impl std::fmt::Display for HashKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field())
    }
}

/// One expected-vs-computed comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashCheck {
    pub kind: HashKind,
    pub expected: String,
    pub computed: Option<String>,
    pub matched: bool,
}

/// Compare an expected hash with what the renderer computed.
///
/// A missing computed hash never matches.
pub fn compare(kind: HashKind, expected: &str, computed: Option<&str>) -> HashCheck {
    let matched = computed.is_some_and(|c| hashes_equal(expected, c));
    HashCheck {
        kind,
        expected: expected.to_string(),
        computed: computed.map(str::to_string),
        matched,
    }
}
