//! Mode resolution from a snapshot's execution block.

use render_client::Snapshot;
use serde::Serialize;
use serde_json::Value;

use super::bundle::Mode;

/// Mode as observed on possibly-incomplete input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedMode {
    Static,
    Loop,
    /// No snapshot to look at
    Unknown,
}

impl ResolvedMode {
    pub fn mode(self) -> Option<Mode> {
        match self {
            ResolvedMode::Static => Some(Mode::Static),
            ResolvedMode::Loop => Some(Mode::Loop),
            ResolvedMode::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResolvedMode::Static => "static",
            ResolvedMode::Loop => "loop",
            ResolvedMode::Unknown => "unknown",
        }
    }
}

impl From<Mode> for ResolvedMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Static => ResolvedMode::Static,
            Mode::Loop => ResolvedMode::Loop,
        }
    }
}

impl std::fmt::Display for ResolvedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loop iff `execution.loop` is true or more than one frame is rendered.
pub fn mode_of(snapshot: &Snapshot) -> Mode {
    if snapshot.execution.is_loop || snapshot.execution.frames > 1 {
        Mode::Loop
    } else {
        Mode::Static
    }
}

pub fn resolve_mode(snapshot: Option<&Snapshot>) -> ResolvedMode {
    snapshot.map_or(ResolvedMode::Unknown, |s| mode_of(s).into())
}

/// Resolve from raw JSON. Malformed `execution` fields read as static.
pub fn resolve_mode_value(snapshot: Option<&Value>) -> ResolvedMode {
    match snapshot {
        Some(snap) if snap.is_object() => {
            let execution = snap.get("execution");
            let is_loop = execution
                .and_then(|e| e.get("loop"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let frames = execution
                .and_then(|e| e.get("frames"))
                .and_then(Value::as_f64)
                .unwrap_or(1.0);
            if is_loop || frames > 1.0 {
                ResolvedMode::Loop
            } else {
                ResolvedMode::Static
            }
        }
        _ => ResolvedMode::Unknown,
    }
}
