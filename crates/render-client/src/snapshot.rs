//! Snapshot wire shape: the unit of deterministic execution.

use serde::{Deserialize, Serialize};

/// Number of user-tunable variables carried by every snapshot.
pub const VARS_LEN: usize = 10;

/// Inclusive lower bound for a snapshot variable.
pub const VAR_MIN: f64 = 0.0;

/// Inclusive upper bound for a snapshot variable.
pub const VAR_MAX: f64 = 100.0;

/// Execution parameters for a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Number of frames to render (1 for a still image).
    pub frames: u32,
    /// Whether the output is a looping animation.
    #[serde(rename = "loop")]
    pub is_loop: bool,
}

impl Default for Execution {
    fn default() -> Self {
        Execution::still()
    }
}

impl Execution {
    /// A single-frame, non-looping execution.
    pub fn still() -> Self {
        Execution {
            frames: 1,
            is_loop: false,
        }
    }

    /// A looping execution over `frames` frames.
    pub fn looping(frames: u32) -> Self {
        Execution {
            frames,
            is_loop: true,
        }
    }
}

/// `{code, seed, vars, execution}` as sent to the renderer.
///
/// Identical snapshots must always reproduce identical hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub code: String,
    pub seed: i64,
    pub vars: Vec<f64>,
    #[serde(default)]
    pub execution: Execution,
}

/// A broken snapshot invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotViolation {
    #[error("code must not be empty")]
    EmptyCode,

    #[error("vars must contain exactly 10 values, found {found}")]
    VarsLength { found: usize },

    #[error("vars[{index}] = {value} is outside [0, 100]")]
    VarOutOfRange { index: usize, value: f64 },

    #[error("frames must be at least 1")]
    ZeroFrames,

    #[error("a looping execution needs at least 2 frames, found {frames}")]
    LoopTooShort { frames: u32 },

    #[error("a non-looping execution must render exactly 1 frame, found {frames}")]
    StillWithFrames { frames: u32 },
}

impl Snapshot {
    pub fn new(code: impl Into<String>, seed: i64, vars: Vec<f64>, execution: Execution) -> Self {
        Snapshot {
            code: code.into(),
            seed,
            vars,
            execution,
        }
    }

    /// Collect every invariant this snapshot breaks. Empty means well-formed.
    pub fn violations(&self) -> Vec<SnapshotViolation> {
        let mut out = Vec::new();
        if self.code.is_empty() {
            out.push(SnapshotViolation::EmptyCode);
        }
        if self.vars.len() != VARS_LEN {
            out.push(SnapshotViolation::VarsLength {
                found: self.vars.len(),
            });
        }
        for (index, &value) in self.vars.iter().enumerate() {
            if !(VAR_MIN..=VAR_MAX).contains(&value) {
                out.push(SnapshotViolation::VarOutOfRange { index, value });
            }
        }
        let Execution { frames, is_loop } = self.execution;
        if frames == 0 {
            out.push(SnapshotViolation::ZeroFrames);
        } else if is_loop && frames < 2 {
            out.push(SnapshotViolation::LoopTooShort { frames });
        } else if !is_loop && frames != 1 {
            out.push(SnapshotViolation::StillWithFrames { frames });
        }
        out
    }

    pub fn check(&self) -> Result<(), Vec<SnapshotViolation>> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
