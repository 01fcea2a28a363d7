//! The exported bundle: claim metadata, sources, snapshot and baseline.
//!
//! A bundle starts as a draft (empty `createdAt`, empty baseline, empty
//! `check.result`) and becomes sealed the moment a render populates its
//! baseline. From then on `snapshot` and `baseline` never change; later
//! verification cycles only rewrite `check`.

use chrono::{DateTime, SecondsFormat, Utc};
use render_client::Snapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ClaimsealError, Result};
use super::hash::normalize_hash;
use super::migration::upgrade_bundle;
use super::mode::mode_of;

/// Current canonical bundle schema version.
pub const BUNDLE_VERSION: &str = "2";

/// Protocol name recorded in `canonical.protocol`.
pub const DEFAULT_PROTOCOL: &str = "deterministic-render";

/// Execution mode of a bundle, always derived from its snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Static,
    Loop,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Static => "static",
            Mode::Loop => "loop",
        }
    }

    /// Loop mode needs an animation hash next to the poster hash.
    pub fn requires_animation(self) -> bool {
        self == Mode::Loop
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

/// Kind of real-world statement a claim makes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    #[default]
    Generic,
    Sports,
    Pnl,
}

impl ClaimType {
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimType::Generic => "generic",
            ClaimType::Sports => "sports",
            ClaimType::Pnl => "pnl",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericDetails {
    /// How the claim will be judged true or false
    #[serde(default)]
    pub criteria: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportsDetails {
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    /// Predicted result, e.g. a winner or a final score
    #[serde(default)]
    pub outcome: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlDetails {
    #[serde(default)]
    pub instrument: String,
    #[serde(default)]
    pub period_start: String,
    #[serde(default)]
    pub period_end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_pct: Option<f64>,
}

/// Type-specific claim details, keyed by `claim.type`.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimDetails {
    Generic(GenericDetails),
    Sports(SportsDetails),
    Pnl(PnlDetails),
}

impl Default for ClaimDetails {
    fn default() -> Self {
        ClaimDetails::Generic(GenericDetails::default())
    }
}

impl ClaimDetails {
    /// Empty details for a claim type.
    pub fn empty(claim_type: ClaimType) -> Self {
        match claim_type {
            ClaimType::Generic => ClaimDetails::Generic(GenericDetails::default()),
            ClaimType::Sports => ClaimDetails::Sports(SportsDetails::default()),
            ClaimType::Pnl => ClaimDetails::Pnl(PnlDetails::default()),
        }
    }

    pub fn claim_type(&self) -> ClaimType {
        match self {
            ClaimDetails::Generic(_) => ClaimType::Generic,
            ClaimDetails::Sports(_) => ClaimType::Sports,
            ClaimDetails::Pnl(_) => ClaimType::Pnl,
        }
    }

    /// Required sub-fields that are still blank, by wire name.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required: Vec<(&'static str, bool)> = match self {
            ClaimDetails::Generic(d) => vec![("criteria", d.criteria.trim().is_empty())],
            ClaimDetails::Sports(d) => vec![
                ("league", d.league.trim().is_empty()),
                ("homeTeam", d.home_team.trim().is_empty()),
                ("awayTeam", d.away_team.trim().is_empty()),
                ("outcome", d.outcome.trim().is_empty()),
            ],
            ClaimDetails::Pnl(d) => vec![
                ("instrument", d.instrument.trim().is_empty()),
                ("periodStart", d.period_start.trim().is_empty()),
                ("periodEnd", d.period_end.trim().is_empty()),
                ("returnPct", d.return_pct.is_none()),
            ],
        };
        required
            .into_iter()
            .filter(|(_, blank)| *blank)
            .map(|(name, _)| name)
            .collect()
    }

    fn to_value(&self) -> Value {
        let value = match self {
            ClaimDetails::Generic(d) => serde_json::to_value(d),
            ClaimDetails::Sports(d) => serde_json::to_value(d),
            ClaimDetails::Pnl(d) => serde_json::to_value(d),
        };
        value.unwrap_or_default()
    }

    fn from_value(claim_type: ClaimType, value: Value) -> serde_json::Result<Self> {
        if value.is_null() {
            return Ok(Self::empty(claim_type));
        }
        Ok(match claim_type {
            ClaimType::Generic => ClaimDetails::Generic(serde_json::from_value(value)?),
            ClaimType::Sports => ClaimDetails::Sports(serde_json::from_value(value)?),
            ClaimType::Pnl => ClaimDetails::Pnl(serde_json::from_value(value)?),
        })
    }
}

/// The checkable real-world statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawClaim", into = "RawClaim")]
pub struct Claim {
    pub title: String,
    pub statement: String,
    pub event_date: String,
    pub subject: String,
    pub notes: String,
    pub details: ClaimDetails,
}

impl Claim {
    pub fn claim_type(&self) -> ClaimType {
        self.details.claim_type()
    }
}

/// Wire form of `Claim`: `type` selects how `details` is read.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClaim {
    #[serde(rename = "type", default)]
    claim_type: ClaimType,
    #[serde(default)]
    title: String,
    #[serde(default)]
    statement: String,
    #[serde(default)]
    event_date: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    details: Value,
}

impl TryFrom<RawClaim> for Claim {
    type Error = serde_json::Error;

    fn try_from(raw: RawClaim) -> std::result::Result<Self, Self::Error> {
        Ok(Claim {
            details: ClaimDetails::from_value(raw.claim_type, raw.details)?,
            title: raw.title,
            statement: raw.statement,
            event_date: raw.event_date,
            subject: raw.subject,
            notes: raw.notes,
        })
    }
}

impl From<Claim> for RawClaim {
    fn from(claim: Claim) -> Self {
        RawClaim {
            claim_type: claim.claim_type(),
            details: claim.details.to_value(),
            title: claim.title,
            statement: claim.statement,
            event_date: claim.event_date,
            subject: claim.subject,
            notes: claim.notes,
        }
    }
}

// ---------------------------------------------------------------------------
// Sources, canonical block, baseline, check record
// ---------------------------------------------------------------------------

/// Evidence pointer. Never fetched or checked for reachability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub retrieved_at: String,
    #[serde(default)]
    pub selector_or_evidence: String,
}

/// Which renderer protocol produced the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Canonical {
    #[serde(default)]
    pub via: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub protocol_version: String,
}

impl Default for Canonical {
    fn default() -> Self {
        Canonical {
            via: "claimseal".to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            protocol_version: String::new(),
        }
    }
}

/// Hashes captured at seal time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    #[serde(default)]
    pub poster_hash: String,
    #[serde(default)]
    pub animation_hash: Option<String>,
}

impl Baseline {
    pub fn new(poster_hash: impl Into<String>, animation_hash: Option<String>) -> Self {
        Baseline {
            poster_hash: poster_hash.into(),
            animation_hash,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.poster_hash.trim().is_empty()
    }

    pub fn animation(&self) -> Option<&str> {
        self.animation_hash
            .as_deref()
            .filter(|h| !h.trim().is_empty())
    }

    /// Whether every hash `mode` requires is present.
    pub fn is_complete(&self, mode: Mode) -> bool {
        !self.is_empty() && (!mode.requires_animation() || self.animation().is_some())
    }
}

/// Result of the most recent verification, as recorded in the bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckVerdict {
    #[default]
    #[serde(rename = "")]
    Unchecked,
    Verified,
    Failed,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRecord {
    #[serde(default)]
    pub last_checked_at: String,
    #[serde(default)]
    pub result: CheckVerdict,
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

fn is_false(b: &bool) -> bool {
    !*b
}

/// Top-level exported artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub bundle_version: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub claim: Claim,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub canonical: Canonical,
    pub snapshot: Snapshot,
    #[serde(default)]
    pub baseline: Baseline,
    #[serde(default)]
    pub check: CheckRecord,
    /// Set by the tamper simulator
    #[serde(default, skip_serializing_if = "is_false")]
    pub tampered: bool,
    /// Marks an example/placeholder bundle
    #[serde(default, skip_serializing_if = "is_false")]
    pub example: bool,
}

impl Bundle {
    /// A fresh, unsealed bundle.
    pub fn draft(claim: Claim, snapshot: Snapshot) -> Self {
        Bundle {
            bundle_version: BUNDLE_VERSION.to_string(),
            created_at: String::new(),
            mode: mode_of(&snapshot),
            claim,
            sources: Vec::new(),
            canonical: Canonical::default(),
            snapshot,
            baseline: Baseline::default(),
            check: CheckRecord::default(),
            tampered: false,
            example: false,
        }
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    /// Mode as derived from the snapshot's execution block.
    pub fn resolved_mode(&self) -> Mode {
        mode_of(&self.snapshot)
    }

    pub fn is_sealed(&self) -> bool {
        !self.baseline.is_empty()
    }

    /// Turn a draft into a sealed bundle.
    ///
    /// Fails if the bundle is already sealed or if `baseline` lacks a hash
    /// the snapshot's mode requires. Static bundles never keep an
    /// animation hash.
    pub fn seal(
        &mut self,
        baseline: Baseline,
        protocol_version: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if self.is_sealed() {
            return Err(ClaimsealError::AlreadySealed);
        }
        let mode = self.resolved_mode();
        if !baseline.is_complete(mode) {
            let detail = if baseline.is_empty() {
                "posterHash is empty"
            } else {
                "animationHash is empty"
            };
            return Err(ClaimsealError::IncompleteBaseline {
                mode,
                detail: detail.to_string(),
            });
        }

        self.mode = mode;
        self.baseline = match mode {
            Mode::Static => Baseline::new(baseline.poster_hash, None),
            Mode::Loop => baseline,
        };
        if let Some(version) = protocol_version {
            self.canonical.protocol_version = version.to_string();
        }
        self.created_at = timestamp(at);
        Ok(())
    }

    /// Record the outcome of a verification cycle. Touches nothing but `check`.
    pub fn record_check(&mut self, result: CheckVerdict, at: DateTime<Utc>) {
        self.check = CheckRecord {
            last_checked_at: timestamp(at),
            result,
        };
    }

    /// Poster hash in normalized form, the store's lookup key.
    pub fn poster_key(&self) -> String {
        normalize_hash(&self.baseline.poster_hash)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse bundle text of any supported generation into the canonical form.
///
/// Legacy bundles are upgraded first; `mode` is re-derived from the
/// snapshot so the typed value never drifts from it.
pub fn parse_bundle(text: &str) -> Result<Bundle> {
    let raw: Value = serde_json::from_str(text)?;
    bundle_from_value(raw)
}

/// Typed bundle from an already-parsed JSON value.
pub fn bundle_from_value(raw: Value) -> Result<Bundle> {
    if !raw.is_object() {
        return Err(ClaimsealError::InvalidBundle(
            "bundle must be a JSON object".to_string(),
        ));
    }
    let upgraded = upgrade_bundle(raw);
    let mut bundle: Bundle = serde_json::from_value(upgraded.value)?;
    bundle.mode = bundle.resolved_mode();
    Ok(bundle)
}
