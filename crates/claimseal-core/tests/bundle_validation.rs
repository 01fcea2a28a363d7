//! Validation, mode resolution, normalization and schema round-trips,
//! exercised through the public API on realistic bundle text.

use claimseal_core::domain::validation::{FIELD_ANIMATION_HASH, FIELD_POSTER_HASH};
use claimseal_core::{
    normalize_hash, parse_bundle, resolve_mode, resolve_mode_value, validate, Baseline, Bundle,
    BundleVersion, CheckVerdict, Claim, ClaimDetails, Execution, Mode, ResolvedMode, Snapshot,
    Source,
};
use serde_json::{json, Value};

const VARS: [f64; 10] = [50.0, 55.0, 30.0, 20.0, 10.0, 15.0, 5.0, 25.0, 40.0, 60.0];

fn bundle_json(vars: Value, execution: Value, baseline: Value) -> String {
    json!({
        "bundleVersion": "2",
        "createdAt": "2026-03-01T12:00:00.000Z",
        "mode": "static",
        "claim": {
            "type": "generic",
            "title": "Rain in Oslo",
            "statement": "It rains in Oslo on 1 May",
            "eventDate": "2026-05-01",
            "subject": "weather",
            "notes": "",
            "details": { "criteria": "met.no daily precipitation > 0" }
        },
        "sources": [],
        "canonical": { "via": "claimseal", "protocol": "deterministic-render", "protocolVersion": "1.2.0" },
        "snapshot": { "code": "function draw(){}", "seed": 42, "vars": vars, "execution": execution },
        "baseline": baseline,
        "check": { "lastCheckedAt": "", "result": "" }
    })
    .to_string()
}

fn still() -> Value {
    json!({ "frames": 1, "loop": false })
}

fn looping() -> Value {
    json!({ "frames": 60, "loop": true })
}

// ---- structural checks ----

#[test]
fn nine_vars_is_invalid_with_length_complaint() {
    let text = bundle_json(
        json!(&VARS[..9]),
        still(),
        json!({ "posterHash": "sha256:abc", "animationHash": null }),
    );
    let result = validate(&text);
    assert!(!result.is_valid);
    assert_eq!(
        result.missing_fields,
        vec!["snapshot.vars (expected 10 values, found 9)"]
    );
    assert!(!result.is_structurally_valid());
}

#[test]
fn out_of_range_var_is_not_rejected() {
    let mut vars = VARS.to_vec();
    vars[3] = 250.0;
    let text = bundle_json(
        json!(vars),
        still(),
        json!({ "posterHash": "sha256:abc", "animationHash": null }),
    );
    let result = validate(&text);
    assert!(result.is_valid, "{:?}", result.missing_fields);
}

#[test]
fn empty_code_is_missing() {
    let text = json!({
        "bundleVersion": "2",
        "snapshot": { "code": "", "seed": 0, "vars": VARS },
        "baseline": { "posterHash": "abc" }
    })
    .to_string();
    let result = validate(&text);
    assert_eq!(result.missing_fields, vec!["snapshot.code"]);
}

// ---- per-mode hash requirements ----

#[test]
fn loop_bundle_with_only_poster_hash_is_invalid() {
    let text = bundle_json(
        json!(VARS),
        looping(),
        json!({ "posterHash": "sha256:abc", "animationHash": null }),
    );
    let result = validate(&text);
    assert!(!result.is_valid);
    assert_eq!(result.mode, ResolvedMode::Loop);
    assert_eq!(result.missing_hash_fields, vec![FIELD_ANIMATION_HASH]);
    assert!(result.is_structurally_valid());
}

#[test]
fn loop_bundle_with_both_hashes_is_valid() {
    let text = bundle_json(
        json!(VARS),
        looping(),
        json!({ "posterHash": "sha256:abc", "animationHash": "sha256:def" }),
    );
    let result = validate(&text);
    assert!(result.is_valid);
    // declared "static" disagrees with the loop snapshot
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn static_bundle_needs_only_poster_hash() {
    let text = bundle_json(json!(VARS), still(), json!({ "posterHash": "" }));
    let result = validate(&text);
    assert_eq!(result.missing_hash_fields, vec![FIELD_POSTER_HASH]);
}

#[test]
fn draft_is_structurally_valid_but_not_valid() {
    let text = bundle_json(
        json!(VARS),
        still(),
        json!({ "posterHash": "", "animationHash": null }),
    );
    let result = validate(&text);
    assert!(result.is_structurally_valid());
    assert!(!result.is_valid);
}

// ---- empty and unparseable input ----

#[test]
fn empty_and_garbage_are_distinct_states() {
    let empty = validate("");
    assert!(empty.is_empty && !empty.is_valid);
    assert!(empty.missing_fields.is_empty());

    let garbage = validate("{\"snapshot\": ");
    assert!(!garbage.is_empty && !garbage.is_valid);
    assert!(garbage.parse_error.is_some());
    assert!(garbage.missing_fields.is_empty());
}

// ---- legacy bundles ----

#[test]
fn legacy_v1_bundle_validates_after_upgrade() {
    let text = json!({
        "strategy": { "name": "Momentum", "description": "Top decile beats bottom decile" },
        "snapshot": { "code": "draw()", "seed": 7, "vars": VARS, "execution": looping() },
        "expectedImageHash": "sha256:POSTER",
        "expectedAnimationHash": "sha256:ANIM"
    })
    .to_string();

    let result = validate(&text);
    assert!(result.is_valid, "{:?}", result.missing_fields);
    assert_eq!(result.source_version, Some(BundleVersion::V1));
    assert!(result.warnings.iter().any(|w| w.contains("legacy")));

    let bundle = parse_bundle(&text).unwrap();
    assert_eq!(bundle.bundle_version, "2");
    assert_eq!(bundle.mode, Mode::Loop);
    assert_eq!(bundle.claim.title, "Momentum");
    assert_eq!(bundle.baseline.animation(), Some("sha256:ANIM"));
}

#[test]
fn legacy_hash_replaces_blank_baseline_entry() {
    let text = json!({
        "snapshot": { "code": "draw()", "seed": 7, "vars": VARS, "execution": still() },
        "baseline": { "posterHash": "" },
        "expectedImageHash": "sha256:POSTER"
    })
    .to_string();

    let result = validate(&text);
    assert!(result.is_valid, "{:?}", result.missing_fields);
    let bundle = parse_bundle(&text).unwrap();
    assert_eq!(bundle.baseline.poster_hash, "sha256:POSTER");
}

#[test]
fn float_version_two_is_current() {
    let mut value: Value =
        serde_json::from_str(&bundle_json(json!(VARS), still(), json!({ "posterHash": "sha256:aa" })))
            .unwrap();
    value["bundleVersion"] = json!(2.0);

    let result = claimseal_core::domain::validation::validate_value(value);
    assert!(result.is_valid);
    assert_eq!(result.source_version, Some(BundleVersion::V2));
    assert!(result.warnings.iter().all(|w| !w.contains("bundleVersion")));
}

#[test]
fn non_object_input_is_not_a_legacy_bundle() {
    let result = validate("[1,2,3]");
    assert!(!result.is_valid);
    assert_eq!(result.source_version, None);
    assert!(result.warnings.iter().all(|w| !w.contains("legacy")));
}

// ---- mode resolution ----

#[test]
fn mode_resolution_is_total() {
    assert_eq!(resolve_mode(None), ResolvedMode::Unknown);
    assert_eq!(resolve_mode_value(Some(&json!("nope"))), ResolvedMode::Unknown);
    let snap = Snapshot::new("x", 0, VARS.to_vec(), Execution::looping(2));
    assert_eq!(resolve_mode(Some(&snap)), resolve_mode(Some(&snap)));
    assert_eq!(resolve_mode(Some(&snap)), ResolvedMode::Loop);
}

// ---- normalization ----

#[test]
fn normalization_properties() {
    assert_eq!(normalize_hash("SHA256:ABC"), normalize_hash("abc"));
    for h in ["sha256:AbC", "ABC", " sha256:sha256:ff ", ""] {
        let once = normalize_hash(h);
        assert_eq!(normalize_hash(&once), once);
    }
}

// ---- round trip ----

fn assert_round_trips(text: &str) {
    let parsed = parse_bundle(text).unwrap();
    let again = parse_bundle(&parsed.to_json_pretty().unwrap()).unwrap();
    assert_eq!(again, parsed);
}

#[test]
fn round_trip_holds_for_every_bundle_shape() {
    assert_round_trips(&bundle_json(json!(VARS), still(), json!({ "posterHash": "sha256:aa" })));
    assert_round_trips(&bundle_json(
        json!(VARS),
        looping(),
        json!({ "posterHash": "sha256:aa", "animationHash": "sha256:bb" }),
    ));
    assert_round_trips(
        &json!({
            "strategy": { "name": "Momentum", "description": "Top decile beats bottom decile" },
            "snapshot": { "code": "draw()", "seed": 7, "vars": VARS, "execution": looping() },
            "expectedImageHash": "sha256:POSTER",
            "expectedAnimationHash": "sha256:ANIM"
        })
        .to_string(),
    );
}

#[test]
fn parse_of_serialize_is_identity() {
    let claim = Claim {
        title: "Derby".to_string(),
        statement: "Home side wins".to_string(),
        event_date: "2026-04-12".to_string(),
        subject: "football".to_string(),
        notes: "kick-off 15:00".to_string(),
        details: ClaimDetails::Sports(claimseal_core::domain::SportsDetails {
            league: "EPL".to_string(),
            home_team: "Arsenal".to_string(),
            away_team: "Spurs".to_string(),
            outcome: "Arsenal win".to_string(),
        }),
    };
    let mut bundle = Bundle::draft(
        claim,
        Snapshot::new("draw()", -3, vec![0.5; 10], Execution::looping(60)),
    )
    .with_sources(vec![Source {
        label: "BBC".to_string(),
        url: "https://bbc.co.uk/sport".to_string(),
        retrieved_at: "2026-04-12T18:00:00Z".to_string(),
        selector_or_evidence: "#score".to_string(),
    }]);
    bundle.baseline = Baseline::new("sha256:aa", Some("sha256:bb".to_string()));
    bundle.check.result = CheckVerdict::Verified;
    bundle.tampered = true;

    let text = bundle.to_json_pretty().unwrap();
    assert_eq!(parse_bundle(&text).unwrap(), bundle);
}
