//! Completeness checks a bundle must pass before it is persisted.
//!
//! The validator is deliberately lenient with drafts; these checks are
//! not. They run when a sealed claim is about to be saved.

use super::bundle::Bundle;

/// Every reason a bundle cannot be submitted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("bundle is not ready for submission: {}", problems.join("; "))]
pub struct SubmissionError {
    pub problems: Vec<String>,
}

/// Check snapshot invariants, claim text, type-specific details and sources.
pub fn check_submission(bundle: &Bundle) -> Result<(), SubmissionError> {
    let mut problems: Vec<String> = Vec::new();

    if let Err(violations) = bundle.snapshot.check() {
        problems.extend(violations.iter().map(|v| format!("snapshot: {}", v)));
    }

    let claim = &bundle.claim;
    if claim.title.trim().is_empty() {
        problems.push("claim.title must not be empty".to_string());
    }
    if claim.statement.trim().is_empty() {
        problems.push("claim.statement must not be empty".to_string());
    }
    for field in claim.details.missing_fields() {
        problems.push(format!(
            "claim.details.{} is required for {} claims",
            field,
            claim.claim_type().as_str()
        ));
    }

    for (i, source) in bundle.sources.iter().enumerate() {
        if source.label.trim().is_empty() {
            problems.push(format!("sources[{}].label must not be empty", i));
        }
        if source.url.trim().is_empty() {
            problems.push(format!("sources[{}].url must not be empty", i));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(SubmissionError { problems })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bundle::{Claim, ClaimDetails, GenericDetails, Source};
    use render_client::{Execution, Snapshot};

    fn complete() -> Bundle {
        let claim = Claim {
            title: "Rain in Oslo".to_string(),
            statement: "It rains in Oslo on 2026-05-01".to_string(),
            details: ClaimDetails::Generic(GenericDetails {
                criteria: "met.no daily record".to_string(),
            }),
            ..Claim::default()
        };
        let snapshot = Snapshot::new("draw()", 42, vec![10.0; 10], Execution::still());
        Bundle::draft(claim, snapshot).with_sources(vec![Source {
            label: "met.no".to_string(),
            url: "https://met.no".to_string(),
            ..Source::default()
        }])
    }

    #[test]
    fn complete_bundle_passes() {
        assert_eq!(check_submission(&complete()), Ok(()));
    }

    #[test]
    fn collects_every_problem() {
        let mut bundle = complete();
        bundle.claim.title.clear();
        bundle.claim.details = ClaimDetails::Generic(GenericDetails::default());
        bundle.sources[0].url.clear();
        bundle.snapshot.vars[4] = 101.0;

        let err = check_submission(&bundle).unwrap_err();
        assert_eq!(err.problems.len(), 4, "{:?}", err.problems);
        assert!(err.to_string().contains("claim.details.criteria"));
        assert!(err.to_string().contains("sources[0].url"));
        assert!(err.to_string().contains("vars[4]"));
    }

    #[test]
    fn no_sources_is_fine() {
        let mut bundle = complete();
        bundle.sources.clear();
        assert!(check_submission(&bundle).is_ok());
    }
}
