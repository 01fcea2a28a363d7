//! Error types for render-client

use thiserror::Error;

/// Errors surfaced by a renderer call, already classified for display.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Network failure, connection refused or timeout
    #[error("renderer unreachable: {message}")]
    Transport { message: String, hint: String },

    /// The renderer refused the snapshot because it breaks an execution rule
    #[error("renderer rejected the snapshot: {message}")]
    ProtocolViolation { message: String, remediation: String },

    /// Any other non-success HTTP status
    #[error("renderer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded
    #[error("malformed renderer response: {0}")]
    MalformedResponse(String),

    /// The client could not be built from its configuration
    #[error("invalid renderer configuration: {0}")]
    Config(String),
}

impl RenderError {
    /// User-facing next step for this failure, when there is one.
    pub fn hint(&self) -> Option<&str> {
        match self {
            RenderError::Transport { hint, .. } => Some(hint.as_str()),
            RenderError::ProtocolViolation { remediation, .. } => Some(remediation.as_str()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RenderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return RenderError::MalformedResponse(err.to_string());
        }
        let hint = if err.is_timeout() {
            "the renderer did not answer in time; retry, or raise the client timeout"
        } else if err.is_connect() {
            "check that the renderer is running and that the renderer URL is correct"
        } else {
            "check network connectivity to the renderer and retry"
        };
        RenderError::Transport {
            message: err.to_string(),
            hint: hint.to_string(),
        }
    }
}

/// Classify a non-success HTTP response from the renderer.
///
/// 400 and 422 mean the renderer looked at the snapshot and refused it,
/// so they become `ProtocolViolation` with a remediation derived from the
/// renderer's message. The message is read from a JSON `error` or
/// `message` field when present, else the raw body is used.
pub fn classify_status(status: u16, body: &str) -> RenderError {
    match status {
        400 | 422 => {
            let message = error_message(body);
            RenderError::ProtocolViolation {
                remediation: remediation_for(&message),
                message,
            }
        }
        _ => RenderError::Status {
            status,
            body: body.trim().to_string(),
        },
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "message"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Map a renderer rejection message to a concrete fix.
pub fn remediation_for(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    let fix = if lower.contains("canvas") {
        "remove createCanvas() and other canvas construction; the renderer supplies the only canvas"
    } else if lower.contains("math.random") || lower.contains("random") {
        "replace Math.random() with the seeded random() helper so output depends only on the seed"
    } else if lower.contains("date") || lower.contains("performance.now") {
        "avoid wall-clock APIs such as Date.now(); derive time from the frame counter"
    } else if lower.contains("fetch") || lower.contains("network") || lower.contains("xmlhttp") {
        "snapshots must not perform network access; inline any data into the code"
    } else if lower.contains("frames") || lower.contains("loop") {
        "a looping snapshot needs frames >= 2 and a still snapshot exactly 1 frame"
    } else {
        "check the snapshot code against the renderer's execution rules and resubmit"
    };
    fix.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_rejection_is_a_protocol_violation() {
        let err = classify_status(
            400,
            r#"{"error":"createCanvas() is not allowed in code mode","code":"PROTOCOL_VIOLATION"}"#,
        );
        match err {
            RenderError::ProtocolViolation {
                message,
                remediation,
            } => {
                assert!(message.contains("createCanvas"));
                assert!(remediation.contains("renderer supplies the only canvas"));
            }
            other => panic!("expected ProtocolViolation, got {:?}", other),
        }
    }

    #[test]
    fn plain_text_body_is_used_as_message() {
        let err = classify_status(422, "Math.random is forbidden\n");
        assert_eq!(
            err,
            RenderError::ProtocolViolation {
                message: "Math.random is forbidden".to_string(),
                remediation: remediation_for("Math.random"),
            }
        );
    }

    #[test]
    fn server_errors_keep_status() {
        let err = classify_status(503, "upstream overloaded");
        assert_eq!(
            err,
            RenderError::Status {
                status: 503,
                body: "upstream overloaded".to_string()
            }
        );
        assert!(err.hint().is_none());
    }

    #[test]
    fn unknown_rejection_gets_generic_fix() {
        assert!(remediation_for("bad things").contains("execution rules"));
    }

    #[test]
    fn transport_error_exposes_hint() {
        let err = RenderError::Transport {
            message: "connection refused".to_string(),
            hint: "start it".to_string(),
        };
        assert_eq!(err.hint(), Some("start it"));
        assert!(err.to_string().contains("connection refused"));
    }
}
