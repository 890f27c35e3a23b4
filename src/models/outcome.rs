use crate::errors::{UpstreamFailure, UpstreamKind};

/// Result of one webhook round-trip, before interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Success { payload: String },
    Failure { kind: UpstreamKind, detail: String },
}

impl WebhookOutcome {
    pub fn into_result(self) -> Result<String, UpstreamFailure> {
        match self {
            WebhookOutcome::Success { payload } => Ok(payload),
            WebhookOutcome::Failure { kind, detail } => Err(UpstreamFailure { kind, detail }),
        }
    }
}

impl From<UpstreamFailure> for WebhookOutcome {
    fn from(f: UpstreamFailure) -> Self {
        WebhookOutcome::Failure {
            kind: f.kind,
            detail: f.detail,
        }
    }
}
