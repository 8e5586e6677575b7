use aprassist_core::chat::FailureKind;

use super::transport::TransportError;

const RATE_LIMIT_STATUS: u16 = 429;
const RATE_LIMIT_STATUS_TEXT: &str = "429";
const RESOURCE_EXHAUSTED_MARKER: &str = "RESOURCE_EXHAUSTED";
const QUOTA_MARKER: &str = "quota";

pub type FailureClassifier = fn(&TransportError) -> FailureKind;

/// Maps any transport failure onto the caller-visible taxonomy.
///
/// Provider error shapes vary, so quota exhaustion is status 429 or one of the
/// markers ("429", "RESOURCE_EXHAUSTED", "quota") in provider or network text.
/// Decode failures describe our own parse position and never carry markers.
pub fn classify_failure(err: &TransportError) -> FailureKind {
    if is_quota_exhausted(err) {
        FailureKind::QuotaExhausted
    } else {
        FailureKind::Generic
    }
}

fn is_quota_exhausted(err: &TransportError) -> bool {
    let message = match err {
        TransportError::Status { status, .. } if *status == RATE_LIMIT_STATUS => return true,
        TransportError::Status { message, .. } | TransportError::Network(message) => message,
        TransportError::Decode(_) => return false,
    };
    message.contains(RATE_LIMIT_STATUS_TEXT)
        || message.contains(RESOURCE_EXHAUSTED_MARKER)
        || message.contains(QUOTA_MARKER)
}
