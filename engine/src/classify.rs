//! Maps translator failures and collaborator faults to the closed set of
//! not-located reasons. Classification is deterministic for identical
//! inputs and never retries; retry policy belongs to the providers.

use crate::error::ProviderError;
use crate::translate::TranslationFailure;
use pinpoint_protocol::MarkerId;
use pinpoint_protocol::NotLocatedReason;
use pinpoint_protocol::NotLocatedRecord;

pub fn classify_failure(marker_id: MarkerId, failure: TranslationFailure) -> NotLocatedRecord {
    let (reason, detail) = match failure {
        TranslationFailure::Deleted { detail } => (NotLocatedReason::Deleted, detail),
        TranslationFailure::OutOfBounds { line, buffer_lines } => (
            NotLocatedReason::OutOfBounds,
            format!("line {line} is outside the {buffer_lines}-line buffer"),
        ),
        TranslationFailure::Ambiguous { matches } => (
            NotLocatedReason::Ambiguous,
            format!("{matches} equally plausible relocations"),
        ),
    };
    NotLocatedRecord {
        marker_id,
        reason,
        detail: Some(detail),
    }
}

pub fn classify_provider_error(marker_id: MarkerId, error: &ProviderError) -> NotLocatedRecord {
    let (reason, detail) = match error {
        ProviderError::ChainUnavailable { detail } => {
            (NotLocatedReason::ChainUnavailable, detail.clone())
        }
        // unknown always carries the underlying error text
        ProviderError::NotFound { what } => (NotLocatedReason::Unknown, format!("{what} not found")),
        ProviderError::Other { detail } => (NotLocatedReason::Unknown, detail.clone()),
    };
    NotLocatedRecord {
        marker_id,
        reason,
        detail: Some(detail),
    }
}

/// A marker that never received an origin location cannot be translated at
/// all; it classifies without invoking the translator.
pub fn classify_unanchored(marker_id: MarkerId) -> NotLocatedRecord {
    NotLocatedRecord {
        marker_id,
        reason: NotLocatedReason::Unknown,
        detail: Some("marker has no recorded origin location".to_string()),
    }
}
