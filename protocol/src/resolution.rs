use crate::location::Location;
use crate::marker::MarkerId;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Why a marker could not be located in the current buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotLocatedReason {
    /// The marked code was removed.
    Deleted,
    /// The computed position falls outside the current buffer.
    OutOfBounds,
    /// Revision history between origin and current could not be retrieved.
    ChainUnavailable,
    /// Multiple equally plausible relocations, none preferable.
    Ambiguous,
    /// Catch-all for unexpected upstream conditions; `detail` carries the
    /// underlying error text.
    Unknown,
}

impl fmt::Display for NotLocatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotLocatedReason::Deleted => "deleted",
            NotLocatedReason::OutOfBounds => "out_of_bounds",
            NotLocatedReason::ChainUnavailable => "chain_unavailable",
            NotLocatedReason::Ambiguous => "ambiguous",
            NotLocatedReason::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Produced instead of a resolved location when translation fails or
/// degrades below the confidence threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotLocatedRecord {
    pub marker_id: MarkerId,
    pub reason: NotLocatedReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A marker resolved to a span of the live buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedMarker {
    pub marker_id: MarkerId,
    /// Expressed in the coordinate space of the buffer the query ran
    /// against, never a stale one.
    pub location: Location,
    /// Set when more than half of the chain's diffs required re-anchoring;
    /// callers may choose to still display the marker.
    #[serde(default)]
    pub low_confidence: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
}

/// Result of resolving one document's markers. Every queried marker lands
/// in exactly one of the two maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionBatch {
    pub located: HashMap<MarkerId, LocatedMarker>,
    pub not_located: HashMap<MarkerId, NotLocatedRecord>,
}

impl ResolutionBatch {
    pub fn len(&self) -> usize {
        self.located.len() + self.not_located.len()
    }

    pub fn is_empty(&self) -> bool {
        self.located.is_empty() && self.not_located.is_empty()
    }
}
