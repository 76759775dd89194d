//! Data model shared between the resolution engine and its collaborators:
//! marker records and their immutable anchors, locations, revision chains,
//! and the located / not-located result types.

mod chain;
mod location;
mod marker;
mod resolution;

pub use chain::ChainStep;
pub use chain::DiffHunk;
pub use chain::FileDiff;
pub use chain::RevisionChain;
pub use location::Location;
pub use marker::Anchor;
pub use marker::Marker;
pub use marker::MarkerId;
pub use marker::RevisionId;
pub use marker::StreamHandle;
pub use marker::StreamId;
pub use marker::User;
pub use marker::UserId;
pub use resolution::LocatedMarker;
pub use resolution::NotLocatedReason;
pub use resolution::NotLocatedRecord;
pub use resolution::ResolutionBatch;
