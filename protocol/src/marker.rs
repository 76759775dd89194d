use crate::location::Location;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identity of a single marker.
    MarkerId
);
string_id!(
    /// Identity of a content stream: the logical file across its whole
    /// revision history, independent of path renames.
    StreamId
);
string_id!(
    /// Version-control revision identifier (e.g. a commit hash).
    RevisionId
);
string_id!(
    /// Identity of a marker's creator, passed through for attribution.
    UserId
);

/// The immutable pairing of a marker with the location it was created at,
/// expressed in the coordinate space of its origin revision. Created once
/// at marker-creation time, never mutated; all recomputation produces new,
/// disposable resolved locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub revision: RevisionId,
    pub location: Location,
}

/// A user-created annotation bound to a code span at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub stream_id: StreamId,
    pub creator_id: UserId,

    /// Repo-relative path recorded at creation time; used to derive a
    /// document uri when navigating straight to the marker.
    pub file: String,

    /// Absent for markers that were never anchored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,

    /// Free-form annotation content (title/text/type) owned by upstream
    /// collaborators; the engine passes it through untouched.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Attribution identity, resolved in one batched lookup per query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// A content stream resolved to its current place on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamHandle {
    pub id: StreamId,
    pub repo_root: PathBuf,
    /// Current repo-relative path of the stream's file.
    pub path: String,
}
