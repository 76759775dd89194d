//! # Pinpoint Engine
//!
//! Re-locates durable code annotations ("markers") against the current
//! state of a file. A marker is anchored to a span of one historical
//! revision; as the file is edited, committed, branched, and reopened —
//! possibly with uncommitted changes present — the engine computes the
//! anchor's best current position, or a typed reason why none exists.
//!
//! ```text
//! resolve(document, markers)
//!     │
//!     ├──> Resolution Cache ── hit ──> cached batch
//!     │
//!     ├──> Revision Chain Provider
//!     │    └─> diffs origin → current (+ dirty buffer diff)
//!     │
//!     ├──> Diff-Based Translator (pure)
//!     │    └─> current span | deleted | out of bounds | ambiguous
//!     │
//!     └──> Not-Located Classifier
//!          └─> {located, not_located} batch
//! ```
//!
//! The translator is a pure function and the natural unit of parallelism;
//! all I/O is behind the injected provider interfaces.

mod classify;
mod diffs;
mod error;
mod git;
mod provider;
mod resolver;
mod translate;

pub use diffs::diff_lines;
pub use diffs::parse_unified;
pub use error::ProviderError;
pub use error::ResolveError;
pub use error::Result;
pub use git::GitChainProvider;
pub use provider::MarkerStore;
pub use provider::RevisionChainProvider;
pub use provider::StreamResolver;
pub use provider::UserDirectory;
pub use resolver::CachePolicy;
pub use resolver::MarkerOutcome;
pub use resolver::MarkerResolver;
pub use resolver::ResolverConfig;
pub use resolver::SingleMarkerResolution;
pub use translate::Translation;
pub use translate::TranslationFailure;
pub use translate::translate;
