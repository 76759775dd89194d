use thiserror::Error;

/// Failures raised at the collaborator boundary (marker store, stream
/// resolver, revision chain provider, user directory).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Revision history between origin and current could not be retrieved:
    /// backend/network failure, rewritten history, or a rename without a
    /// supplied mapping. Retryable upstream; the engine itself never
    /// retries.
    #[error("revision chain unavailable: {detail}")]
    ChainUnavailable { detail: String },

    /// A referenced marker or content stream no longer exists.
    #[error("{what} not found")]
    NotFound { what: String },

    /// Unexpected collaborator fault.
    #[error("provider error: {detail}")]
    Other { detail: String },
}

/// Errors surfaced by the resolver's exposed operations. Batch resolution
/// degrades to typed not-located records instead of raising these; only
/// the lookup paths (single-marker navigation, marker enumeration) error.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
