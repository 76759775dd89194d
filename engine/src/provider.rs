//! Interfaces of the external collaborators the engine consumes. The
//! orchestrator receives these at construction, so deployments (and tests)
//! substitute their own implementations.

use crate::error::ProviderError;
use async_trait::async_trait;
use pinpoint_protocol::Marker;
use pinpoint_protocol::MarkerId;
use pinpoint_protocol::RevisionChain;
use pinpoint_protocol::RevisionId;
use pinpoint_protocol::StreamHandle;
use pinpoint_protocol::StreamId;
use pinpoint_protocol::User;
use pinpoint_protocol::UserId;
use std::path::Path;

/// Supplies the ordered revision chain between a marker's origin revision
/// and the current state of its file, plus the live buffer contents.
#[async_trait]
pub trait RevisionChainProvider: Send + Sync {
    /// Current (possibly uncommitted) contents of the stream's document.
    async fn live_buffer(
        &self,
        stream: &StreamHandle,
        uri: &str,
    ) -> Result<String, ProviderError>;

    /// Diffs in strict origin→current order, the dirty-buffer diff last
    /// when `include_dirty` is set. An uncomputable intermediate step
    /// (rewritten history, a move without a rename mapping) must fail with
    /// [`ProviderError::ChainUnavailable`], never silently truncate.
    async fn chain(
        &self,
        stream: &StreamHandle,
        origin: &RevisionId,
        buffer: &str,
        include_dirty: bool,
    ) -> Result<RevisionChain, ProviderError>;
}

/// Marker retrieval, backed by whatever persistence the deployment uses.
#[async_trait]
pub trait MarkerStore: Send + Sync {
    /// Markers attached to a content stream, in creation order.
    async fn markers_for_stream(&self, stream: &StreamId) -> Result<Vec<Marker>, ProviderError>;

    async fn marker_by_id(&self, id: &MarkerId) -> Result<Marker, ProviderError>;
}

/// Maps filesystem paths to the content-stream identity markers attach to.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// `None` means the document is simply untracked, not an error.
    async fn stream_for_path(&self, path: &Path)
        -> Result<Option<StreamHandle>, ProviderError>;

    async fn stream_by_id(&self, id: &StreamId) -> Result<Option<StreamHandle>, ProviderError>;
}

/// Attribution lookup. The engine only passes identities through; it
/// issues one batched call per resolution batch.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn users_by_id(&self, ids: &[UserId]) -> Result<Vec<User>, ProviderError>;
}
