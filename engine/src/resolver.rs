//! The resolution orchestrator: fans a document's markers through
//! cache → translator → classifier and assembles the located / not-located
//! result sets.

use crate::classify;
use crate::error::ProviderError;
use crate::error::ResolveError;
use crate::error::Result;
use crate::provider::MarkerStore;
use crate::provider::RevisionChainProvider;
use crate::provider::StreamResolver;
use crate::provider::UserDirectory;
use crate::translate;
use crate::translate::Translation;
use futures::future::join_all;
use pinpoint_protocol::LocatedMarker;
use pinpoint_protocol::Marker;
use pinpoint_protocol::MarkerId;
use pinpoint_protocol::NotLocatedRecord;
use pinpoint_protocol::ResolutionBatch;
use pinpoint_protocol::RevisionId;
use pinpoint_protocol::StreamHandle;
use pinpoint_protocol::User;
use pinpoint_protocol::UserId;
use pinpoint_utils_cache::BatchCache;
use pinpoint_utils_cache::BatchKey;
use pinpoint_utils_cache::Fingerprint;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

/// Per-call cache behavior; an explicit parameter instead of a hidden
/// avoid-caching flag threaded through shared state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    #[default]
    ReadWrite,
    Bypass,
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Resolved batches retained, most-recent first. A tunable, not a
    /// correctness property.
    pub cache_capacity: NonZeroUsize,
    /// Budget for one revision-chain lookup; a timeout surfaces as
    /// `chain_unavailable`, never an unbounded hang.
    pub chain_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_capacity: NonZeroUsize::new(64).unwrap_or(NonZeroUsize::MIN),
            chain_timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome of navigating straight to one marker.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerOutcome {
    Located(LocatedMarker),
    NotLocated(NotLocatedRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleMarkerResolution {
    /// Document the marker was resolved against; derived from the marker's
    /// recorded path when the caller did not supply one.
    pub uri: String,
    pub marker: Marker,
    pub outcome: MarkerOutcome,
}

/// The public entry point of the engine.
///
/// Collaborators are injected at construction; the resolver holds no other
/// state than its cache and the per-document supersession counters, and
/// never holds a lock across a provider call.
pub struct MarkerResolver {
    markers: Arc<dyn MarkerStore>,
    streams: Arc<dyn StreamResolver>,
    chains: Arc<dyn RevisionChainProvider>,
    users: Arc<dyn UserDirectory>,
    cache: BatchCache<ResolutionBatch>,
    config: ResolverConfig,
    generations: Mutex<HashMap<String, u64>>,
}

impl MarkerResolver {
    pub fn new(
        markers: Arc<dyn MarkerStore>,
        streams: Arc<dyn StreamResolver>,
        chains: Arc<dyn RevisionChainProvider>,
        users: Arc<dyn UserDirectory>,
        config: ResolverConfig,
    ) -> Self {
        let cache = BatchCache::new(config.cache_capacity);
        Self {
            markers,
            streams,
            chains,
            users,
            cache,
            config,
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve every marker attached to the document's content stream. An
    /// untracked document (no stream for the path) yields an empty batch,
    /// not an error.
    pub async fn resolve_document_markers(
        &self,
        uri: &str,
        policy: CachePolicy,
    ) -> Result<ResolutionBatch> {
        let path = path_from_uri(uri);
        let Some(stream) = self.streams.stream_for_path(&path).await? else {
            debug!("no content stream for {uri}, returning empty batch");
            return Ok(ResolutionBatch::default());
        };
        let markers = self.markers.markers_for_stream(&stream.id).await?;
        debug!("resolving {} marker(s) for {uri}", markers.len());
        if markers.is_empty() {
            return Ok(ResolutionBatch::default());
        }
        Ok(self.resolve(&stream, uri, &markers, policy).await)
    }

    /// Resolve one marker, deriving the document from the marker's recorded
    /// path within its stream's repository root when no uri is supplied.
    pub async fn resolve_single_marker(
        &self,
        marker_id: &MarkerId,
        uri: Option<&str>,
    ) -> Result<SingleMarkerResolution> {
        let marker = match self.markers.marker_by_id(marker_id).await {
            Ok(marker) => marker,
            Err(ProviderError::NotFound { what }) => {
                return Err(ResolveError::NotFound { what });
            }
            Err(err) => return Err(err.into()),
        };
        let Some(stream) = self.streams.stream_by_id(&marker.stream_id).await? else {
            return Err(ResolveError::NotFound {
                what: format!("stream {}", marker.stream_id),
            });
        };

        let uri = match uri {
            Some(uri) => uri.to_string(),
            None => file_uri(&stream.repo_root.join(&marker.file)),
        };

        let batch = self
            .resolve(
                &stream,
                &uri,
                std::slice::from_ref(&marker),
                CachePolicy::ReadWrite,
            )
            .await;

        let outcome = if let Some(located) = batch.located.get(marker_id) {
            MarkerOutcome::Located(located.clone())
        } else if let Some(record) = batch.not_located.get(marker_id) {
            MarkerOutcome::NotLocated(record.clone())
        } else {
            // every queried marker lands in one of the two maps; keep the
            // path total anyway
            warn!("marker {marker_id} missing from its own resolution batch");
            MarkerOutcome::NotLocated(classify::classify_unanchored(marker_id.clone()))
        };

        Ok(SingleMarkerResolution {
            uri,
            marker,
            outcome,
        })
    }

    /// Resolve a batch of markers against one document. Infallible by
    /// design: every failure path ends in a typed not-located record.
    pub async fn resolve(
        &self,
        stream: &StreamHandle,
        uri: &str,
        markers: &[Marker],
        policy: CachePolicy,
    ) -> ResolutionBatch {
        let buffer = match self.chains.live_buffer(stream, uri).await {
            Ok(buffer) => buffer,
            Err(err) => {
                warn!("live buffer unavailable for {uri}: {err}");
                return degraded_batch(markers, &err);
            }
        };

        let key = BatchKey {
            document: uri.to_string(),
            content: Fingerprint::of_text(&buffer),
            markers: Fingerprint::of_ids(markers.iter().map(|marker| marker.id.as_str())),
        };

        if policy == CachePolicy::ReadWrite {
            if let Some(batch) = self.cache.get(&key).await {
                debug!("cache hit for {uri} ({} markers)", markers.len());
                return (*batch).clone();
            }
        }

        let generation = self.bump_generation(uri);

        let mut batch = self.resolve_uncached(stream, uri, markers, &buffer).await;
        self.attach_attribution(&mut batch, markers).await;

        if policy == CachePolicy::ReadWrite {
            // a superseded query must not resurrect stale data
            if self.current_generation(uri) == generation {
                self.cache.put(key, batch.clone()).await;
            } else {
                debug!("resolution for {uri} superseded, skipping cache write");
            }
        }
        batch
    }

    async fn resolve_uncached(
        &self,
        stream: &StreamHandle,
        uri: &str,
        markers: &[Marker],
        buffer: &str,
    ) -> ResolutionBatch {
        let mut batch = ResolutionBatch::default();

        // one provider round-trip per distinct origin revision
        let mut groups: HashMap<RevisionId, Vec<&Marker>> = HashMap::new();
        for marker in markers {
            match &marker.anchor {
                Some(anchor) => groups
                    .entry(anchor.revision.clone())
                    .or_default()
                    .push(marker),
                None => {
                    batch.not_located.insert(
                        marker.id.clone(),
                        classify::classify_unanchored(marker.id.clone()),
                    );
                }
            }
        }

        let chains = &self.chains;
        let chain_timeout = self.config.chain_timeout;
        let fetches = groups.into_iter().map(|(origin, group)| async move {
            let fetched = match timeout(
                chain_timeout,
                chains.chain(stream, &origin, buffer, true),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::ChainUnavailable {
                    detail: format!("chain lookup timed out after {chain_timeout:?}"),
                }),
            };
            (group, fetched)
        });

        for (group, fetched) in join_all(fetches).await {
            match fetched {
                Ok(chain) => {
                    for marker in group {
                        let Some(anchor) = &marker.anchor else {
                            continue;
                        };
                        match translate::translate(&anchor.location, &chain, buffer) {
                            Translation::Located {
                                location,
                                low_confidence,
                            } => {
                                batch.located.insert(
                                    marker.id.clone(),
                                    LocatedMarker {
                                        marker_id: marker.id.clone(),
                                        location,
                                        low_confidence,
                                        creator_name: None,
                                    },
                                );
                            }
                            Translation::Failed(failure) => {
                                batch.not_located.insert(
                                    marker.id.clone(),
                                    classify::classify_failure(marker.id.clone(), failure),
                                );
                            }
                        }
                    }
                }
                Err(err) => {
                    // one origin group's failure leaves the rest of the
                    // batch resolving normally
                    warn!("chain unavailable for {} marker(s) in {uri}: {err}", group.len());
                    for marker in group {
                        batch.not_located.insert(
                            marker.id.clone(),
                            classify::classify_provider_error(marker.id.clone(), &err),
                        );
                    }
                }
            }
        }
        batch
    }

    /// One batched attribution lookup per resolution; a failure leaves
    /// creator names unset rather than degrading the batch.
    async fn attach_attribution(&self, batch: &mut ResolutionBatch, markers: &[Marker]) {
        if batch.located.is_empty() {
            return;
        }
        let mut ids: Vec<UserId> = markers
            .iter()
            .filter(|marker| batch.located.contains_key(&marker.id))
            .map(|marker| marker.creator_id.clone())
            .collect();
        ids.sort();
        ids.dedup();

        match self.users.users_by_id(&ids).await {
            Ok(users) => {
                let by_id: HashMap<&UserId, &User> =
                    users.iter().map(|user| (&user.id, user)).collect();
                for marker in markers {
                    if let Some(entry) = batch.located.get_mut(&marker.id) {
                        entry.creator_name = by_id
                            .get(&marker.creator_id)
                            .map(|user| user.username.clone());
                    }
                }
            }
            Err(err) => warn!("attribution lookup failed: {err}"),
        }
    }

    fn bump_generation(&self, uri: &str) -> u64 {
        let mut generations = lock(&self.generations);
        let entry = generations.entry(uri.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    fn current_generation(&self, uri: &str) -> u64 {
        lock(&self.generations).get(uri).copied().unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// The live buffer itself could not be read; nothing in the batch is
/// resolvable, but the result still classifies every marker.
fn degraded_batch(markers: &[Marker], err: &ProviderError) -> ResolutionBatch {
    let mut batch = ResolutionBatch::default();
    for marker in markers {
        let record = if marker.anchor.is_some() {
            classify::classify_provider_error(marker.id.clone(), err)
        } else {
            classify::classify_unanchored(marker.id.clone())
        };
        batch.not_located.insert(marker.id.clone(), record);
    }
    batch
}

fn path_from_uri(uri: &str) -> PathBuf {
    match uri.strip_prefix("file://") {
        Some(rest) => PathBuf::from(rest),
        None => PathBuf::from(uri),
    }
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}
