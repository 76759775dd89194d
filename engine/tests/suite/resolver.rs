use crate::suite::fakes::ChainSpec;
use crate::suite::fakes::FakeChainProvider;
use crate::suite::fakes::FakeMarkerStore;
use crate::suite::fakes::FakeStreamResolver;
use crate::suite::fakes::FakeUserDirectory;
use crate::suite::fakes::marker;
use crate::suite::fakes::stream;
use crate::suite::fakes::unanchored_marker;
use assert_matches::assert_matches;
use pinpoint_engine::CachePolicy;
use pinpoint_engine::MarkerOutcome;
use pinpoint_engine::MarkerResolver;
use pinpoint_engine::ResolveError;
use pinpoint_engine::ResolverConfig;
use pinpoint_protocol::ChainStep;
use pinpoint_protocol::DiffHunk;
use pinpoint_protocol::FileDiff;
use pinpoint_protocol::Location;
use pinpoint_protocol::Marker;
use pinpoint_protocol::MarkerId;
use pinpoint_protocol::NotLocatedReason;
use pinpoint_protocol::RevisionChain;
use pinpoint_protocol::RevisionId;
use pinpoint_protocol::User;
use pinpoint_protocol::UserId;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const URI: &str = "file:///repo/src/lib.rs";

struct World {
    resolver: MarkerResolver,
    provider: Arc<FakeChainProvider>,
}

fn world(markers: Vec<Marker>, chains: HashMap<RevisionId, ChainSpec>, buffer: &str) -> World {
    world_with_config(markers, chains, buffer, ResolverConfig::default())
}

fn world_with_config(
    markers: Vec<Marker>,
    chains: HashMap<RevisionId, ChainSpec>,
    buffer: &str,
    config: ResolverConfig,
) -> World {
    let provider = Arc::new(FakeChainProvider::new(buffer, chains));
    let resolver = MarkerResolver::new(
        Arc::new(FakeMarkerStore { markers }),
        Arc::new(FakeStreamResolver {
            streams: vec![stream("s1", "/repo", "src/lib.rs")],
        }),
        Arc::clone(&provider) as Arc<dyn pinpoint_engine::RevisionChainProvider>,
        Arc::new(FakeUserDirectory {
            users: vec![
                User {
                    id: UserId::from("u1"),
                    username: "alice".to_string(),
                },
                User {
                    id: UserId::from("u2"),
                    username: "bob".to_string(),
                },
            ],
        }),
        config,
    );
    World { resolver, provider }
}

fn insert_at_top(revision: &str) -> RevisionChain {
    RevisionChain {
        origin: RevisionId::from("r0"),
        steps: vec![ChainStep {
            revision: RevisionId::from(revision),
            diff: FileDiff {
                hunks: vec![DiffHunk {
                    old_start: 0,
                    old_lines: 0,
                    new_start: 0,
                    new_lines: 1,
                    removed: vec![],
                    added: vec!["x".to_string()],
                }],
            },
        }],
        dirty: None,
    }
}

fn delete_lines(revision: &str, old_start: u32, removed: &[&str]) -> RevisionChain {
    RevisionChain {
        origin: RevisionId::from("r0"),
        steps: vec![ChainStep {
            revision: RevisionId::from(revision),
            diff: FileDiff {
                hunks: vec![DiffHunk {
                    old_start,
                    old_lines: removed.len() as u32,
                    new_start: old_start,
                    new_lines: 0,
                    removed: removed.iter().map(|line| line.to_string()).collect(),
                    added: vec![],
                }],
            },
        }],
        dirty: None,
    }
}

#[tokio::test]
async fn insert_above_relocates_marker_one_line_down() {
    // Anchor on "b" of "a\nb\nc\n"; one line has since been inserted at
    // the top.
    let chains = HashMap::from([(RevisionId::from("r0"), ChainSpec::Ready(insert_at_top("r1")))]);
    let world = world(
        vec![marker("m1", "s1", "u1", "r0", Location::new(1, 0, 1, 1))],
        chains,
        "x\na\nb\nc\n",
    );

    let batch = world
        .resolver
        .resolve_document_markers(URI, CachePolicy::ReadWrite)
        .await
        .expect("resolve");

    assert!(batch.not_located.is_empty());
    let located = &batch.located[&MarkerId::from("m1")];
    assert_eq!(located.location, Location::new(2, 0, 2, 1));
    assert!(!located.low_confidence);
    assert_eq!(located.creator_name.as_deref(), Some("alice"));
}

#[tokio::test]
async fn fully_deleted_span_reports_deleted() {
    // Anchor covered lines 2-3 ("c", "d"); both were deleted outright.
    let chains = HashMap::from([(
        RevisionId::from("r0"),
        ChainSpec::Ready(delete_lines("r1", 2, &["c", "d"])),
    )]);
    let world = world(
        vec![marker("m1", "s1", "u1", "r0", Location::new(2, 0, 3, 1))],
        chains,
        "a\nb\ne\n",
    );

    let batch = world
        .resolver
        .resolve_document_markers(URI, CachePolicy::ReadWrite)
        .await
        .expect("resolve");

    assert!(batch.located.is_empty());
    let record = &batch.not_located[&MarkerId::from("m1")];
    assert_eq!(record.reason, NotLocatedReason::Deleted);
}

#[tokio::test]
async fn truncated_buffer_reports_out_of_bounds() {
    // Anchor on line 5, but the buffer was cut down to 4 lines.
    let chains = HashMap::from([(
        RevisionId::from("r0"),
        ChainSpec::Ready(RevisionChain::empty(RevisionId::from("r0"))),
    )]);
    let world = world(
        vec![marker("m1", "s1", "u1", "r0", Location::new(5, 0, 5, 1))],
        chains,
        "a\nb\nc\nd\n",
    );

    let batch = world
        .resolver
        .resolve_document_markers(URI, CachePolicy::ReadWrite)
        .await
        .expect("resolve");

    let record = &batch.not_located[&MarkerId::from("m1")];
    assert_eq!(record.reason, NotLocatedReason::OutOfBounds);
}

#[tokio::test(start_paused = true)]
async fn timed_out_chain_lookup_degrades_only_that_marker() {
    // Two markers with different origins; one chain lookup hangs past the
    // configured budget.
    let chains = HashMap::from([
        (
            RevisionId::from("r0"),
            ChainSpec::Ready(RevisionChain::empty(RevisionId::from("r0"))),
        ),
        (
            RevisionId::from("r9"),
            ChainSpec::Hang(Duration::from_secs(60)),
        ),
    ]);
    let world = world_with_config(
        vec![
            marker("m1", "s1", "u1", "r0", Location::new(0, 0, 0, 1)),
            marker("m2", "s1", "u2", "r9", Location::new(1, 0, 1, 1)),
        ],
        chains,
        "a\nb\nc\n",
        ResolverConfig {
            chain_timeout: Duration::from_millis(50),
            ..ResolverConfig::default()
        },
    );

    let batch = world
        .resolver
        .resolve_document_markers(URI, CachePolicy::ReadWrite)
        .await
        .expect("resolve");

    assert_eq!(batch.located.len(), 1);
    assert!(batch.located.contains_key(&MarkerId::from("m1")));
    let record = &batch.not_located[&MarkerId::from("m2")];
    assert_eq!(record.reason, NotLocatedReason::ChainUnavailable);
    assert!(
        record
            .detail
            .as_deref()
            .is_some_and(|detail| detail.contains("timed out"))
    );
}

#[tokio::test]
async fn one_failing_chain_leaves_the_rest_of_the_batch_resolving() {
    let chains = HashMap::from([
        (
            RevisionId::from("r0"),
            ChainSpec::Ready(RevisionChain::empty(RevisionId::from("r0"))),
        ),
        (
            RevisionId::from("r1"),
            ChainSpec::Fail("history rewritten".to_string()),
        ),
        (
            RevisionId::from("r2"),
            ChainSpec::Ready(RevisionChain::empty(RevisionId::from("r2"))),
        ),
    ]);
    let world = world(
        vec![
            marker("m1", "s1", "u1", "r0", Location::new(0, 0, 0, 1)),
            marker("m2", "s1", "u1", "r1", Location::new(1, 0, 1, 1)),
            marker("m3", "s1", "u2", "r2", Location::new(2, 0, 2, 1)),
        ],
        chains,
        "a\nb\nc\n",
    );

    let batch = world
        .resolver
        .resolve_document_markers(URI, CachePolicy::ReadWrite)
        .await
        .expect("resolve");

    assert_eq!(batch.located.len(), 2);
    assert_eq!(batch.not_located.len(), 1);
    let record = &batch.not_located[&MarkerId::from("m2")];
    assert_eq!(record.reason, NotLocatedReason::ChainUnavailable);
    assert_eq!(record.detail.as_deref(), Some("history rewritten"));
}

#[tokio::test]
async fn second_identical_query_is_served_from_cache() {
    let chains = HashMap::from([(RevisionId::from("r0"), ChainSpec::Ready(insert_at_top("r1")))]);
    let world = world(
        vec![marker("m1", "s1", "u1", "r0", Location::new(1, 0, 1, 1))],
        chains,
        "x\na\nb\nc\n",
    );

    let first = world
        .resolver
        .resolve_document_markers(URI, CachePolicy::ReadWrite)
        .await
        .expect("resolve");
    assert_eq!(world.provider.calls(), 1);

    let second = world
        .resolver
        .resolve_document_markers(URI, CachePolicy::ReadWrite)
        .await
        .expect("resolve");
    assert_eq!(world.provider.calls(), 1, "second query must hit the cache");
    assert_eq!(first, second);
}

#[tokio::test]
async fn concurrent_identical_queries_agree() {
    let chains = HashMap::from([(RevisionId::from("r0"), ChainSpec::Ready(insert_at_top("r1")))]);
    let world = world(
        vec![marker("m1", "s1", "u1", "r0", Location::new(1, 0, 1, 1))],
        chains,
        "x\na\nb\nc\n",
    );

    let (first, second) = tokio::join!(
        world.resolver.resolve_document_markers(URI, CachePolicy::ReadWrite),
        world.resolver.resolve_document_markers(URI, CachePolicy::ReadWrite),
    );
    assert_eq!(first.expect("resolve"), second.expect("resolve"));
}

#[tokio::test]
async fn bypass_policy_skips_the_cache() {
    let chains = HashMap::from([(RevisionId::from("r0"), ChainSpec::Ready(insert_at_top("r1")))]);
    let world = world(
        vec![marker("m1", "s1", "u1", "r0", Location::new(1, 0, 1, 1))],
        chains,
        "x\na\nb\nc\n",
    );

    for _ in 0..2 {
        world
            .resolver
            .resolve_document_markers(URI, CachePolicy::Bypass)
            .await
            .expect("resolve");
    }
    assert_eq!(world.provider.calls(), 2);
}

#[tokio::test]
async fn unanchored_marker_is_unknown_without_a_chain_lookup() {
    let world = world(
        vec![unanchored_marker("m1", "s1", "u1")],
        HashMap::new(),
        "a\nb\nc\n",
    );

    let batch = world
        .resolver
        .resolve_document_markers(URI, CachePolicy::ReadWrite)
        .await
        .expect("resolve");

    let record = &batch.not_located[&MarkerId::from("m1")];
    assert_eq!(record.reason, NotLocatedReason::Unknown);
    assert_eq!(world.provider.calls(), 0);
}

#[tokio::test]
async fn untracked_document_yields_an_empty_batch() {
    let world = world(Vec::new(), HashMap::new(), "a\n");

    let batch = world
        .resolver
        .resolve_document_markers("file:///elsewhere/other.rs", CachePolicy::ReadWrite)
        .await
        .expect("resolve");

    assert!(batch.is_empty());
}

#[tokio::test]
async fn single_marker_navigation_derives_the_document_uri() {
    let chains = HashMap::from([(RevisionId::from("r0"), ChainSpec::Ready(insert_at_top("r1")))]);
    let world = world(
        vec![marker("m1", "s1", "u1", "r0", Location::new(1, 0, 1, 1))],
        chains,
        "x\na\nb\nc\n",
    );

    let resolution = world
        .resolver
        .resolve_single_marker(&MarkerId::from("m1"), None)
        .await
        .expect("resolve");

    assert_eq!(resolution.uri, URI);
    assert_matches!(
        resolution.outcome,
        MarkerOutcome::Located(located) if located.location == Location::new(2, 0, 2, 1)
    );
}

#[tokio::test]
async fn single_marker_navigation_reports_missing_markers() {
    let world = world(Vec::new(), HashMap::new(), "a\n");

    let err = world
        .resolver
        .resolve_single_marker(&MarkerId::from("ghost"), None)
        .await
        .expect_err("missing marker");

    assert_matches!(err, ResolveError::NotFound { .. });
}
