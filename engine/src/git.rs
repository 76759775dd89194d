//! Revision chain provider backed by the `git` CLI.

use crate::diffs;
use crate::error::ProviderError;
use crate::provider::RevisionChainProvider;
use async_trait::async_trait;
use pinpoint_protocol::ChainStep;
use pinpoint_protocol::FileDiff;
use pinpoint_protocol::RevisionChain;
use pinpoint_protocol::RevisionId;
use pinpoint_protocol::StreamHandle;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

pub struct GitChainProvider {
    repo_root: PathBuf,
}

impl GitChainProvider {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    async fn run_git(&self, args: &[&str]) -> Result<String, ProviderError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .await
            .map_err(|err| ProviderError::ChainUnavailable {
                detail: format!("failed to spawn git: {err}"),
            })?;
        if !output.status.success() {
            return Err(ProviderError::ChainUnavailable {
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Commits that touched `path` after `origin`, oldest first. Commits
    /// that did not touch the file are folded into the following step's
    /// diff, so the chain stays equivalent while staying short.
    async fn revisions_since(
        &self,
        origin: &RevisionId,
        path: &str,
    ) -> Result<Vec<RevisionId>, ProviderError> {
        let range = format!("{origin}..HEAD");
        let stdout = self
            .run_git(&["rev-list", "--reverse", &range, "--", path])
            .await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(RevisionId::from)
            .collect())
    }

    async fn diff_between(
        &self,
        from: &str,
        to: &str,
        path: &str,
    ) -> Result<FileDiff, ProviderError> {
        let stdout = self
            .run_git(&["diff", "--unified=3", from, to, "--", path])
            .await?;
        diffs::parse_unified(&stdout).map_err(|err| ProviderError::ChainUnavailable {
            detail: format!("unparseable diff between {from} and {to}: {err}"),
        })
    }

    async fn committed_contents(&self, path: &str) -> Result<String, ProviderError> {
        let spec = format!("HEAD:{path}");
        self.run_git(&["show", &spec]).await
    }
}

#[async_trait]
impl RevisionChainProvider for GitChainProvider {
    async fn live_buffer(
        &self,
        stream: &StreamHandle,
        _uri: &str,
    ) -> Result<String, ProviderError> {
        let path = self.repo_root.join(&stream.path);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| ProviderError::ChainUnavailable {
                detail: format!("cannot read {}: {err}", path.display()),
            })
    }

    async fn chain(
        &self,
        stream: &StreamHandle,
        origin: &RevisionId,
        buffer: &str,
        include_dirty: bool,
    ) -> Result<RevisionChain, ProviderError> {
        let revisions = self.revisions_since(origin, &stream.path).await?;
        debug!(
            "chain for {}: {} committed step(s) since {origin}",
            stream.path,
            revisions.len()
        );

        let mut steps = Vec::with_capacity(revisions.len());
        let mut previous = origin.clone();
        for revision in revisions {
            let diff = self
                .diff_between(previous.as_str(), revision.as_str(), &stream.path)
                .await?;
            steps.push(ChainStep {
                revision: revision.clone(),
                diff,
            });
            previous = revision;
        }

        let dirty = if include_dirty {
            let committed = self.committed_contents(&stream.path).await?;
            let diff = diffs::diff_lines(&committed, buffer);
            if diff.is_empty() { None } else { Some(diff) }
        } else {
            None
        };

        Ok(RevisionChain {
            origin: origin.clone(),
            steps,
            dirty,
        })
    }
}
