//! Cached workspace listing
//!
//! Wraps a [`WorkspaceLister`] with an in-memory snapshot refreshed on a
//! fixed pace by a background task. Reads always serve the snapshot, so a
//! scrape never triggers a remote listing. The cache is warmed for one fixed
//! pair of tag filters; a read with different filters is a hard error rather
//! than a silently wrong answer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use driftwatch_core::domain::Workspace;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::repository::{self, RepositoryError, WorkspaceLister};

/// Default pace between cache refreshes.
pub const DEFAULT_REFRESH_PACE: Duration = Duration::from_secs(75);

pub struct CachedWorkspaceLister {
    include_tags: Vec<String>,
    exclude_tags: Vec<String>,
    snapshot: Arc<RwLock<Vec<Workspace>>>,
}

impl CachedWorkspaceLister {
    /// Warms the cache with an initial listing, then spawns the refresh loop.
    /// The loop stops when the token is canceled.
    pub async fn new(
        inner: Arc<dyn WorkspaceLister>,
        refresh_pace: Duration,
        include_tags: Vec<String>,
        exclude_tags: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let initial = inner
            .list_workspaces(&include_tags, &exclude_tags)
            .await
            .context("could not list workspaces to warm the cache")?;
        info!("Workspace cache warmed with {} workspaces", initial.len());

        let snapshot = Arc::new(RwLock::new(initial));
        tokio::spawn(refresh_loop(
            inner,
            refresh_pace,
            include_tags.clone(),
            exclude_tags.clone(),
            Arc::clone(&snapshot),
            cancel,
        ));

        Ok(Self {
            include_tags,
            exclude_tags,
            snapshot,
        })
    }
}

async fn refresh_loop(
    inner: Arc<dyn WorkspaceLister>,
    refresh_pace: Duration,
    include_tags: Vec<String>,
    exclude_tags: Vec<String>,
    snapshot: Arc<RwLock<Vec<Workspace>>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(refresh_pace);
    // The warm-up already listed; skip the immediate first tick.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Workspace cache refresh loop stopped");
                return;
            }
            _ = ticker.tick() => {
                match inner.list_workspaces(&include_tags, &exclude_tags).await {
                    Ok(workspaces) => {
                        debug!("Workspace cache refreshed with {} workspaces", workspaces.len());
                        *snapshot.write().await = workspaces;
                    }
                    // Keep serving the previous snapshot.
                    Err(err) => {
                        error!("Could not refresh the workspace cache: {err}");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl WorkspaceLister for CachedWorkspaceLister {
    async fn list_workspaces(
        &self,
        include_tags: &[String],
        exclude_tags: &[String],
    ) -> repository::Result<Vec<Workspace>> {
        if include_tags != self.include_tags || exclude_tags != self.exclude_tags {
            return Err(RepositoryError::InvalidFilter(
                "cache was warmed with different tag filters".to_string(),
            ));
        }

        Ok(self.snapshot.read().await.clone())
    }
}
