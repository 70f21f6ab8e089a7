//! Detection controller
//!
//! Runs drift detection cycles forever at a fixed pace. A cycle lists the
//! selected workspaces and hands them to the processing pipeline. The first
//! cycle starts immediately; a failed cycle is logged and the next one runs
//! on schedule.

use anyhow::{Context, Result, bail};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::pipeline::Processor;
use crate::repository::WorkspaceLister;

/// Default pace between detection cycles.
pub const DEFAULT_DETECT_INTERVAL: Duration = Duration::from_secs(300);

pub struct DriftDetector {
    interval: Duration,
    lister: Arc<dyn WorkspaceLister>,
    processor: Arc<dyn Processor>,
    include_tags: Vec<String>,
    exclude_tags: Vec<String>,
}

impl DriftDetector {
    pub fn new(
        interval: Duration,
        lister: Arc<dyn WorkspaceLister>,
        processor: Arc<dyn Processor>,
        include_tags: Vec<String>,
        exclude_tags: Vec<String>,
    ) -> Result<Self> {
        if interval.is_zero() {
            bail!("detect interval must be greater than zero");
        }

        Ok(Self {
            interval,
            lister,
            processor,
            include_tags,
            exclude_tags,
        })
    }

    /// Runs cycles until the token is canceled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Drift detector stopped");
                    return Ok(());
                }
                // The first tick fires immediately.
                _ = ticker.tick() => {
                    if let Err(err) = self.cycle().await {
                        error!("Drift detection cycle failed: {err:#}");
                    }
                }
            }
        }
    }

    async fn cycle(&self) -> Result<()> {
        let workspaces = self
            .lister
            .list_workspaces(&self.include_tags, &self.exclude_tags)
            .await
            .context("could not list workspaces")?;

        if workspaces.is_empty() {
            warn!("0 workspaces selected");
            return Ok(());
        }

        self.processor
            .process(workspaces)
            .await
            .context("workspaces processing failed")?;

        Ok(())
    }
}
