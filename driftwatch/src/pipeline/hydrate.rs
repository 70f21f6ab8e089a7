//! Hydration stage
//!
//! Attaches each workspace's latest known drift-check plan, fetched
//! concurrently under a bounded worker budget. Results are merged back into
//! the original input order by workspace ID. A missing prior run is not an
//! error; any other per-item failure is logged and the workspace proceeds
//! with no last plan.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use driftwatch_core::domain::Workspace;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::Processor;
use crate::repository::{self, LatestPlanGetter, RepositoryError};

/// Default number of concurrent latest-plan fetches.
pub const DEFAULT_FETCH_WORKERS: usize = 20;

pub struct HydrateLatestPlanProcessor {
    getter: Arc<dyn LatestPlanGetter>,
    workers: usize,
    cancel: CancellationToken,
}

impl HydrateLatestPlanProcessor {
    pub fn new(getter: Arc<dyn LatestPlanGetter>, workers: usize, cancel: CancellationToken) -> Self {
        Self {
            getter,
            workers: workers.max(1),
            cancel,
        }
    }
}

#[async_trait]
impl Processor for HydrateLatestPlanProcessor {
    async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        debug!("Getting workspaces' latest drift detection plan");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        for wk in workspaces.iter().cloned() {
            let getter = Arc::clone(&self.getter);
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (wk, Err(RepositoryError::Internal("worker pool closed".to_string()))),
                };

                let fetched: repository::Result<_> = tokio::select! {
                    _ = cancel.cancelled() => Err(RepositoryError::Internal("canceled".to_string())),
                    fetched = getter.latest_check_plan(&wk) => fetched,
                };

                (wk, fetched)
            });
        }

        // Index completions by workspace ID; the fan-in also selects on
        // cancellation so a canceled pipeline never blocks on the merge.
        let mut indexed: HashMap<String, Workspace> = HashMap::with_capacity(workspaces.len());
        loop {
            let joined = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tasks.abort_all();
                    bail!("hydration canceled");
                }
                joined = tasks.join_next() => joined,
            };

            let Some(joined) = joined else { break };
            let (mut wk, fetched) = joined.context("hydration worker panicked")?;

            match fetched {
                Ok(plan) => wk.last_drift_plan = Some(plan),
                // No prior drift detection run, the workspace proceeds bare.
                Err(err) if err.is_not_found() => {}
                Err(err) => {
                    error!(workspace = %wk.name, "Could not get latest drift detection plan: {err}");
                }
            }
            indexed.insert(wk.id.clone(), wk);
        }

        // Replay the original input order with the hydrated results.
        Ok(workspaces
            .into_iter()
            .map(|wk| {
                let id = wk.id.clone();
                indexed.remove(&id).unwrap_or(wk)
            })
            .collect())
    }
}
