//! Wait-for-completion stage
//!
//! Blocks until each workspace's drift-check plan reaches a terminal status
//! or its individual deadline expires, one waiter task per workspace. Each
//! waiter carries its own timeout, so a slow run cannot starve the others.
//! Workspaces without a plan skip waiting and pass through unchanged; a
//! timed-out or failing waiter is logged and the workspace keeps its last
//! observed plan. Results merge back into the original input order.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use driftwatch_core::domain::{Plan, Workspace};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::Processor;
use crate::repository::CheckPlanGetter;

/// Default pace between run status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

pub struct WaitPlanProcessor {
    getter: Arc<dyn CheckPlanGetter>,
    poll_interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
}

impl WaitPlanProcessor {
    pub fn new(
        getter: Arc<dyn CheckPlanGetter>,
        poll_interval: Duration,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            getter,
            poll_interval,
            timeout,
            cancel,
        }
    }
}

#[async_trait]
impl Processor for WaitPlanProcessor {
    async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        let mut tasks = JoinSet::new();
        for wk in workspaces.iter().cloned() {
            // No plan to wait for, the workspace passes through unchanged.
            let Some(plan) = wk.last_drift_plan.clone() else {
                continue;
            };

            let getter = Arc::clone(&self.getter);
            let poll_interval = self.poll_interval;
            let timeout = self.timeout;
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                debug!(workspace = %wk.name, run_id = %plan.id, "Waiting for drift detection plan to finish");

                let waited = tokio::time::timeout(
                    timeout,
                    wait_for_plan(getter.as_ref(), &wk, &plan.id, poll_interval, cancel),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(anyhow!("deadline exceeded waiting for plan {}", plan.id))
                });

                (wk, waited)
            });
        }

        let mut indexed: HashMap<String, Workspace> = HashMap::new();
        loop {
            let joined = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tasks.abort_all();
                    bail!("wait canceled");
                }
                joined = tasks.join_next() => joined,
            };

            let Some(joined) = joined else { break };
            let (mut wk, waited) = joined.context("plan waiter panicked")?;

            match waited {
                Ok(plan) => {
                    info!(workspace = %wk.name, run_id = %plan.id, "Drift detection plan finished");
                    wk.last_drift_plan = Some(plan);
                }
                // The workspace keeps its last observed plan state.
                Err(err) => {
                    error!(workspace = %wk.name, "Error while waiting for drift detection plan: {err}");
                }
            }
            indexed.insert(wk.id.clone(), wk);
        }

        Ok(workspaces
            .into_iter()
            .map(|wk| {
                let id = wk.id.clone();
                indexed.remove(&id).unwrap_or(wk)
            })
            .collect())
    }
}

/// Polls a plan until it leaves the waiting state. The first check happens
/// immediately; subsequent checks follow the poll pace.
async fn wait_for_plan(
    getter: &dyn CheckPlanGetter,
    workspace: &Workspace,
    plan_id: &str,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> Result<Plan> {
    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => bail!("canceled while waiting for plan {plan_id}"),
            _ = ticker.tick() => {
                let plan = getter
                    .check_plan(workspace, plan_id)
                    .await
                    .with_context(|| format!("could not get check plan {plan_id:?}"))?;

                if !plan.status.is_waiting() {
                    return Ok(plan);
                }
            }
        }
    }
}
