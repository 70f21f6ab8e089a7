//! Sort stage

use anyhow::Result;
use async_trait::async_trait;
use driftwatch_core::domain::Workspace;
use tracing::debug;

use super::Processor;

/// Sorts workspaces by their latest drift detection plan, oldest first.
/// Workspaces with no last plan are treated as the oldest possible and sort
/// first. The sort is stable, so equal or absent timestamps preserve input
/// order and repeated runs over identical inputs reproduce the same order.
pub struct SortByOldestPlanProcessor;

#[async_trait]
impl Processor for SortByOldestPlanProcessor {
    async fn process(&self, mut workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        debug!("Sorting workspaces by oldest drift detection");

        workspaces.sort_by_key(|wk| wk.last_drift_plan.as_ref().map(|plan| plan.created_at));

        Ok(workspaces)
    }
}
