//! Dry-run repository decorator
//!
//! Substitutes "create a new drift-check plan" with "reuse the latest known
//! plan", leaving every other capability untouched. Selected at construction
//! time so the pipeline stages stay unaware of the mode.

use async_trait::async_trait;
use driftwatch_core::domain::{Plan, Workspace};
use std::sync::Arc;
use tracing::warn;

use super::{
    CheckPlanCreator, CheckPlanGetter, LatestPlanGetter, Repository, Result, WorkspaceLister,
};

pub struct DryRunRepository {
    inner: Arc<dyn Repository>,
}

impl DryRunRepository {
    pub fn new(inner: Arc<dyn Repository>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl WorkspaceLister for DryRunRepository {
    async fn list_workspaces(
        &self,
        include_tags: &[String],
        exclude_tags: &[String],
    ) -> Result<Vec<Workspace>> {
        self.inner.list_workspaces(include_tags, exclude_tags).await
    }
}

#[async_trait]
impl LatestPlanGetter for DryRunRepository {
    async fn latest_check_plan(&self, workspace: &Workspace) -> Result<Plan> {
        self.inner.latest_check_plan(workspace).await
    }
}

#[async_trait]
impl CheckPlanCreator for DryRunRepository {
    async fn create_check_plan(&self, workspace: &Workspace, _message: &str) -> Result<Plan> {
        warn!(
            workspace = %workspace.name,
            "Not creating drift detection plan due to dry-run, using latest drift detection plan instead"
        );
        self.inner.latest_check_plan(workspace).await
    }
}

#[async_trait]
impl CheckPlanGetter for DryRunRepository {
    async fn check_plan(&self, workspace: &Workspace, plan_id: &str) -> Result<Plan> {
        self.inner.check_plan(workspace, plan_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fake::{FakeRepository, FakeResponse};
    use driftwatch_core::domain::PlanStatus;

    #[tokio::test]
    async fn test_create_reuses_latest_plan() {
        let fake = Arc::new(FakeRepository::new());
        let wk = Workspace::new("ws-1", "wk1", "org");
        fake.set_latest(
            "ws-1",
            FakeResponse::Plan(FakeRepository::plan("p-old", PlanStatus::FinishedOk)),
        );

        let repo = DryRunRepository::new(fake.clone());
        let plan = repo.create_check_plan(&wk, "Drift detection").await.unwrap();

        assert_eq!(plan.id, "p-old");
        assert!(fake.create_calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_propagates_missing_latest() {
        let fake = Arc::new(FakeRepository::new());
        let wk = Workspace::new("ws-1", "wk1", "org");

        let repo = DryRunRepository::new(fake);
        let err = repo
            .create_check_plan(&wk, "Drift detection")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }
}
