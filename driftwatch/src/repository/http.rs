//! HTTP-backed repository
//!
//! Maps wire DTOs from the remote workspace API to domain entities. Created
//! runs are tagged with a detector-id marker in the run message; the latest
//! drift-check lookup searches for that marker so unrelated runs are
//! ignored.

use async_trait::async_trait;
use driftwatch_client::WorkspaceApiClient;
use driftwatch_core::domain::{Plan, PlanStatus, Workspace};
use driftwatch_core::dto::run::{CreateRun, RunData};
use driftwatch_core::dto::workspace::WorkspaceData;

use super::{
    CheckPlanCreator, CheckPlanGetter, LatestPlanGetter, RepositoryError, Result, WorkspaceLister,
};

pub struct ApiRepository {
    client: WorkspaceApiClient,
    organization: String,
    address: String,
    detector_id: String,
}

impl ApiRepository {
    pub fn new(
        client: WorkspaceApiClient,
        organization: impl Into<String>,
        address: impl Into<String>,
        detector_id: impl Into<String>,
    ) -> Self {
        let address = address.into();
        Self {
            client,
            organization: organization.into(),
            address: address.trim_end_matches('/').to_string(),
            detector_id: detector_id.into(),
        }
    }

    fn message_id(&self) -> String {
        format!("driftwatch/detector-id/{}", self.detector_id)
    }

    fn run_url(&self, workspace_name: &str, run_id: &str) -> String {
        format!(
            "{}/app/{}/workspaces/{}/runs/{}",
            self.address, self.organization, workspace_name, run_id
        )
    }

    fn map_workspace(&self, wk: WorkspaceData) -> Workspace {
        Workspace::new(wk.id, wk.name, self.organization.clone()).with_tags(wk.tag_names)
    }

    fn map_plan(&self, workspace_name: &str, run: RunData) -> Plan {
        let status = map_run_status(&run.status);

        // Finish data is only meaningful once the run left the waiting state.
        let finished_at = if status.is_terminal() {
            run.status_timestamps
                .and_then(|ts| ts.planned_and_finished_at)
        } else {
            None
        };

        let url = self.run_url(workspace_name, &run.id);
        Plan {
            id: run.id,
            created_at: run.created_at,
            finished_at,
            message: run.message,
            has_changes: run.has_changes,
            status,
            url,
        }
    }
}

fn map_run_status(status: &str) -> PlanStatus {
    match status {
        "planned_and_finished" => PlanStatus::FinishedOk,
        "canceled" | "discarded" | "errored" => PlanStatus::FinishedNotOk,
        "pending" | "fetching" | "fetching_completed" | "queuing" | "plan_queued" | "planning"
        | "planned" | "pre_plan_running" | "pre_plan_completed" => PlanStatus::Waiting,
        _ => PlanStatus::Unknown,
    }
}

#[async_trait]
impl WorkspaceLister for ApiRepository {
    async fn list_workspaces(
        &self,
        include_tags: &[String],
        exclude_tags: &[String],
    ) -> Result<Vec<Workspace>> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let listed = self
                .client
                .list_workspaces(&self.organization, include_tags, exclude_tags, page)
                .await?;

            all.extend(listed.workspaces.into_iter().map(|wk| self.map_workspace(wk)));

            match listed.pagination.next_page {
                Some(next) if next != page => page = next,
                _ => break,
            }
        }

        Ok(all)
    }
}

#[async_trait]
impl LatestPlanGetter for ApiRepository {
    async fn latest_check_plan(&self, workspace: &Workspace) -> Result<Plan> {
        let runs = self
            .client
            .list_runs(&workspace.id, &self.message_id(), 1)
            .await?;

        let run = runs.runs.into_iter().next().ok_or(RepositoryError::NotFound)?;

        Ok(self.map_plan(&workspace.name, run))
    }
}

#[async_trait]
impl CheckPlanCreator for ApiRepository {
    async fn create_check_plan(&self, workspace: &Workspace, message: &str) -> Result<Plan> {
        let final_message = format!("{}: {}", message, self.message_id());
        let run = self
            .client
            .create_run(&CreateRun {
                workspace_id: workspace.id.clone(),
                message: final_message,
                plan_only: true,
            })
            .await?;

        Ok(self.map_plan(&workspace.name, run))
    }
}

#[async_trait]
impl CheckPlanGetter for ApiRepository {
    async fn check_plan(&self, workspace: &Workspace, plan_id: &str) -> Result<Plan> {
        let run = self.client.get_run(plan_id).await?;

        Ok(self.map_plan(&workspace.name, run))
    }
}
