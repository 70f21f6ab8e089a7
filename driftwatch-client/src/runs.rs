//! Run lifecycle endpoints

use driftwatch_core::dto::run::{CreateRun, RunData, RunPage};
use tracing::debug;

use crate::{Result, WorkspaceApiClient};

impl WorkspaceApiClient {
    /// Create a new run against a workspace
    ///
    /// The request is plan-only by construction; the remote service plans the
    /// latest configured revision without applying.
    pub async fn create_run(&self, req: &CreateRun) -> Result<RunData> {
        let url = format!("{}/api/v2/runs", self.base_url);

        debug!(workspace_id = %req.workspace_id, "Creating run");

        let response = self.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Read a single run by ID
    pub async fn get_run(&self, run_id: &str) -> Result<RunData> {
        let url = format!("{}/api/v2/runs/{}", self.base_url, run_id);

        let response = self.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List a workspace's runs matching a message search term
    ///
    /// Runs come back newest first; `page_size` bounds the result. The drift
    /// detector uses this with its detector-id marker and a page size of one
    /// to find the latest drift-check run.
    pub async fn list_runs(
        &self,
        workspace_id: &str,
        search: &str,
        page_size: u32,
    ) -> Result<RunPage> {
        let url = format!("{}/api/v2/workspaces/{}/runs", self.base_url, workspace_id);

        debug!(workspace_id, search, "Listing runs");

        let response = self
            .get(&url)
            .query(&[
                ("search[message]", search.to_string()),
                ("page[size]", page_size.to_string()),
            ])
            .send()
            .await?;

        self.handle_response(response).await
    }
}
