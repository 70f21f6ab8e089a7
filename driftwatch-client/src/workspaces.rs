//! Workspace listing endpoints

use driftwatch_core::dto::workspace::WorkspacePage;
use tracing::debug;

use crate::{Result, WorkspaceApiClient};

const PAGE_SIZE: u32 = 100;

impl WorkspaceApiClient {
    /// List one page of an organization's workspaces
    ///
    /// Tag filters are applied server-side: `include_tags` keeps only
    /// workspaces carrying all the given tags, `exclude_tags` drops any
    /// workspace carrying one of them. Pages start at 1; the returned page
    /// carries the next page number, if any.
    pub async fn list_workspaces(
        &self,
        organization: &str,
        include_tags: &[String],
        exclude_tags: &[String],
        page: u32,
    ) -> Result<WorkspacePage> {
        let url = format!(
            "{}/api/v2/organizations/{}/workspaces",
            self.base_url, organization
        );

        debug!(organization, page, "Listing workspaces");

        let mut query: Vec<(&str, String)> = vec![
            ("page[number]", page.to_string()),
            ("page[size]", PAGE_SIZE.to_string()),
        ];
        if !include_tags.is_empty() {
            query.push(("search[tags]", include_tags.join(",")));
        }
        if !exclude_tags.is_empty() {
            query.push(("search[exclude-tags]", exclude_tags.join(",")));
        }

        let response = self.get(&url).query(&query).send().await?;

        self.handle_response(response).await
    }
}
