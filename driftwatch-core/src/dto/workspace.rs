//! Workspace DTOs for the remote API

use serde::{Deserialize, Serialize};

/// One workspace as returned by the remote listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tag_names: Vec<String>,
}

/// One page of a workspace listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspacePage {
    pub workspaces: Vec<WorkspaceData>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Listing pagination cursor. `next_page` is absent on the last page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub next_page: Option<u32>,
}
