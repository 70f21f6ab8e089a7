//! Run DTOs for the remote API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to create a plan-only run against a workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRun {
    pub workspace_id: String,
    pub message: String,
    pub plan_only: bool,
}

/// One run as returned by the remote API.
///
/// `status` carries the remote service's own vocabulary (for example
/// `planned_and_finished`, `errored`, `planning`); the repository layer maps
/// it to the simplified domain status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunData {
    pub id: String,
    pub message: String,
    pub status: String,
    #[serde(default)]
    pub has_changes: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status_timestamps: Option<RunStatusTimestamps>,
}

/// Timestamps the remote service records per status transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStatusTimestamps {
    pub planning_at: Option<DateTime<Utc>>,
    pub planned_and_finished_at: Option<DateTime<Utc>>,
}

/// One page of a run listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPage {
    pub runs: Vec<RunData>,
}
