//! Repository contracts against the remote workspace management service
//!
//! The pipeline consumes these as narrow capability traits so stages can be
//! tested against in-memory fakes and so dry-run can swap the mutating
//! behavior at construction time.

pub mod dry_run;
pub mod http;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use driftwatch_core::domain::{Plan, Workspace};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Errors surfaced by repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested resource does not exist. For the latest-plan lookup this
    /// is a recoverable condition (no prior run), not a failure.
    #[error("resource does not exist")]
    NotFound,

    /// A read was attempted with filter parameters different from the ones a
    /// cache was warmed with.
    #[error("invalid filter parameters: {0}")]
    InvalidFilter(String),

    #[error(transparent)]
    Client(#[from] driftwatch_client::ClientError),

    #[error("{0}")]
    Internal(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound => true,
            Self::Client(err) => err.is_not_found(),
            _ => false,
        }
    }
}

/// Lists the fleet of workspaces matching tag filters. Pagination is handled
/// internally.
#[async_trait]
pub trait WorkspaceLister: Send + Sync {
    async fn list_workspaces(
        &self,
        include_tags: &[String],
        exclude_tags: &[String],
    ) -> Result<Vec<Workspace>>;
}

/// Fetches a workspace's latest known drift-check plan.
#[async_trait]
pub trait LatestPlanGetter: Send + Sync {
    async fn latest_check_plan(&self, workspace: &Workspace) -> Result<Plan>;
}

/// Creates a new drift-check plan against a workspace.
#[async_trait]
pub trait CheckPlanCreator: Send + Sync {
    async fn create_check_plan(&self, workspace: &Workspace, message: &str) -> Result<Plan>;
}

/// Reads the current state of a drift-check plan.
#[async_trait]
pub trait CheckPlanGetter: Send + Sync {
    async fn check_plan(&self, workspace: &Workspace, plan_id: &str) -> Result<Plan>;
}

/// Full capability set of the remote service.
pub trait Repository:
    WorkspaceLister + LatestPlanGetter + CheckPlanCreator + CheckPlanGetter
{
}

impl<T> Repository for T where
    T: WorkspaceLister + LatestPlanGetter + CheckPlanCreator + CheckPlanGetter
{
}
