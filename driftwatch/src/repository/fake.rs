//! In-memory scriptable repository for tests

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use driftwatch_core::domain::{Plan, PlanStatus, Workspace};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    CheckPlanCreator, CheckPlanGetter, LatestPlanGetter, RepositoryError, Result, WorkspaceLister,
};

/// Scripted response for one repository call.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    Plan(Plan),
    NotFound,
    Fail(&'static str),
}

impl FakeResponse {
    fn resolve(self) -> Result<Plan> {
        match self {
            Self::Plan(plan) => Ok(plan),
            Self::NotFound => Err(RepositoryError::NotFound),
            Self::Fail(msg) => Err(RepositoryError::Internal(msg.to_string())),
        }
    }
}

/// Repository whose responses are scripted per workspace/plan ID.
///
/// Poll responses for a plan are consumed front to back; the last scripted
/// response repeats, which models a run settling in a terminal status.
#[derive(Default)]
pub struct FakeRepository {
    workspaces: Mutex<Vec<Workspace>>,
    latest_plans: Mutex<HashMap<String, FakeResponse>>,
    created_plans: Mutex<HashMap<String, FakeResponse>>,
    poll_results: Mutex<HashMap<String, VecDeque<FakeResponse>>>,
    list_calls: AtomicUsize,
    create_calls: Mutex<Vec<String>>,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience plan constructor with a fixed creation timestamp.
    pub fn plan(id: &str, status: PlanStatus) -> Plan {
        Plan {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            finished_at: None,
            message: String::new(),
            has_changes: false,
            status,
            url: format!("https://app.example.com/runs/{id}"),
        }
    }

    pub fn set_workspaces(&self, wks: Vec<Workspace>) {
        *self.workspaces.lock().unwrap() = wks;
    }

    /// Scripts the latest-plan lookup for a workspace ID.
    pub fn set_latest(&self, workspace_id: &str, response: FakeResponse) {
        self.latest_plans
            .lock()
            .unwrap()
            .insert(workspace_id.to_string(), response);
    }

    /// Scripts the create-plan call for a workspace ID.
    pub fn set_created(&self, workspace_id: &str, response: FakeResponse) {
        self.created_plans
            .lock()
            .unwrap()
            .insert(workspace_id.to_string(), response);
    }

    /// Appends one scripted poll response for a plan ID.
    pub fn push_poll(&self, plan_id: &str, response: FakeResponse) {
        self.poll_results
            .lock()
            .unwrap()
            .entry(plan_id.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.create_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkspaceLister for FakeRepository {
    async fn list_workspaces(
        &self,
        _include_tags: &[String],
        _exclude_tags: &[String],
    ) -> Result<Vec<Workspace>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.workspaces.lock().unwrap().clone())
    }
}

#[async_trait]
impl LatestPlanGetter for FakeRepository {
    async fn latest_check_plan(&self, workspace: &Workspace) -> Result<Plan> {
        let response = self.latest_plans.lock().unwrap().get(&workspace.id).cloned();
        response.unwrap_or(FakeResponse::NotFound).resolve()
    }
}

#[async_trait]
impl CheckPlanCreator for FakeRepository {
    async fn create_check_plan(&self, workspace: &Workspace, _message: &str) -> Result<Plan> {
        self.create_calls.lock().unwrap().push(workspace.id.clone());
        let response = self.created_plans.lock().unwrap().get(&workspace.id).cloned();
        response
            .unwrap_or(FakeResponse::Fail("no scripted create response"))
            .resolve()
    }
}

#[async_trait]
impl CheckPlanGetter for FakeRepository {
    async fn check_plan(&self, _workspace: &Workspace, plan_id: &str) -> Result<Plan> {
        let mut polls = self.poll_results.lock().unwrap();
        let queue = polls
            .get_mut(plan_id)
            .ok_or_else(|| RepositoryError::Internal("no scripted poll response".to_string()))?;

        let response = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .ok_or_else(|| RepositoryError::Internal("poll queue exhausted".to_string()))?
        };

        response.resolve()
    }
}
