//! Workspace domain types

use serde::{Deserialize, Serialize};

use crate::domain::plan::Plan;

/// One remotely managed infrastructure unit subject to drift checking.
///
/// The `last_drift_plan` is attached by the hydration stage and replaced by
/// the plan-creation and wait stages as the cycle progresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub organization: String,
    pub tags: Vec<String>,
    pub last_drift_plan: Option<Plan>,
}

impl Workspace {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        organization: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            organization: organization.into(),
            tags: Vec::new(),
            last_drift_plan: None,
        }
    }

    /// Sets the workspace tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Attaches a last known drift plan.
    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.last_drift_plan = Some(plan);
        self
    }
}
