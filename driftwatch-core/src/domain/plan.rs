//! Drift-check plan domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One drift-check execution against a workspace.
///
/// Created by the plan-creation stage in `Waiting` state, observed by the
/// wait stage until it leaves `Waiting`, then immutable for the rest of the
/// cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub message: String,
    /// Only meaningful when `status` is `FinishedOk`.
    pub has_changes: bool,
    pub status: PlanStatus,
    pub url: String,
}

impl Plan {
    /// Wall-clock duration of the run, if it finished.
    pub fn run_duration(&self) -> Option<Duration> {
        let finished = self.finished_at?;
        (finished - self.created_at).to_std().ok()
    }

    /// True when the run completed successfully and detected drift.
    pub fn has_drift(&self) -> bool {
        self.status == PlanStatus::FinishedOk && self.has_changes
    }

    /// True when the run itself errored, independent of drift.
    pub fn failed(&self) -> bool {
        self.status == PlanStatus::FinishedNotOk
    }
}

/// Simplified run status the drift detector cares about.
///
/// `FinishedNotOk` means the run itself errored (infrastructure or tooling
/// failure), independent of drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    #[default]
    Unknown,
    Waiting,
    FinishedOk,
    FinishedNotOk,
}

impl PlanStatus {
    pub fn is_waiting(self) -> bool {
        self == PlanStatus::Waiting
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PlanStatus::FinishedOk | PlanStatus::FinishedNotOk)
    }
}
