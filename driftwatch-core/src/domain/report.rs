//! Structured drift detection report
//!
//! Machine-readable result of one detection cycle, keyed by workspace name
//! with fleet-level aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::workspace::Workspace;

/// Per-workspace result entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceReport {
    pub name: String,
    pub id: String,
    pub tags: Vec<String>,
    pub drift_detection_run_id: String,
    pub drift_detection_run_url: String,
    pub drift_detection_run_duration_seconds: u64,
    pub drift: bool,
    pub drift_detection_plan_error: bool,
    pub ok: bool,
}

/// Fleet-level report for one detection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub workspaces: BTreeMap<String, WorkspaceReport>,
    pub drift: bool,
    pub drift_detection_plan_error: bool,
    pub ok: bool,
    pub created_at: DateTime<Utc>,
}

impl DriftReport {
    /// Folds the final per-workspace plan statuses into a report.
    pub fn from_workspaces(wks: &[Workspace], created_at: DateTime<Utc>) -> Self {
        let mut any_drift = false;
        let mut any_plan_error = false;
        let mut workspaces = BTreeMap::new();

        for wk in wks {
            let (run_id, run_url, run_duration, drift, plan_error) = match &wk.last_drift_plan {
                Some(plan) => (
                    plan.id.clone(),
                    plan.url.clone(),
                    plan.run_duration().map(|d| d.as_secs()).unwrap_or(0),
                    plan.has_drift(),
                    plan.failed(),
                ),
                None => (String::new(), String::new(), 0, false, false),
            };

            any_drift = any_drift || drift;
            any_plan_error = any_plan_error || plan_error;

            workspaces.insert(
                wk.name.clone(),
                WorkspaceReport {
                    name: wk.name.clone(),
                    id: wk.id.clone(),
                    tags: wk.tags.clone(),
                    drift_detection_run_id: run_id,
                    drift_detection_run_url: run_url,
                    drift_detection_run_duration_seconds: run_duration,
                    drift,
                    drift_detection_plan_error: plan_error,
                    ok: !drift && !plan_error,
                },
            );
        }

        Self {
            workspaces,
            drift: any_drift,
            drift_detection_plan_error: any_plan_error,
            ok: !any_drift && !any_plan_error,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plan::{Plan, PlanStatus};
    use chrono::TimeZone;

    fn plan(id: &str, status: PlanStatus, has_changes: bool) -> Plan {
        Plan {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            finished_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 1, 0).unwrap()),
            message: String::new(),
            has_changes,
            status,
            url: format!("https://app.example.com/runs/{id}"),
        }
    }

    #[test]
    fn test_all_clean_is_ok() {
        let wks = vec![
            Workspace::new("ws-1", "wk1", "org").with_plan(plan("p1", PlanStatus::FinishedOk, false)),
            Workspace::new("ws-2", "wk2", "org").with_plan(plan("p2", PlanStatus::FinishedOk, false)),
        ];

        let report = DriftReport::from_workspaces(&wks, Utc::now());
        assert!(report.ok);
        assert!(!report.drift);
        assert!(!report.drift_detection_plan_error);
        assert!(report.workspaces["wk1"].ok);
        assert!(report.workspaces["wk2"].ok);
    }

    #[test]
    fn test_single_drift_marks_fleet() {
        let wks = vec![
            Workspace::new("ws-1", "wk1", "org").with_plan(plan("p1", PlanStatus::FinishedOk, false)),
            Workspace::new("ws-2", "wk2", "org").with_plan(plan("p2", PlanStatus::FinishedOk, true)),
        ];

        let report = DriftReport::from_workspaces(&wks, Utc::now());
        assert!(!report.ok);
        assert!(report.drift);
        assert!(!report.drift_detection_plan_error);
        assert!(report.workspaces["wk1"].ok);
        assert!(report.workspaces["wk2"].drift);
        assert!(!report.workspaces["wk2"].ok);
    }

    #[test]
    fn test_plan_error_tracked_independently() {
        let wks = vec![
            Workspace::new("ws-1", "wk1", "org").with_plan(plan("p1", PlanStatus::FinishedOk, true)),
            Workspace::new("ws-2", "wk2", "org").with_plan(plan("p2", PlanStatus::FinishedNotOk, false)),
        ];

        let report = DriftReport::from_workspaces(&wks, Utc::now());
        assert!(report.drift);
        assert!(report.drift_detection_plan_error);
        assert!(!report.ok);
    }

    #[test]
    fn test_workspace_without_plan_is_ok() {
        let wks = vec![Workspace::new("ws-1", "wk1", "org")];

        let report = DriftReport::from_workspaces(&wks, Utc::now());
        assert!(report.ok);
        let entry = &report.workspaces["wk1"];
        assert!(entry.ok);
        assert_eq!(entry.drift_detection_run_id, "");
    }

    #[test]
    fn test_report_serializes_to_json() {
        let wks = vec![
            Workspace::new("ws-1", "wk1", "org")
                .with_tags(vec!["team-a".to_string()])
                .with_plan(plan("p1", PlanStatus::FinishedOk, false)),
        ];

        let report = DriftReport::from_workspaces(&wks, Utc::now());
        let raw = serde_json::to_value(&report).unwrap();
        assert_eq!(raw["ok"], true);
        assert_eq!(raw["workspaces"]["wk1"]["drift_detection_run_id"], "p1");
        assert_eq!(raw["workspaces"]["wk1"]["tags"][0], "team-a");
        assert_eq!(
            raw["workspaces"]["wk1"]["drift_detection_run_duration_seconds"],
            60
        );
    }
}
