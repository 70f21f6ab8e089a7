//! Result-classification stages
//!
//! Inspect the final per-workspace run statuses and produce (a) a structured
//! JSON report and (b) a terminal classification. Drift and plan failures
//! are domain outcomes, not software errors; they travel the error channel
//! as distinguished values so the caller can map them to dedicated exit
//! codes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use driftwatch_core::domain::{DriftReport, Workspace};
use std::io::Write;
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

use super::Processor;

/// Distinguished cycle outcomes, mapped to process exit codes by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DetectionError {
    #[error("drift detected")]
    DriftDetected,
    #[error("drift detection plan failed")]
    PlanFailed,
}

/// Folds the final plan statuses into a classification. Drift takes
/// precedence on the error channel; both conditions are always logged.
pub struct PlanResultProcessor {
    /// When set, drift and plan failures no longer surface as errors.
    suppress_outcomes: bool,
}

impl PlanResultProcessor {
    pub fn new(suppress_outcomes: bool) -> Self {
        Self { suppress_outcomes }
    }
}

#[async_trait]
impl Processor for PlanResultProcessor {
    async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        let mut any_drift = false;
        let mut any_plan_error = false;
        for wk in &workspaces {
            let Some(plan) = &wk.last_drift_plan else {
                continue;
            };

            if plan.has_drift() {
                any_drift = true;
                warn!(workspace = %wk.name, run_id = %plan.id, run_url = %plan.url, "Drift detected");
            } else if plan.failed() {
                any_plan_error = true;
                warn!(workspace = %wk.name, run_id = %plan.id, run_url = %plan.url, "Drift detection plan failed");
            }
        }

        if self.suppress_outcomes {
            return Ok(workspaces);
        }
        if any_drift {
            return Err(DetectionError::DriftDetected.into());
        }
        if any_plan_error {
            return Err(DetectionError::PlanFailed.into());
        }

        Ok(workspaces)
    }
}

/// Writes the machine-readable detection report.
pub struct JsonReportProcessor {
    out: Mutex<Box<dyn Write + Send>>,
    pretty: bool,
}

impl JsonReportProcessor {
    pub fn new(out: Box<dyn Write + Send>, pretty: bool) -> Self {
        Self {
            out: Mutex::new(out),
            pretty,
        }
    }
}

#[async_trait]
impl Processor for JsonReportProcessor {
    async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        let report = DriftReport::from_workspaces(&workspaces, Utc::now());

        let data = if self.pretty {
            serde_json::to_vec_pretty(&report)
        } else {
            serde_json::to_vec(&report)
        }
        .context("the result could not be marshaled in JSON")?;

        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow::anyhow!("report output lock poisoned"))?;
        out.write_all(&data)
            .and_then(|_| out.write_all(b"\n"))
            .context("result could not be written to the output")?;

        Ok(workspaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fake::FakeRepository;
    use driftwatch_core::domain::{Plan, PlanStatus};
    use std::sync::Arc;

    fn workspace(id: &str, plan: Option<Plan>) -> Workspace {
        let mut wk = Workspace::new(id, id, "org");
        wk.last_drift_plan = plan;
        wk
    }

    fn finished(id: &str, has_changes: bool) -> Plan {
        let mut plan = FakeRepository::plan(id, PlanStatus::FinishedOk);
        plan.has_changes = has_changes;
        plan
    }

    #[tokio::test]
    async fn test_all_ok_passes_through() {
        let wks = vec![
            workspace("w1", Some(finished("p1", false))),
            workspace("w2", Some(finished("p2", false))),
            workspace("w3", None),
        ];

        let got = PlanResultProcessor::new(false).process(wks).await.unwrap();
        assert_eq!(got.len(), 3);
    }

    #[tokio::test]
    async fn test_drift_surfaces_as_distinguished_error() {
        let wks = vec![
            workspace("w1", Some(finished("p1", false))),
            workspace("w2", Some(finished("p2", true))),
        ];

        let err = PlanResultProcessor::new(false).process(wks).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<DetectionError>(),
            Some(&DetectionError::DriftDetected)
        );
    }

    #[tokio::test]
    async fn test_plan_failure_surfaces_as_distinguished_error() {
        let wks = vec![
            workspace("w1", Some(finished("p1", false))),
            workspace("w2", Some(FakeRepository::plan("p2", PlanStatus::FinishedNotOk))),
        ];

        let err = PlanResultProcessor::new(false).process(wks).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<DetectionError>(),
            Some(&DetectionError::PlanFailed)
        );
    }

    #[tokio::test]
    async fn test_drift_takes_precedence_over_plan_failure() {
        let wks = vec![
            workspace("w1", Some(finished("p1", true))),
            workspace("w2", Some(FakeRepository::plan("p2", PlanStatus::FinishedNotOk))),
        ];

        let err = PlanResultProcessor::new(false).process(wks).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<DetectionError>(),
            Some(&DetectionError::DriftDetected)
        );
    }

    #[tokio::test]
    async fn test_suppressed_outcomes_never_error() {
        let wks = vec![workspace("w1", Some(finished("p1", true)))];

        let got = PlanResultProcessor::new(true).process(wks).await.unwrap();
        assert_eq!(got.len(), 1);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_json_report_is_written_and_input_passed_through() {
        let buf = SharedBuf::default();
        let wks = vec![
            workspace("w1", Some(finished("p1", false))),
            workspace("w2", Some(finished("p2", true))),
        ];

        let p = JsonReportProcessor::new(Box::new(buf.clone()), false);
        let got = p.process(wks).await.unwrap();
        assert_eq!(got.len(), 2);

        let raw = buf.0.lock().unwrap().clone();
        let parsed: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(parsed["ok"], false);
        assert_eq!(parsed["drift"], true);
        assert_eq!(parsed["workspaces"]["w2"]["drift"], true);
        assert_eq!(parsed["workspaces"]["w1"]["ok"], true);
    }
}
