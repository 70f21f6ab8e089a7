//! Drift metrics collection
//!
//! On every scrape, runs a read-only pipeline over the listed fleet and
//! renders the result in the Prometheus text exposition format. Collection
//! is bounded by a deadline so a slow remote API degrades the scrape instead
//! of hanging it.

use anyhow::{Context, Result, bail};
use driftwatch_core::domain::{PlanStatus, Workspace};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::pipeline::Processor;
use crate::repository::WorkspaceLister;

/// Default deadline for one metrics collection.
pub const DEFAULT_COLLECT_TIMEOUT: Duration = Duration::from_secs(45);

pub struct MetricsCollector {
    lister: Arc<dyn WorkspaceLister>,
    processor: Arc<dyn Processor>,
    include_tags: Vec<String>,
    exclude_tags: Vec<String>,
    timeout: Duration,
}

impl MetricsCollector {
    pub fn new(
        lister: Arc<dyn WorkspaceLister>,
        processor: Arc<dyn Processor>,
        include_tags: Vec<String>,
        exclude_tags: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            lister,
            processor,
            include_tags,
            exclude_tags,
            timeout,
        }
    }

    /// Collects and renders the current drift metrics. A zero timeout
    /// disables the deadline.
    pub async fn collect(&self) -> Result<String> {
        let lister = Arc::clone(&self.lister);
        let processor = Arc::clone(&self.processor);
        let include_tags = self.include_tags.clone();
        let exclude_tags = self.exclude_tags.clone();

        if self.timeout.is_zero() {
            return collect_metrics(lister, processor, include_tags, exclude_tags).await;
        }

        let task = tokio::spawn(collect_metrics(
            lister,
            processor,
            include_tags,
            exclude_tags,
        ));
        match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined.context("metrics collection panicked")?,
            Err(_) => bail!("metrics collection deadline exceeded"),
        }
    }
}

async fn collect_metrics(
    lister: Arc<dyn WorkspaceLister>,
    processor: Arc<dyn Processor>,
    include_tags: Vec<String>,
    exclude_tags: Vec<String>,
) -> Result<String> {
    debug!("Collecting drift metrics");

    let workspaces = lister
        .list_workspaces(&include_tags, &exclude_tags)
        .await
        .context("could not list workspaces")?;

    let workspaces = processor
        .process(workspaces)
        .await
        .context("workspaces processing failed")?;

    Ok(render(&workspaces))
}

/// Known drift detection states of a workspace.
const STATES: [&str; 3] = ["ok", "drift", "drift_plan_error"];

fn render(workspaces: &[Workspace]) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "# HELP driftwatch_workspace_drift_detection_state Latest drift detection state of the workspace."
    );
    let _ = writeln!(out, "# TYPE driftwatch_workspace_drift_detection_state gauge");
    for wk in workspaces {
        let Some(state) = detection_state(wk) else {
            continue;
        };
        for known in STATES {
            let _ = writeln!(
                out,
                "driftwatch_workspace_drift_detection_state{{workspace_name=\"{}\",state=\"{known}\"}} {}",
                escape_label(&wk.name),
                u8::from(known == state),
            );
        }
    }

    let _ = writeln!(
        out,
        "# HELP driftwatch_workspace_info Information of the workspace's latest drift detection."
    );
    let _ = writeln!(out, "# TYPE driftwatch_workspace_info gauge");
    for wk in workspaces {
        let Some(plan) = &wk.last_drift_plan else {
            continue;
        };
        let mut tags = wk.tags.clone();
        tags.sort();
        let _ = writeln!(
            out,
            "driftwatch_workspace_info{{workspace_name=\"{}\",workspace_id=\"{}\",run_id=\"{}\",run_url=\"{}\",tags=\"{}\",organization_name=\"{}\"}} 1",
            escape_label(&wk.name),
            escape_label(&wk.id),
            escape_label(&plan.id),
            escape_label(&plan.url),
            escape_label(&tags.join(",")),
            escape_label(&wk.organization),
        );
    }

    let _ = writeln!(
        out,
        "# HELP driftwatch_workspace_drift_detection_create Unix timestamp of the latest drift detection creation."
    );
    let _ = writeln!(out, "# TYPE driftwatch_workspace_drift_detection_create gauge");
    for wk in workspaces {
        let Some(plan) = &wk.last_drift_plan else {
            continue;
        };
        let _ = writeln!(
            out,
            "driftwatch_workspace_drift_detection_create{{workspace_name=\"{}\"}} {}",
            escape_label(&wk.name),
            plan.created_at.timestamp(),
        );
    }

    let _ = writeln!(
        out,
        "# HELP driftwatch_workspace_drift_detection_finish Unix timestamp of the latest drift detection finish."
    );
    let _ = writeln!(out, "# TYPE driftwatch_workspace_drift_detection_finish gauge");
    for wk in workspaces {
        let Some(plan) = &wk.last_drift_plan else {
            continue;
        };
        let Some(finished_at) = plan.finished_at else {
            continue;
        };
        let _ = writeln!(
            out,
            "driftwatch_workspace_drift_detection_finish{{workspace_name=\"{}\"}} {}",
            escape_label(&wk.name),
            finished_at.timestamp(),
        );
    }

    out
}

fn detection_state(workspace: &Workspace) -> Option<&'static str> {
    let plan = workspace.last_drift_plan.as_ref()?;
    match plan.status {
        PlanStatus::FinishedOk if plan.has_changes => Some("drift"),
        PlanStatus::FinishedOk => Some("ok"),
        PlanStatus::FinishedNotOk => Some("drift_plan_error"),
        // Waiting or unknown runs have no reportable state yet.
        _ => None,
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NoopProcessor;
    use crate::repository::fake::FakeRepository;
    use driftwatch_core::domain::Plan;

    fn workspace(name: &str, plan: Option<Plan>) -> Workspace {
        let mut wk = Workspace::new(name, name, "org").with_tags(vec!["team:b".into(), "team:a".into()]);
        wk.last_drift_plan = plan;
        wk
    }

    fn plan(id: &str, status: PlanStatus, has_changes: bool) -> Plan {
        let mut plan = FakeRepository::plan(id, status);
        plan.has_changes = has_changes;
        plan
    }

    fn collector(fake: Arc<FakeRepository>, timeout: Duration) -> MetricsCollector {
        MetricsCollector::new(fake, Arc::new(NoopProcessor), vec![], vec![], timeout)
    }

    #[test]
    fn test_detection_state_mapping() {
        let cases = [
            (PlanStatus::FinishedOk, false, Some("ok")),
            (PlanStatus::FinishedOk, true, Some("drift")),
            (PlanStatus::FinishedNotOk, false, Some("drift_plan_error")),
            (PlanStatus::FinishedNotOk, true, Some("drift_plan_error")),
            (PlanStatus::Waiting, false, None),
            (PlanStatus::Unknown, false, None),
        ];
        for (status, has_changes, want) in cases {
            let wk = workspace("w", Some(plan("p", status, has_changes)));
            assert_eq!(detection_state(&wk), want);
        }
        assert_eq!(detection_state(&workspace("w", None)), None);
    }

    #[tokio::test]
    async fn test_renders_state_info_and_timestamps() {
        let fake = Arc::new(FakeRepository::new());
        let mut finished = plan("p1", PlanStatus::FinishedOk, true);
        finished.finished_at = Some(finished.created_at + chrono::Duration::minutes(2));
        fake.set_workspaces(vec![
            workspace("wk-drifted", Some(finished)),
            workspace("wk-waiting", Some(plan("p2", PlanStatus::Waiting, false))),
            workspace("wk-bare", None),
        ]);

        let got = collector(fake, Duration::from_secs(5)).collect().await.unwrap();

        assert!(got.contains(
            "driftwatch_workspace_drift_detection_state{workspace_name=\"wk-drifted\",state=\"drift\"} 1"
        ));
        assert!(got.contains(
            "driftwatch_workspace_drift_detection_state{workspace_name=\"wk-drifted\",state=\"ok\"} 0"
        ));
        // Waiting and bare workspaces expose no state series.
        assert!(!got.contains("workspace_name=\"wk-waiting\",state="));
        assert!(!got.contains("workspace_name=\"wk-bare\""));

        // Tags are sorted in the info series.
        assert!(got.contains("run_id=\"p1\""));
        assert!(got.contains("tags=\"team:a,team:b\""));
        assert!(got.contains("organization_name=\"org\""));

        assert!(got.contains("driftwatch_workspace_drift_detection_create{workspace_name=\"wk-drifted\"}"));
        assert!(got.contains("driftwatch_workspace_drift_detection_finish{workspace_name=\"wk-drifted\"}"));
        // An unfinished run has a create timestamp but no finish timestamp.
        assert!(got.contains("driftwatch_workspace_drift_detection_create{workspace_name=\"wk-waiting\"}"));
        assert!(!got.contains("driftwatch_workspace_drift_detection_finish{workspace_name=\"wk-waiting\"}"));
    }

    #[tokio::test]
    async fn test_label_values_are_escaped() {
        let got = render(&[workspace(
            "wk\"quoted\"",
            Some(plan("p1", PlanStatus::FinishedOk, false)),
        )]);
        assert!(got.contains("workspace_name=\"wk\\\"quoted\\\"\""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_collection_hits_the_deadline() {
        struct SlowProcessor;

        #[async_trait::async_trait]
        impl Processor for SlowProcessor {
            async fn process(&self, workspaces: Vec<Workspace>) -> anyhow::Result<Vec<Workspace>> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(workspaces)
            }
        }

        let fake = Arc::new(FakeRepository::new());
        let collector = MetricsCollector::new(
            fake,
            Arc::new(SlowProcessor),
            vec![],
            vec![],
            Duration::from_secs(45),
        );

        let err = collector.collect().await.unwrap_err();
        assert!(err.to_string().contains("deadline exceeded"));
    }
}
