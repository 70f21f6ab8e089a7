//! Admission/selection stages
//!
//! Pure, synchronous, order-preserving filters deciding which workspaces
//! proceed through the pipeline. Per-workspace drops are logged at debug.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use driftwatch_core::domain::Workspace;
use regex::Regex;
use std::time::Duration;
use tracing::debug;

use super::{NoopProcessor, Processor};

/// Keeps only workspaces whose name matches at least one pattern.
pub struct IncludeNameProcessor {
    regexes: Vec<Regex>,
}

impl IncludeNameProcessor {
    /// An empty pattern set means include all.
    pub fn new(patterns: &[String]) -> Result<Box<dyn Processor>> {
        if patterns.is_empty() {
            return Ok(Box::new(NoopProcessor));
        }

        Ok(Box::new(Self {
            regexes: compile_regexes(patterns)?,
        }))
    }
}

#[async_trait]
impl Processor for IncludeNameProcessor {
    async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        debug!("Including workspaces by name");

        Ok(workspaces
            .into_iter()
            .filter(|wk| {
                let keep = matches_any(&self.regexes, &wk.name);
                if !keep {
                    debug!(workspace = %wk.name, "Ignoring workspace, not included by name");
                }
                keep
            })
            .collect())
    }
}

/// Drops any workspace whose name matches at least one pattern.
pub struct ExcludeNameProcessor {
    regexes: Vec<Regex>,
}

impl ExcludeNameProcessor {
    /// An empty pattern set means exclude none.
    pub fn new(patterns: &[String]) -> Result<Box<dyn Processor>> {
        if patterns.is_empty() {
            return Ok(Box::new(NoopProcessor));
        }

        Ok(Box::new(Self {
            regexes: compile_regexes(patterns)?,
        }))
    }
}

#[async_trait]
impl Processor for ExcludeNameProcessor {
    async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        debug!("Excluding workspaces by name");

        Ok(workspaces
            .into_iter()
            .filter(|wk| {
                let drop = matches_any(&self.regexes, &wk.name);
                if drop {
                    debug!(workspace = %wk.name, "Ignoring workspace, excluded by name");
                }
                !drop
            })
            .collect())
    }
}

/// Drops workspaces whose last known plan is still waiting; a new detection
/// would just queue behind it.
pub struct FilterQueuedPlanProcessor;

#[async_trait]
impl Processor for FilterQueuedPlanProcessor {
    async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        debug!("Filtering already queued drift detection plans");

        Ok(workspaces
            .into_iter()
            .filter(|wk| {
                let queued = wk
                    .last_drift_plan
                    .as_ref()
                    .is_some_and(|plan| plan.status.is_waiting());
                if queued {
                    debug!(workspace = %wk.name, "Ignoring workspace, drift detection already queued");
                }
                !queued
            })
            .collect())
    }
}

/// Drops workspaces whose last plan is younger than a minimum age.
/// Workspaces with no last plan are never filtered.
pub struct FilterRecentPlanProcessor {
    not_before: chrono::Duration,
}

impl FilterRecentPlanProcessor {
    /// A zero duration means no filtering.
    pub fn new(not_before: Duration) -> Box<dyn Processor> {
        if not_before.is_zero() {
            return Box::new(NoopProcessor);
        }

        Box::new(Self {
            not_before: chrono::Duration::from_std(not_before)
                .unwrap_or_else(|_| chrono::Duration::MAX),
        })
    }
}

#[async_trait]
impl Processor for FilterRecentPlanProcessor {
    async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        debug!("Filtering drift detection plans executed too recently");

        let now = Utc::now();
        Ok(workspaces
            .into_iter()
            .filter(|wk| {
                let recent = wk
                    .last_drift_plan
                    .as_ref()
                    .is_some_and(|plan| now - plan.created_at < self.not_before);
                if recent {
                    debug!(workspace = %wk.name, "Ignoring workspace, drift detection executed too recently");
                }
                !recent
            })
            .collect())
    }
}

/// Truncates the sequence to at most `max` workspaces.
pub struct LimitMaxProcessor {
    max: usize,
}

impl LimitMaxProcessor {
    /// Zero means no limit.
    pub fn new(max: usize) -> Box<dyn Processor> {
        if max == 0 {
            return Box::new(NoopProcessor);
        }

        Box::new(Self { max })
    }
}

#[async_trait]
impl Processor for LimitMaxProcessor {
    async fn process(&self, mut workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        debug!("Limiting max drift plan detections");

        workspaces.truncate(self.max);
        Ok(workspaces)
    }
}

fn compile_regexes(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("invalid regex {p:?}")))
        .collect()
}

fn matches_any(regexes: &[Regex], s: &str) -> bool {
    regexes.iter().any(|rx| rx.is_match(s))
}
