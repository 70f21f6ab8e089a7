//! Plan-creation stage
//!
//! Creates one new drift-check plan per surviving workspace. Requests are
//! issued sequentially on purpose: run creation is a mutating call and the
//! remote service applies its own admission control; client-side concurrency
//! here would only fight it.

use anyhow::Result;
use async_trait::async_trait;
use driftwatch_core::domain::Workspace;
use std::sync::Arc;
use tracing::{error, info};

use super::Processor;
use crate::repository::CheckPlanCreator;

pub struct CreatePlanProcessor {
    creator: Arc<dyn CheckPlanCreator>,
    message: String,
}

impl CreatePlanProcessor {
    pub fn new(creator: Arc<dyn CheckPlanCreator>, message: impl Into<String>) -> Self {
        Self {
            creator,
            message: message.into(),
        }
    }
}

#[async_trait]
impl Processor for CreatePlanProcessor {
    async fn process(&self, workspaces: Vec<Workspace>) -> Result<Vec<Workspace>> {
        let mut created = 0;
        let mut out = Vec::with_capacity(workspaces.len());
        for mut wk in workspaces {
            match self.creator.create_check_plan(&wk, &self.message).await {
                Ok(plan) => {
                    created += 1;
                    info!(workspace = %wk.name, run_id = %plan.id, "Drift detection plan created");
                    wk.last_drift_plan = Some(plan);
                }
                // Keep whatever plan the workspace already carried.
                Err(err) => {
                    error!(workspace = %wk.name, "Could not create drift detection plan: {err}");
                }
            }

            out.push(wk);
        }

        info!("{created} drift detection plans created");

        Ok(out)
    }
}
