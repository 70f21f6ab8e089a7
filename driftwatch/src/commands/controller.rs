//! `controller` command: periodic drift detection plus the metrics server

use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{GlobalConfig, build_repository, split_repeated_arg, validate_selection};
use crate::controller::DriftDetector;
use crate::metrics::cache::CachedWorkspaceLister;
use crate::metrics::collector::MetricsCollector;
use crate::metrics::server::{ServerConfig, run_server};
use crate::pipeline::filter::{
    ExcludeNameProcessor, FilterQueuedPlanProcessor, FilterRecentPlanProcessor,
    IncludeNameProcessor, LimitMaxProcessor,
};
use crate::pipeline::hydrate::{DEFAULT_FETCH_WORKERS, HydrateLatestPlanProcessor};
use crate::pipeline::plan::CreatePlanProcessor;
use crate::pipeline::sort::SortByOldestPlanProcessor;
use crate::pipeline::wait::{DEFAULT_POLL_INTERVAL, WaitPlanProcessor};
use crate::pipeline::{Processor, ProcessorChain};
use crate::repository::WorkspaceLister;

#[derive(Args)]
pub struct ControllerArgs {
    /// Message set on the created drift detection plans
    #[arg(short = 'm', long, default_value = "Drift detection")]
    pub plan_message: String,

    /// Regex of workspace names to include (repeatable, comma-splittable)
    #[arg(short = 'i', long = "include-name")]
    pub include_names: Vec<String>,

    /// Regex of workspace names to exclude (repeatable, comma-splittable)
    #[arg(short = 'e', long = "exclude-name")]
    pub exclude_names: Vec<String>,

    /// Workspace tags to include (repeatable, comma-splittable)
    #[arg(short = 't', long = "include-tag")]
    pub include_tags: Vec<String>,

    /// Workspace tags to exclude (repeatable, comma-splittable)
    #[arg(short = 'x', long = "exclude-tag")]
    pub exclude_tags: Vec<String>,

    /// Maximum number of drift detection plans per cycle, 0 for no limit
    #[arg(short = 'l', long, default_value_t = 1)]
    pub limit_max_plans: usize,

    /// Don't detect drift on workspaces whose last detection is younger than
    /// this many seconds
    #[arg(short = 'n', long = "not-before", default_value_t = 3600)]
    pub not_before_seconds: u64,

    /// Deadline in seconds to wait for each created plan to finish
    #[arg(long = "wait-timeout", default_value_t = 3600)]
    pub wait_timeout_seconds: u64,

    /// Don't create drift detection plans, reuse the latest known ones
    #[arg(long)]
    pub dry_run: bool,

    /// Number of concurrent workers fetching workspace information
    #[arg(long, default_value_t = DEFAULT_FETCH_WORKERS)]
    pub fetch_workers: usize,

    /// Seconds between drift detection cycles
    #[arg(long = "detect-interval", default_value_t = 300)]
    pub detect_interval_seconds: u64,

    /// Serve metrics only, without running drift detections
    #[arg(long)]
    pub disable_drift_detector: bool,

    /// Deadline in seconds for one metrics collection, 0 for no deadline
    #[arg(long = "metrics-timeout", default_value_t = 45)]
    pub metrics_timeout_seconds: u64,

    /// Address the HTTP server listens on
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub listen_address: String,

    /// Path serving the drift metrics
    #[arg(long, default_value = "/metrics")]
    pub metrics_path: String,

    /// Path serving the health check
    #[arg(long, default_value = "/status")]
    pub health_check_path: String,
}

pub async fn handle_controller_command(args: ControllerArgs, config: &GlobalConfig) -> Result<()> {
    let include_names = split_repeated_arg(&args.include_names);
    let exclude_names = split_repeated_arg(&args.exclude_names);
    let include_tags = split_repeated_arg(&args.include_tags);
    let exclude_tags = split_repeated_arg(&args.exclude_tags);
    validate_selection(&include_names, &exclude_names, &include_tags, &exclude_tags)?;

    let repository = build_repository(config, args.dry_run)?;

    let cancel = CancellationToken::new();
    super::spawn_shutdown_watcher(cancel.clone());

    let mut services = JoinSet::new();

    if !args.disable_drift_detector {
        let detection_chain: Arc<dyn Processor> = Arc::new(ProcessorChain::new(vec![
            IncludeNameProcessor::new(&include_names)?,
            ExcludeNameProcessor::new(&exclude_names)?,
            Box::new(HydrateLatestPlanProcessor::new(
                repository.clone(),
                args.fetch_workers,
                cancel.clone(),
            )),
            Box::new(FilterQueuedPlanProcessor),
            FilterRecentPlanProcessor::new(Duration::from_secs(args.not_before_seconds)),
            Box::new(SortByOldestPlanProcessor),
            LimitMaxProcessor::new(args.limit_max_plans),
            Box::new(CreatePlanProcessor::new(
                repository.clone(),
                &args.plan_message,
            )),
            Box::new(WaitPlanProcessor::new(
                repository.clone(),
                DEFAULT_POLL_INTERVAL,
                Duration::from_secs(args.wait_timeout_seconds),
                cancel.clone(),
            )),
        ]));

        let detector = DriftDetector::new(
            Duration::from_secs(args.detect_interval_seconds),
            repository.clone(),
            detection_chain,
            include_tags.clone(),
            exclude_tags.clone(),
        )?;

        let cancel = cancel.clone();
        services.spawn(async move { detector.run(cancel).await });
    }

    // The metrics pipeline is read-only: it narrows the fleet the same way
    // the detector does and attaches the latest known plan, but never
    // creates runs or waits on them.
    let metrics_chain: Arc<dyn Processor> = Arc::new(ProcessorChain::new(vec![
        IncludeNameProcessor::new(&include_names)?,
        ExcludeNameProcessor::new(&exclude_names)?,
        Box::new(HydrateLatestPlanProcessor::new(
            repository.clone(),
            args.fetch_workers,
            cancel.clone(),
        )),
    ]));

    let cached_lister = Arc::new(
        CachedWorkspaceLister::new(
            repository.clone() as Arc<dyn WorkspaceLister>,
            crate::metrics::cache::DEFAULT_REFRESH_PACE,
            include_tags.clone(),
            exclude_tags.clone(),
            cancel.clone(),
        )
        .await
        .context("could not set up the workspace cache")?,
    );

    let collector = Arc::new(MetricsCollector::new(
        cached_lister,
        metrics_chain,
        include_tags,
        exclude_tags,
        Duration::from_secs(args.metrics_timeout_seconds),
    ));

    {
        let server_config = ServerConfig {
            listen_address: args.listen_address.clone(),
            metrics_path: args.metrics_path.clone(),
            health_check_path: args.health_check_path.clone(),
        };
        let cancel = cancel.clone();
        services.spawn(async move { run_server(server_config, collector, cancel).await });
    }

    // The first service to finish, cleanly or not, brings the others down.
    let mut first_error = None;
    while let Some(joined) = services.join_next().await {
        cancel.cancel();
        match joined.context("service task panicked") {
            Ok(Ok(())) => {}
            Ok(Err(err)) | Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
