//! `run` command: one drift detection cycle

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{GlobalConfig, build_repository, split_repeated_arg, validate_selection};
use crate::pipeline::filter::{
    ExcludeNameProcessor, FilterQueuedPlanProcessor, FilterRecentPlanProcessor,
    IncludeNameProcessor, LimitMaxProcessor,
};
use crate::pipeline::hydrate::{DEFAULT_FETCH_WORKERS, HydrateLatestPlanProcessor};
use crate::pipeline::plan::CreatePlanProcessor;
use crate::pipeline::result::{JsonReportProcessor, PlanResultProcessor};
use crate::pipeline::sort::SortByOldestPlanProcessor;
use crate::pipeline::wait::{DEFAULT_POLL_INTERVAL, WaitPlanProcessor};
use crate::pipeline::{Processor, ProcessorChain};
use crate::repository::WorkspaceLister;

#[derive(Clone, Copy, ValueEnum)]
pub enum OutFormat {
    /// Compact JSON report on stdout
    Json,
    /// Indented JSON report on stdout
    PrettyJson,
}

#[derive(Args)]
pub struct RunArgs {
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
    #[arg(short = 'l', long, default_value_t = 0)]
    pub limit_max_plans: usize,

    /// Don't detect drift on workspaces whose last detection is younger than
    /// this many seconds
    #[arg(short = 'n', long = "not-before", default_value_t = 3600)]
    pub not_before_seconds: u64,

    /// Deadline in seconds to wait for each created plan to finish
    #[arg(long = "wait-timeout", default_value_t = 7200)]
    pub wait_timeout_seconds: u64,

    /// Exit 0 even when drift or a failed plan was detected
    #[arg(long)]
    pub disable_drift_plan_exitcodes: bool,

    /// Report output format
    #[arg(short = 'o', long = "out-format", value_enum)]
    pub out_format: Option<OutFormat>,

    /// Don't create drift detection plans, reuse the latest known ones
    #[arg(long)]
    pub dry_run: bool,

    /// Number of concurrent workers fetching workspace information
    #[arg(long, default_value_t = DEFAULT_FETCH_WORKERS)]
    pub fetch_workers: usize,
}

pub async fn handle_run_command(args: RunArgs, config: &GlobalConfig) -> Result<()> {
    let include_names = split_repeated_arg(&args.include_names);
    let exclude_names = split_repeated_arg(&args.exclude_names);
    let include_tags = split_repeated_arg(&args.include_tags);
    let exclude_tags = split_repeated_arg(&args.exclude_tags);
    validate_selection(&include_names, &exclude_names, &include_tags, &exclude_tags)?;

    let repository = build_repository(config, args.dry_run)?;

    let cancel = CancellationToken::new();
    super::spawn_shutdown_watcher(cancel.clone());

    let report: Box<dyn Processor> = match args.out_format {
        Some(format) => Box::new(JsonReportProcessor::new(
            Box::new(std::io::stdout()),
            matches!(format, OutFormat::PrettyJson),
        )),
        None => Box::new(crate::pipeline::NoopProcessor),
    };

    let chain = ProcessorChain::new(vec![
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
        report,
        Box::new(PlanResultProcessor::new(args.disable_drift_plan_exitcodes)),
    ]);

    let workspaces = repository
        .list_workspaces(&include_tags, &exclude_tags)
        .await
        .context("could not list workspaces")?;

    if workspaces.is_empty() {
        bail!("0 workspaces selected");
    }
    info!("{} workspaces selected", workspaces.len());

    chain
        .process(workspaces)
        .await
        .context("workspaces processing failed")?;

    Ok(())
}
