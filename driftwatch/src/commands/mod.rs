//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod controller;
mod run;
mod version;

pub use controller::ControllerArgs;
pub use run::RunArgs;

use anyhow::{Result, bail};
use clap::Subcommand;
use std::sync::Arc;

use crate::repository::Repository;
use crate::repository::dry_run::DryRunRepository;
use crate::repository::http::ApiRepository;
use driftwatch_client::WorkspaceApiClient;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a single drift detection cycle and exit
    Run(RunArgs),
    /// Run drift detections periodically and serve drift metrics
    Controller(ControllerArgs),
    /// Print the application version
    Version,
}

/// Configuration shared by all commands.
pub struct GlobalConfig {
    /// Base address of the remote workspace management service.
    pub address: String,
    pub token: String,
    pub organization: String,
    /// Identifier embedded in run messages to recognize our own runs.
    pub app_id: String,
}

/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &GlobalConfig) -> Result<()> {
    match command {
        Commands::Run(args) => run::handle_run_command(args, config).await,
        Commands::Controller(args) => controller::handle_controller_command(args, config).await,
        Commands::Version => version::handle_version_command(),
    }
}

/// Cancels the token on SIGINT or SIGTERM.
pub(crate) fn spawn_shutdown_watcher(cancel: tokio_util::sync::CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            ) {
                Ok(sigterm) => sigterm,
                Err(err) => {
                    tracing::error!("Could not install the SIGTERM handler: {err}");
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        tracing::info!("Shutdown signal received");
        cancel.cancel();
    });
}

/// Splits repeated flag values on commas, so both `-t a -t b` and `-t a,b`
/// select the same set.
pub(crate) fn split_repeated_arg(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// Name and tag selection axes are mutually exclusive, and so are the
/// include and exclude directions within each axis.
pub(crate) fn validate_selection(
    include_names: &[String],
    exclude_names: &[String],
    include_tags: &[String],
    exclude_tags: &[String],
) -> Result<()> {
    if !include_names.is_empty() && !exclude_names.is_empty() {
        bail!("include and exclude name filters can't be used at the same time");
    }
    if !include_tags.is_empty() && !exclude_tags.is_empty() {
        bail!("include and exclude tag filters can't be used at the same time");
    }
    if (!include_names.is_empty() || !exclude_names.is_empty())
        && (!include_tags.is_empty() || !exclude_tags.is_empty())
    {
        bail!("name and tag filters can't be used at the same time");
    }

    Ok(())
}

/// Builds the repository against the remote service, optionally wrapped in
/// the dry-run decorator.
pub(crate) fn build_repository(config: &GlobalConfig, dry_run: bool) -> Result<Arc<dyn Repository>> {
    if config.organization.is_empty() {
        bail!("organization is required");
    }
    if config.token.is_empty() {
        bail!("API token is required");
    }

    let client = WorkspaceApiClient::new(&config.address, &config.token);
    let repository: Arc<dyn Repository> = Arc::new(ApiRepository::new(
        client,
        &config.organization,
        &config.address,
        &config.app_id,
    ));

    if dry_run {
        return Ok(Arc::new(DryRunRepository::new(repository)));
    }

    Ok(repository)
}
