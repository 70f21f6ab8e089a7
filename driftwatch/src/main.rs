//! Driftwatch
//!
//! Detects infrastructure drift on remotely managed workspaces by creating
//! plan-only runs and classifying their outcome. Drift and plan failures
//! map to dedicated exit codes so schedulers and alerting can tell them
//! apart from software errors.

mod commands;
mod controller;
mod metrics;
mod pipeline;
mod repository;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{Commands, GlobalConfig, handle_command};
use pipeline::result::DetectionError;

const EXIT_DRIFT: i32 = 2;
const EXIT_PLAN_FAILED: i32 = 3;

#[derive(Parser)]
#[command(name = "driftwatch")]
#[command(about = "Drift detection for remotely managed infrastructure workspaces", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Disable all logging
    #[arg(long, global = true)]
    no_log: bool,

    /// Identifier embedded in run messages to recognize our own runs
    #[arg(long, env = "DRIFTWATCH_APP_ID", default_value = "driftwatch", global = true)]
    app_id: String,

    /// Organization owning the workspaces
    #[arg(long, env = "DRIFTWATCH_ORGANIZATION", default_value = "", global = true)]
    organization: String,

    /// API bearer token
    #[arg(
        long,
        env = "DRIFTWATCH_TOKEN",
        default_value = "",
        hide_env_values = true,
        global = true
    )]
    token: String,

    /// Base address of the remote workspace management service
    #[arg(
        long,
        env = "DRIFTWATCH_ADDRESS",
        default_value = "https://app.terraform.io",
        global = true
    )]
    address: String,

    #[command(subcommand)]
    command: Commands,
}

/// Logs go to stderr; stdout is reserved for the JSON report.
fn init_tracing(debug: bool, no_log: bool) {
    if no_log {
        return;
    }

    let default_directive = if debug {
        "driftwatch=debug"
    } else {
        "driftwatch=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.debug, cli.no_log);

    let config = GlobalConfig {
        address: cli.address,
        token: cli.token,
        organization: cli.organization,
        app_id: cli.app_id,
    };

    if let Err(err) = handle_command(cli.command, &config).await {
        let detection = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<DetectionError>());

        match detection {
            Some(DetectionError::DriftDetected) => {
                eprintln!("Drift detected");
                std::process::exit(EXIT_DRIFT);
            }
            Some(DetectionError::PlanFailed) => {
                eprintln!("Drift detection plan failed");
                std::process::exit(EXIT_PLAN_FAILED);
            }
            None => {
                eprintln!("Error: {err:#}");
                std::process::exit(1);
            }
        }
    }
}
