// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! EcoSnap - image pipeline for EcoSnapCam trail cameras.
//!
//! This is the binary entry point: it loads configuration, installs logging,
//! and dispatches to one subcommand module.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod audit;
mod lock_status;
mod output;
mod process;
mod workflow;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ecosnap_config::EcoSnapConfig;
use ecosnap_core::EcoSnapError;

/// EcoSnap - image pipeline for EcoSnapCam trail cameras.
#[derive(Parser, Debug)]
#[command(name = "ecosnap", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every matching workflow on one uploaded image.
    Process {
        /// Path to the stored image.
        image: PathBuf,
        /// Camera that took the picture.
        #[arg(long)]
        device_id: String,
        /// Why the camera woke up (PIR, TIMER, ...).
        #[arg(long)]
        wake_reason: String,
        /// Capture time as YYYYMMDD-HHMMSS. Defaults to now.
        #[arg(long)]
        timestamp: Option<String>,
        /// Battery voltage reported by the camera, in millivolts.
        #[arg(long)]
        battery_mv: Option<u32>,
        /// Print the attempt outcomes as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show who holds the AI backend gate. Never modifies the token.
    LockStatus {
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Show recent audit records, newest first.
    Audit {
        /// Only records for this workflow id.
        #[arg(long)]
        workflow: Option<i64>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long)]
        json: bool,
    },
    /// Manage stored workflows.
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },
}

#[derive(Subcommand, Debug)]
enum WorkflowAction {
    /// List every stored workflow.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Add the `[[workflow]]` entries of a TOML file.
    Import { file: PathBuf },
    /// Delete a workflow and its audit records.
    Delete { id: i64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ecosnap_config::load_and_validate_path(path),
        None => ecosnap_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            ecosnap_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.general.log_level);

    if let Err(e) = run(cli.command, &config).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &EcoSnapConfig) -> Result<(), EcoSnapError> {
    match command {
        Commands::Process {
            image,
            device_id,
            wake_reason,
            timestamp,
            battery_mv,
            json,
        } => {
            let args = process::ProcessArgs {
                image,
                device_id,
                wake_reason,
                timestamp,
                battery_mv,
            };
            process::run_process(config, args, json).await
        }
        Commands::LockStatus { json, plain } => lock_status::run_lock_status(config, json, plain),
        Commands::Audit {
            workflow,
            limit,
            json,
        } => audit::run_audit(config, workflow, limit, json).await,
        Commands::Workflow { action } => match action {
            WorkflowAction::List { json } => workflow::run_list(config, json).await,
            WorkflowAction::Import { file } => workflow::run_import(config, &file).await,
            WorkflowAction::Delete { id } => workflow::run_delete(config, id).await,
        },
    }
}

/// Log to stderr so `--json` output on stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ecosnap={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
