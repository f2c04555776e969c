//! trovilo entry point.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use trovilo::adapters::kube::{build_client, check_connectivity, KubeWatchSource};
use trovilo::application::{shutdown_signal, JobSupervisor};
use trovilo::cli::Cli;
use trovilo::infrastructure::config::ConfigLoader;
use trovilo::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if tracing::dispatcher::has_been_set() {
                tracing::error!(error = %format!("{err:#}"), "trovilo stopped");
            } else {
                eprintln!("Error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ConfigLoader::load_from_file(&cli.config)?;
    cli.apply_logging_overrides(&mut config.logging);

    let _logger = LoggerImpl::init(&config.logging)?;

    if cli.check_config {
        let jobs = serde_yaml::to_string(&config.jobs).context("Failed to render jobs")?;
        print!("{jobs}");
        return Ok(());
    }

    let client = build_client(cli.kubeconfig.as_deref()).await?;
    let version = check_connectivity(&client).await?;
    tracing::info!(
        server_version = %version,
        jobs = config.jobs.len(),
        "Connected to Kubernetes API server"
    );

    let supervisor = JobSupervisor::from_config(KubeWatchSource::new(client), &config);

    tokio::select! {
        result = supervisor.run(config.jobs) => result.map_err(Into::into),
        () = shutdown_signal() => {
            tracing::info!("Shutdown signal received, stopping");
            Ok(())
        }
    }
}
