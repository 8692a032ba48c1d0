use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sftp_courier::ConnectionManager;
use sftp_courier::cli::{
    Cli, Commands, run_compare, run_download, run_hosts, run_ls, run_status, run_sync, run_upload,
};
use sftp_courier::config::{config_dir, load_profiles, load_settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging goes to stderr so stdout stays clean for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config_dir = cli.config_dir.unwrap_or_else(config_dir);

    let profiles = load_profiles(&config_dir)
        .with_context(|| format!("Failed to load profiles from {}", config_dir.display()))?;
    let settings = load_settings(&config_dir)
        .with_context(|| format!("Failed to load settings from {}", config_dir.display()))?;

    info!(
        config = %config_dir.display(),
        profiles = profiles.len(),
        "Configuration loaded"
    );

    let manager = ConnectionManager::new(profiles, settings);

    match cli.command {
        Commands::Status => {
            run_status(&manager).await?;
        }
        Commands::Hosts => {
            run_hosts()?;
        }
        Commands::Ls { profile, path, all } => {
            run_ls(&manager, &profile, path.as_deref(), all).await?;
        }
        Commands::Upload {
            profile,
            local_path,
            remote_path,
            progress,
        } => {
            run_upload(&manager, &profile, &local_path, &remote_path, progress).await?;
        }
        Commands::Download {
            profile,
            remote_path,
            local_path,
            progress,
        } => {
            run_download(&manager, &profile, &remote_path, &local_path, progress).await?;
        }
        Commands::Compare {
            profile,
            local_path,
            remote_path,
            no_tool,
        } => {
            run_compare(&manager, &profile, &local_path, &remote_path, no_tool).await?;
        }
        Commands::Sync {
            profile,
            local_path,
            remote_path,
        } => {
            run_sync(&manager, &profile, &local_path, &remote_path).await?;
        }
    }

    Ok(())
}
