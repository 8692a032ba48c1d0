//! CLI command implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::DateTime;

use crate::config::{ConnectionState, scan_ssh_config};
use crate::ssh::{ConnectionManager, Direction, EntryKind, TransferScheduler};
use crate::sync::{SyncVerdict, auto_sync, compare};

/// Show configured profiles, settings, and connection state.
pub async fn run_status(manager: &ConnectionManager) -> Result<()> {
    let profiles = manager.profiles().await;
    let settings = manager.settings();

    println!("Profiles: {}", profiles.len());
    for profile in &profiles {
        let state = match profile.state {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        };
        let auth = if profile.key_path.is_some() {
            "key"
        } else {
            "password"
        };
        println!(
            "  {} - {}@{}:{} [{auth}] {state}",
            profile.name, profile.username, profile.hostname, profile.port
        );
    }

    println!();
    println!("Settings:");
    println!("  auto_upload: {}", settings.auto_upload);
    println!("  show_hidden_files: {}", settings.show_hidden_files);
    println!("  default_timeout: {}s", settings.default_timeout);

    Ok(())
}

/// List hosts discovered in `~/.ssh/config`.
pub fn run_hosts() -> Result<()> {
    let Some(home) = dirs::home_dir() else {
        bail!("Cannot determine home directory");
    };
    let path = home.join(".ssh").join("config");
    if !path.exists() {
        println!("No SSH config found at {}", path.display());
        return Ok(());
    }

    let entries = scan_ssh_config(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if entries.is_empty() {
        println!("No hosts found in {}", path.display());
        return Ok(());
    }

    for entry in entries {
        let user = entry.username.as_deref().unwrap_or("-");
        let key = entry.identity_file.as_deref().unwrap_or("-");
        println!(
            "  {} - {}:{} user={user} key={key}",
            entry.alias, entry.hostname, entry.port
        );
    }

    Ok(())
}

/// List a remote directory.
pub async fn run_ls(
    manager: &ConnectionManager,
    profile: &str,
    path: Option<&str>,
    all: bool,
) -> Result<()> {
    let remote_dir = match path {
        Some(p) => p.to_string(),
        None => manager
            .profiles()
            .await
            .iter()
            .find(|p| p.name == profile)
            .map(|p| p.remote_dir.clone())
            .unwrap_or_else(|| "/".to_string()),
    };
    let show_hidden = all || manager.settings().show_hidden_files;

    let session = manager.connect(profile).await?;
    let result = crate::ssh::list(&session, &remote_dir, show_hidden).await;
    manager.disconnect(profile).await;

    for entry in result? {
        let kind = match entry.kind {
            EntryKind::Directory => "d",
            EntryKind::File => "-",
        };
        let mtime = entry
            .mtime
            .and_then(|t| DateTime::from_timestamp(i64::from(t), 0))
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
        println!("{kind} {:>12} {mtime} {}", entry.size, entry.name);
    }

    Ok(())
}

/// Upload a file, optionally polling progress.
pub async fn run_upload(
    manager: &ConnectionManager,
    profile: &str,
    local_path: &Path,
    remote_path: &str,
    progress: bool,
) -> Result<()> {
    run_transfer(
        manager,
        profile,
        Direction::Upload,
        local_path.to_path_buf(),
        remote_path.to_string(),
        progress,
    )
    .await
}

/// Download a file, optionally polling progress.
pub async fn run_download(
    manager: &ConnectionManager,
    profile: &str,
    remote_path: &str,
    local_path: &Path,
    progress: bool,
) -> Result<()> {
    run_transfer(
        manager,
        profile,
        Direction::Download,
        local_path.to_path_buf(),
        remote_path.to_string(),
        progress,
    )
    .await
}

async fn run_transfer(
    manager: &ConnectionManager,
    profile: &str,
    direction: Direction,
    local_path: PathBuf,
    remote_path: String,
    progress: bool,
) -> Result<()> {
    let session = manager.connect(profile).await?;

    let (scheduler, mut outcomes) = TransferScheduler::new();
    let task = scheduler.spawn_transfer(Arc::clone(&session), direction, local_path, remote_path);

    let outcome = if progress {
        let mut tick = tokio::time::interval(Duration::from_millis(200));
        loop {
            tokio::select! {
                outcome = outcomes.recv() => break outcome,
                _ = tick.tick() => {
                    let (transferred, total) = task.progress();
                    match total {
                        Some(total) => eprint!("\r{transferred}/{total} bytes"),
                        None => eprint!("\r{transferred} bytes"),
                    }
                }
            }
        }
    } else {
        outcomes.recv().await
    };

    if progress {
        eprintln!();
    }
    manager.disconnect(profile).await;

    let Some(outcome) = outcome else {
        bail!("Transfer worker exited without reporting an outcome");
    };
    if let Some(error) = outcome.error {
        return Err(error.into());
    }

    let (transferred, _) = outcome.task.progress();
    println!("{direction} complete: {transferred} bytes");
    Ok(())
}

/// Compare a local file against its remote counterpart. When the
/// `auto_upload` setting is on and local is newer, the file is uploaded
/// after the comparison.
pub async fn run_compare(
    manager: &ConnectionManager,
    profile: &str,
    local_path: &Path,
    remote_path: &str,
    no_tool: bool,
) -> Result<()> {
    let session = manager.connect(profile).await?;
    let result = compare(&session, local_path, remote_path, !no_tool).await;

    let comparison = match result {
        Ok(comparison) => comparison,
        Err(e) => {
            manager.disconnect(profile).await;
            return Err(e.into());
        }
    };
    println!("local:  {}", format_mtime(comparison.local_mtime));
    println!("remote: {}", format_mtime(comparison.remote_mtime));
    println!("verdict: {}", describe_verdict(comparison.verdict));

    if comparison.verdict == SyncVerdict::LocalNewer && manager.settings().auto_upload {
        let uploaded = crate::ssh::upload(&session, local_path, remote_path, None).await;
        manager.disconnect(profile).await;
        uploaded?;
        println!("Uploaded {} (auto_upload is on)", local_path.display());
    } else {
        manager.disconnect(profile).await;
    }
    Ok(())
}

/// Transfer whichever side is newer.
pub async fn run_sync(
    manager: &ConnectionManager,
    profile: &str,
    local_path: &Path,
    remote_path: &str,
) -> Result<()> {
    let session = manager.connect(profile).await?;
    let result = auto_sync(&session, local_path, remote_path).await;
    manager.disconnect(profile).await;

    match result? {
        Some(Direction::Upload) => println!("Uploaded {} (local was newer)", local_path.display()),
        Some(Direction::Download) => println!("Downloaded {remote_path} (remote was newer)"),
        None => println!("Already in sync"),
    }
    Ok(())
}

fn format_mtime(mtime: i64) -> String {
    DateTime::from_timestamp(mtime, 0)
        .map_or_else(|| mtime.to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

const fn describe_verdict(verdict: SyncVerdict) -> &'static str {
    match verdict {
        SyncVerdict::LocalNewer => "local is newer",
        SyncVerdict::RemoteNewer => "remote is newer",
        SyncVerdict::InSync => "in sync",
    }
}
