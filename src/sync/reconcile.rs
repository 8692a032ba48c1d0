//! File-level sync reconciliation.
//!
//! Compares one local file against its remote counterpart by modification
//! time and either reports the verdict, shows the difference through an
//! external diff tool, or transfers in the newer direction. Equal
//! timestamps never transfer, even if content differs; this mirrors the
//! mtime-only comparison and is a documented limitation.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use russh_sftp::protocol::FileAttributes;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{CourierError, Result};
use crate::ssh::{Session, download, sftp_error, upload};

/// External diff tools probed in order.
const DIFF_TOOLS: [&str; 3] = ["meld", "diff", "kdiff3"];

/// Which side of a comparison is newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncVerdict {
    LocalNewer,
    RemoteNewer,
    InSync,
}

/// Result of comparing a local file against its remote counterpart.
#[derive(Debug, Clone, Copy)]
pub struct Comparison {
    pub verdict: SyncVerdict,
    /// Local mtime, seconds since the epoch
    pub local_mtime: i64,
    /// Remote mtime, seconds since the epoch
    pub remote_mtime: i64,
}

/// Pure mtime comparison. Strictly-newer wins; a tie is in sync.
#[must_use]
pub const fn decide(local_mtime: i64, remote_mtime: i64) -> SyncVerdict {
    if local_mtime > remote_mtime {
        SyncVerdict::LocalNewer
    } else if remote_mtime > local_mtime {
        SyncVerdict::RemoteNewer
    } else {
        SyncVerdict::InSync
    }
}

/// Stat both sides and yield the mtime verdict. When `launch_tool` is
/// set and one of the known diff tools is installed, the remote file is
/// materialized into the session scratch directory and the tool is run
/// against the pair; with no tool installed the verdict alone is
/// returned.
///
/// # Errors
///
/// Returns `NotConnected`, `Io`, or `Sftp`.
pub async fn compare(
    session: &Session,
    local_path: &Path,
    remote_path: &str,
    launch_tool: bool,
) -> Result<Comparison> {
    let local_mtime = local_mtime(local_path)?;
    let remote_mtime = remote_mtime(session, remote_path).await?;
    let comparison = Comparison {
        verdict: decide(local_mtime, remote_mtime),
        local_mtime,
        remote_mtime,
    };

    if launch_tool {
        if let Some(tool) = find_diff_tool(&DIFF_TOOLS) {
            let scratch_copy = materialize_remote(session, remote_path).await?;

            debug!(tool = %tool, remote = %remote_path, "Launching diff tool");
            let status = Command::new(&tool)
                .arg(local_path)
                .arg(&scratch_copy)
                .status()
                .await?;
            // Non-zero is how diff reports "files differ", not a failure
            debug!(tool = %tool, status = %status, "Diff tool finished");
        } else {
            warn!(
                tried = %DIFF_TOOLS.join(", "),
                "No diff tool installed, reporting the timestamp verdict only"
            );
        }
    }

    Ok(comparison)
}

/// Transfer in the newer direction, then propagate the source mtime to
/// the destination so a second run is a no-op.
///
/// Returns the direction transferred, or `None` when both sides carry
/// the same timestamp.
///
/// # Errors
///
/// Returns `NotConnected`, `Io`, or `Sftp`.
pub async fn auto_sync(
    session: &Session,
    local_path: &Path,
    remote_path: &str,
) -> Result<Option<crate::ssh::Direction>> {
    use crate::ssh::Direction;

    let local_mtime = local_mtime(local_path)?;
    let remote_mtime = remote_mtime(session, remote_path).await?;

    match decide(local_mtime, remote_mtime) {
        SyncVerdict::LocalNewer => {
            upload(session, local_path, remote_path, None).await?;
            set_remote_mtime(session, remote_path, local_mtime).await?;
            info!(remote = %remote_path, "Synced local to remote");
            Ok(Some(Direction::Upload))
        }
        SyncVerdict::RemoteNewer => {
            download(session, remote_path, local_path, None).await?;
            set_local_mtime(local_path, remote_mtime)?;
            info!(local = %local_path.display(), "Synced remote to local");
            Ok(Some(Direction::Download))
        }
        SyncVerdict::InSync => {
            debug!(remote = %remote_path, "Timestamps equal, nothing to sync");
            Ok(None)
        }
    }
}

fn local_mtime(path: &Path) -> Result<i64> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(epoch_secs(modified))
}

async fn remote_mtime(session: &Session, path: &str) -> Result<i64> {
    let sftp = session.sftp().await?;
    let metadata = sftp.metadata(path).await.map_err(sftp_error)?;
    metadata
        .mtime
        .map(i64::from)
        .ok_or_else(|| CourierError::Sftp {
            reason: format!("Server reported no mtime for {path}"),
        })
}

async fn set_remote_mtime(session: &Session, path: &str, mtime: i64) -> Result<()> {
    let sftp = session.sftp().await?;
    let mut attrs = FileAttributes::empty();
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let secs = mtime as u32;
    attrs.mtime = Some(secs);
    attrs.atime = Some(secs);
    sftp.set_metadata(path, attrs).await.map_err(sftp_error)
}

fn set_local_mtime(path: &Path, mtime: i64) -> Result<()> {
    #[expect(clippy::cast_sign_loss)]
    let time = UNIX_EPOCH + Duration::from_secs(mtime as u64);
    let file = std::fs::OpenOptions::new().write(true).open(path)?;
    file.set_modified(time)?;
    Ok(())
}

#[expect(clippy::cast_possible_wrap)]
fn epoch_secs(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn find_diff_tool(candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find(|tool| which::which(tool).is_ok())
        .map(|tool| (*tool).to_string())
}

/// Download the remote file into the session scratch directory and
/// return the local copy's path.
async fn materialize_remote(session: &Session, remote_path: &str) -> Result<std::path::PathBuf> {
    std::fs::create_dir_all(session.scratch_dir())?;
    let file_name = remote_path.rsplit('/').next().unwrap_or(remote_path);
    let scratch_copy = session.scratch_dir().join(file_name);
    download(session, remote_path, &scratch_copy, None).await?;
    Ok(scratch_copy)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============== Verdict Decisions ==============

    #[test]
    fn test_decide_local_newer() {
        assert_eq!(decide(200, 100), SyncVerdict::LocalNewer);
    }

    #[test]
    fn test_decide_remote_newer() {
        assert_eq!(decide(100, 200), SyncVerdict::RemoteNewer);
    }

    #[test]
    fn test_decide_equal_is_in_sync() {
        assert_eq!(decide(100, 100), SyncVerdict::InSync);
        assert_eq!(decide(0, 0), SyncVerdict::InSync);
    }

    #[test]
    fn test_decide_one_second_apart() {
        assert_eq!(decide(101, 100), SyncVerdict::LocalNewer);
        assert_eq!(decide(100, 101), SyncVerdict::RemoteNewer);
    }

    // ============== Local mtime Helpers ==============

    #[test]
    fn test_local_mtime_of_fresh_file_is_recent() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mtime = local_mtime(file.path()).unwrap();
        let now = epoch_secs(SystemTime::now());
        assert!((now - mtime).abs() < 60);
    }

    #[test]
    fn test_local_mtime_missing_file_is_error() {
        let err = local_mtime(Path::new("/no/such/file")).unwrap_err();
        assert!(matches!(err, CourierError::Io(_)));
    }

    #[test]
    fn test_set_local_mtime_roundtrip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        set_local_mtime(file.path(), 1_600_000_000).unwrap();
        assert_eq!(local_mtime(file.path()).unwrap(), 1_600_000_000);
    }

    #[test]
    fn test_epoch_secs_before_epoch_clamps_to_zero() {
        assert_eq!(epoch_secs(UNIX_EPOCH), 0);
    }

    // ============== Diff Tool Discovery ==============

    #[test]
    fn test_find_diff_tool_none_when_no_candidate_installed() {
        assert_eq!(
            find_diff_tool(&["definitely-not-an-installed-diff-tool"]),
            None
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_find_diff_tool_first_installed_candidate_wins() {
        let tool = find_diff_tool(&["definitely-not-an-installed-diff-tool", "sh"]);
        assert_eq!(tool, Some("sh".to_string()));
    }

    // ============== Comparison Struct ==============

    #[test]
    fn test_comparison_copy_and_debug() {
        let comparison = Comparison {
            verdict: SyncVerdict::InSync,
            local_mtime: 100,
            remote_mtime: 100,
        };
        let copied = comparison;
        assert_eq!(copied.verdict, SyncVerdict::InSync);

        let debug_str = format!("{comparison:?}");
        assert!(debug_str.contains("InSync"));
    }
}
