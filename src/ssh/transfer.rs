//! Streaming file transfers.
//!
//! Uploads and downloads stream in fixed-size chunks so memory use is
//! bounded by the chunk size regardless of file size. Progress is
//! published through atomic counters on [`TransferTask`] and cancellation
//! is checked once per chunk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use russh_sftp::protocol::{FileAttributes, OpenFlags};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::error::{CourierError, Result};
use crate::ssh::session::Session;
use crate::ssh::sftp_error;

/// Transfer chunk size. Cancellation latency is at most one chunk.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upload => write!(f, "upload"),
            Self::Download => write!(f, "download"),
        }
    }
}

/// Shared state of one transfer.
///
/// Mutated by exactly one worker; read by at most one poller through
/// atomic loads, so no lock is needed around progress reads.
pub struct TransferTask {
    local_path: PathBuf,
    remote_path: String,
    direction: Direction,
    total: AtomicU64,
    total_known: AtomicBool,
    transferred: AtomicU64,
    cancelled: AtomicBool,
    completed: AtomicBool,
    succeeded: AtomicBool,
}

impl TransferTask {
    #[must_use]
    pub fn new(local_path: PathBuf, remote_path: String, direction: Direction) -> Self {
        Self {
            local_path,
            remote_path,
            direction,
            total: AtomicU64::new(0),
            total_known: AtomicBool::new(false),
            transferred: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            succeeded: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    #[must_use]
    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Request cooperative cancellation. Observed by the worker at chunk
    /// granularity; the destination file may be left partially written.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.succeeded.load(Ordering::Acquire)
    }

    /// Bytes transferred so far, and the total when known.
    #[must_use]
    pub fn progress(&self) -> (u64, Option<u64>) {
        let transferred = self.transferred.load(Ordering::Relaxed);
        let total = self
            .total_known
            .load(Ordering::Acquire)
            .then(|| self.total.load(Ordering::Relaxed));
        (transferred, total)
    }

    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.total_known.store(true, Ordering::Release);
    }

    fn add_transferred(&self, bytes: u64) {
        self.transferred.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn finish(&self, succeeded: bool) {
        self.succeeded.store(succeeded, Ordering::Release);
        self.completed.store(true, Ordering::Release);
    }
}

/// Upload a local file to the remote path, streaming in chunks.
///
/// # Errors
///
/// Fails fast with `NotConnected` on an inactive session; otherwise
/// returns `Io`, `Sftp`, or `Cancelled`.
pub async fn upload(
    session: &Session,
    local_path: &Path,
    remote_path: &str,
    task: Option<&TransferTask>,
) -> Result<()> {
    let sftp = session.sftp().await?;

    let mut local_file = File::open(local_path).await?;
    let metadata = local_file.metadata().await?;
    if let Some(task) = task {
        task.set_total(metadata.len());
    }

    let flags = OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE;
    let mut remote_file = sftp
        .open_with_flags_and_attributes(remote_path, flags, upload_attrs())
        .await
        .map_err(sftp_error)?;

    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        if let Some(task) = task
            && task.is_cancelled()
        {
            return Err(CourierError::Cancelled {
                remote_path: remote_path.to_string(),
            });
        }

        let n = local_file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }

        // write_all completes partial remote writes before the next read
        remote_file
            .write_all(&buffer[..n])
            .await
            .map_err(|e| CourierError::Sftp {
                reason: format!("Write error: {e}"),
            })?;

        if let Some(task) = task {
            task.add_transferred(n as u64);
        }
    }

    remote_file.flush().await.map_err(|e| CourierError::Sftp {
        reason: format!("Flush error: {e}"),
    })?;
    remote_file
        .shutdown()
        .await
        .map_err(|e| CourierError::Sftp {
            reason: format!("Close error: {e}"),
        })?;

    debug!(
        local = %local_path.display(),
        remote = %remote_path,
        bytes = metadata.len(),
        "Upload complete"
    );
    Ok(())
}

/// Attributes for newly created remote files: owner read/write only,
/// regardless of the local file's mode.
fn upload_attrs() -> FileAttributes {
    let mut attrs = FileAttributes::empty();
    attrs.permissions = Some(0o600);
    attrs
}

/// Download a remote file to the local path, streaming in chunks.
///
/// The total is seeded from the remote stat when the server reports a
/// size; a zero-byte read from the remote file is end of file.
///
/// # Errors
///
/// Fails fast with `NotConnected` on an inactive session; otherwise
/// returns `Io`, `Sftp`, or `Cancelled`.
pub async fn download(
    session: &Session,
    remote_path: &str,
    local_path: &Path,
    task: Option<&TransferTask>,
) -> Result<()> {
    let sftp = session.sftp().await?;

    if let Some(task) = task
        && let Ok(metadata) = sftp.metadata(remote_path).await
        && let Some(size) = metadata.size
    {
        task.set_total(size);
    }

    let mut remote_file = sftp.open(remote_path).await.map_err(sftp_error)?;
    let mut local_file = File::create(local_path).await?;

    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        if let Some(task) = task
            && task.is_cancelled()
        {
            return Err(CourierError::Cancelled {
                remote_path: remote_path.to_string(),
            });
        }

        let n = remote_file
            .read(&mut buffer)
            .await
            .map_err(|e| CourierError::Sftp {
                reason: format!("Read error: {e}"),
            })?;
        if n == 0 {
            break;
        }

        local_file.write_all(&buffer[..n]).await?;
        total += n as u64;

        if let Some(task) = task {
            task.add_transferred(n as u64);
        }
    }

    local_file.flush().await?;

    debug!(
        remote = %remote_path,
        local = %local_path.display(),
        bytes = total,
        "Download complete"
    );
    Ok(())
}
