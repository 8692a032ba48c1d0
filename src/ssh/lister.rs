//! Remote directory listing and entry management.

use tracing::debug;

use crate::error::Result;
use crate::ssh::session::Session;
use crate::ssh::sftp_error;

/// Kind of a remote entry, classified by the directory bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry in a remote directory listing. Ephemeral per listing.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Modification time in seconds since the epoch, when reported
    pub mtime: Option<u32>,
}

/// Whether a listing entry is shown. `.` and `..` are always skipped;
/// other dot-prefixed names are hidden unless `show_hidden` is set.
#[must_use]
pub fn is_visible(name: &str, show_hidden: bool) -> bool {
    if name == "." || name == ".." {
        return false;
    }
    show_hidden || !name.starts_with('.')
}

/// List the entries of a remote directory in server-reported order.
///
/// # Errors
///
/// Returns `NotConnected` on an inactive session or `Sftp` when the
/// directory cannot be read.
pub async fn list(session: &Session, path: &str, show_hidden: bool) -> Result<Vec<RemoteEntry>> {
    let sftp = session.sftp().await?;
    let entries = sftp.read_dir(path).await.map_err(sftp_error)?;

    let mut result = Vec::new();
    for entry in entries {
        let name = entry.file_name();
        if !is_visible(&name, show_hidden) {
            continue;
        }

        let metadata = entry.metadata();
        let kind = if entry.file_type().is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        result.push(RemoteEntry {
            name,
            kind,
            size: metadata.size.unwrap_or(0),
            mtime: metadata.mtime,
        });
    }

    debug!(path = %path, count = result.len(), "Listed remote directory");
    Ok(result)
}

/// Create a remote directory.
///
/// # Errors
///
/// Returns `NotConnected` or `Sftp`.
pub async fn create_dir(session: &Session, path: &str) -> Result<()> {
    let sftp = session.sftp().await?;
    sftp.create_dir(path).await.map_err(sftp_error)
}

/// Remove a remote file.
///
/// # Errors
///
/// Returns `NotConnected` or `Sftp`.
pub async fn remove_file(session: &Session, path: &str) -> Result<()> {
    let sftp = session.sftp().await?;
    sftp.remove_file(path).await.map_err(sftp_error)
}

/// Remove an empty remote directory. Recursive deletion is intentionally
/// unsupported; the server rejects a non-empty directory.
///
/// # Errors
///
/// Returns `NotConnected` or `Sftp`.
pub async fn remove_dir(session: &Session, path: &str) -> Result<()> {
    let sftp = session.sftp().await?;
    sftp.remove_dir(path).await.map_err(sftp_error)
}
