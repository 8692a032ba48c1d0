//! SSH/SFTP layer: connection lifecycle, transfers, scheduling, listing.

mod endpoint;
pub mod lister;
mod scheduler;
mod session;
pub mod transfer;

pub use lister::{EntryKind, RemoteEntry, is_visible, list};
pub use scheduler::{TransferOutcome, TransferScheduler};
pub use session::{ConnectionManager, Session};
pub use transfer::{CHUNK_SIZE, Direction, TransferTask, download, upload};

use crate::error::CourierError;

/// Convert an SFTP protocol error to a `CourierError`
#[expect(clippy::needless_pass_by_value)]
pub(crate) fn sftp_error(e: russh_sftp::client::error::Error) -> CourierError {
    CourierError::Sftp {
        reason: e.to_string(),
    }
}
