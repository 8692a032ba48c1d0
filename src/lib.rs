pub mod cli;
pub mod config;
pub mod error;
pub mod ssh;
pub mod sync;

pub use config::{ConnectionProfile, ConnectionState, Settings};
pub use error::{CourierError, Result};
pub use ssh::{
    ConnectionManager, Direction, EntryKind, RemoteEntry, Session, TransferOutcome,
    TransferScheduler, TransferTask,
};
pub use sync::{Comparison, SyncVerdict};
