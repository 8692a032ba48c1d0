//! Background transfer scheduling.
//!
//! Each transfer runs in its own spawned task. Workers on the same
//! session serialize on the session's transfer lock; workers on distinct
//! sessions run in parallel. Completion is delivered through an mpsc
//! channel that the controller drains on its own turn, so it never
//! blocks on a transfer.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

use crate::error::CourierError;
use crate::ssh::session::Session;
use crate::ssh::transfer::{self, Direction, TransferTask};

/// Terminal report for one transfer, delivered over the completion channel.
pub struct TransferOutcome {
    pub task: Arc<TransferTask>,
    /// `None` on success; the typed error otherwise. The task's
    /// transferred/total pair remains readable either way.
    pub error: Option<CourierError>,
}

pub struct TransferScheduler {
    tx: UnboundedSender<TransferOutcome>,
}

impl TransferScheduler {
    /// Create a scheduler and the completion channel receiver the
    /// controller drains.
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<TransferOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Launch a transfer in the background and return its task handle
    /// immediately. The caller polls the handle for progress and receives
    /// the terminal outcome on the completion channel.
    pub fn spawn_transfer(
        &self,
        session: Arc<Session>,
        direction: Direction,
        local_path: PathBuf,
        remote_path: String,
    ) -> Arc<TransferTask> {
        let task = Arc::new(TransferTask::new(
            local_path.clone(),
            remote_path.clone(),
            direction,
        ));

        let worker_task = Arc::clone(&task);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            // One worker drives I/O against a session at a time
            let guard = session.transfer_guard().await;

            let result = match direction {
                Direction::Upload => {
                    transfer::upload(&session, &local_path, &remote_path, Some(&worker_task)).await
                }
                Direction::Download => {
                    transfer::download(&session, &remote_path, &local_path, Some(&worker_task))
                        .await
                }
            };

            drop(guard);

            match &result {
                Ok(()) => {
                    let (transferred, _) = worker_task.progress();
                    info!(
                        profile = %session.profile_name(),
                        direction = %direction,
                        remote = %remote_path,
                        bytes = transferred,
                        "Transfer complete"
                    );
                }
                Err(e) if e.is_cancelled() => {
                    warn!(
                        profile = %session.profile_name(),
                        direction = %direction,
                        remote = %remote_path,
                        "Transfer cancelled"
                    );
                }
                Err(e) => {
                    error!(
                        profile = %session.profile_name(),
                        direction = %direction,
                        remote = %remote_path,
                        error = %e,
                        "Transfer failed"
                    );
                }
            }

            worker_task.finish(result.is_ok());

            // The receiver may be gone if the controller shut down first
            let _ = tx.send(TransferOutcome {
                task: worker_task,
                error: result.err(),
            });
        });

        task
    }
}
