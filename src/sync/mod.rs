//! Sync reconciliation between local files and their remote counterparts.

mod reconcile;

pub use reconcile::{Comparison, SyncVerdict, auto_sync, compare, decide};
