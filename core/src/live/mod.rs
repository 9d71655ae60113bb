//! Live parsing: a session fed from a tailed log, published as table snapshots.

pub mod controller;
pub mod graph;
pub mod publisher;
pub mod service;
pub mod session;
pub mod snapshot;
pub mod summary;

pub use controller::LiveParserController;
pub use graph::LiveGraph;
pub use publisher::{ChannelHandler, PublishError, SnapshotHandler, deliver};
pub use service::{LiveParser, LiveSettings};
pub use session::{LiveSession, ParseCounters};
pub use snapshot::{LiveRow, LiveValue, Snapshot, SnapshotOptions};
pub use summary::{CopyOptions, copy_text};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock ignoring poison: a panicking handler must not take the session down with it.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
