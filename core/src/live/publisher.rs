//! Periodic delivery of snapshots to a consumer.

use std::fmt::Display;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};

use super::session::LiveSession;
use super::snapshot::{LiveRow, Snapshot, SnapshotOptions};
use super::lock;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("snapshot handler failed: {0}")]
    Handler(String),

    #[error("snapshot channel is full")]
    ChannelFull,

    #[error("snapshot channel is closed")]
    ChannelClosed,

    #[error("snapshot handler panicked")]
    Panicked,
}

/// Consumer of published snapshots.
///
/// Closures taking `(rows, elapsed_seconds)` implement this directly:
///
/// ```
/// use tally_core::{LiveRow, SnapshotHandler};
///
/// fn takes_handler(_: impl SnapshotHandler) {}
///
/// takes_handler(|rows: &[LiveRow], elapsed: f64| {
///     println!("{} rows after {elapsed:.1}s", rows.len());
///     Ok::<(), std::io::Error>(())
/// });
/// ```
pub trait SnapshotHandler: Send {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), PublishError>;
}

impl<F, E> SnapshotHandler for F
where
    F: FnMut(&[LiveRow], f64) -> Result<(), E> + Send,
    E: Display,
{
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), PublishError> {
        self(&snapshot.rows, snapshot.elapsed_seconds).map_err(|e| PublishError::Handler(e.to_string()))
    }
}

/// Forwards snapshots over a bounded channel without ever blocking the publisher.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: mpsc::Sender<Snapshot>,
}

impl ChannelHandler {
    pub fn new(tx: mpsc::Sender<Snapshot>) -> Self {
        Self { tx }
    }

    /// Handler plus the receiving end of a channel holding up to `capacity` snapshots.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Snapshot>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl SnapshotHandler for ChannelHandler {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), PublishError> {
        self.tx.try_send(snapshot.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PublishError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => PublishError::ChannelClosed,
        })
    }
}

/// Hand a snapshot to `handler`, turning a panic into an error.
pub fn deliver(handler: &mut dyn SnapshotHandler, snapshot: &Snapshot) -> Result<(), PublishError> {
    catch_unwind(AssertUnwindSafe(|| handler.on_snapshot(snapshot)))
        .unwrap_or(Err(PublishError::Panicked))
}

/// Publish a snapshot every `period` until shutdown. The handler is handed
/// back so a restarted parser keeps delivering to it.
pub(crate) async fn run_publisher(
    session: Arc<Mutex<LiveSession>>,
    mut handler: Box<dyn SnapshotHandler>,
    period: Duration,
    options: SnapshotOptions,
    mut shutdown: watch::Receiver<bool>,
) -> Box<dyn SnapshotHandler> {
    let mut ticker = interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        if *shutdown.borrow() {
            break;
        }

        let (window, counters) = lock(&session).snapshot_parts();
        let snapshot = Snapshot::build(window.as_ref(), counters, &options);

        if let Err(e) = deliver(handler.as_mut(), &snapshot) {
            tracing::warn!("[PUBLISH] Snapshot not delivered: {}", e);
        }
    }

    tracing::debug!("[PUBLISH] Publisher stopped");
    handler
}
