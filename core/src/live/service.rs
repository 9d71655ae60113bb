//! The live parser: a tailing ingestion task and a publishing task sharing
//! one session.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tally_types::LiveParserConfig;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::lock;
use super::publisher::{PublishError, SnapshotHandler, run_publisher};
use super::session::LiveSession;
use super::snapshot::{LiveRow, Snapshot, SnapshotOptions};
use crate::combat_log::{LogTailer, TailRead};
use crate::encounter::EncounterSummary;
use crate::error::LiveParserError;
use crate::signal_processor::SignalHandler;

/// Upper bound for the retry delay after read errors.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSettings {
    pub poll_interval: Duration,
    pub inactivity_threshold: Duration,
    pub publish_interval: Duration,
    pub players_only: bool,
    pub auto_start: bool,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self::from(&LiveParserConfig::default())
    }
}

impl From<&LiveParserConfig> for LiveSettings {
    fn from(config: &LiveParserConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            inactivity_threshold: Duration::from_secs(config.seconds_between_combats),
            publish_interval: Duration::from_millis(config.publish_interval_ms),
            players_only: config.players_only,
            auto_start: config.auto_start,
        }
    }
}

impl LiveSettings {
    fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            players_only: self.players_only,
        }
    }
}

struct RunningTasks {
    runtime: Runtime,
    shutdown: watch::Sender<bool>,
    ingest: JoinHandle<()>,
    publisher: JoinHandle<Box<dyn SnapshotHandler>>,
}

/// Tails one combat log and publishes its live table.
///
/// `start` and `stop` may be called from any thread. Statistics survive a
/// stop/start cycle; lines appended while stopped are not read.
pub struct LiveParser {
    path: PathBuf,
    settings: LiveSettings,
    session: Arc<Mutex<LiveSession>>,
    /// Parked here while stopped, owned by the publisher task while running.
    handler: Mutex<Option<Box<dyn SnapshotHandler>>>,
    running: Mutex<Option<RunningTasks>>,
}

impl LiveParser {
    pub fn new(
        path: impl Into<PathBuf>,
        settings: LiveSettings,
        handler: impl SnapshotHandler + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            settings,
            session: Arc::new(Mutex::new(LiveSession::new(settings.inactivity_threshold))),
            handler: Mutex::new(Some(Box::new(handler))),
            running: Mutex::new(None),
        }
    }

    /// Create a parser and start it right away.
    pub fn spawn(
        path: impl Into<PathBuf>,
        settings: LiveSettings,
        handler: impl SnapshotHandler + 'static,
    ) -> Result<Self, LiveParserError> {
        let parser = Self::new(path, settings, handler);
        parser.start()?;
        Ok(parser)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &LiveSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        lock(&self.running).is_some()
    }

    /// Open the log at its current end and begin tailing and publishing.
    /// Does nothing if already running.
    pub fn start(&self) -> Result<(), LiveParserError> {
        let mut running = lock(&self.running);
        if running.is_some() {
            return Ok(());
        }

        let tailer = LogTailer::open(&self.path)?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("tally-live")
            .enable_all()
            .build()
            .map_err(LiveParserError::Runtime)?;

        let handler = lock(&self.handler).take().unwrap_or_else(|| {
            tracing::warn!("[LIVE] Snapshot handler was lost, publishing to nowhere");
            discard_handler()
        });

        let (shutdown, shutdown_rx) = watch::channel(false);
        let ingest = runtime.spawn(run_ingest(
            tailer,
            Arc::clone(&self.session),
            self.settings.poll_interval,
            shutdown_rx.clone(),
        ));
        let publisher = runtime.spawn(run_publisher(
            Arc::clone(&self.session),
            handler,
            self.settings.publish_interval,
            self.settings.snapshot_options(),
            shutdown_rx,
        ));

        tracing::info!("[LIVE] Started live parser on {}", self.path.display());
        *running = Some(RunningTasks {
            runtime,
            shutdown,
            ingest,
            publisher,
        });
        Ok(())
    }

    /// Stop both tasks and wait for them. No snapshot is delivered after this
    /// returns. Does nothing if already stopped.
    ///
    /// Must not be called from inside the snapshot handler.
    pub fn stop(&self) {
        let mut running = lock(&self.running);
        let Some(tasks) = running.take() else {
            return;
        };
        let RunningTasks {
            runtime,
            shutdown,
            ingest,
            publisher,
        } = tasks;

        let _ = shutdown.send(true);
        let join = async move {
            if let Err(e) = ingest.await {
                tracing::warn!("[LIVE] Ingestion task failed: {}", e);
            }
            publisher.await
        };

        // block_on panics on a thread that is already driving a runtime.
        let joined = if Handle::try_current().is_ok() {
            std::thread::scope(|s| s.spawn(|| runtime.block_on(join)).join())
                .unwrap_or_else(|_| {
                    tracing::warn!("[LIVE] Join thread panicked");
                    Ok(discard_handler())
                })
        } else {
            runtime.block_on(join)
        };

        match joined {
            Ok(handler) => *lock(&self.handler) = Some(handler),
            Err(e) => tracing::warn!("[LIVE] Publisher task failed: {}", e),
        }
        runtime.shutdown_background();
        tracing::info!("[LIVE] Stopped live parser on {}", self.path.display());
    }

    /// Register an observer of combat signals.
    pub fn add_signal_handler(&self, handler: impl SignalHandler + Send + 'static) {
        lock(&self.session).add_signal_handler(Box::new(handler));
    }

    /// Build a snapshot of the current state on demand.
    pub fn snapshot(&self) -> Snapshot {
        let (window, counters) = lock(&self.session).snapshot_parts();
        Snapshot::build(window.as_ref(), counters, &self.settings.snapshot_options())
    }

    /// Finished encounters, oldest first.
    pub fn history(&self) -> Vec<EncounterSummary> {
        lock(&self.session).history()
    }

    /// Shared session, for callers that feed or inspect it directly.
    pub fn session(&self) -> Arc<Mutex<LiveSession>> {
        Arc::clone(&self.session)
    }
}

impl Drop for LiveParser {
    fn drop(&mut self) {
        self.stop();
    }
}

fn discard_handler() -> Box<dyn SnapshotHandler> {
    Box::new(|_: &[LiveRow], _: f64| Ok::<(), PublishError>(()))
}

/// Poll the tailer and feed each complete line into the session until shutdown.
pub(crate) async fn run_ingest(
    mut tailer: LogTailer,
    session: Arc<Mutex<LiveSession>>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let poll_interval = poll_interval.max(Duration::from_millis(1));
    let mut backoff = poll_interval;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let delay = match tailer.poll().await {
            Ok(TailRead::Lines(lines)) => {
                backoff = poll_interval;
                // One lock per line keeps the publisher from waiting on a large batch.
                for line in &lines {
                    lock(&session).ingest_line(line);
                }
                continue;
            }
            Ok(TailRead::Empty) => {
                backoff = poll_interval;
                lock(&session).expire_idle(Instant::now());
                poll_interval
            }
            Err(e) => {
                tracing::warn!(
                    "[TAIL] Read of {} failed, retrying in {:?}: {}",
                    tailer.path().display(),
                    backoff,
                    e
                );
                let delay = backoff;
                backoff = (backoff * 2).min(MAX_BACKOFF);
                if let Err(e) = tailer.reopen() {
                    tracing::debug!("[TAIL] Reopen failed: {}", e);
                }
                delay
            }
        };

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!("[TAIL] Ingestion stopped at offset {}", tailer.offset());
}
