//! Live combat-log parsing: tail a log the game is still writing, keep
//! per-entity statistics for the current combat and publish them as table
//! snapshots.

pub mod combat_log;
pub mod context;
pub mod encounter;
pub mod error;
pub mod live;
pub mod signal_processor;
pub mod state;

// Re-exports for convenience
pub use combat_log::{EntityRef, EventFlags, EventKind, LogEntry, LogTailer, ParseOutcome, TailRead};
pub use context::{AppConfig, AppConfigExt};
pub use encounter::{CombatWindow, EncounterSummary, EntityStats};
pub use error::{LiveParserError, MalformedLine};
pub use live::{
    ChannelHandler, CopyOptions, LiveGraph, LiveParser, LiveParserController, LiveRow, LiveSession,
    LiveSettings, LiveValue, ParseCounters, PublishError, Snapshot, SnapshotHandler, copy_text,
};
pub use signal_processor::{EventProcessor, GameSignal, SignalHandler};
pub use state::SessionCache;
pub use tally_types::{LIVE_TABLE_HEADER, LIVE_TABLE_VERSION, LiveColumn};
