//! Aggregation state shared between the ingestion and publishing tasks.

use std::time::{Duration, Instant};

use serde::Serialize;

use super::snapshot::{Snapshot, SnapshotOptions};
use crate::combat_log::{LogEntry, ParseOutcome, decode_log, parse_line};
use crate::encounter::{CombatWindow, EncounterSummary};
use crate::signal_processor::{EventProcessor, GameSignal, SignalHandler};
use crate::state::SessionCache;

/// Line accounting since the session was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseCounters {
    /// Complete lines read, blank ones included.
    pub lines: u64,
    /// Lines that parsed into an entry.
    pub parsed: u64,
    /// Malformed lines.
    pub skipped: u64,
    /// Parsed entries that do not feed statistics.
    pub ignored: u64,
}

/// Cache, processor and counters behind one lock, so a reader never sees a
/// half-applied event.
pub struct LiveSession {
    cache: SessionCache,
    processor: EventProcessor,
    counters: ParseCounters,
    signal_handlers: Vec<Box<dyn SignalHandler + Send>>,
    /// Wall-clock time of the last qualifying event.
    last_activity: Option<Instant>,
}

impl LiveSession {
    pub fn new(inactivity_threshold: Duration) -> Self {
        Self {
            cache: SessionCache::new(),
            processor: EventProcessor::new(inactivity_threshold),
            counters: ParseCounters::default(),
            signal_handlers: Vec::new(),
            last_activity: None,
        }
    }

    /// Register a signal handler to receive game signals
    pub fn add_signal_handler(&mut self, handler: Box<dyn SignalHandler + Send>) {
        self.signal_handlers.push(handler);
    }

    /// Feed one raw line (with its newline) read from the log.
    pub fn ingest_line(&mut self, raw: &str) -> Vec<GameSignal> {
        match parse_line(raw) {
            ParseOutcome::Entry(entry) => {
                self.counters.lines += 1;
                self.counters.parsed += 1;
                self.ingest(&entry)
            }
            ParseOutcome::Blank => {
                self.counters.lines += 1;
                Vec::new()
            }
            ParseOutcome::Malformed(reason) => {
                self.counters.lines += 1;
                self.counters.skipped += 1;
                tracing::debug!("[PARSE] Skipping line: {}", reason);
                Vec::new()
            }
            ParseOutcome::Incomplete => Vec::new(),
        }
    }

    /// Feed a whole log read from disk. Decoding matches the live tailer, and
    /// a final line without its newline is still applied.
    pub fn ingest_log(&mut self, bytes: &[u8]) {
        let text = decode_log(bytes);
        for line in text.split_inclusive('\n') {
            if line.ends_with('\n') {
                self.ingest_line(line);
            } else {
                self.ingest_line(&format!("{line}\n"));
            }
        }
    }

    /// Apply a parsed entry and dispatch the signals it produced.
    pub fn ingest(&mut self, entry: &LogEntry) -> Vec<GameSignal> {
        if !entry.event_kind.is_qualifying() {
            self.counters.ignored += 1;
            return Vec::new();
        }
        self.last_activity = Some(Instant::now());
        let signals = self.processor.process_event(entry, &mut self.cache);
        self.dispatch_signals(&signals);
        signals
    }

    /// End the active window if no qualifying event arrived for longer than
    /// the inactivity threshold, measured on the wall clock.
    pub fn expire_idle(&mut self, now: Instant) -> Vec<GameSignal> {
        let Some(last) = self.last_activity else {
            return Vec::new();
        };
        let idle_for = now.saturating_duration_since(last);
        let signals = self.processor.expire_idle(&mut self.cache, idle_for);
        self.dispatch_signals(&signals);
        signals
    }

    /// End the active window now, regardless of activity.
    pub fn end_combat(&mut self) -> Vec<GameSignal> {
        let signals = self.processor.expire_idle(&mut self.cache, Duration::MAX);
        self.dispatch_signals(&signals);
        signals
    }

    fn dispatch_signals(&mut self, signals: &[GameSignal]) {
        if signals.is_empty() {
            return;
        }
        for handler in &mut self.signal_handlers {
            handler.handle_signals(signals);
        }
    }

    pub fn current_window(&self) -> Option<&CombatWindow> {
        self.cache.current_window()
    }

    pub fn counters(&self) -> ParseCounters {
        self.counters
    }

    pub fn inactivity_threshold(&self) -> Duration {
        self.processor.inactivity_threshold()
    }

    /// Archived summaries, oldest first.
    pub fn history(&self) -> Vec<EncounterSummary> {
        self.cache.encounter_history.summaries().cloned().collect()
    }

    /// Copy of what a snapshot needs, so the projection can run after the
    /// lock is released.
    pub fn snapshot_parts(&self) -> (Option<CombatWindow>, ParseCounters) {
        (self.cache.current_window().cloned(), self.counters)
    }

    pub fn snapshot(&self, options: &SnapshotOptions) -> Snapshot {
        Snapshot::build(self.cache.current_window(), self.counters, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const HIT: &str =
        "24:03:01:12:00:00::Alpha,P[1@1 Alpha@alpha],,*,Drone,C[2 Drone],Beam,Pn.B,Phaser,,100,100\n";

    #[test]
    fn counters_track_each_outcome() {
        let mut session = LiveSession::new(Duration::from_secs(45));
        session.ingest_line(HIT);
        session.ingest_line("\n");
        session.ingest_line("garbage without separator\n");
        session.ingest_line(
            "24:03:01:12:00:01::Alpha,P[1@1 Alpha@alpha],,*,,*,Scan,Pn.S,Sensor,,,\n",
        );
        session.ingest_line("24:03:01:12:00:02::partial");

        assert_eq!(
            session.counters(),
            ParseCounters {
                lines: 4,
                parsed: 2,
                skipped: 1,
                ignored: 1,
            }
        );
        assert_eq!(session.current_window().unwrap().total_damage(), 100.0);
    }

    #[test]
    fn signal_handlers_see_combat_lifecycle() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut session = LiveSession::new(Duration::from_secs(10));
        session.add_signal_handler(Box::new(move |signal: &GameSignal| {
            sink.lock().unwrap().push(signal.encounter_id());
        }));

        session.ingest_line(HIT);
        session.ingest_line(
            "24:03:01:12:01:00::Alpha,P[1@1 Alpha@alpha],,*,Drone,C[2 Drone],Beam,Pn.B,Phaser,,100,100\n",
        );
        // started 0, ended 0, started 1
        assert_eq!(*seen.lock().unwrap(), vec![0, 0, 1]);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn idle_expiry_freezes_window() {
        let mut session = LiveSession::new(Duration::from_secs(10));
        assert!(session.expire_idle(Instant::now()).is_empty());

        session.ingest_line(HIT);
        assert!(session.expire_idle(Instant::now()).is_empty());

        let later = Instant::now() + Duration::from_secs(11);
        assert_eq!(session.expire_idle(later).len(), 1);

        let snapshot = session.snapshot(&SnapshotOptions::default());
        assert!(!snapshot.in_combat);
        assert_eq!(snapshot.rows.len(), 2);
    }

    #[test]
    fn end_combat_archives_window() {
        let mut session = LiveSession::new(Duration::from_secs(3600));
        session.ingest_line(HIT);
        assert_eq!(session.end_combat().len(), 1);
        assert!(session.end_combat().is_empty());
        assert_eq!(session.history()[0].total_damage, 100.0);
    }

    #[test]
    fn whole_log_with_byte_order_mark() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(HIT.as_bytes());
        bytes.extend_from_slice(HIT.trim_end().as_bytes());

        let mut session = LiveSession::new(Duration::from_secs(45));
        session.ingest_log(&bytes);
        assert_eq!(session.counters().parsed, 2);
        assert_eq!(session.counters().skipped, 0);
        assert_eq!(session.current_window().unwrap().total_damage(), 200.0);
    }
}
