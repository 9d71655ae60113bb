use std::time::Duration;

use chrono::TimeDelta;

use super::combat_state::{
    DEFAULT_INACTIVITY_THRESHOLD, advance_combat_state, log_time_threshold, tick_combat_state,
};
use super::GameSignal;
use crate::combat_log::{EventKind, LogEntry};
use crate::state::SessionCache;

/// Routes parsed entries into the session cache.
#[derive(Debug, Clone)]
pub struct EventProcessor {
    inactivity_threshold: Duration,
    log_threshold: TimeDelta,
}

impl Default for EventProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INACTIVITY_THRESHOLD)
    }
}

impl EventProcessor {
    pub fn new(inactivity_threshold: Duration) -> Self {
        Self {
            inactivity_threshold,
            log_threshold: log_time_threshold(inactivity_threshold),
        }
    }

    pub fn inactivity_threshold(&self) -> Duration {
        self.inactivity_threshold
    }

    /// Process a single entry, returning the signals it produced.
    /// Non-qualifying entries are ignored.
    pub fn process_event(&self, entry: &LogEntry, cache: &mut SessionCache) -> Vec<GameSignal> {
        if !entry.event_kind.is_qualifying() {
            return Vec::new();
        }

        let mut signals = advance_combat_state(entry, cache, self.log_threshold);
        let Some(window) = cache.active_window_mut() else {
            return signals;
        };
        window.accumulate(entry);

        if matches!(entry.event_kind, EventKind::Kill | EventKind::Death) {
            signals.push(GameSignal::EntityKilled {
                timestamp: entry.timestamp,
                encounter_id: window.id,
                killer: entry
                    .source
                    .is_attributable()
                    .then(|| entry.source.name.clone()),
                victim: entry.target.name.clone(),
            });
        }
        signals
    }

    /// End the active window if ingestion has been idle for longer than the threshold.
    pub fn expire_idle(&self, cache: &mut SessionCache, idle_for: Duration) -> Vec<GameSignal> {
        tick_combat_state(cache, idle_for, self.inactivity_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::parse_entry;

    #[test]
    fn other_events_touch_nothing() {
        let processor = EventProcessor::default();
        let mut cache = SessionCache::new();
        let info = parse_entry(
            "24:03:01:12:00:00::Alpha,P[1@1 Alpha@alpha],,*,Drone,C[2 Drone],Scan,Pn.S,Sensor,,,",
        )
        .unwrap();
        assert!(processor.process_event(&info, &mut cache).is_empty());
        assert!(cache.current_window().is_none());
    }

    #[test]
    fn kill_emits_entity_killed() {
        let processor = EventProcessor::new(Duration::from_secs(30));
        let mut cache = SessionCache::new();
        let kill = parse_entry(
            "24:03:01:12:00:00::Alpha,P[1@1 Alpha@alpha],,*,Drone,C[2 Drone],Beam,Pn.B,Phaser,Kill,,",
        )
        .unwrap();

        let signals = processor.process_event(&kill, &mut cache);
        assert_eq!(signals.len(), 2);
        assert_eq!(
            signals[1],
            GameSignal::EntityKilled {
                timestamp: kill.timestamp,
                encounter_id: 0,
                killer: Some("Alpha".to_string()),
                victim: "Drone".to_string(),
            }
        );
        assert_eq!(cache.current_window().unwrap().entity_by_name("Drone").unwrap().deaths, 1);
    }

    #[test]
    fn expire_idle_uses_threshold() {
        let processor = EventProcessor::new(Duration::from_secs(10));
        let mut cache = SessionCache::new();
        let hit = parse_entry(
            "24:03:01:12:00:00::Alpha,P[1@1 Alpha@alpha],,*,Drone,C[2 Drone],Beam,Pn.B,Phaser,,5,5",
        )
        .unwrap();
        processor.process_event(&hit, &mut cache);

        assert!(processor.expire_idle(&mut cache, Duration::from_secs(5)).is_empty());
        assert_eq!(processor.expire_idle(&mut cache, Duration::from_secs(11)).len(), 1);
        assert!(!cache.current_window().unwrap().is_active());
    }
}
