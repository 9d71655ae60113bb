use chrono::NaiveDateTime;

use crate::encounter::summary::{EncounterHistory, create_encounter_summary};
use crate::encounter::CombatWindow;

/// Pure storage for session state.
/// Routing logic lives in EventProcessor.
#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    /// Window shown in snapshots: active, or frozen until the next combat.
    current: Option<CombatWindow>,
    /// Most recently archived window.
    previous: Option<CombatWindow>,
    next_encounter_id: u64,

    // Finished windows for this session
    pub encounter_history: EncounterHistory,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            encounter_history: EncounterHistory::with_capacity(capacity),
            ..Self::default()
        }
    }

    // --- Window Management ---

    /// Archive the current window (ending it if still active) and open a
    /// fresh one starting at `start`. Returns the new window's id.
    pub fn start_new_window(&mut self, start: NaiveDateTime) -> u64 {
        self.finalize_current();

        let id = self.next_encounter_id;
        self.next_encounter_id += 1;
        tracing::info!("[ENCOUNTER] Creating new combat window ID={} at {}", id, start);

        if let Some(old) = self.current.replace(CombatWindow::new(id, start)) {
            self.previous = Some(old);
        }
        id
    }

    /// End the current window and record its summary. The window itself stays
    /// in place (frozen) until the next one replaces it. Returns true if a
    /// window was ended by this call.
    pub fn finalize_current(&mut self) -> bool {
        let Some(window) = self.current.as_mut() else {
            return false;
        };
        if !window.is_active() {
            return false;
        }
        window.end();

        if let Some(summary) = create_encounter_summary(window) {
            self.encounter_history.add(summary);
        }
        true
    }

    // --- Accessors ---

    pub fn current_window(&self) -> Option<&CombatWindow> {
        self.current.as_ref()
    }

    pub fn current_window_mut(&mut self) -> Option<&mut CombatWindow> {
        self.current.as_mut()
    }

    /// The current window if it is still accepting events.
    pub fn active_window_mut(&mut self) -> Option<&mut CombatWindow> {
        self.current.as_mut().filter(|w| w.is_active())
    }

    pub fn previous_window(&self) -> Option<&CombatWindow> {
        self.previous.as_ref()
    }

    pub fn next_encounter_id(&self) -> u64 {
        self.next_encounter_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::parse_entry;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn starts_without_window() {
        let mut cache = SessionCache::new();
        assert!(cache.current_window().is_none());
        assert!(!cache.finalize_current());
        assert_eq!(cache.encounter_history.len(), 0);
    }

    #[test]
    fn new_window_archives_previous() {
        let mut cache = SessionCache::new();
        assert_eq!(cache.start_new_window(ts("2024-03-01 12:00:00")), 0);

        let hit = parse_entry(
            "24:03:01:12:00:01::Alpha,P[1@1 Alpha@alpha],,*,Drone,C[2 Drone],Beam,Pn.B,Phaser,,10,10",
        )
        .unwrap();
        cache.current_window_mut().unwrap().accumulate(&hit);

        assert_eq!(cache.start_new_window(ts("2024-03-01 12:05:00")), 1);
        assert_eq!(cache.current_window().unwrap().id, 1);
        assert!(cache.current_window().unwrap().is_active());

        let previous = cache.previous_window().unwrap();
        assert_eq!(previous.id, 0);
        assert!(!previous.is_active());
        assert_eq!(cache.encounter_history.latest().unwrap().total_damage, 10.0);
        assert_eq!(cache.next_encounter_id(), 2);
    }

    #[test]
    fn finalize_is_idempotent_and_freezes_window() {
        let mut cache = SessionCache::new();
        cache.start_new_window(ts("2024-03-01 12:00:00"));
        let hit = parse_entry(
            "24:03:01:12:00:00::Alpha,P[1@1 Alpha@alpha],,*,Drone,C[2 Drone],Beam,Pn.B,Phaser,,10,10",
        )
        .unwrap();
        cache.current_window_mut().unwrap().accumulate(&hit);

        assert!(cache.finalize_current());
        assert!(!cache.finalize_current());
        assert_eq!(cache.encounter_history.len(), 1);
        assert!(cache.current_window().is_some());
        assert!(cache.active_window_mut().is_none());
    }
}
