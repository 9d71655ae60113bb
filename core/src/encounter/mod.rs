//! Combat windows and per-entity statistics.

mod stats;
pub mod summary;

pub use stats::EntityStats;
pub use summary::{EncounterHistory, EncounterSummary, EntitySummary, create_encounter_summary};

use chrono::NaiveDateTime;
use hashbrown::HashMap;

use crate::combat_log::{EntityRef, EventKind, LogEntry};
use stats::seconds_between;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowState {
    #[default]
    Active,
    /// Terminal: stats are frozen until the next combat replaces the window.
    Ended,
}

/// One period of continuous combat activity.
#[derive(Debug, Clone)]
pub struct CombatWindow {
    pub id: u64,
    pub start: NaiveDateTime,
    pub last_activity: NaiveDateTime,
    pub state: WindowState,
    entities: HashMap<String, EntityStats>,
}

impl CombatWindow {
    pub fn new(id: u64, start: NaiveDateTime) -> Self {
        Self {
            id,
            start,
            last_activity: start,
            state: WindowState::Active,
            entities: HashMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == WindowState::Active
    }

    pub fn end(&mut self) {
        self.state = WindowState::Ended;
    }

    /// Active combat time: first to most recent qualifying event.
    pub fn elapsed_seconds(&self) -> f64 {
        seconds_between(self.start, self.last_activity)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityStats> {
        self.entities.values()
    }

    pub fn entity(&self, id: &str) -> Option<&EntityStats> {
        self.entities.get(id)
    }

    pub fn entity_by_name(&self, name: &str) -> Option<&EntityStats> {
        self.entities.values().find(|e| e.name == name)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn total_damage(&self) -> f64 {
        self.entities.values().map(|e| e.damage_dealt).sum()
    }

    pub fn total_healing(&self) -> f64 {
        self.entities.values().map(|e| e.healing_done).sum()
    }

    pub fn total_attacks_in(&self) -> u32 {
        self.entities.values().map(|e| e.attacks_in).sum()
    }

    /// Apply one qualifying event. `Other` events and ended windows are left untouched.
    pub fn accumulate(&mut self, entry: &LogEntry) {
        if !self.is_active() || !entry.event_kind.is_qualifying() {
            return;
        }

        let ts = entry.timestamp;
        let credited = entry.source.is_attributable();

        match entry.event_kind {
            EventKind::Damage => self.apply_damage(entry, credited),
            EventKind::Heal => {
                let amount = entry.amount();
                if credited {
                    self.entity_mut(&entry.source, ts).healing_done += amount;
                }
                self.entity_mut(&entry.target, ts).healing_received += amount;
            }
            EventKind::Kill | EventKind::Death => {
                // Killing blows carry the damage of the final hit.
                if entry.amount() > 0.0 {
                    self.apply_damage(entry, credited);
                }
                if credited {
                    self.entity_mut(&entry.source, ts).kills += 1;
                }
                self.entity_mut(&entry.target, ts).deaths += 1;
            }
            EventKind::Other => {}
        }

        if ts > self.last_activity {
            self.last_activity = ts;
        }
    }

    fn apply_damage(&mut self, entry: &LogEntry, credited: bool) {
        let ts = entry.timestamp;
        let amount = entry.amount();
        if credited {
            let owner = self.entity_mut(&entry.source, ts);
            owner.damage_dealt += amount;
            if !entry.is_miss() {
                owner.hits += 1;
                if entry.is_critical() {
                    owner.crits += 1;
                }
            }
        }
        let target = self.entity_mut(&entry.target, ts);
        target.damage_taken += amount;
        target.attacks_in += 1;
    }

    fn entity_mut(&mut self, entity: &EntityRef, timestamp: NaiveDateTime) -> &mut EntityStats {
        let stats = self
            .entities
            .entry(entity.id.clone())
            .or_insert_with(|| EntityStats::new(entity, timestamp));
        stats.touch(timestamp);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::parse_entry;

    const A: &str = "P[1@1 Alpha@alpha]";
    const B: &str = "C[2 Target_Drone]";

    fn line(time: &str, owner: (&str, &str), target: (&str, &str), kind: &str, flags: &str, mag: &str) -> LogEntry {
        parse_entry(&format!(
            "24:03:01:{time}::{},{},,*,{},{},Ability,Pn.A,{kind},{flags},{mag},{mag}",
            owner.0, owner.1, target.0, target.1
        ))
        .unwrap()
    }

    fn window_with(entries: &[LogEntry]) -> CombatWindow {
        let mut window = CombatWindow::new(0, entries[0].timestamp);
        for entry in entries {
            window.accumulate(entry);
        }
        window
    }

    #[test]
    fn damage_updates_both_sides() {
        let window = window_with(&[
            line("12:00:00", ("Alpha", A), ("Drone", B), "Phaser", "Critical", "100"),
            line("12:00:01", ("Alpha", A), ("Drone", B), "Phaser", "", "50"),
            line("12:00:02", ("Alpha", A), ("Drone", B), "Phaser", "Miss", "0"),
        ]);

        let a = window.entity(A).unwrap();
        assert_eq!(a.damage_dealt, 150.0);
        assert_eq!(a.hits, 2);
        assert_eq!(a.crits, 1);
        assert_eq!(a.crit_rate(), 0.5);
        assert_eq!(a.handle.as_deref(), Some("@alpha"));

        let b = window.entity(B).unwrap();
        assert_eq!(b.damage_taken, 150.0);
        assert_eq!(b.attacks_in, 3);
        assert_eq!(window.total_attacks_in(), 3);
        assert_eq!(window.elapsed_seconds(), 2.0);
    }

    #[test]
    fn self_heal_counts_as_done_and_received() {
        let window = window_with(&[line("12:00:00", ("Alpha", A), ("", "*"), "HitPoints", "", "-40")]);
        let a = window.entity(A).unwrap();
        assert_eq!(a.healing_done, 40.0);
        assert_eq!(a.healing_received, 40.0);
        assert_eq!(window.entity_count(), 1);
    }

    #[test]
    fn kills_and_environment_deaths() {
        let window = window_with(&[
            line("12:00:00", ("Alpha", A), ("Drone", B), "Phaser", "Kill", ""),
            line("12:00:03", ("", "*"), ("Alpha", A), "Plasma", "Kill", ""),
        ]);
        assert_eq!(window.entity(A).unwrap().kills, 1);
        assert_eq!(window.entity(A).unwrap().deaths, 1);
        assert_eq!(window.entity(B).unwrap().deaths, 1);
        assert!(window.entity("*").is_none());
    }

    #[test]
    fn killing_blow_counts_its_damage() {
        let window = window_with(&[line("12:00:00", ("Alpha", A), ("Drone", B), "Phaser", "Kill", "250")]);
        let a = window.entity(A).unwrap();
        assert_eq!(a.kills, 1);
        assert_eq!(a.damage_dealt, 250.0);
        assert_eq!(a.hits, 1);
        assert_eq!(window.entity(B).unwrap().deaths, 1);
        assert_eq!(window.entity(B).unwrap().damage_taken, 250.0);
    }

    #[test]
    fn environment_damage_only_touches_target() {
        let window = window_with(&[line("12:00:00", ("", "*"), ("Alpha", A), "Plasma", "", "75")]);
        assert_eq!(window.entity_count(), 1);
        assert_eq!(window.entity(A).unwrap().damage_taken, 75.0);
        assert_eq!(window.total_damage(), 0.0);
    }

    #[test]
    fn other_events_and_ended_windows_are_ignored() {
        let first = line("12:00:00", ("Alpha", A), ("Drone", B), "Phaser", "", "10");
        let other = line("12:00:05", ("Alpha", A), ("Drone", B), "Tractor", "", "n/a");
        let mut window = window_with(&[first.clone(), other]);
        assert_eq!(window.last_activity, first.timestamp);

        window.end();
        window.accumulate(&line("12:00:06", ("Alpha", A), ("Drone", B), "Phaser", "", "10"));
        assert_eq!(window.total_damage(), 10.0);
        assert!(!window.is_active());
    }

    #[test]
    fn per_entity_combat_time() {
        let window = window_with(&[
            line("12:00:00", ("Alpha", A), ("Drone", B), "Phaser", "", "10"),
            line("12:00:04.5", ("Alpha", A), ("Drone", B), "Phaser", "", "10"),
        ]);
        assert_eq!(window.entity(A).unwrap().combat_seconds(), 4.5);
        assert_eq!(window.entity_by_name("Drone").unwrap().id, B);
    }
}
