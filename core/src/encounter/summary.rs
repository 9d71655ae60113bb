//! Archived records of finished combat windows.

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::CombatWindow;

/// Default number of summaries kept per session.
pub const HISTORY_CAPACITY: usize = 20;

/// Per-entity line of an [`EncounterSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub name: String,
    pub handle: Option<String>,
    pub is_player: bool,
    pub damage: f64,
    pub dps: f64,
    pub healing: f64,
    pub hps: f64,
    pub damage_taken: f64,
    pub kills: u32,
    pub deaths: u32,
}

/// Summary of a completed combat window with computed metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncounterSummary {
    pub encounter_id: u64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_seconds: f64,
    pub total_damage: f64,
    pub total_healing: f64,
    /// Sorted by damage dealt, highest first.
    pub entities: Vec<EntitySummary>,
}

impl EncounterSummary {
    /// Top damage dealer, if anyone dealt damage.
    pub fn top_damage(&self) -> Option<&EntitySummary> {
        self.entities.first().filter(|e| e.damage > 0.0)
    }
}

/// Bounded history of finished encounters, oldest first.
#[derive(Debug, Clone)]
pub struct EncounterHistory {
    summaries: VecDeque<EncounterSummary>,
    capacity: usize,
}

impl Default for EncounterHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl EncounterHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            summaries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn add(&mut self, summary: EncounterSummary) {
        if self.summaries.len() == self.capacity {
            self.summaries.pop_front();
        }
        self.summaries.push_back(summary);
    }

    pub fn summaries(&self) -> impl DoubleEndedIterator<Item = &EncounterSummary> + ExactSizeIterator {
        self.summaries.iter()
    }

    pub fn latest(&self) -> Option<&EncounterSummary> {
        self.summaries.back()
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn clear(&mut self) {
        self.summaries.clear();
    }
}

/// Build a summary from a window. Windows without any entity are not worth
/// keeping and yield `None`.
pub fn create_encounter_summary(window: &CombatWindow) -> Option<EncounterSummary> {
    if window.entity_count() == 0 {
        return None;
    }

    let duration = window.elapsed_seconds();
    let rate = |total: f64| if duration > 0.0 { total / duration } else { 0.0 };

    let mut entities: Vec<EntitySummary> = window
        .entities()
        .map(|e| EntitySummary {
            name: e.name.clone(),
            handle: e.handle.clone(),
            is_player: e.is_player,
            damage: e.damage_dealt,
            dps: rate(e.damage_dealt),
            healing: e.healing_done,
            hps: rate(e.healing_done),
            damage_taken: e.damage_taken,
            kills: e.kills,
            deaths: e.deaths,
        })
        .collect();
    entities.sort_by(|a, b| b.damage.total_cmp(&a.damage).then_with(|| a.name.cmp(&b.name)));

    Some(EncounterSummary {
        encounter_id: window.id,
        start: window.start,
        end: window.last_activity,
        duration_seconds: duration,
        total_damage: window.total_damage(),
        total_healing: window.total_healing(),
        entities,
    })
}
