use chrono::NaiveDateTime;
use serde::Serialize;

use crate::combat_log::EntityRef;

/// Running totals for one entity within a combat window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityStats {
    pub id: String,
    pub name: String,
    pub handle: Option<String>,
    pub is_player: bool,

    pub damage_dealt: f64,
    pub damage_taken: f64,
    pub healing_done: f64,
    pub healing_received: f64,
    pub kills: u32,
    pub deaths: u32,
    pub hits: u32,
    pub crits: u32,
    /// Attacks aimed at this entity, misses included.
    pub attacks_in: u32,

    pub first_event: NaiveDateTime,
    pub last_event: NaiveDateTime,
}

impl EntityStats {
    pub fn new(entity: &EntityRef, timestamp: NaiveDateTime) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            handle: entity.handle().map(str::to_string),
            is_player: entity.is_player(),
            damage_dealt: 0.0,
            damage_taken: 0.0,
            healing_done: 0.0,
            healing_received: 0.0,
            kills: 0,
            deaths: 0,
            hits: 0,
            crits: 0,
            attacks_in: 0,
            first_event: timestamp,
            last_event: timestamp,
        }
    }

    pub(crate) fn touch(&mut self, timestamp: NaiveDateTime) {
        if timestamp < self.first_event {
            self.first_event = timestamp;
        }
        if timestamp > self.last_event {
            self.last_event = timestamp;
        }
    }

    /// Time between this entity's first and last event.
    pub fn combat_seconds(&self) -> f64 {
        seconds_between(self.first_event, self.last_event)
    }

    pub fn crit_rate(&self) -> f64 {
        if self.hits == 0 {
            0.0
        } else {
            self.crits as f64 / self.hits as f64
        }
    }

    /// Handle for players, name otherwise.
    pub fn handle_or_name(&self) -> &str {
        self.handle.as_deref().unwrap_or(&self.name)
    }
}

pub(crate) fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let ms = end.signed_duration_since(start).num_milliseconds();
    (ms.max(0) as f64) / 1000.0
}
