use chrono::NaiveDateTime;

use crate::encounter::EncounterSummary;

/// Notable state changes derived from the event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum GameSignal {
    // Combat lifecycle
    CombatStarted {
        timestamp: NaiveDateTime,
        encounter_id: u64,
    },
    CombatEnded {
        /// Last qualifying event of the window.
        timestamp: NaiveDateTime,
        encounter_id: u64,
        summary: Option<EncounterSummary>,
    },

    // Entity state changes
    EntityKilled {
        timestamp: NaiveDateTime,
        encounter_id: u64,
        /// None when the environment did the killing.
        killer: Option<String>,
        victim: String,
    },
}

impl GameSignal {
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            GameSignal::CombatStarted { timestamp, .. }
            | GameSignal::CombatEnded { timestamp, .. }
            | GameSignal::EntityKilled { timestamp, .. } => *timestamp,
        }
    }

    pub fn encounter_id(&self) -> u64 {
        match self {
            GameSignal::CombatStarted { encounter_id, .. }
            | GameSignal::CombatEnded { encounter_id, .. }
            | GameSignal::EntityKilled { encounter_id, .. } => *encounter_id,
        }
    }
}
