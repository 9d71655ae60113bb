use std::collections::BTreeSet;

use chrono::NaiveDateTime;

/// Well-known flag tags written by the game client.
pub mod flag {
    pub const CRITICAL: &str = "Critical";
    pub const FLANK: &str = "Flank";
    pub const KILL: &str = "Kill";
    pub const MISS: &str = "Miss";
    pub const SHIELD_BREAK: &str = "ShieldBreak";
}

/// Damage types that carry heals when their magnitude is negative.
const HEALABLE_TYPES: [&str; 2] = ["HitPoints", "Shield"];

/// An entity as referenced by a log line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// False for the environment (`*` or blank ids), which can deal damage
    /// but is never credited with it.
    pub fn is_attributable(&self) -> bool {
        !self.id.is_empty() && self.id != "*"
    }

    pub fn is_player(&self) -> bool {
        self.id.starts_with("P[")
    }

    /// Account handle of a player (`P[812@934 Kira@kira.handle]` → `@kira.handle`).
    pub fn handle(&self) -> Option<&str> {
        if !self.is_player() {
            return None;
        }
        let inner = self.id.strip_prefix("P[")?.strip_suffix(']')?;
        let space = inner.find(' ')?;
        let at = inner.rfind('@')?;
        (at > space).then(|| &inner[at..])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Damage,
    Heal,
    Kill,
    Death,
    Other,
}

impl EventKind {
    /// Derive the kind of an event from its raw fields.
    pub fn classify(
        owner: &EntityRef,
        damage_type: &str,
        flags: &EventFlags,
        magnitude: Option<f64>,
    ) -> Self {
        if flags.contains(flag::KILL) {
            return if owner.is_attributable() {
                EventKind::Kill
            } else {
                EventKind::Death
            };
        }
        match magnitude {
            Some(m) if m < 0.0 && HEALABLE_TYPES.contains(&damage_type) => EventKind::Heal,
            Some(m) if m > 0.0 => EventKind::Damage,
            _ if flags.contains(flag::MISS) => EventKind::Damage,
            _ => EventKind::Other,
        }
    }

    /// Events that feed statistics and keep a combat alive.
    pub fn is_qualifying(self) -> bool {
        !matches!(self, EventKind::Other)
    }
}

/// Set of flag tags on one event, kept sorted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventFlags(BTreeSet<String>);

impl EventFlags {
    /// Parse the `|`-separated flag field. Empty segments are dropped.
    pub fn from_field(field: &str) -> Self {
        Self(
            field
                .split('|')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn to_field(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join("|")
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn insert(&mut self, tag: impl Into<String>) {
        self.0.insert(tag.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// One parsed combat log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    /// Entity credited with the event.
    pub source: EntityRef,
    /// Pet or projectile that acted on behalf of `source`.
    pub via: Option<EntityRef>,
    pub target: EntityRef,
    pub event_name: String,
    pub event_id: String,
    pub damage_type: String,
    pub event_kind: EventKind,
    pub flags: EventFlags,
    pub magnitude: Option<f64>,
    pub base_magnitude: Option<f64>,
}

impl LogEntry {
    /// Absolute size of the event, zero when the magnitude is unknown.
    pub fn amount(&self) -> f64 {
        self.magnitude.map(f64::abs).unwrap_or(0.0)
    }

    pub fn is_critical(&self) -> bool {
        self.flags.contains(flag::CRITICAL)
    }

    pub fn is_miss(&self) -> bool {
        self.flags.contains(flag::MISS)
    }
}
