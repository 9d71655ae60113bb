//! Shared types for Tally.
//!
//! Everything here is consumed by both the live parser core and whatever
//! front-end renders its output, so the table schema lives in this crate
//! rather than in `tally-core`.

pub mod formatting;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Live table schema
// ─────────────────────────────────────────────────────────────────────────────

/// Version of [`LIVE_TABLE_HEADER`]. Bumped whenever column order or arity changes.
pub const LIVE_TABLE_VERSION: u32 = 1;

/// Number of columns in a live table row.
pub const LIVE_COLUMN_COUNT: usize = 11;

/// Column names of the live table, in row order.
pub const LIVE_TABLE_HEADER: [&str; LIVE_COLUMN_COUNT] = [
    "Name",
    "Handle",
    "DPS",
    "Combat Time",
    "Damage",
    "Damage Taken",
    "Attacks-in Share",
    "HPS",
    "Healing",
    "Kills",
    "Deaths",
];

/// Typed index into a live table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveColumn {
    Name,
    Handle,
    Dps,
    CombatTime,
    Damage,
    DamageTaken,
    AttacksInShare,
    Hps,
    Healing,
    Kills,
    Deaths,
}

impl LiveColumn {
    /// All columns in header order.
    pub const ALL: [LiveColumn; LIVE_COLUMN_COUNT] = [
        LiveColumn::Name,
        LiveColumn::Handle,
        LiveColumn::Dps,
        LiveColumn::CombatTime,
        LiveColumn::Damage,
        LiveColumn::DamageTaken,
        LiveColumn::AttacksInShare,
        LiveColumn::Hps,
        LiveColumn::Healing,
        LiveColumn::Kills,
        LiveColumn::Deaths,
    ];

    /// Position of this column in a row.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn header(self) -> &'static str {
        LIVE_TABLE_HEADER[self as usize]
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Metrics that can be plotted in the live graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphField {
    #[default]
    Dps,
    DamageTaken,
    AttacksInShare,
    Hps,
}

impl GraphField {
    pub const ALL: [GraphField; 4] = [
        GraphField::Dps,
        GraphField::DamageTaken,
        GraphField::AttacksInShare,
        GraphField::Hps,
    ];

    /// Table column the graph reads its values from.
    pub const fn column(self) -> LiveColumn {
        match self {
            GraphField::Dps => LiveColumn::Dps,
            GraphField::DamageTaken => LiveColumn::DamageTaken,
            GraphField::AttacksInShare => LiveColumn::AttacksInShare,
            GraphField::Hps => LiveColumn::Hps,
        }
    }

    pub const fn label(self) -> &'static str {
        self.column().header()
    }
}

/// Which identity a player row is labelled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NameDisplay {
    Name,
    #[default]
    Handle,
}

// ─────────────────────────────────────────────────────────────────────────────
// Live parser configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub enabled: bool,
    pub field: GraphField,
    /// Points kept per series.
    pub points: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            field: GraphField::Dps,
            points: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveParserConfig {
    /// Gap between two events that splits them into separate combats.
    pub seconds_between_combats: u64,
    pub poll_interval_ms: u64,
    pub publish_interval_ms: u64,
    /// Hide NPC rows from the table.
    pub players_only: bool,
    /// Start tailing as soon as a log is activated. When off, the parser is
    /// created stopped and waits for an explicit start.
    pub auto_start: bool,
    pub name_display: NameDisplay,
    pub visible_columns: Vec<LiveColumn>,
    pub european_numbers: bool,
    pub graph: GraphConfig,
}

impl Default for LiveParserConfig {
    fn default() -> Self {
        Self {
            seconds_between_combats: 45,
            poll_interval_ms: 100,
            publish_interval_ms: 1000,
            players_only: false,
            auto_start: true,
            name_display: NameDisplay::Handle,
            visible_columns: LiveColumn::ALL.to_vec(),
            european_numbers: false,
            graph: GraphConfig::default(),
        }
    }
}

impl LiveParserConfig {
    /// Visible columns in header order, with duplicates removed.
    pub fn visible_columns_ordered(&self) -> Vec<LiveColumn> {
        LiveColumn::ALL
            .into_iter()
            .filter(|c| self.visible_columns.contains(c))
            .collect()
    }
}
