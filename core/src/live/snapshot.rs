//! Projection of a combat window into live table rows.

use std::cmp::Ordering;
use std::ops::Index;

use serde::Serialize;
use tally_types::formatting::{format_compact, format_duration, format_share};
use tally_types::{LIVE_COLUMN_COUNT, LiveColumn, NameDisplay};

use super::session::ParseCounters;
use crate::encounter::{CombatWindow, EntityStats};

/// One table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiveValue {
    Text(String),
    Number(f64),
    Count(u32),
}

impl LiveValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LiveValue::Number(n) => Some(*n),
            LiveValue::Count(c) => Some(f64::from(*c)),
            LiveValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            LiveValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One entity's row, values in [`LiveColumn`] order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveRow {
    /// Entity id from the log. Names are not unique, ids are.
    pub id: String,
    pub values: [LiveValue; LIVE_COLUMN_COUNT],
    pub is_player: bool,
}

impl Index<LiveColumn> for LiveRow {
    type Output = LiveValue;

    fn index(&self, column: LiveColumn) -> &LiveValue {
        &self.values[column.index()]
    }
}

impl LiveRow {
    fn from_stats(stats: &EntityStats, elapsed: f64, total_attacks_in: u32) -> Self {
        let rate = |total: f64| if elapsed > 0.0 { total / elapsed } else { 0.0 };
        let share = if total_attacks_in > 0 {
            f64::from(stats.attacks_in) / f64::from(total_attacks_in)
        } else {
            0.0
        };

        Self {
            id: stats.id.clone(),
            values: [
                LiveValue::Text(stats.name.clone()),
                LiveValue::Text(stats.handle.clone().unwrap_or_default()),
                LiveValue::Number(rate(stats.damage_dealt)),
                LiveValue::Number(stats.combat_seconds()),
                LiveValue::Number(stats.damage_dealt),
                LiveValue::Number(stats.damage_taken),
                LiveValue::Number(share),
                LiveValue::Number(rate(stats.healing_done)),
                LiveValue::Number(stats.healing_done),
                LiveValue::Count(stats.kills),
                LiveValue::Count(stats.deaths),
            ],
            is_player: stats.is_player,
        }
    }

    pub fn name(&self) -> &str {
        self[LiveColumn::Name].as_text().unwrap_or_default()
    }

    pub fn handle(&self) -> &str {
        self[LiveColumn::Handle].as_text().unwrap_or_default()
    }

    /// Label to show for this row. NPCs have no handle and always use the name.
    pub fn label(&self, display: NameDisplay) -> &str {
        match display {
            NameDisplay::Handle if !self.handle().is_empty() => self.handle(),
            _ => self.name(),
        }
    }

    /// Numeric value of a column, 0.0 for text columns.
    pub fn number(&self, column: LiveColumn) -> f64 {
        self[column].as_f64().unwrap_or(0.0)
    }

    /// Cell rendered for display.
    pub fn format_cell(&self, column: LiveColumn, european: bool) -> String {
        match (&self[column], column) {
            (LiveValue::Text(s), _) => s.clone(),
            (LiveValue::Count(c), _) => c.to_string(),
            (LiveValue::Number(n), LiveColumn::CombatTime) => format_duration(*n),
            (LiveValue::Number(n), LiveColumn::AttacksInShare) => format_share(*n, european),
            (LiveValue::Number(n), _) => format_compact(*n, european),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Drop NPC rows.
    pub players_only: bool,
}

/// Immutable view of the live table at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub encounter_id: Option<u64>,
    pub in_combat: bool,
    pub elapsed_seconds: f64,
    /// Ordered by DPS, highest first, then by name.
    pub rows: Vec<LiveRow>,
    pub counters: ParseCounters,
}

impl Snapshot {
    pub fn empty(counters: ParseCounters) -> Self {
        Self {
            encounter_id: None,
            in_combat: false,
            elapsed_seconds: 0.0,
            rows: Vec::new(),
            counters,
        }
    }

    pub fn build(
        window: Option<&CombatWindow>,
        counters: ParseCounters,
        options: &SnapshotOptions,
    ) -> Self {
        let Some(window) = window else {
            return Self::empty(counters);
        };

        let elapsed = window.elapsed_seconds();
        let total_attacks_in = window.total_attacks_in();
        let mut rows: Vec<LiveRow> = window
            .entities()
            .filter(|e| !options.players_only || e.is_player)
            .map(|e| LiveRow::from_stats(e, elapsed, total_attacks_in))
            .collect();
        rows.sort_by(compare_rows);

        Self {
            encounter_id: Some(window.id),
            in_combat: window.is_active(),
            elapsed_seconds: elapsed,
            rows,
            counters,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn compare_rows(a: &LiveRow, b: &LiveRow) -> Ordering {
    b.number(LiveColumn::Dps)
        .total_cmp(&a.number(LiveColumn::Dps))
        .then_with(|| a.name().cmp(b.name()))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::parse_entry;

    fn window(lines: &[&str]) -> CombatWindow {
        let entries: Vec<_> = lines.iter().map(|l| parse_entry(l).unwrap()).collect();
        let mut window = CombatWindow::new(3, entries[0].timestamp);
        for entry in &entries {
            window.accumulate(entry);
        }
        window
    }

    #[test]
    fn no_window_is_empty() {
        let snapshot = Snapshot::build(None, ParseCounters::default(), &SnapshotOptions::default());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.encounter_id, None);
        assert!(!snapshot.in_combat);
    }

    #[test]
    fn zero_elapsed_gives_zero_rates() {
        let window = window(&[
            "24:03:01:12:00:00::Alpha,P[1@1 Alpha@alpha],,*,Drone,C[2 Drone],Beam,Pn.B,Phaser,,100,100",
        ]);
        let snapshot = Snapshot::build(Some(&window), ParseCounters::default(), &SnapshotOptions::default());
        assert_eq!(snapshot.elapsed_seconds, 0.0);
        for row in &snapshot.rows {
            assert_eq!(row.number(LiveColumn::Dps), 0.0);
            assert_eq!(row.number(LiveColumn::Hps), 0.0);
        }
        assert_eq!(snapshot.rows[0].number(LiveColumn::Damage), 100.0);
    }

    #[test]
    fn rows_follow_column_schema() {
        let window = window(&[
            "24:03:01:12:00:00::Alpha,P[1@1 Alpha@alpha],,*,Drone,C[2 Drone],Beam,Pn.B,Phaser,Critical,100,100",
            "24:03:01:12:00:04::Drone,C[2 Drone],,*,Alpha,P[1@1 Alpha@alpha],Torp,Pn.T,Plasma,,60,60",
            "24:03:01:12:00:05::Drone,C[2 Drone],,*,Alpha,P[1@1 Alpha@alpha],Torp,Pn.T,Plasma,Miss,0,0",
            "24:03:01:12:00:10::Alpha,P[1@1 Alpha@alpha],,*,,*,Heal,Pn.H,HitPoints,,-50,-50",
        ]);
        let snapshot = Snapshot::build(Some(&window), ParseCounters::default(), &SnapshotOptions::default());
        assert_eq!(snapshot.elapsed_seconds, 10.0);
        assert!(snapshot.in_combat);

        let alpha = &snapshot.rows[0];
        assert_eq!(alpha.name(), "Alpha");
        assert_eq!(alpha.handle(), "@alpha");
        assert_eq!(alpha.number(LiveColumn::Dps), 10.0);
        assert_eq!(alpha.number(LiveColumn::CombatTime), 10.0);
        assert_eq!(alpha.number(LiveColumn::DamageTaken), 60.0);
        assert!((alpha.number(LiveColumn::AttacksInShare) - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(alpha.number(LiveColumn::Hps), 5.0);
        assert_eq!(alpha[LiveColumn::Kills], LiveValue::Count(0));
        assert_eq!(alpha.format_cell(LiveColumn::CombatTime, false), "0:10");
        assert_eq!(alpha.format_cell(LiveColumn::AttacksInShare, false), "66.7%");

        let drone = &snapshot.rows[1];
        assert_eq!(drone.label(NameDisplay::Handle), "Drone");
        assert_eq!(drone.number(LiveColumn::Dps), 6.0);
    }

    #[test]
    fn ties_order_by_name_and_npcs_can_be_hidden() {
        let window = window(&[
            "24:03:01:12:00:00::Zed,P[9@9 Zed@zed],,*,Drone,C[2 Drone],Beam,Pn.B,Phaser,,10,10",
            "24:03:01:12:00:02::Amy,P[8@8 Amy@amy],,*,Drone,C[2 Drone],Beam,Pn.B,Phaser,,10,10",
        ]);
        let all = Snapshot::build(Some(&window), ParseCounters::default(), &SnapshotOptions::default());
        let names: Vec<_> = all.rows.iter().map(LiveRow::name).collect();
        assert_eq!(names, vec!["Amy", "Zed", "Drone"]);
        assert_eq!(all.rows[0].id, "P[8@8 Amy@amy]");

        let players = Snapshot::build(
            Some(&window),
            ParseCounters::default(),
            &SnapshotOptions { players_only: true },
        );
        assert_eq!(players.rows.len(), 2);
        assert!(players.rows.iter().all(|r| r.is_player));
    }
}
