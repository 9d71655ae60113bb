//! Rolling per-entity series for the live graph.

use hashbrown::HashMap;
use tally_types::{GraphField, LiveColumn, NameDisplay};

use super::publisher::{PublishError, SnapshotHandler};
use super::snapshot::Snapshot;

#[derive(Debug, Clone)]
struct Series {
    label: String,
    points: Vec<f64>,
}

impl Series {
    fn latest(&self) -> f64 {
        self.points.last().copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct LiveGraph {
    field: GraphField,
    capacity: usize,
    name_display: NameDisplay,
    encounter_id: Option<u64>,
    /// Keyed by entity id; several NPCs often share one name.
    series: HashMap<String, Series>,
}

impl LiveGraph {
    pub fn new(field: GraphField, capacity: usize) -> Self {
        Self {
            field,
            capacity: capacity.max(1),
            name_display: NameDisplay::Name,
            encounter_id: None,
            series: HashMap::new(),
        }
    }

    /// Label series with player handles instead of character names.
    pub fn with_name_display(mut self, name_display: NameDisplay) -> Self {
        self.name_display = name_display;
        self
    }

    pub fn field(&self) -> GraphField {
        self.field
    }

    /// Switch the plotted metric. Existing points belong to the old metric and are dropped.
    pub fn set_field(&mut self, field: GraphField) {
        if field != self.field {
            self.field = field;
            self.series.clear();
        }
    }

    /// Append one point per entity from `snapshot`.
    pub fn push(&mut self, snapshot: &Snapshot) {
        if snapshot.encounter_id != self.encounter_id {
            self.series.clear();
            self.encounter_id = snapshot.encounter_id;
        }

        let column: LiveColumn = self.field.column();
        for series in self.series.values_mut() {
            series.points.push(0.0);
        }
        for row in &snapshot.rows {
            let value = row.number(column);
            match self.series.get_mut(row.id.as_str()) {
                Some(series) => {
                    if let Some(last) = series.points.last_mut() {
                        *last = value;
                    }
                }
                None => {
                    self.series.insert(
                        row.id.clone(),
                        Series {
                            label: row.label(self.name_display).to_string(),
                            points: vec![value],
                        },
                    );
                }
            }
        }

        for series in self.series.values_mut() {
            if series.points.len() > self.capacity {
                let excess = series.points.len() - self.capacity;
                series.points.drain(..excess);
            }
        }
    }

    /// All series as `(label, points)`, highest latest value first, ties by
    /// label and then entity id.
    pub fn series(&self) -> Vec<(&str, &[f64])> {
        let mut series: Vec<(&String, &Series)> = self.series.iter().collect();
        series.sort_by(|(a_id, a), (b_id, b)| {
            b.latest()
                .total_cmp(&a.latest())
                .then_with(|| a.label.cmp(&b.label))
                .then_with(|| a_id.cmp(b_id))
        });
        series
            .into_iter()
            .map(|(_, s)| (s.label.as_str(), s.points.as_slice()))
            .collect()
    }

    pub fn top(&self, n: usize) -> Vec<(&str, &[f64])> {
        let mut series = self.series();
        series.truncate(n);
        series
    }

    pub fn clear(&mut self) {
        self.series.clear();
        self.encounter_id = None;
    }
}

impl SnapshotHandler for LiveGraph {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), PublishError> {
        self.push(snapshot);
        Ok(())
    }
}
