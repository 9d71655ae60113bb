//! Plain-text rendering of live tables, graphs and encounter history.

use std::io::Write;

use tally_core::live::graph::LiveGraph;
use tally_core::{EncounterSummary, LiveColumn, PublishError, Snapshot, SnapshotHandler};
use tally_types::formatting::{format_compact, format_duration};
use tally_types::{LiveParserConfig, NameDisplay};

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const GRAPH_SERIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStyle {
    pub columns: Vec<LiveColumn>,
    pub name_display: NameDisplay,
    pub european: bool,
}

impl From<&LiveParserConfig> for TableStyle {
    fn from(config: &LiveParserConfig) -> Self {
        Self {
            columns: config.visible_columns_ordered(),
            name_display: config.name_display,
            european: config.european_numbers,
        }
    }
}

/// Render the visible columns of a snapshot as an aligned table.
pub fn render_table(snapshot: &Snapshot, style: &TableStyle) -> String {
    let status = match (snapshot.encounter_id, snapshot.in_combat) {
        (None, _) => "waiting for combat".to_string(),
        (Some(id), true) => format!("combat #{id} {}", format_duration(snapshot.elapsed_seconds)),
        (Some(id), false) => format!("combat #{id} ended after {}", format_duration(snapshot.elapsed_seconds)),
    };

    let header: Vec<String> = style.columns.iter().map(|c| c.header().to_string()).collect();
    let cells: Vec<Vec<String>> = snapshot
        .rows
        .iter()
        .map(|row| {
            style
                .columns
                .iter()
                .map(|&column| match column {
                    LiveColumn::Name => row.label(style.name_display).to_string(),
                    _ => row.format_cell(column, style.european),
                })
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |values: &[String]| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{v:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = format!("-- {status} ({} lines, {} skipped) --\n", snapshot.counters.lines, snapshot.counters.skipped);
    out.push_str(&line(&header));
    out.push('\n');
    for row in &cells {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

/// One sparkline per series, scaled to the largest value shown.
pub fn render_graph(graph: &LiveGraph, limit: usize) -> String {
    let series = graph.top(limit);
    let max = series
        .iter()
        .flat_map(|(_, points)| points.iter().copied())
        .fold(0.0_f64, f64::max);
    let name_width = series.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0);

    let mut out = format!("{}:\n", graph.field().label());
    for (name, points) in series {
        let spark: String = points
            .iter()
            .map(|&v| {
                if max <= 0.0 {
                    SPARKS[0]
                } else {
                    let idx = ((v / max) * (SPARKS.len() - 1) as f64).round() as usize;
                    SPARKS[idx.min(SPARKS.len() - 1)]
                }
            })
            .collect();
        out.push_str(&format!("{name:<name_width$} {spark}\n"));
    }
    out
}

/// Finished encounters, one per line.
pub fn render_history(history: &[EncounterSummary], european: bool) -> String {
    if history.is_empty() {
        return "No finished combats\n".to_string();
    }
    let mut out = String::new();
    for summary in history {
        let top = summary
            .top_damage()
            .map(|e| format!("{} {}", e.name, format_compact(e.dps, european)))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "#{:<3} {} {:>6}  damage {:>8}  healing {:>8}  top {}\n",
            summary.encounter_id,
            summary.start.format("%H:%M:%S"),
            format_duration(summary.duration_seconds),
            format_compact(summary.total_damage, european),
            format_compact(summary.total_healing, european),
            top
        ));
    }
    out
}

/// Prints every snapshot to stdout, optionally followed by the live graph.
pub struct TerminalHandler {
    style: TableStyle,
    graph: Option<LiveGraph>,
}

impl TerminalHandler {
    pub fn new(config: &LiveParserConfig) -> Self {
        let graph = config
            .graph
            .enabled
            .then(|| LiveGraph::new(config.graph.field, config.graph.points).with_name_display(config.name_display));
        Self {
            style: TableStyle::from(config),
            graph,
        }
    }
}

impl SnapshotHandler for TerminalHandler {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), PublishError> {
        let mut text = render_table(snapshot, &self.style);
        if let Some(graph) = &mut self.graph {
            graph.push(snapshot);
            text.push_str(&render_graph(graph, GRAPH_SERIES));
        }
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(text.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| PublishError::Handler(e.to_string()))
    }
}
