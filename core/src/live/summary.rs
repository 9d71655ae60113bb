//! Clipboard text for the "copy result" action.

use tally_types::formatting::{format_compact, format_duration};
use tally_types::{LiveColumn, LiveParserConfig, NameDisplay};

use super::snapshot::Snapshot;

const PREFIX: &str = "Tally - Live";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOptions {
    pub name_display: NameDisplay,
    pub european: bool,
    /// Number of entries to include, all when `None`.
    pub limit: Option<usize>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            name_display: NameDisplay::Handle,
            european: false,
            limit: None,
        }
    }
}

impl From<&LiveParserConfig> for CopyOptions {
    fn from(config: &LiveParserConfig) -> Self {
        Self {
            name_display: config.name_display,
            european: config.european_numbers,
            limit: None,
        }
    }
}

/// One-line DPS ranking of a snapshot.
///
/// ```text
/// Tally - Live: 1:23 | DPS: 1. @alpha 12.34K | 2. @beta 9.87K
/// ```
pub fn copy_text(snapshot: &Snapshot, options: &CopyOptions) -> String {
    if snapshot.rows.is_empty() {
        return format!("{PREFIX}: no combat data");
    }

    let limit = options.limit.unwrap_or(usize::MAX);
    let ranking: Vec<String> = snapshot
        .rows
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, row)| {
            format!(
                "{}. {} {}",
                i + 1,
                row.label(options.name_display),
                format_compact(row.number(LiveColumn::Dps), options.european)
            )
        })
        .collect();

    format!(
        "{PREFIX}: {} | DPS: {}",
        format_duration(snapshot.elapsed_seconds),
        ranking.join(" | ")
    )
}
