//! Combat boundary detection.
//!
//! A window stays active while qualifying events keep arriving. It ends when
//! the next event is more than the inactivity threshold after the window's
//! last activity, or when the wall clock shows the log has gone quiet for
//! longer than the threshold (see [`tick_combat_state`]).

use std::time::Duration;

use chrono::TimeDelta;

use crate::combat_log::LogEntry;
use crate::state::SessionCache;

use super::GameSignal;

/// Default gap between events that separates two combats.
pub const DEFAULT_INACTIVITY_THRESHOLD: Duration = Duration::from_secs(45);

/// Convert a threshold into log-time units, saturating on overflow.
pub(crate) fn log_time_threshold(threshold: Duration) -> TimeDelta {
    TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX)
}

/// Decide whether `entry` belongs to the current window, rolling over to a new
/// one if it does not. Emits CombatEnded/CombatStarted as needed.
///
/// Only call this for qualifying events.
pub fn advance_combat_state(
    entry: &LogEntry,
    cache: &mut SessionCache,
    threshold: TimeDelta,
) -> Vec<GameSignal> {
    let mut signals = Vec::new();
    let timestamp = entry.timestamp;

    let needs_new_window = match cache.current_window() {
        None => true,
        Some(window) if !window.is_active() => true,
        // Strictly greater: a gap equal to the threshold keeps the window.
        // Out-of-order timestamps give a negative gap and never split.
        Some(window) => timestamp.signed_duration_since(window.last_activity) > threshold,
    };
    if !needs_new_window {
        return signals;
    }

    if let Some(ended) = end_active_window(cache) {
        signals.push(ended);
    }

    let encounter_id = cache.start_new_window(timestamp);
    tracing::info!("[COMBAT-STATE] Combat {} started at {}", encounter_id, timestamp);
    signals.push(GameSignal::CombatStarted {
        timestamp,
        encounter_id,
    });
    signals
}

/// Wall-clock fallback: end the active window when nothing qualifying has
/// been ingested for longer than `threshold`.
pub fn tick_combat_state(
    cache: &mut SessionCache,
    idle_for: Duration,
    threshold: Duration,
) -> Vec<GameSignal> {
    if idle_for <= threshold {
        return Vec::new();
    }
    end_active_window(cache).into_iter().collect()
}

fn end_active_window(cache: &mut SessionCache) -> Option<GameSignal> {
    let window = cache.current_window()?;
    let encounter_id = window.id;
    let timestamp = window.last_activity;

    if !cache.finalize_current() {
        return None;
    }
    tracing::info!(
        "[COMBAT-STATE] Ending combat {} at {} (last activity)",
        encounter_id,
        timestamp
    );

    let summary = cache
        .encounter_history
        .latest()
        .filter(|s| s.encounter_id == encounter_id)
        .cloned();
    Some(GameSignal::CombatEnded {
        timestamp,
        encounter_id,
        summary,
    })
}
