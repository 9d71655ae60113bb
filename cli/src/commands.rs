use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tally_core::context::{AppConfig, AppConfigExt, newest_log, resolve_log_path};
use tally_core::{CopyOptions, GameSignal, LiveParserController, LiveSession, LiveSettings, copy_text};

use crate::render::{TerminalHandler, render_history};

pub type SharedController = Arc<Mutex<LiveParserController>>;

pub fn lock_controller(controller: &SharedController) -> std::sync::MutexGuard<'_, LiveParserController> {
    controller.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pick the log to follow: an explicit path, else the newest log in the
/// given (or configured) directory, else the configured log path.
pub fn resolve_live_path(
    config: &AppConfig,
    path: Option<&Path>,
    dir: Option<&Path>,
) -> Result<PathBuf, String> {
    if let Some(path) = path {
        return Ok(resolve_log_path(config, path));
    }
    let dir = dir.unwrap_or(config.log_directory.as_path());
    match newest_log(dir) {
        Ok(Some(newest)) => return Ok(newest),
        Ok(None) => {}
        Err(e) => tracing::warn!("Cannot read log directory {}: {}", dir.display(), e),
    }
    config
        .log_path
        .as_deref()
        .map(|p| resolve_log_path(config, p))
        .ok_or_else(|| format!("No combat log found in {}", dir.display()))
}

/// Start (or restart) live parsing of `path` with a terminal handler.
pub fn activate(controller: &SharedController, config: &AppConfig, path: &Path) -> Result<(), String> {
    let settings = LiveSettings::from(&config.live);
    let handler = TerminalHandler::new(&config.live);
    let mut controller = lock_controller(controller);
    let parser = controller
        .activate(path, settings, handler)
        .map_err(|e| e.to_string())?;
    parser.add_signal_handler(|signal: &GameSignal| {
        tracing::debug!("signal: {:?}", signal);
    });
    if parser.is_running() {
        println!("Live parsing {}", path.display());
    } else {
        println!("Live parser ready for {}, type `start` to begin", path.display());
    }
    Ok(())
}

pub fn set_running(controller: &SharedController, running: bool) -> Result<(), String> {
    let active = lock_controller(controller)
        .set_running(running)
        .map_err(|e| e.to_string())?;
    if !active {
        return Err("No live parser is active".to_string());
    }
    println!("{}", if running { "Live parser started" } else { "Live parser stopped" });
    Ok(())
}

pub fn copy_result(controller: &SharedController, config: &AppConfig) -> Result<(), String> {
    let controller = lock_controller(controller);
    let parser = controller.parser().ok_or("No live parser is active")?;
    println!("{}", copy_text(&parser.snapshot(), &CopyOptions::from(&config.live)));
    Ok(())
}

pub fn show_history(controller: &SharedController, config: &AppConfig) -> Result<(), String> {
    let controller = lock_controller(controller);
    let parser = controller.parser().ok_or("No live parser is active")?;
    print!("{}", render_history(&parser.history(), config.live.european_numbers));
    Ok(())
}

pub fn exit(controller: &SharedController) {
    lock_controller(controller).deactivate();
    println!("Exiting...");
}

/// Run a whole log through the aggregator and print its encounters.
pub fn parse_file(
    config: &AppConfig,
    path: &Path,
    seconds_between_combats: Option<u64>,
    json: bool,
) -> Result<(), String> {
    let path = resolve_log_path(config, path);
    let threshold = seconds_between_combats.unwrap_or(config.live.seconds_between_combats);
    let session = load_session(&path, Duration::from_secs(threshold))?;

    let history = session.history();
    if json {
        let out = serde_json::to_string_pretty(&history).map_err(|e| e.to_string())?;
        println!("{out}");
        return Ok(());
    }

    let counters = session.counters();
    println!(
        "{}: {} lines, {} parsed, {} skipped, {} ignored",
        path.display(),
        counters.lines,
        counters.parsed,
        counters.skipped,
        counters.ignored
    );
    print!("{}", render_history(&history, config.live.european_numbers));
    Ok(())
}

/// Read a whole log into a session and close its last combat.
pub fn load_session(path: &Path, threshold: Duration) -> Result<LiveSession, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut session = LiveSession::new(threshold);
    session.ingest_log(&bytes);
    session.end_combat();
    Ok(session)
}

pub fn show_settings(config: &AppConfig) -> Result<(), String> {
    match AppConfig::config_path() {
        Ok(path) => println!("Configuration file: {}", path.display()),
        Err(e) => println!("Configuration file unavailable: {e}"),
    }
    let text = serde_json::to_string_pretty(config).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}
