//! Following the newest combat log in a log directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::LiveParserError;

/// Game logs are named like `Combatlog.log` or `Combatlog_2024-03-01.log`.
pub fn is_combat_log(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    name.starts_with("combatlog") && name.ends_with(".log")
}

/// Most recently modified combat log in `dir`, if any.
pub fn newest_log(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut newest: Option<(PathBuf, SystemTime)> = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !is_combat_log(&path) {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().is_none_or(|(_, time)| modified > *time) {
            newest = Some((path, modified));
        }
    }

    Ok(newest.map(|(path, _)| path))
}

#[derive(Debug)]
pub enum DirectoryEvent {
    NewFile(PathBuf),
    FileRemoved(PathBuf),
    Error(String),
}

/// Reports combat log files appearing in or disappearing from one directory.
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<DirectoryEvent>,
    dir: PathBuf,
}

impl DirectoryWatcher {
    pub fn new(dir: &Path) -> Result<Self, LiveParserError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    for event in classify(event) {
                        let _ = tx.send(event);
                    }
                }
                Err(e) => {
                    let _ = tx.send(DirectoryEvent::Error(e.to_string()));
                }
            }
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        tracing::info!("[WATCH] Watching {}", dir.display());
        Ok(Self {
            _watcher: watcher,
            rx,
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Wait for the next event. `None` once the watcher has shut down.
    pub async fn next_event(&mut self) -> Option<DirectoryEvent> {
        self.rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<DirectoryEvent> {
        self.rx.try_recv().ok()
    }
}

fn classify(event: Event) -> Vec<DirectoryEvent> {
    let make: fn(PathBuf) -> DirectoryEvent = match event.kind {
        EventKind::Create(_) => DirectoryEvent::NewFile,
        EventKind::Remove(_) => DirectoryEvent::FileRemoved,
        _ => return Vec::new(),
    };
    event
        .paths
        .into_iter()
        .filter(|p| is_combat_log(p))
        .map(make)
        .collect()
}
