use std::path::{Path, PathBuf};

use tally_core::context::{AppConfig, DirectoryEvent, DirectoryWatcher, newest_log};
use tokio::task::JoinHandle;

use crate::commands::{self, SharedController, lock_controller};

/// Watch `dir` and switch live parsing to each new combat log that appears.
pub fn spawn_follow(
    dir: &Path,
    controller: SharedController,
    config: AppConfig,
) -> Option<JoinHandle<()>> {
    if !dir.is_dir() {
        println!("Warning: Log directory {} does not exist", dir.display());
        return None;
    }

    let mut watcher = match DirectoryWatcher::new(dir) {
        Ok(w) => w,
        Err(e) => {
            println!("Failed to start directory watcher: {}", e);
            return None;
        }
    };

    println!("Following new logs in {}", dir.display());

    let handle = tokio::spawn(async move {
        while let Some(event) = watcher.next_event().await {
            handle_watcher_event(event, watcher.dir(), &controller, &config);
        }
    });
    Some(handle)
}

fn handle_watcher_event(
    event: DirectoryEvent,
    dir: &Path,
    controller: &SharedController,
    config: &AppConfig,
) {
    match event {
        DirectoryEvent::NewFile(path) => {
            println!("New log file detected: {}", path.display());
            if let Err(e) = commands::activate(controller, config, &path) {
                println!("Error: {e}");
            }
        }

        DirectoryEvent::FileRemoved(path) => {
            if !is_active_file(controller, &path) {
                return;
            }
            lock_controller(controller).deactivate();

            match newest_log(dir) {
                Ok(Some(next)) => {
                    println!("Active file removed, switching to: {}", next.display());
                    if let Err(e) = commands::activate(controller, config, &next) {
                        println!("Error: {e}");
                    }
                }
                Ok(None) => println!("Active file removed, no other log to follow"),
                Err(e) => tracing::warn!("Cannot read log directory {}: {}", dir.display(), e),
            }
        }

        DirectoryEvent::Error(err) => {
            tracing::warn!("[WATCH] {}", err);
        }
    }
}

fn is_active_file(controller: &SharedController, path: &Path) -> bool {
    lock_controller(controller)
        .parser()
        .is_some_and(|parser| parser.path() == path)
}

/// Directory to follow: the one given, else the configured log directory.
pub fn follow_dir(config: &AppConfig, dir: Option<&Path>) -> PathBuf {
    dir.map(Path::to_path_buf)
        .unwrap_or_else(|| config.log_directory.clone())
}
