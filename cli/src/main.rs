use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use tally_cli::commands::{self, SharedController};
use tally_cli::{dir_watcher, logging, readline};
use tally_core::LiveParserController;
use tally_core::context::{AppConfig, AppConfigExt};

#[derive(Parser)]
#[command(version, about = "Live combat log parser")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail a combat log and print the live table.
    Live {
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Directory to pick the newest log from.
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Switch to new logs as they appear in the directory.
        #[arg(short, long)]
        follow: bool,
    },
    /// Parse a whole log and print its encounters.
    Parse {
        path: PathBuf,
        #[arg(short, long)]
        seconds_between_combats: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    Config,
}

/// Commands accepted at the prompt while live parsing.
#[derive(Parser)]
#[command(no_binary_name = true)]
enum ReplCommand {
    Start,
    Stop,
    Copy,
    History,
    #[command(alias = "exit")]
    Quit,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let _guard = logging::init_logging();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });

    match Cli::parse().command {
        Commands::Live { path, dir, follow } => live(config, path, dir, follow).await,
        Commands::Parse {
            path,
            seconds_between_combats,
            json,
        } => commands::parse_file(&config, &path, seconds_between_combats, json),
        Commands::Config => commands::show_settings(&config),
    }
}

async fn live(
    config: AppConfig,
    path: Option<PathBuf>,
    dir: Option<PathBuf>,
    follow: bool,
) -> Result<(), String> {
    let controller: SharedController = Arc::new(Mutex::new(LiveParserController::new()));

    let log = commands::resolve_live_path(&config, path.as_deref(), dir.as_deref())?;
    commands::activate(&controller, &config, &log)?;

    let watcher = if follow {
        let dir = dir_watcher::follow_dir(&config, dir.as_deref());
        dir_watcher::spawn_follow(&dir, Arc::clone(&controller), config.clone())
    } else {
        None
    };

    // stdin blocks, so the prompt runs off the runtime's worker threads.
    let repl_controller = Arc::clone(&controller);
    let repl = tokio::task::spawn_blocking(move || repl(&repl_controller, &config));
    let result = repl.await.map_err(|e| e.to_string())?;

    if let Some(watcher) = watcher {
        watcher.abort();
    }
    commands::exit(&controller);
    result
}

fn repl(controller: &SharedController, config: &AppConfig) -> Result<(), String> {
    while let Some(line) = readline()? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, controller, config) {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => {
                writeln!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }
    Ok(())
}

fn respond(line: &str, controller: &SharedController, config: &AppConfig) -> Result<bool, String> {
    let args = shlex::split(line).ok_or("error: Invalid quoting")?;
    let command = ReplCommand::try_parse_from(args).map_err(|e| e.to_string())?;

    match command {
        ReplCommand::Start => commands::set_running(controller, true)?,
        ReplCommand::Stop => commands::set_running(controller, false)?,
        ReplCommand::Copy => commands::copy_result(controller, config)?,
        ReplCommand::History => commands::show_history(controller, config)?,
        ReplCommand::Quit => return Ok(true),
    }
    Ok(false)
}
