mod config;
pub mod directory;

pub use config::{APP_NAME, AppConfig, AppConfigExt, resolve_log_path};
pub use directory::{DirectoryEvent, DirectoryWatcher, is_combat_log, newest_log};
