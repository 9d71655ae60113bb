use std::path::PathBuf;

use super::publisher::SnapshotHandler;
use super::service::{LiveParser, LiveSettings};
use crate::combat_log::LogTailer;
use crate::error::LiveParserError;

/// Owns at most one live parser at a time.
#[derive(Default)]
pub struct LiveParserController {
    parser: Option<LiveParser>,
}

impl LiveParserController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser for `path`, replacing any existing one. It is started
    /// right away when `settings.auto_start` is set; otherwise the log is only
    /// checked for readability and the parser waits for `set_running(true)`.
    pub fn activate(
        &mut self,
        path: impl Into<PathBuf>,
        settings: LiveSettings,
        handler: impl SnapshotHandler + 'static,
    ) -> Result<&LiveParser, LiveParserError> {
        let path = path.into();
        if !path.is_file() {
            return Err(LiveParserError::InvalidLogFile(path));
        }

        if !settings.auto_start {
            LogTailer::open(&path)?;
        }

        self.deactivate();
        let parser = if settings.auto_start {
            LiveParser::spawn(path, settings, handler)?
        } else {
            LiveParser::new(path, settings, handler)
        };
        Ok(self.parser.insert(parser))
    }

    /// Stop and drop the parser. Returns false if there was none.
    pub fn deactivate(&mut self) -> bool {
        match self.parser.take() {
            Some(parser) => {
                parser.stop();
                true
            }
            None => false,
        }
    }

    /// Start or stop the held parser without discarding its statistics.
    /// Returns false if no parser is active.
    pub fn set_running(&self, running: bool) -> Result<bool, LiveParserError> {
        let Some(parser) = &self.parser else {
            return Ok(false);
        };
        if running {
            parser.start()?;
        } else {
            parser.stop();
        }
        Ok(true)
    }

    pub fn parser(&self) -> Option<&LiveParser> {
        self.parser.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.parser.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.parser.as_ref().is_some_and(LiveParser::is_running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::snapshot::LiveRow;

    fn noop(_: &[LiveRow], _: f64) -> Result<(), String> {
        Ok(())
    }

    #[test]
    fn rejects_missing_and_directory_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = LiveParserController::new();

        let err = controller
            .activate(dir.path().join("nope.log"), LiveSettings::default(), noop)
            .err()
            .unwrap();
        assert!(matches!(err, LiveParserError::InvalidLogFile(_)));

        let err = controller
            .activate(dir.path(), LiveSettings::default(), noop)
            .err()
            .unwrap();
        assert!(matches!(err, LiveParserError::InvalidLogFile(_)));
        assert!(!controller.is_active());
    }

    #[test]
    fn activate_toggle_and_deactivate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combat.log");
        std::fs::write(&path, "").unwrap();

        let mut controller = LiveParserController::new();
        assert!(!controller.set_running(true).unwrap());

        controller.activate(&path, LiveSettings::default(), noop).unwrap();
        assert!(controller.is_running());

        assert!(controller.set_running(false).unwrap());
        assert!(controller.is_active());
        assert!(!controller.is_running());

        assert!(controller.set_running(true).unwrap());
        assert!(controller.is_running());

        // Replacing keeps exactly one parser.
        controller.activate(&path, LiveSettings::default(), noop).unwrap();
        assert!(controller.is_running());

        assert!(controller.deactivate());
        assert!(!controller.deactivate());
        assert!(!controller.is_active());
    }

    #[test]
    fn without_auto_start_parser_waits_for_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combat.log");
        std::fs::write(&path, "").unwrap();
        let settings = LiveSettings {
            auto_start: false,
            ..LiveSettings::default()
        };

        let mut controller = LiveParserController::new();
        controller.activate(&path, settings, noop).unwrap();
        assert!(controller.is_active());
        assert!(!controller.is_running());

        assert!(controller.set_running(true).unwrap());
        assert!(controller.is_running());

        // The path is still validated before anything is replaced.
        let err = controller
            .activate(dir.path().join("gone.log"), settings, noop)
            .err()
            .unwrap();
        assert!(matches!(err, LiveParserError::InvalidLogFile(_)));
        assert!(controller.is_running());
        controller.deactivate();
    }

    #[test]
    fn default_settings_start_immediately() {
        assert!(LiveSettings::default().auto_start);
    }
}

