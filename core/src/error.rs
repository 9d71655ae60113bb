use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the live parser to its owner.
#[derive(Debug, Error)]
pub enum LiveParserError {
    #[error("log file {} is unavailable: {source}", path.display())]
    IoUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a combat log file", .0.display())]
    InvalidLogFile(PathBuf),

    #[error("failed to build live parser runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] confy::ConfyError),

    #[error("directory watch failed: {0}")]
    Watch(#[from] notify::Error),
}

impl LiveParserError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::IoUnavailable {
            path: path.into(),
            source,
        }
    }
}

/// Why a complete line was rejected by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedLine {
    #[error("missing '::' between timestamp and fields")]
    MissingSeparator,

    #[error("invalid timestamp {0:?}")]
    Timestamp(String),

    #[error("expected 12 fields, found {0}")]
    FieldCount(usize),
}
