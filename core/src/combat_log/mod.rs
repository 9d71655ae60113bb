//! Combat log input: line format, parsing and file tailing.

mod entry;
pub mod parser;
pub mod reader;

pub use entry::{EntityRef, EventFlags, EventKind, LogEntry, flag};
pub use parser::{ParseOutcome, format_line, parse_entry, parse_line};
pub use reader::{LogTailer, TailRead, decode_log};
