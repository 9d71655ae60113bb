//! Tailing reader for a combat log that is still being written.

use std::borrow::Cow;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use encoding_rs::UTF_8;
use memchr::{memchr, memchr_iter, memrchr};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::LiveParserError;

/// Result of one poll of the log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailRead {
    /// Complete lines, each still carrying its `\n`.
    Lines(Vec<String>),
    /// Nothing new was appended since the last poll.
    Empty,
}

/// Identifies the file behind a path so a replaced file can be detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    dev: u64,
    ino: u64,
}

#[cfg(unix)]
fn file_identity(meta: &fs::Metadata) -> Option<FileIdentity> {
    use std::os::unix::fs::MetadataExt;
    Some(FileIdentity {
        dev: meta.dev(),
        ino: meta.ino(),
    })
}

#[cfg(not(unix))]
fn file_identity(_meta: &fs::Metadata) -> Option<FileIdentity> {
    None
}

pub struct LogTailer {
    path: PathBuf,
    file: File,
    /// Byte position of the file cursor.
    read_pos: u64,
    /// Bytes after the last newline, waiting for the rest of their line.
    pending: Vec<u8>,
    identity: Option<FileIdentity>,
    /// Opened in the middle of a line; its tail is dropped, not delivered.
    skip_partial: bool,
}

struct OpenedFile {
    file: File,
    pos: u64,
    identity: Option<FileIdentity>,
    at_line_start: bool,
}

impl LogTailer {
    /// Open `path` positioned at its current end, so only lines appended
    /// from now on are returned.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LiveParserError> {
        Self::open_at(path, u64::MAX)
    }

    /// Open `path` positioned at `offset`, clamped to the file length.
    pub fn open_at(path: impl AsRef<Path>, offset: u64) -> Result<Self, LiveParserError> {
        let path = path.as_ref().to_path_buf();
        let opened = open_file(&path, offset).map_err(|e| LiveParserError::unavailable(&path, e))?;

        Ok(Self {
            path,
            file: opened.file,
            read_pos: opened.pos,
            pending: Vec::new(),
            identity: opened.identity,
            skip_partial: !opened.at_line_start,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte position just after the last line returned by [`poll`](Self::poll).
    pub fn offset(&self) -> u64 {
        self.read_pos - self.pending.len() as u64
    }

    /// Read whatever was appended since the last poll.
    ///
    /// A trailing fragment without a newline is held back until it is
    /// completed. Truncation or replacement of the file restarts reading at
    /// the beginning of the new content.
    pub async fn poll(&mut self) -> io::Result<TailRead> {
        let meta = tokio::fs::metadata(&self.path).await?;
        let replaced = match (self.identity, file_identity(&meta)) {
            (Some(old), Some(new)) => old != new,
            _ => false,
        };
        if replaced || meta.len() < self.read_pos {
            tracing::info!(
                "[TAIL] {} was rotated or truncated, reading from start",
                self.path.display()
            );
            self.reopen_at(0)?;
        }
        if meta.len() == self.read_pos {
            return Ok(TailRead::Empty);
        }

        let mut chunk = Vec::new();
        let n = self.file.read_to_end(&mut chunk).await?;
        self.read_pos += n as u64;
        if n == 0 {
            return Ok(TailRead::Empty);
        }

        self.pending.extend_from_slice(&chunk);
        if self.skip_partial {
            match memchr(b'\n', &self.pending) {
                Some(end) => {
                    self.pending.drain(..=end);
                    self.skip_partial = false;
                }
                None => {
                    self.pending.clear();
                    return Ok(TailRead::Empty);
                }
            }
        }
        let Some(last_newline) = memrchr(b'\n', &self.pending) else {
            return Ok(TailRead::Empty);
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        Ok(TailRead::Lines(split_lines(&complete)))
    }

    /// Re-open the same path at the current line offset, dropping any
    /// partial fragment. A different file now at the path is read from the
    /// start. Used to recover from read errors.
    pub fn reopen(&mut self) -> io::Result<()> {
        let meta = fs::metadata(&self.path)?;
        let replaced = match (self.identity, file_identity(&meta)) {
            (Some(old), Some(new)) => old != new,
            _ => false,
        };
        let offset = if replaced { 0 } else { self.offset() };
        self.reopen_at(offset)
    }

    fn reopen_at(&mut self, offset: u64) -> io::Result<()> {
        let opened = open_file(&self.path, offset)?;
        self.file = opened.file;
        self.read_pos = opened.pos;
        self.identity = opened.identity;
        self.skip_partial = !opened.at_line_start;
        self.pending.clear();
        Ok(())
    }
}

fn open_file(path: &Path, offset: u64) -> io::Result<OpenedFile> {
    let mut file = fs::File::open(path)?;
    let meta = file.metadata()?;
    if !meta.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }
    let pos = offset.min(meta.len());
    let at_line_start = if pos == 0 {
        true
    } else {
        let mut previous = [0u8; 1];
        file.seek(SeekFrom::Start(pos - 1))?;
        file.read_exact(&mut previous)?;
        previous[0] == b'\n'
    };
    let pos = file.seek(SeekFrom::Start(pos))?;
    Ok(OpenedFile {
        file: File::from_std(file),
        pos,
        identity: file_identity(&meta),
        at_line_start,
    })
}

/// Decode log bytes as UTF-8, dropping a leading byte order mark and
/// replacing invalid sequences.
pub fn decode_log(bytes: &[u8]) -> Cow<'_, str> {
    UTF_8.decode_with_bom_removal(bytes).0
}

/// Decode a buffer of complete lines, keeping each line's terminator.
fn split_lines(bytes: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;
    for end in memchr_iter(b'\n', bytes) {
        lines.push(decode_log(&bytes[start..=end]).into_owned());
        start = end + 1;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn append(path: &Path, text: &str) {
        let mut file = fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn lines(read: TailRead) -> Vec<String> {
        match read {
            TailRead::Lines(lines) => lines,
            TailRead::Empty => Vec::new(),
        }
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = LogTailer::open(dir.path().join("missing.log")).err().unwrap();
        assert!(matches!(err, LiveParserError::IoUnavailable { .. }));
    }

    #[test]
    fn directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = LogTailer::open(dir.path()).err().unwrap();
        assert!(matches!(err, LiveParserError::IoUnavailable { .. }));
    }

    #[tokio::test]
    async fn starts_at_end_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combat.log");
        fs::write(&path, "old line\n").unwrap();

        let mut tailer = LogTailer::open(&path).unwrap();
        assert_eq!(tailer.offset(), 9);
        assert_eq!(tailer.poll().await.unwrap(), TailRead::Empty);

        append(&path, "new line\n");
        assert_eq!(lines(tailer.poll().await.unwrap()), vec!["new line\n"]);
    }

    #[tokio::test]
    async fn holds_back_partial_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combat.log");
        fs::write(&path, "").unwrap();
        let mut tailer = LogTailer::open(&path).unwrap();

        append(&path, "first\nsec");
        assert_eq!(lines(tailer.poll().await.unwrap()), vec!["first\n"]);
        assert_eq!(tailer.offset(), 6);

        append(&path, "ond\nthird");
        assert_eq!(lines(tailer.poll().await.unwrap()), vec!["second\n"]);

        assert_eq!(tailer.poll().await.unwrap(), TailRead::Empty);
        append(&path, "\n");
        assert_eq!(lines(tailer.poll().await.unwrap()), vec!["third\n"]);
    }

    #[tokio::test]
    async fn open_at_offset_reads_from_there() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combat.log");
        fs::write(&path, "a\nb\nc\n").unwrap();

        let mut tailer = LogTailer::open_at(&path, 2).unwrap();
        assert_eq!(lines(tailer.poll().await.unwrap()), vec!["b\n", "c\n"]);
    }

    #[tokio::test]
    async fn truncation_restarts_from_beginning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combat.log");
        fs::write(&path, "a long first line\n").unwrap();
        let mut tailer = LogTailer::open(&path).unwrap();

        fs::write(&path, "new\n").unwrap();
        assert_eq!(lines(tailer.poll().await.unwrap()), vec!["new\n"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn replaced_file_is_read_from_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combat.log");
        fs::write(&path, "before rotation\n").unwrap();
        let mut tailer = LogTailer::open(&path).unwrap();

        let rotated = dir.path().join("combat.log.1");
        fs::rename(&path, &rotated).unwrap();
        fs::write(&path, "after rotation that is longer\n").unwrap();

        assert_eq!(
            lines(tailer.poll().await.unwrap()),
            vec!["after rotation that is longer\n"]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combat.log");
        fs::write(&path, "").unwrap();
        let mut tailer = LogTailer::open(&path).unwrap();

        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"\xEF\xBB\xBFbom\nbad \xFF byte\n").unwrap();

        assert_eq!(
            lines(tailer.poll().await.unwrap()),
            vec!["bom\n".to_string(), "bad \u{FFFD} byte\n".to_string()]
        );
    }

    #[tokio::test]
    async fn opening_mid_line_drops_the_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combat.log");
        fs::write(&path, "first\nhalf").unwrap();

        let mut tailer = LogTailer::open(&path).unwrap();
        assert_eq!(tailer.poll().await.unwrap(), TailRead::Empty);

        append(&path, " written");
        assert_eq!(tailer.poll().await.unwrap(), TailRead::Empty);
        append(&path, " line\nnext\n");
        assert_eq!(lines(tailer.poll().await.unwrap()), vec!["next\n"]);

        // Offset 2 is inside "first", offset 6 is the start of the second line.
        let mut tailer = LogTailer::open_at(&path, 2).unwrap();
        assert_eq!(
            lines(tailer.poll().await.unwrap()),
            vec!["half written line\n", "next\n"]
        );
        let mut tailer = LogTailer::open_at(&path, 6).unwrap();
        assert_eq!(lines(tailer.poll().await.unwrap()).len(), 2);
        let mut tailer = LogTailer::open_at(&path, 8).unwrap();
        assert_eq!(lines(tailer.poll().await.unwrap()), vec!["next\n"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reopen_after_delete_reads_new_file_from_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combat.log");
        fs::write(&path, "").unwrap();
        let mut tailer = LogTailer::open(&path).unwrap();
        append(&path, "consumed line\n");
        assert_eq!(lines(tailer.poll().await.unwrap()).len(), 1);

        fs::remove_file(&path).unwrap();
        assert!(tailer.poll().await.is_err());
        assert!(tailer.reopen().is_err());

        fs::write(&path, "fresh\n").unwrap();
        tailer.reopen().unwrap();
        assert_eq!(tailer.offset(), 0);
        assert_eq!(lines(tailer.poll().await.unwrap()), vec!["fresh\n"]);
    }

    #[test]
    fn decode_drops_byte_order_mark() {
        assert_eq!(decode_log(b"\xEF\xBB\xBFline\n"), "line\n");
        assert_eq!(decode_log(b"a \xFF b"), "a \u{FFFD} b");
    }
}
