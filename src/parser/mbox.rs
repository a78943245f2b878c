//! Streaming MBOX splitter.
//!
//! Reads MBOX files line-by-line and hands every message to the caller as a
//! [`RawRecord`]. Tolerant of malformed input.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, TuneError};
use crate::model::message::RawRecord;

/// Size of the internal read buffer (1 MB).
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Maximum message size in bytes (256 MB); longer bodies are truncated.
const MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// Report progress every 4 MB.
const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

/// Streaming MBOX reader.
///
/// The reader is tolerant of:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Truncated messages at EOF
/// - UTF-8 BOM at the start of the file
///
/// `>From ` lines in bodies (mboxrd quoting) lose one leading `>`.
pub struct MboxReader {
    path: PathBuf,
    file_size: u64,
}

impl MboxReader {
    /// Open a reader for the given MBOX file.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TuneError::FileNotFound(path.clone())
            } else {
                TuneError::io(&path, e)
            }
        })?;
        Ok(Self {
            path,
            file_size: metadata.len(),
        })
    }

    /// Total size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Split the MBOX, calling `on_record` for every message found.
    ///
    /// `on_record` returns `true` to continue or `false` to stop early.
    /// `progress` receives `(bytes_read, file_size)`.
    ///
    /// Returns the number of messages delivered.
    pub fn for_each_record(
        &self,
        on_record: &mut dyn FnMut(RawRecord) -> bool,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| TuneError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut count: u64 = 0;
        let mut current_offset: u64 = 0;
        let mut message_buf: Vec<u8> = Vec::with_capacity(64 * 1024);
        let mut message_start: u64 = 0;
        let mut prev_line_was_empty = true;
        let mut first_line = true;
        let mut truncated = false;
        let mut last_progress: u64 = 0;
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);

        loop {
            line_buf.clear();
            let line_len = reader
                .read_until(b'\n', &mut line_buf)
                .map_err(|e| TuneError::io(&self.path, e))?;
            if line_len == 0 {
                break;
            }

            if is_mbox_separator(&line_buf) {
                if !first_line && !prev_line_was_empty {
                    warn!(
                        offset = current_offset,
                        "Found 'From ' separator without preceding blank line"
                    );
                }
                if !message_buf.is_empty() {
                    let record = RawRecord::new(message_start, std::mem::take(&mut message_buf));
                    count += 1;
                    if !on_record(record) {
                        return Ok(count);
                    }
                }
                message_start = current_offset;
                truncated = false;
                message_buf.extend_from_slice(&line_buf);
            } else if message_buf.len() + line_buf.len() <= MAX_MESSAGE_SIZE {
                message_buf.extend_from_slice(unescape_from_line(&line_buf));
            } else if !truncated {
                warn!(
                    offset = message_start,
                    max_size = MAX_MESSAGE_SIZE,
                    "Message exceeds maximum size, truncating body"
                );
                truncated = true;
            }

            prev_line_was_empty = is_blank_line(&line_buf);
            first_line = false;
            current_offset += line_len as u64;

            if let Some(cb) = progress {
                if current_offset - last_progress >= PROGRESS_INTERVAL {
                    cb(current_offset, self.file_size);
                    last_progress = current_offset;
                }
            }
        }

        if !message_buf.is_empty() {
            count += 1;
            on_record(RawRecord::new(message_start, message_buf));
        }

        if let Some(cb) = progress {
            cb(self.file_size, self.file_size);
        }

        debug!(path = %self.path.display(), count, "Split MBOX");
        Ok(count)
    }

    /// Read every record into memory.
    pub fn read_all(&self, progress: Option<&dyn Fn(u64, u64)>) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();
        self.for_each_record(
            &mut |record| {
                records.push(record);
                true
            },
            progress,
        )?;
        Ok(records)
    }
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    let line = line.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(line);
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}

/// Undo mboxrd quoting: `>From `, `>>From `, … lose one `>`.
fn unescape_from_line(line: &[u8]) -> &[u8] {
    let quotes = line.iter().take_while(|&&b| b == b'>').count();
    if quotes > 0 && line[quotes..].starts_with(b"From ") {
        &line[1..]
    } else {
        line
    }
}
