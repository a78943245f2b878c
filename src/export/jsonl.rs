//! Chat-format JSONL output.
//!
//! One object per line:
//!
//! ```json
//! {"messages":[{"role":"user","content":"…"},{"role":"assistant","content":"…"}]}
//! ```
//!
//! Non-ASCII text is written as UTF-8, not `\u` escapes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, TuneError};
use crate::model::pair::TrainingExample;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRecord<'a> {
    messages: [ChatMessage<'a>; 2],
}

impl<'a> From<&'a TrainingExample> for ChatRecord<'a> {
    fn from(example: &'a TrainingExample) -> Self {
        Self {
            messages: [
                ChatMessage {
                    role: "user",
                    content: &example.prompt_text,
                },
                ChatMessage {
                    role: "assistant",
                    content: &example.response_text,
                },
            ],
        }
    }
}

/// Serialize one example as a single JSONL line (without the newline).
pub fn to_line(example: &TrainingExample) -> Result<String> {
    serde_json::to_string(&ChatRecord::from(example))
        .map_err(|e| TuneError::Export(format!("cannot serialize example: {e}")))
}

/// Write `examples` to `writer`, one line each.
pub fn write_records<W: Write>(writer: &mut W, examples: &[TrainingExample]) -> Result<()> {
    for example in examples {
        let line = to_line(example)?;
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

/// Write `examples` to `path`.
///
/// The file is written to a temporary sibling first and renamed into place,
/// so a failed run never leaves a half-written dataset behind.
pub fn write_jsonl(path: &Path, examples: &[TrainingExample]) -> Result<()> {
    let tmp_path = path.with_extension("jsonl.tmp");
    {
        let file = File::create(&tmp_path).map_err(|e| TuneError::io(&tmp_path, e))?;
        let mut writer = BufWriter::new(file);
        write_records(&mut writer, examples).map_err(|e| match e {
            TuneError::Io { source, .. } => TuneError::io(&tmp_path, source),
            other => other,
        })?;
        writer.flush().map_err(|e| TuneError::io(&tmp_path, e))?;
    }
    std::fs::rename(&tmp_path, path).map_err(|e| TuneError::io(path, e))?;
    Ok(())
}
