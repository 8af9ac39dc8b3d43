//! Line-oriented reading of session log files.
//!
//! Session files are read-once: the producer may still be appending, so a
//! trailing partial line is returned like any other line and left to the
//! parser to reject.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Iterator over the lines of a log file as `(line_number, text)` pairs.
///
/// Line numbers are 1-based. Invalid UTF-8 is replaced lossily rather than
/// failing the whole file, and a trailing `\r` is stripped.
#[derive(Debug)]
pub struct LineReader<R> {
    reader: R,
    line_number: usize,
    buffer: Vec<u8>,
}

impl LineReader<BufReader<File>> {
    /// Open `path` for line reading.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be opened.
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::from_reader(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> LineReader<R> {
    /// Wrap an existing buffered reader.
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buffer: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = io::Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                let mut end = self.buffer.len();
                if self.buffer[..end].ends_with(b"\n") {
                    end -= 1;
                }
                if self.buffer[..end].ends_with(b"\r") {
                    end -= 1;
                }
                let line = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
                Some(Ok((self.line_number, line)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Scan the head of a session file for the first record carrying a `cwd`.
///
/// Only the first `max_lines` lines are inspected. Unreadable files and
/// malformed lines yield `None` rather than an error.
pub fn first_cwd(path: &Path, max_lines: usize) -> Option<String> {
    let reader = LineReader::open(path).ok()?;
    reader
        .take(max_lines)
        .filter_map(Result::ok)
        .filter_map(|(_, line)| serde_json::from_str::<serde_json::Value>(&line).ok())
        .find_map(|value| {
            value
                .get("cwd")
                .and_then(serde_json::Value::as_str)
                .filter(|cwd| !cwd.is_empty())
                .map(str::to_string)
        })
}
