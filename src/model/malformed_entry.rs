//! Malformed record types for unparseable JSONL lines.
//!
//! When a JSONL line after the first cannot be parsed into a [`RawRecord`](crate::model::RawRecord),
//! the session keeps a `MalformedEntry` so callers can report it and carry on.

use crate::model::error::ParseError;
use serde::Serialize;

/// Longest prefix of the offending line kept for diagnostics.
const RAW_PREVIEW_CHARS: usize = 200;

/// A malformed JSONL line that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedEntry {
    line_number: usize,
    raw_preview: String,
    error_message: String,
}

impl MalformedEntry {
    /// Create a new malformed entry.
    ///
    /// # Arguments
    ///
    /// * `line_number` - The line number in the JSONL file (1-indexed)
    /// * `raw_line` - The raw line content that failed to parse
    /// * `error_message` - Human-readable error message
    pub fn new(line_number: usize, raw_line: &str, error_message: impl Into<String>) -> Self {
        Self {
            line_number,
            raw_preview: raw_line.chars().take(RAW_PREVIEW_CHARS).collect(),
            error_message: error_message.into(),
        }
    }

    /// Build from a parse failure.
    pub fn from_error(raw_line: &str, error: &ParseError) -> Self {
        Self::new(error.line(), raw_line, error.to_string())
    }

    /// Get the line number where the error occurred.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Get the start of the raw line content.
    pub fn raw_preview(&self) -> &str {
        &self.raw_preview
    }

    /// Get the error message.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_capped() {
        let raw = "x".repeat(1000);
        let entry = MalformedEntry::new(3, &raw, "bad");
        assert_eq!(entry.raw_preview().chars().count(), RAW_PREVIEW_CHARS);
        assert_eq!(entry.line_number(), 3);
    }

    #[test]
    fn from_error_takes_line_and_message() {
        let err = ParseError::NotAnObject { line: 9 };
        let entry = MalformedEntry::from_error("[1,2]", &err);
        assert_eq!(entry.line_number(), 9);
        assert!(entry.error_message().contains("line 9"));
    }
}
