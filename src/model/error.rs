//! Error types for ccexport.
//!
//! This module defines a hierarchical error taxonomy using `thiserror` for structured error
//! handling. Errors compose cleanly via `?` and `From` conversions.
//!
//! # Error Hierarchy
//!
//! - [`AppError`] - Top-level error returned from `main` logic
//!   - [`SessionLoadError`] - A session file cannot produce a session at all
//!   - [`ParseError`] - One JSONL line is unusable (malformed record)
//!   - [`ExportError`] - Writing an output artifact failed
//!   - [`WatermarkError`] - Persisted export state unreadable or unwritable
//!   - [`crate::config::ConfigError`] - Configuration file problems
//!   - [`crate::logging::LoggingError`] - Log subscriber initialization problems
//!
//! # Error Recovery Strategy
//!
//! | Error                                  | Recovery                                         |
//! |----------------------------------------|--------------------------------------------------|
//! | `ParseError` on a line after the first | skip the line, `warn!`, continue                 |
//! | `SessionLoadError`                     | per-session failure, batch continues             |
//! | unknown result shape                   | not an error: classifies as `unknown`            |
//! | `ExportError::Io` for one session      | per-session failure in the manifest              |
//! | `WatermarkError::Corrupt`              | treated as "no watermark" (full export), `warn!` |

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error encompassing all failure modes.
///
/// # Examples
///
/// ```no_run
/// use ccexport::model::error::{AppError, SessionLoadError};
///
/// fn run_app() -> Result<(), AppError> {
///     // SessionLoadError automatically converts to AppError via From
///     load()?;
///     Ok(())
/// }
/// # fn load() -> Result<(), SessionLoadError> { Ok(()) }
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// A session could not be loaded.
    #[error("Failed to load session: {0}")]
    SessionLoad(#[from] SessionLoadError),

    /// A single record could not be parsed where a record was required.
    #[error("Failed to parse log entry: {0}")]
    Parse(#[from] ParseError),

    /// The export run failed as a whole.
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    /// The watermark could not be written.
    #[error("Export state error: {0}")]
    Watermark(#[from] WatermarkError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),

    /// The projects directory does not exist.
    #[error("Claude Code projects directory not found: {path}")]
    ProjectsDirNotFound {
        /// The directory that was looked up.
        path: PathBuf,
    },

    /// No session matched the given id or prefix.
    #[error("Session not found: {query}")]
    SessionNotFound {
        /// The id or id prefix the user supplied.
        query: String,
    },

    /// A session id prefix matched more than one session.
    #[error("Ambiguous prefix '{query}' matches {} sessions:\n{}", .candidates.len(), .candidates.join("\n"))]
    AmbiguousSession {
        /// The id prefix the user supplied.
        query: String,
        /// Every matching session id.
        candidates: Vec<String>,
    },

    /// Generic I/O failure writing to stdout or reading directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors encountered when parsing one JSONL record (a `MalformedRecord`).
///
/// Parsing errors are **non-fatal** once a session has been established: the offending
/// line is logged with its line number and skipped, and parsing continues.
///
/// All variants include `line: usize` (1-based) so users can locate the bad line in an
/// editor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A log line contains syntactically invalid JSON.
    ///
    /// Typical cause: a line truncated by a crash mid-write.
    ///
    /// # Examples
    ///
    /// ```
    /// use ccexport::model::error::ParseError;
    ///
    /// let err = ParseError::InvalidJson {
    ///     line: 42,
    ///     message: "EOF while parsing an object".to_string()
    /// };
    /// assert!(err.to_string().contains("line 42"));
    /// ```
    #[error("Invalid JSON at line {line}: {message}")]
    InvalidJson {
        /// The 1-based line number.
        line: usize,
        /// The JSON parser error message.
        message: String,
    },

    /// The line is valid JSON but not an object.
    #[error("Expected a JSON object at line {line}")]
    NotAnObject {
        /// The 1-based line number.
        line: usize,
    },

    /// A JSON object is missing a field every record must carry.
    ///
    /// Only `type` is required; all other fields are optional.
    #[error("Missing required field '{field}' at line {line}")]
    MissingField {
        /// The 1-based line number.
        line: usize,
        /// The name of the missing field.
        field: &'static str,
    },

    /// A timestamp field is present but not RFC 3339.
    #[error("Invalid timestamp '{raw}' at line {line}")]
    InvalidTimestamp {
        /// The 1-based line number.
        line: usize,
        /// The raw timestamp value.
        raw: String,
    },
}

impl ParseError {
    /// The 1-based line number the error refers to.
    pub fn line(&self) -> usize {
        match self {
            ParseError::InvalidJson { line, .. }
            | ParseError::NotAnObject { line }
            | ParseError::MissingField { line, .. }
            | ParseError::InvalidTimestamp { line, .. } => *line,
        }
    }
}

/// A session's record stream is unusable from its start.
///
/// Surfaced to the caller as a per-session error so a batch export or an interactive
/// view can report "could not load" for this one session and carry on.
#[derive(Debug, Error)]
pub enum SessionLoadError {
    /// The session file could not be opened or read.
    #[error("Cannot read session file {path}: {source}")]
    Io {
        /// Path of the session file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The first record of the file is malformed, so no session can be established.
    #[error("Session file {path} is unreadable from its first record: {source}")]
    UnreadableStart {
        /// Path of the session file.
        path: PathBuf,
        /// Parse failure of the first non-blank line.
        #[source]
        source: ParseError,
    },

    /// Neither the records nor the file name yield a session id.
    #[error("No session id could be established for {path}")]
    MissingSessionId {
        /// Path of the session file.
        path: PathBuf,
    },
}

/// Failures of the export driver.
#[derive(Debug, Error)]
pub enum ExportError {
    /// An output artifact could not be written (ExportIOError).
    #[error("Cannot write {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The zip archive could not be assembled.
    #[error("Cannot write archive {path}: {message}")]
    Archive {
        /// Archive path.
        path: PathBuf,
        /// Error reported by the zip writer.
        message: String,
    },

    /// Every selected session failed; nothing was written.
    #[error("No session could be exported ({failed} failed)")]
    NothingExported {
        /// Number of failed sessions.
        failed: usize,
    },

    /// The run was interrupted between sessions.
    #[error("Export cancelled")]
    Cancelled,
}

/// Failures reading or writing the export watermark.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// The state file could not be read or replaced.
    #[error("Watermark IO error at {path}: {source}")]
    Io {
        /// State file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The state file exists but does not decode (WatermarkCorrupt).
    #[error("Watermark file {path} is corrupt: {message}")]
    Corrupt {
        /// State file path.
        path: PathBuf,
        /// Decoder error message.
        message: String,
    },

    /// The in-memory watermark could not be encoded.
    #[error("Cannot encode watermark: {0}")]
    Serialize(#[from] serde_json::Error),
}
