//! Core identifier newtypes with smart constructors.
//!
//! All identifiers validate non-empty strings at construction time.
//! Raw constructors are never exported - use smart constructors only.

use serde::Serialize;
use std::fmt;

/// Unique identifier for a record within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntryUuid(String);

impl EntryUuid {
    /// Smart constructor: validates non-empty UUID
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidUuid> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidUuid::Empty);
        }
        Ok(Self(raw))
    }

    /// Get the UUID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session identifier: the stable id of one conversation log.
///
/// Ordered lexicographically so export batches sort deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Smart constructor: validates non-empty session ID
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidSessionId> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(InvalidSessionId::Empty);
        }
        Ok(Self(raw))
    }

    /// Get the session ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` characters, used in file names and listings.
    pub fn short(&self, len: usize) -> &str {
        match self.0.char_indices().nth(len) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tool invocation identifier for linking tool_use to tool_result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ToolUseId(String);

impl ToolUseId {
    /// Smart constructor: validates non-empty tool use ID
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidToolUseId> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidToolUseId::Empty);
        }
        Ok(Self(raw))
    }

    /// Get the tool use ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolUseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ===== Error Types =====

/// Error returned when constructing an [`EntryUuid`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvalidUuid {
    /// The input was empty.
    #[error("UUID cannot be empty")]
    Empty,
}

/// Error returned when constructing a [`SessionId`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvalidSessionId {
    /// The input was empty.
    #[error("Session ID cannot be empty")]
    Empty,
}

/// Error returned when constructing a [`ToolUseId`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvalidToolUseId {
    /// The input was empty.
    #[error("Tool Use ID cannot be empty")]
    Empty,
}

// ===== Tests =====
