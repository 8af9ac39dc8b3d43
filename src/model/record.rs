//! Raw record types representing one decoded JSONL line.
//!
//! A [`RawRecord`] is produced by the parser and consumed immediately by the
//! session aggregator. Content is normalized into [`ContentBlock`]s but text is
//! not yet sanitized and tool results are not yet classified.

use crate::model::{ContentBlock, EntryUuid, SessionId, TokenUsage};
use chrono::{DateTime, Utc};

// ===== RecordType =====

/// Value of the record's `type` field.
///
/// The vocabulary is open: unrecognized values are kept in `Other` and are not
/// interpreted further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordType {
    /// `"user"`.
    User,
    /// `"assistant"`.
    Assistant,
    /// `"system"`.
    System,
    /// Any other value, kept verbatim.
    Other(String),
}

impl RecordType {
    /// Map a raw `type` value. Never fails.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "system" => Self::System,
            other => Self::Other(other.to_string()),
        }
    }

    /// The raw `type` value.
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Other(s) => s,
        }
    }
}

// ===== RecordContext =====

/// Environment fields stamped on records by the producer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordContext {
    /// Working directory of the producing process.
    pub cwd: Option<String>,
    /// Git branch checked out at the time.
    pub git_branch: Option<String>,
    /// Producer version.
    pub version: Option<String>,
    /// Permission mode in effect.
    pub permission_mode: Option<String>,
}

// ===== RecordFlags =====

/// Boolean markers carried by a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFlags {
    /// Written by a subagent conversation branch.
    pub is_sidechain: bool,
    /// Producer-injected user turn (caveats, command echoes).
    pub is_meta: bool,
    /// User turn holding the summary that replaced compacted history.
    pub is_compact_summary: bool,
}

// ===== RecordPayload =====

/// Type-specific body of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordPayload {
    /// User turn: typed text or tool results.
    User {
        /// Content blocks in order.
        content: Vec<ContentBlock>,
        /// Structured `toolUseResult` value, shape defined by the producing tool.
        tool_use_result: Option<serde_json::Value>,
    },
    /// Model turn.
    Assistant {
        /// Model id as logged.
        model: Option<String>,
        /// Content blocks in order.
        content: Vec<ContentBlock>,
        /// Token usage for this turn.
        usage: TokenUsage,
        /// Why generation stopped.
        stop_reason: Option<String>,
    },
    /// Producer event.
    System {
        /// Event subtype.
        subtype: Option<String>,
        /// Event text.
        content: Option<String>,
        /// Severity.
        level: Option<String>,
    },
    /// Record type outside the interpreted set.
    Other,
}

// ===== RawRecord =====

/// One decoded log line.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    line: usize,
    record_type: RecordType,
    timestamp: Option<DateTime<Utc>>,
    session_id: Option<SessionId>,
    uuid: Option<EntryUuid>,
    parent_uuid: Option<EntryUuid>,
    context: RecordContext,
    flags: RecordFlags,
    slug: Option<String>,
    payload: RecordPayload,
}

impl RawRecord {
    /// Create a record. Used by the parser; tests may build records directly.
    pub fn new(line: usize, record_type: RecordType, payload: RecordPayload) -> Self {
        Self {
            line,
            record_type,
            timestamp: None,
            session_id: None,
            uuid: None,
            parent_uuid: None,
            context: RecordContext::default(),
            flags: RecordFlags::default(),
            slug: None,
            payload,
        }
    }

    /// Set the timestamp.
    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the session id.
    pub fn with_session_id(mut self, session_id: Option<SessionId>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Set the record and parent UUIDs.
    pub fn with_uuids(mut self, uuid: Option<EntryUuid>, parent: Option<EntryUuid>) -> Self {
        self.uuid = uuid;
        self.parent_uuid = parent;
        self
    }

    /// Set the environment context.
    pub fn with_context(mut self, context: RecordContext) -> Self {
        self.context = context;
        self
    }

    /// Set the flags.
    pub fn with_flags(mut self, flags: RecordFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the session slug.
    pub fn with_slug(mut self, slug: Option<String>) -> Self {
        self.slug = slug;
        self
    }

    // ===== Accessors (read-only) =====

    /// 1-based line number in the source file.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Get the record type.
    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    /// Get the timestamp, if any.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Get the session id, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Get the record UUID, if any.
    pub fn uuid(&self) -> Option<&EntryUuid> {
        self.uuid.as_ref()
    }

    /// Get the parent UUID, if any.
    pub fn parent_uuid(&self) -> Option<&EntryUuid> {
        self.parent_uuid.as_ref()
    }

    /// Get the environment context.
    pub fn context(&self) -> &RecordContext {
        &self.context
    }

    /// Get the flags.
    pub fn flags(&self) -> RecordFlags {
        self.flags
    }

    /// Get the session slug, if any.
    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    /// Get the type-specific body.
    pub fn payload(&self) -> &RecordPayload {
        &self.payload
    }

    /// Consume the record, keeping only its payload.
    pub fn into_payload(self) -> RecordPayload {
        self.payload
    }
}
