//! Message types for Claude Code conversations.
//!
//! A [`Message`] is the canonical unit of conversation produced by the session
//! aggregator. Raw constructors are never exported - use smart constructors and
//! the `with_*` builders only.

use crate::model::{ClassifiedResult, EntryUuid, ModelInfo, TokenUsage, ToolUseId};
use chrono::{DateTime, Utc};
use serde::Serialize;

// ===== Role =====

/// Message role in a Claude Code conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message authored by the user, or a synthetic user turn carrying a tool result
    User,
    /// Message authored by Claude assistant
    Assistant,
    /// Producer-side event (compaction boundary, notices)
    System,
}

impl Role {
    /// Lowercase role name as written in exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

// ===== ContentBlock =====

/// Individual content block within a raw message body.
///
/// Message bodies in Claude Code logs are either a plain string or a list of
/// heterogeneous blocks. The parser normalizes both forms to `Vec<ContentBlock>`.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Visible text
    Text {
        /// Text as written, control markers not yet removed
        text: String,
    },
    /// Tool invocation by the assistant
    ToolUse(ToolCall),
    /// Result returned from a tool execution
    ToolResult {
        /// ID linking this result to the originating tool_use
        tool_use_id: Option<ToolUseId>,
        /// Text rendition of the block content
        content: String,
        /// Whether the tool execution failed
        is_error: bool,
    },
    /// Extended thinking block
    Thinking {
        /// Reasoning content
        thinking: String,
    },
    /// Inline image attachment
    Image(ImageAttachment),
    /// Block type this version does not interpret
    Unknown,
}

// ===== ImageAttachment =====

/// Inline binary attachment (base64 payload as logged).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageAttachment {
    /// MIME type, e.g. `image/png`.
    pub media_type: String,
    /// Base64 data, kept verbatim.
    #[serde(skip_serializing)]
    pub data: String,
}

impl ImageAttachment {
    /// Approximate decoded size in bytes.
    pub fn decoded_len(&self) -> usize {
        self.data.len() / 4 * 3
    }
}

// ===== ToolCall =====

/// Tool invocation recorded in a Claude Code log.
///
/// Represents the assistant calling a tool (Read, Write, Bash, etc.) with
/// structured parameters. The id links to a corresponding tool result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    id: Option<ToolUseId>,
    name: ToolName,
    input: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(id: Option<ToolUseId>, name: ToolName, input: serde_json::Value) -> Self {
        Self { id, name, input }
    }

    /// Identifier linking this call to its result
    pub fn id(&self) -> Option<&ToolUseId> {
        self.id.as_ref()
    }

    /// Tool name (Read, Write, Bash, etc.)
    pub fn name(&self) -> &ToolName {
        &self.name
    }

    /// Tool-specific input parameters
    pub fn input(&self) -> &serde_json::Value {
        &self.input
    }

    /// String-valued input parameter, empty when absent.
    pub fn input_str(&self, key: &str) -> &str {
        self.input.get(key).and_then(|v| v.as_str()).unwrap_or("")
    }
}

// ===== ToolName =====

/// Tool names recognized in Claude Code logs.
///
/// Enumerates known tools with a fallback variant for custom or future tools.
/// Dispatch on this type always has an `Other` arm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    /// Execute bash commands
    Bash,
    /// Read files from filesystem
    Read,
    /// Write files to filesystem
    Write,
    /// Edit existing files (string replacement)
    Edit,
    /// Find files by glob pattern
    Glob,
    /// Search file contents with regex
    Grep,
    /// Fetch web resources
    WebFetch,
    /// Search the web
    WebSearch,
    /// Create or manage subagent tasks
    Task,
    /// Maintain the todo list
    TodoWrite,
    /// Ask the user multiple-choice questions
    AskUserQuestion,
    /// Unknown or custom tool
    Other(String),
}

impl ToolName {
    /// Parse a tool name from the JSONL log.
    ///
    /// Recognizes standard Claude Code tools, wrapping unknown names in `Other`.
    pub fn parse(name: &str) -> Self {
        match name {
            "Bash" => Self::Bash,
            "Read" => Self::Read,
            "Write" => Self::Write,
            "Edit" => Self::Edit,
            "Glob" => Self::Glob,
            "Grep" => Self::Grep,
            "WebFetch" => Self::WebFetch,
            "WebSearch" => Self::WebSearch,
            "Task" => Self::Task,
            "TodoWrite" => Self::TodoWrite,
            "AskUserQuestion" => Self::AskUserQuestion,
            other => Self::Other(other.to_string()),
        }
    }

    /// Get the canonical string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bash => "Bash",
            Self::Read => "Read",
            Self::Write => "Write",
            Self::Edit => "Edit",
            Self::Glob => "Glob",
            Self::Grep => "Grep",
            Self::WebFetch => "WebFetch",
            Self::WebSearch => "WebSearch",
            Self::Task => "Task",
            Self::TodoWrite => "TodoWrite",
            Self::AskUserQuestion => "AskUserQuestion",
            Self::Other(s) => s,
        }
    }
}

impl Serialize for ToolName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ===== SystemEvent =====

/// Payload of a system-role message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemEvent {
    /// Event subtype, e.g. `compact_boundary`.
    pub subtype: Option<String>,
    /// Event text.
    pub content: Option<String>,
    /// Severity as logged.
    pub level: Option<String>,
}

impl SystemEvent {
    /// Subtype the producer writes when it resets context.
    pub const COMPACT_BOUNDARY: &'static str = "compact_boundary";

    /// True when the event marks a context reset.
    pub fn is_compaction(&self) -> bool {
        self.subtype.as_deref() == Some(Self::COMPACT_BOUNDARY)
    }
}

// ===== Message =====

/// Canonical unit of conversation.
///
/// User messages carry authored text and images, or a classified tool result
/// (results arrive as synthetic user turns); both may coexist. Assistant
/// messages carry text, thinking, tool invocations, model and usage. System
/// messages carry a [`SystemEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    uuid: Option<EntryUuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_uuid: Option<EntryUuid>,
    timestamp: Option<DateTime<Utc>>,
    text: Option<String>,
    thinking: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<ImageAttachment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_uses: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_result: Option<ClassifiedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<ModelInfo>,
    usage: TokenUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<SystemEvent>,
    is_sidechain: bool,
    is_compact_summary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    slug: Option<String>,
}

impl Message {
    /// Create an empty message with the given role.
    ///
    /// Use the `with_*` builders to attach content and metadata.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            uuid: None,
            parent_uuid: None,
            timestamp: None,
            text: None,
            thinking: None,
            images: Vec::new(),
            tool_uses: Vec::new(),
            tool_result: None,
            model: None,
            usage: TokenUsage::default(),
            stop_reason: None,
            system: None,
            is_sidechain: false,
            is_compact_summary: false,
            slug: None,
        }
    }

    /// System message for a producer event.
    pub fn system(event: SystemEvent) -> Self {
        let mut msg = Self::new(Role::System);
        msg.system = Some(event);
        msg
    }

    /// Get the role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Get the record UUID, if any.
    pub fn uuid(&self) -> Option<&EntryUuid> {
        self.uuid.as_ref()
    }

    /// Get the parent record UUID, if any.
    pub fn parent_uuid(&self) -> Option<&EntryUuid> {
        self.parent_uuid.as_ref()
    }

    /// Get the record timestamp, if any.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Sanitized text, `None` when nothing remains after sanitizing.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Extended-thinking text, if any.
    pub fn thinking(&self) -> Option<&str> {
        self.thinking.as_deref()
    }

    /// Inline images.
    pub fn images(&self) -> &[ImageAttachment] {
        &self.images
    }

    /// Tool invocations made by this message.
    pub fn tool_uses(&self) -> &[ToolCall] {
        &self.tool_uses
    }

    /// Classified tool result carried by this message.
    pub fn tool_result(&self) -> Option<&ClassifiedResult> {
        self.tool_result.as_ref()
    }

    /// Model that generated this message. Never the synthetic sentinel.
    pub fn model(&self) -> Option<&ModelInfo> {
        self.model.as_ref()
    }

    /// Token usage; zero for non-assistant messages.
    pub fn usage(&self) -> &TokenUsage {
        &self.usage
    }

    /// Why the model stopped generating.
    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.as_deref()
    }

    /// Payload of a system message.
    pub fn system_event(&self) -> Option<&SystemEvent> {
        self.system.as_ref()
    }

    /// True for subagent branch messages.
    pub fn is_sidechain(&self) -> bool {
        self.is_sidechain
    }

    /// True for the summary that replaced compacted history.
    pub fn is_compact_summary(&self) -> bool {
        self.is_compact_summary
    }

    /// Session slug stamped by the producer.
    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    /// True for a context-compaction boundary.
    pub fn is_compaction(&self) -> bool {
        self.system.as_ref().is_some_and(SystemEvent::is_compaction)
    }

    /// True when the user actually typed something (not a tool-result carrier).
    pub fn is_user_authored(&self) -> bool {
        self.role == Role::User && !self.is_compact_summary && self.text.is_some()
    }

    // ===== Builders =====

    /// Set the record UUID.
    pub fn with_uuid(mut self, uuid: Option<EntryUuid>) -> Self {
        self.uuid = uuid;
        self
    }

    /// Set the parent record UUID.
    pub fn with_parent_uuid(mut self, parent: Option<EntryUuid>) -> Self {
        self.parent_uuid = parent;
        self
    }

    /// Set the timestamp.
    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach text; empty strings are stored as `None`.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = if text.is_empty() { None } else { Some(text) };
        self
    }

    /// Attach thinking text; empty strings are ignored.
    pub fn with_thinking(mut self, thinking: impl Into<String>) -> Self {
        let thinking = thinking.into();
        self.thinking = if thinking.trim().is_empty() {
            None
        } else {
            Some(thinking)
        };
        self
    }

    /// Attach inline images.
    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }

    /// Attach tool invocations.
    pub fn with_tool_uses(mut self, tool_uses: Vec<ToolCall>) -> Self {
        self.tool_uses = tool_uses;
        self
    }

    /// Attach a classified tool result.
    pub fn with_tool_result(mut self, result: ClassifiedResult) -> Self {
        self.tool_result = Some(result);
        self
    }

    /// Attach model info to this message (builder pattern).
    pub fn with_model(mut self, model: Option<ModelInfo>) -> Self {
        self.model = model;
        self
    }

    /// Attach token usage to this message (builder pattern).
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Set the stop reason.
    pub fn with_stop_reason(mut self, stop_reason: Option<String>) -> Self {
        self.stop_reason = stop_reason;
        self
    }

    /// Mark as a subagent branch message.
    pub fn with_sidechain(mut self, is_sidechain: bool) -> Self {
        self.is_sidechain = is_sidechain;
        self
    }

    /// Mark as a compaction summary.
    pub fn with_compact_summary(mut self, is_compact_summary: bool) -> Self {
        self.is_compact_summary = is_compact_summary;
        self
    }

    /// Set the session slug.
    pub fn with_slug(mut self, slug: Option<String>) -> Self {
        self.slug = slug;
        self
    }
}

// ===== Tests =====

#[cfg(test)]
mod tests {
    use super::*;

    // ===== ToolName Tests =====

    #[test]
    fn tool_name_parse_recognizes_known_tools() {
        for name in [
            "Bash",
            "Read",
            "Write",
            "Edit",
            "Glob",
            "Grep",
            "WebFetch",
            "WebSearch",
            "Task",
            "TodoWrite",
            "AskUserQuestion",
        ] {
            let parsed = ToolName::parse(name);
            assert!(
                !matches!(parsed, ToolName::Other(_)),
                "{name} should be a known tool"
            );
            assert_eq!(parsed.as_str(), name);
        }
    }

    #[test]
    fn tool_name_parse_wraps_unknown_in_other() {
        let parsed = ToolName::parse("mcp__github__create_issue");
        assert_eq!(
            parsed,
            ToolName::Other("mcp__github__create_issue".to_string())
        );
        assert_eq!(parsed.as_str(), "mcp__github__create_issue");
    }

    #[test]
    fn tool_name_serializes_as_plain_string() {
        let json = serde_json::to_string(&ToolName::TodoWrite).unwrap();
        assert_eq!(json, "\"TodoWrite\"");
    }

    // ===== ToolCall Tests =====

    #[test]
    fn tool_call_input_str_returns_empty_for_missing_key() {
        let call = ToolCall::new(
            None,
            ToolName::Bash,
            serde_json::json!({"command": "pytest"}),
        );
        assert_eq!(call.input_str("command"), "pytest");
        assert_eq!(call.input_str("description"), "");
    }

    // ===== Message Tests =====

    #[test]
    fn message_with_empty_text_stores_none() {
        let msg = Message::new(Role::User).with_text("");
        assert!(msg.text().is_none());
        assert!(!msg.is_user_authored());
    }

    #[test]
    fn message_with_whitespace_thinking_stores_none() {
        let msg = Message::new(Role::Assistant).with_thinking("  \n ");
        assert!(msg.thinking().is_none());
    }

    #[test]
    fn compact_summary_is_not_user_authored() {
        let msg = Message::new(Role::User)
            .with_text("This session is being continued...")
            .with_compact_summary(true);
        assert!(!msg.is_user_authored());
    }

    #[test]
    fn system_compaction_event_is_detected() {
        let msg = Message::system(SystemEvent {
            subtype: Some("compact_boundary".to_string()),
            content: Some("Conversation compacted".to_string()),
            level: None,
        });
        assert_eq!(msg.role(), Role::System);
        assert!(msg.is_compaction());
    }

    #[test]
    fn image_decoded_len_approximates_base64() {
        let image = ImageAttachment {
            media_type: "image/png".to_string(),
            data: "AAAA".repeat(10),
        };
        assert_eq!(image.decoded_len(), 30);
    }
}
