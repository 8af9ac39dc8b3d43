//! JSONL parser for Claude Code log records.
//!
//! This module provides pure parsing functions for converting JSONL lines
//! into [`RawRecord`]s. Unknown fields are ignored and unknown record or block
//! types are kept as `Other`/`Unknown`, so newer producer versions degrade
//! gracefully.

pub mod sanitize;

use crate::model::{
    ContentBlock, EntryUuid, ImageAttachment, MalformedEntry, ParseError, RawRecord,
    RecordContext, RecordFlags, RecordPayload, RecordType, SessionId, TokenUsage, ToolCall,
    ToolName, ToolUseId,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

// Record type with its timestamp nested under `snapshot`
const RECORD_TYPE_FILE_HISTORY_SNAPSHOT: &str = "file-history-snapshot";

/// Raw JSON structure for deserializing log records.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecordJson {
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    parent_uuid: Option<String>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    git_branch: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    permission_mode: Option<String>,
    #[serde(default)]
    is_sidechain: Option<bool>,
    #[serde(default)]
    is_meta: Option<bool>,
    #[serde(default)]
    is_compact_summary: Option<bool>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    tool_use_result: Option<serde_json::Value>,
    // System record fields
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    content: Option<serde_json::Value>,
    #[serde(default)]
    level: Option<String>,
    // file-history-snapshot
    #[serde(default)]
    snapshot: Option<RawSnapshot>,
}

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: Option<RawMessageContent>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<RawTokenUsage>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawMessageContent {
    Text(String),
    Blocks(Vec<RawBlockItem>),
    Other(#[allow(dead_code)] serde_json::Value),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBlockItem {
    Text(String),
    Block(RawContentBlock),
    Other(#[allow(dead_code)] serde_json::Value),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
        #[serde(default)]
        content: serde_json::Value,
        #[serde(default)]
        is_error: Option<bool>,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    Image {
        #[serde(default)]
        source: Option<RawImageSource>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct RawImageSource {
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

/// Token counts; the producer sometimes writes `null` for a count.
#[derive(Debug, Deserialize)]
struct RawTokenUsage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
}

impl From<RawTokenUsage> for TokenUsage {
    fn from(raw: RawTokenUsage) -> Self {
        TokenUsage {
            input_tokens: raw.input_tokens.unwrap_or(0),
            output_tokens: raw.output_tokens.unwrap_or(0),
            cache_creation_input_tokens: raw.cache_creation_input_tokens.unwrap_or(0),
            cache_read_input_tokens: raw.cache_read_input_tokens.unwrap_or(0),
        }
    }
}

/// Result of parsing a JSONL line with graceful error handling.
///
/// This allows the caller to continue processing subsequent lines
/// even when encountering malformed JSON.
#[derive(Debug, Clone)]
pub enum ParseResult {
    /// Successfully parsed a record.
    Valid(Box<RawRecord>),
    /// Encountered a malformed line that could not be parsed.
    Malformed(MalformedEntry),
}

/// Parse a single JSONL line gracefully.
///
/// Unlike [`parse_record`], this function never returns an error.
///
/// # Arguments
///
/// * `raw` - The raw JSONL line to parse
/// * `line_number` - The line number (1-indexed) for error reporting
pub fn parse_record_graceful(raw: &str, line_number: usize) -> ParseResult {
    match parse_record(raw, line_number) {
        Ok(record) => ParseResult::Valid(Box::new(record)),
        Err(parse_error) => {
            ParseResult::Malformed(MalformedEntry::from_error(raw, &parse_error))
        }
    }
}

/// Parse a single JSONL line into a [`RawRecord`].
///
/// # Errors
///
/// Returns `ParseError` if:
/// - the line is not valid JSON, or not a JSON object
/// - the `type` field is missing or not a string
/// - a known field has an incompatible shape
/// - a timestamp is present but not RFC 3339
pub fn parse_record(raw: &str, line_number: usize) -> Result<RawRecord, ParseError> {
    let value: serde_json::Value =
        serde_json::from_str(raw.trim()).map_err(|e| ParseError::InvalidJson {
            line: line_number,
            message: e.to_string(),
        })?;

    let object = value.as_object().ok_or(ParseError::NotAnObject { line: line_number })?;
    if !object.get("type").is_some_and(serde_json::Value::is_string) {
        return Err(ParseError::MissingField {
            line: line_number,
            field: "type",
        });
    }

    let raw_record: RawRecordJson =
        serde_json::from_value(value).map_err(|e| ParseError::InvalidJson {
            line: line_number,
            message: e.to_string(),
        })?;

    let record_type = RecordType::parse(&raw_record.record_type);

    // file-history-snapshot stores its timestamp inside `snapshot`
    let timestamp_raw = match raw_record.timestamp.as_deref() {
        Some(ts) if !ts.is_empty() => Some(ts.to_string()),
        _ if raw_record.record_type == RECORD_TYPE_FILE_HISTORY_SNAPSHOT => raw_record
            .snapshot
            .as_ref()
            .and_then(|s| s.timestamp.clone())
            .filter(|ts| !ts.is_empty()),
        _ => None,
    };
    let timestamp = timestamp_raw
        .map(|ts| parse_timestamp(&ts, line_number))
        .transpose()?;

    let session_id = raw_record
        .session_id
        .as_deref()
        .and_then(|id| SessionId::new(id).ok());
    let uuid = raw_record.uuid.as_deref().and_then(|u| EntryUuid::new(u).ok());
    let parent_uuid = raw_record
        .parent_uuid
        .as_deref()
        .and_then(|u| EntryUuid::new(u).ok());

    let context = RecordContext {
        cwd: non_empty(raw_record.cwd),
        git_branch: non_empty(raw_record.git_branch),
        version: non_empty(raw_record.version),
        permission_mode: non_empty(raw_record.permission_mode),
    };
    let flags = RecordFlags {
        is_sidechain: raw_record.is_sidechain.unwrap_or(false),
        is_meta: raw_record.is_meta.unwrap_or(false),
        is_compact_summary: raw_record.is_compact_summary.unwrap_or(false),
    };

    let payload = match record_type {
        RecordType::User => {
            let content = raw_record
                .message
                .and_then(|m| m.content)
                .map(parse_content)
                .unwrap_or_default();
            RecordPayload::User {
                content,
                tool_use_result: raw_record.tool_use_result.filter(|v| !v.is_null()),
            }
        }
        RecordType::Assistant => {
            let message = raw_record.message;
            let (model, content, usage, stop_reason) = match message {
                Some(m) => (
                    non_empty(m.model),
                    m.content.map(parse_content).unwrap_or_default(),
                    m.usage.map(TokenUsage::from).unwrap_or_default(),
                    m.stop_reason,
                ),
                None => (None, Vec::new(), TokenUsage::default(), None),
            };
            RecordPayload::Assistant {
                model,
                content,
                usage,
                stop_reason,
            }
        }
        RecordType::System => RecordPayload::System {
            subtype: non_empty(raw_record.subtype),
            content: raw_record
                .content
                .as_ref()
                .map(flatten_text)
                .filter(|c| !c.is_empty()),
            level: raw_record.level,
        },
        RecordType::Other(_) => RecordPayload::Other,
    };

    Ok(RawRecord::new(line_number, record_type, payload)
        .with_timestamp(timestamp)
        .with_session_id(session_id)
        .with_uuids(uuid, parent_uuid)
        .with_context(context)
        .with_flags(flags)
        .with_slug(non_empty(raw_record.slug)))
}

fn parse_timestamp(raw: &str, line_number: usize) -> Result<DateTime<Utc>, ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ParseError::InvalidTimestamp {
            line: line_number,
            raw: raw.to_string(),
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Normalize message content (string or block list) into content blocks.
fn parse_content(raw: RawMessageContent) -> Vec<ContentBlock> {
    match raw {
        RawMessageContent::Text(text) => vec![ContentBlock::Text { text }],
        RawMessageContent::Blocks(items) => items
            .into_iter()
            .map(|item| match item {
                RawBlockItem::Text(text) => ContentBlock::Text { text },
                RawBlockItem::Block(block) => parse_content_block(block),
                RawBlockItem::Other(_) => ContentBlock::Unknown,
            })
            .collect(),
        RawMessageContent::Other(_) => Vec::new(),
    }
}

fn parse_content_block(raw: RawContentBlock) -> ContentBlock {
    match raw {
        RawContentBlock::Text { text } => ContentBlock::Text { text },
        RawContentBlock::Thinking { thinking } => ContentBlock::Thinking { thinking },
        RawContentBlock::ToolUse { id, name, input } => {
            let name = if name.is_empty() {
                ToolName::Other("unknown".to_string())
            } else {
                ToolName::parse(&name)
            };
            ContentBlock::ToolUse(ToolCall::new(ToolUseId::new(id).ok(), name, input))
        }
        RawContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => ContentBlock::ToolResult {
            tool_use_id: ToolUseId::new(tool_use_id).ok(),
            content: flatten_text(&content),
            is_error: is_error.unwrap_or(false),
        },
        RawContentBlock::Image { source } => {
            let source = source.unwrap_or(RawImageSource {
                media_type: None,
                data: None,
            });
            ContentBlock::Image(ImageAttachment {
                media_type: source
                    .media_type
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
                data: source.data.unwrap_or_default(),
            })
        }
        RawContentBlock::Unknown => ContentBlock::Unknown,
    }
}

/// Flatten a JSON content value to plain text.
///
/// Strings pass through; arrays join the `text` of their text blocks (and bare
/// strings) with newlines; image blocks become `[image]`; other values are empty.
pub fn flatten_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Object(obj) => match obj.get("type").and_then(|t| t.as_str())
                {
                    Some("text") => obj.get("text").and_then(|t| t.as_str()).map(str::to_string),
                    Some("image") => Some("[image]".to_string()),
                    _ => None,
                },
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

// ===== Tests =====
