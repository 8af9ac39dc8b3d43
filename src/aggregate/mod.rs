//! Session aggregation.
//!
//! Folds the records of one session file, in file order, into a [`Session`]:
//! the ordered message list plus rollup metadata. File order is chronological,
//! so running sums and first/last timestamps are taken as records arrive.
//!
//! The first non-blank line is load-bearing: if it does not parse, the whole
//! file is reported as [`SessionLoadError::UnreadableStart`]. Any later
//! malformed line is skipped with a warning and recorded on the session.

use crate::classify::classify_result;
use crate::model::error::SessionLoadError;
use crate::model::{
    ClassifiedResult, ContentBlock, ImageAttachment, MalformedEntry, Message, ModelInfo,
    RawRecord, RecordContext, RecordPayload, Role, Session, SessionId, SessionMetadata,
    SystemEvent, ToolCall,
};
use crate::parser::sanitize::strip_control_markers;
use crate::parser::{parse_record, parse_record_graceful, ParseResult};
use crate::source::LineReader;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Maximum title length in characters.
pub const TITLE_MAX_CHARS: usize = 100;

/// Parse and aggregate one session file.
///
/// # Errors
///
/// - `SessionLoadError::Io` if the file cannot be read
/// - `SessionLoadError::UnreadableStart` if the first non-blank line is malformed
/// - `SessionLoadError::MissingSessionId` if no id can be established
pub fn parse_session(path: &Path) -> Result<Session, SessionLoadError> {
    let io_error = |source: io::Error| SessionLoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = LineReader::open(path).map_err(io_error)?;
    let fallback_id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| SessionId::new(s).ok());
    aggregate_lines(path, reader, fallback_id)
}

/// Parse and aggregate session content held in memory.
///
/// `label` stands in for the file path in errors and log output.
///
/// # Errors
///
/// Same as [`parse_session`], minus I/O failures.
pub fn parse_session_str(
    label: &Path,
    content: &str,
    fallback_id: Option<SessionId>,
) -> Result<Session, SessionLoadError> {
    let lines = content
        .lines()
        .enumerate()
        .map(|(idx, line)| Ok((idx + 1, line.to_string())));
    aggregate_lines(label, lines, fallback_id)
}

fn aggregate_lines(
    path: &Path,
    lines: impl Iterator<Item = io::Result<(usize, String)>>,
    fallback_id: Option<SessionId>,
) -> Result<Session, SessionLoadError> {
    let mut aggregator = SessionAggregator::new();
    let mut started = false;

    for item in lines {
        let (line_number, line) = item.map_err(|source| SessionLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        if !started {
            started = true;
            let record = parse_record(&line, line_number).map_err(|source| {
                SessionLoadError::UnreadableStart {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            aggregator.push(record);
            continue;
        }

        match parse_record_graceful(&line, line_number) {
            ParseResult::Valid(record) => aggregator.push(*record),
            ParseResult::Malformed(entry) => {
                warn!(
                    path = %path.display(),
                    line = entry.line_number(),
                    error = entry.error_message(),
                    "Skipping malformed record"
                );
                aggregator.record_malformed(entry);
            }
        }
    }

    let session = aggregator
        .finish(fallback_id)
        .ok_or_else(|| SessionLoadError::MissingSessionId {
            path: path.to_path_buf(),
        })?;

    debug!(
        session_id = %session.id(),
        messages = session.messages().len(),
        malformed = session.malformed().len(),
        "Session aggregated"
    );
    Ok(session)
}

/// Incremental fold of records into a session.
///
/// Records must be pushed in file order.
#[derive(Debug, Default)]
pub struct SessionAggregator {
    record_session_id: Option<SessionId>,
    messages: Vec<Message>,
    metadata: SessionMetadata,
    malformed: Vec<MalformedEntry>,
    title: Option<String>,
}

impl SessionAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record.
    pub fn push(&mut self, record: RawRecord) {
        if self.record_session_id.is_none() {
            self.record_session_id = record.session_id().cloned();
        }
        if let Some(ts) = record.timestamp() {
            self.metadata.first_timestamp.get_or_insert(ts);
            self.metadata.last_timestamp = Some(ts);
        }
        self.absorb_context(record.context());

        let flags = record.flags();
        let base = |role: Role| {
            Message::new(role)
                .with_uuid(record.uuid().cloned())
                .with_parent_uuid(record.parent_uuid().cloned())
                .with_timestamp(record.timestamp())
                .with_sidechain(flags.is_sidechain)
                .with_slug(record.slug().map(str::to_string))
        };

        let mut emitted: Vec<Message> = Vec::new();
        match record.payload() {
            RecordPayload::User {
                content,
                tool_use_result,
            } => {
                let parts = UserParts::split(content, tool_use_result.as_ref());
                let title_candidate = !flags.is_meta && !flags.is_compact_summary;
                if title_candidate && self.title.is_none() {
                    self.title = derive_title(&parts.text);
                }

                let mut results = parts.results.into_iter();
                let first = base(Role::User)
                    .with_text(parts.text)
                    .with_images(parts.images)
                    .with_compact_summary(flags.is_compact_summary);
                let first = match results.next() {
                    Some(result) => first.with_tool_result(result),
                    None => first,
                };
                if first.text().is_some() || !first.images().is_empty() || first.tool_result().is_some() {
                    emitted.push(first);
                }
                emitted.extend(results.map(|result| base(Role::User).with_tool_result(result)));
            }
            RecordPayload::Assistant {
                model,
                content,
                usage,
                stop_reason,
            } => {
                let model = model.as_deref().and_then(ModelInfo::new);
                if let Some(model) = &model {
                    self.metadata.models_used.insert(model.clone());
                }
                self.metadata.usage += *usage;
                if let Some(reason) = stop_reason {
                    *self.metadata.stop_reasons.entry(reason.clone()).or_default() += 1;
                }

                let parts = AssistantParts::split(content);
                for call in &parts.tool_uses {
                    self.metadata.total_tool_calls += 1;
                    *self
                        .metadata
                        .tool_call_counts
                        .entry(call.name().as_str().to_string())
                        .or_default() += 1;
                }

                emitted.push(
                    base(Role::Assistant)
                        .with_text(parts.text)
                        .with_thinking(parts.thinking)
                        .with_images(parts.images)
                        .with_tool_uses(parts.tool_uses)
                        .with_model(model)
                        .with_usage(*usage)
                        .with_stop_reason(stop_reason.clone()),
                );
            }
            RecordPayload::System {
                subtype,
                content,
                level,
            } => {
                let event = SystemEvent {
                    subtype: subtype.clone(),
                    content: content.clone(),
                    level: level.clone(),
                };
                if event.is_compaction() {
                    self.metadata.compactions += 1;
                }
                emitted.push(
                    Message::system(event)
                        .with_uuid(record.uuid().cloned())
                        .with_parent_uuid(record.parent_uuid().cloned())
                        .with_timestamp(record.timestamp())
                        .with_sidechain(flags.is_sidechain),
                );
            }
            RecordPayload::Other => {}
        }

        self.metadata.sidechain_messages += emitted.iter().filter(|m| m.is_sidechain()).count();
        self.messages.extend(emitted);
    }

    /// Record a skipped line.
    pub fn record_malformed(&mut self, entry: MalformedEntry) {
        self.malformed.push(entry);
    }

    /// Complete the session.
    ///
    /// The id is `preferred_id` (the file stem for on-disk sessions) when
    /// given, else the first `sessionId` seen in the records. Returns `None`
    /// when neither exists.
    pub fn finish(mut self, preferred_id: Option<SessionId>) -> Option<Session> {
        let id = preferred_id.or(self.record_session_id)?;
        let title = self.title.unwrap_or_else(|| id.to_string());
        self.metadata.malformed_lines = self.malformed.len();
        Some(Session::new(
            id,
            title,
            self.messages,
            self.metadata,
            self.malformed,
        ))
    }

    fn absorb_context(&mut self, context: &RecordContext) {
        fill(&mut self.metadata.cwd, &context.cwd);
        fill(&mut self.metadata.git_branch, &context.git_branch);
        fill(&mut self.metadata.version, &context.version);
        fill(&mut self.metadata.permission_mode, &context.permission_mode);
    }
}

fn fill(slot: &mut Option<String>, value: &Option<String>) {
    if slot.is_none() {
        if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
            *slot = Some(v.to_string());
        }
    }
}

/// Aggregate already-parsed records.
///
/// Returns `None` when no session id can be established.
pub fn aggregate(
    records: impl IntoIterator<Item = RawRecord>,
    preferred_id: Option<SessionId>,
) -> Option<Session> {
    let mut aggregator = SessionAggregator::new();
    for record in records {
        aggregator.push(record);
    }
    aggregator.finish(preferred_id)
}

/// First line of `text`, trimmed and capped at [`TITLE_MAX_CHARS`].
pub fn derive_title(text: &str) -> Option<String> {
    let first_line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(first_line.chars().take(TITLE_MAX_CHARS).collect::<String>().trim_end().to_string())
}

struct UserParts {
    text: String,
    images: Vec<ImageAttachment>,
    results: Vec<ClassifiedResult>,
}

impl UserParts {
    /// Split user content. The structured `toolUseResult` belongs to the first
    /// result block; later blocks are classified from their text alone.
    fn split(content: &[ContentBlock], tool_use_result: Option<&serde_json::Value>) -> Self {
        let mut texts = Vec::new();
        let mut images = Vec::new();
        let mut results = Vec::new();
        let mut payload = tool_use_result;

        for block in content {
            match block {
                ContentBlock::Text { text } => texts.push(text.as_str()),
                ContentBlock::Image(image) => images.push(image.clone()),
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => {
                    results.push(classify_result(
                        payload.take(),
                        content,
                        tool_use_id.clone(),
                        *is_error,
                    ));
                }
                ContentBlock::ToolUse(_) | ContentBlock::Thinking { .. } | ContentBlock::Unknown => {}
            }
        }

        Self {
            text: strip_control_markers(&texts.join("\n")),
            images,
            results,
        }
    }
}

struct AssistantParts {
    text: String,
    thinking: String,
    images: Vec<ImageAttachment>,
    tool_uses: Vec<ToolCall>,
}

impl AssistantParts {
    fn split(content: &[ContentBlock]) -> Self {
        let mut texts = Vec::new();
        let mut thinking = Vec::new();
        let mut images = Vec::new();
        let mut tool_uses = Vec::new();

        for block in content {
            match block {
                ContentBlock::Text { text } => texts.push(text.as_str()),
                ContentBlock::Thinking { thinking: t } => thinking.push(t.as_str()),
                ContentBlock::Image(image) => images.push(image.clone()),
                ContentBlock::ToolUse(call) => tool_uses.push(call.clone()),
                ContentBlock::ToolResult { .. } | ContentBlock::Unknown => {}
            }
        }

        Self {
            text: strip_control_markers(&texts.join("\n")),
            thinking: thinking.join("\n\n"),
            images,
            tool_uses,
        }
    }
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;
