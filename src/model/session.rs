//! Session and session metadata types.
//!
//! Session is the aggregate root produced by the aggregator. It is never mutated
//! after aggregation completes; renderers take a read-only view.

use crate::model::{MalformedEntry, Message, ModelInfo, Role, SessionId, TokenUsage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

// ===== SessionMetadata =====

/// Rollup over one session's records.
///
/// # Invariants
///
/// - `usage` equals the sum of every message's usage, synthetic turns included
/// - `models_used` never contains the synthetic sentinel
/// - `total_tool_calls` equals the sum of `tool_call_counts`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionMetadata {
    /// Earliest record timestamp.
    pub first_timestamp: Option<DateTime<Utc>>,
    /// Latest record timestamp.
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Real models seen, sorted.
    pub models_used: BTreeSet<ModelInfo>,
    /// Summed token usage.
    pub usage: TokenUsage,
    /// Tool invocations across all messages.
    pub total_tool_calls: usize,
    /// Invocations per tool name.
    pub tool_call_counts: BTreeMap<String, usize>,
    /// First `cwd` seen.
    pub cwd: Option<String>,
    /// First git branch seen.
    pub git_branch: Option<String>,
    /// First producer version seen.
    pub version: Option<String>,
    /// First permission mode seen.
    pub permission_mode: Option<String>,
    /// Context-reset system events seen.
    pub compactions: usize,
    /// Messages from subagent branches.
    pub sidechain_messages: usize,
    /// Assistant stop reasons and their counts.
    pub stop_reasons: BTreeMap<String, usize>,
    /// Lines skipped as malformed.
    pub malformed_lines: usize,
}

impl SessionMetadata {
    /// Seconds between the first and last timestamp.
    pub fn wall_clock_seconds(&self) -> Option<i64> {
        match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => Some((last - first).num_seconds().max(0)),
            _ => None,
        }
    }

    /// Tool call counts, most used first, ties by name.
    pub fn tool_call_breakdown(&self) -> Vec<(&str, usize)> {
        let mut breakdown: Vec<(&str, usize)> = self
            .tool_call_counts
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        breakdown
    }

    /// Model ids joined with `", "`.
    pub fn models_joined(&self) -> String {
        self.models_used
            .iter()
            .map(ModelInfo::id)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ===== Session =====

/// A complete, aggregated conversation.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    title: String,
    messages: Vec<Message>,
    metadata: SessionMetadata,
    malformed: Vec<MalformedEntry>,
}

impl Session {
    /// Assemble a session. Called by the aggregator once all records are folded.
    pub fn new(
        id: SessionId,
        title: String,
        messages: Vec<Message>,
        metadata: SessionMetadata,
        malformed: Vec<MalformedEntry>,
    ) -> Self {
        Self {
            id,
            title,
            messages,
            metadata,
            malformed,
        }
    }

    /// Get the session id.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Get the derived title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Get the messages in file order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the session metadata.
    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Lines that were skipped during parsing.
    pub fn malformed(&self) -> &[MalformedEntry] {
        &self.malformed
    }

    /// True when at least one user-authored text exists.
    pub fn has_user_text(&self) -> bool {
        self.messages.iter().any(Message::is_user_authored)
    }

    /// Read-only (role, text) view used by search and exclusion matching.
    pub fn text_items(&self) -> impl Iterator<Item = (Role, &str)> + '_ {
        self.messages.iter().filter_map(|msg| {
            let text = msg
                .text()
                .or_else(|| msg.system_event().and_then(|e| e.content.as_deref()))?;
            Some((msg.role(), text))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SystemEvent;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().expect("valid timestamp")
    }

    #[test]
    fn wall_clock_seconds_spans_first_to_last() {
        let meta = SessionMetadata {
            first_timestamp: Some(ts("2025-01-01T10:00:00Z")),
            last_timestamp: Some(ts("2025-01-01T10:02:30Z")),
            ..Default::default()
        };
        assert_eq!(meta.wall_clock_seconds(), Some(150));
    }

    #[test]
    fn wall_clock_seconds_none_without_timestamps() {
        assert_eq!(SessionMetadata::default().wall_clock_seconds(), None);
    }

    #[test]
    fn tool_call_breakdown_sorts_by_count_then_name() {
        let mut meta = SessionMetadata::default();
        meta.tool_call_counts.insert("Read".to_string(), 2);
        meta.tool_call_counts.insert("Bash".to_string(), 5);
        meta.tool_call_counts.insert("Edit".to_string(), 2);

        assert_eq!(
            meta.tool_call_breakdown(),
            vec![("Bash", 5), ("Edit", 2), ("Read", 2)]
        );
    }

    #[test]
    fn text_items_include_system_content() {
        let session = Session::new(
            SessionId::new("s").unwrap(),
            "t".to_string(),
            vec![
                Message::new(Role::User).with_text("hello"),
                Message::new(Role::Assistant),
                Message::system(SystemEvent {
                    subtype: Some("informational".into()),
                    content: Some("notice".into()),
                    level: None,
                }),
            ],
            SessionMetadata::default(),
            Vec::new(),
        );

        let items: Vec<_> = session.text_items().collect();
        assert_eq!(items, vec![(Role::User, "hello"), (Role::System, "notice")]);
        assert!(session.has_user_text());
    }
}
