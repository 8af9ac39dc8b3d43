//! Full-text search over parsed sessions.
//!
//! Sessions are parsed on demand and scanned message by message; there is no
//! index. Matching is a case-insensitive substring test.

use crate::aggregate::parse_session;
use crate::model::error::AppError;
use crate::model::{Role, Session, SessionId};
use crate::source;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

/// Results returned when no limit is given.
pub const DEFAULT_LIMIT: usize = 50;

/// Characters of context kept on each side of a match.
pub const SNIPPET_CONTEXT: usize = 80;

/// One searchable piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextItem<'a> {
    /// Session the text belongs to.
    pub session_id: &'a SessionId,
    /// Author of the message.
    pub role: Role,
    /// Sanitized message text.
    pub text: &'a str,
    /// Message timestamp.
    pub timestamp: Option<DateTime<Utc>>,
}

/// A message containing the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// Project display name.
    pub project: String,
    /// Session id.
    pub session_id: String,
    /// Session title.
    pub title: String,
    /// Author of the message.
    pub role: Role,
    /// Message timestamp.
    pub timestamp: Option<DateTime<Utc>>,
    /// Text around the first match.
    pub snippet: String,
}

/// Message texts of a session in order, system event content included.
pub fn text_items(session: &Session) -> impl Iterator<Item = TextItem<'_>> + '_ {
    session.messages().iter().filter_map(move |msg| {
        let text = msg
            .text()
            .or_else(|| msg.system_event().and_then(|e| e.content.as_deref()))?;
        Some(TextItem {
            session_id: session.id(),
            role: msg.role(),
            text,
            timestamp: msg.timestamp(),
        })
    })
}

/// Matches within one session, at most `limit`.
pub fn search_session(session: &Session, project: &str, query: &str, limit: usize) -> Vec<SearchMatch> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    text_items(session)
        .filter_map(|item| {
            let range = find_ignore_case(item.text, &needle)?;
            Some(SearchMatch {
                project: project.to_string(),
                session_id: item.session_id.to_string(),
                title: session.title().to_string(),
                role: item.role,
                timestamp: item.timestamp,
                snippet: snippet(item.text, range),
            })
        })
        .take(limit)
        .collect()
}

/// Search every session under `root`, in (project, session id) order.
///
/// Sessions that fail to load are skipped.
///
/// # Errors
///
/// Propagates discovery errors from [`source::all_sessions`].
pub fn search(root: &Path, query: &str, limit: usize) -> Result<Vec<SearchMatch>, AppError> {
    let mut matches = Vec::new();
    if query.trim().is_empty() {
        return Ok(matches);
    }
    for file in source::all_sessions(root, None)? {
        if matches.len() >= limit {
            break;
        }
        let session = match parse_session(&file.path) {
            Ok(session) => session,
            Err(e) => {
                debug!(session_id = %file.id, error = %e, "Skipping unreadable session");
                continue;
            }
        };
        let remaining = limit - matches.len();
        matches.extend(search_session(&session, &file.project, query, remaining));
    }
    Ok(matches)
}

/// Byte range of the first case-insensitive occurrence of `needle`, which
/// must already be lowercase.
fn find_ignore_case(text: &str, needle: &str) -> Option<Range<usize>> {
    'start: for (start, _) in text.char_indices() {
        let mut wanted = needle.chars();
        let mut rest = text[start..].chars();
        let mut end = start;
        loop {
            if wanted.as_str().is_empty() {
                return Some(start..end);
            }
            let Some(ch) = rest.next() else {
                continue 'start;
            };
            for lower in ch.to_lowercase() {
                if wanted.next() != Some(lower) {
                    continue 'start;
                }
            }
            end += ch.len_utf8();
        }
    }
    None
}

fn snippet(text: &str, range: Range<usize>) -> String {
    let from = text[..range.start]
        .char_indices()
        .rev()
        .nth(SNIPPET_CONTEXT - 1)
        .map_or(0, |(i, _)| i);
    let to = text[range.end..]
        .char_indices()
        .nth(SNIPPET_CONTEXT)
        .map_or(text.len(), |(i, _)| range.end + i);
    text[from..to].to_string()
}
