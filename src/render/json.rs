//! JSON export format.
//!
//! Everything the session holds, plus computed stats, in one document. The
//! output carries no wall-clock fields, so exporting an unchanged session
//! twice yields identical bytes.

use crate::model::{MalformedEntry, Message, Session, SessionId, SessionMetadata, SessionStats};
use serde::Serialize;

/// Version of the JSON document layout.
pub const JSON_SCHEMA_VERSION: &str = "2.0";

#[derive(Serialize)]
struct JsonDocument<'a> {
    schema_version: &'static str,
    session_id: &'a SessionId,
    title: &'a str,
    metadata: &'a SessionMetadata,
    stats: &'a SessionStats,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "no_entries")]
    malformed_lines: &'a [MalformedEntry],
}

fn no_entries(entries: &&[MalformedEntry]) -> bool {
    entries.is_empty()
}

/// Render a session and its stats as pretty-printed JSON.
///
/// # Errors
///
/// Returns the serializer error if a value cannot be encoded.
pub fn render_json(session: &Session, stats: &SessionStats) -> Result<String, serde_json::Error> {
    let document = JsonDocument {
        schema_version: JSON_SCHEMA_VERSION,
        session_id: session.id(),
        title: session.title(),
        metadata: session.metadata(),
        stats,
        messages: session.messages(),
        malformed_lines: session.malformed(),
    };
    let mut out = serde_json::to_string_pretty(&document)?;
    out.push('\n');
    Ok(out)
}
