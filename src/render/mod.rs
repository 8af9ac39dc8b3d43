//! Session document rendering.
//!
//! A Markdown document is a YAML frontmatter block with a fixed key set,
//! a title header, and one section per message in original order:
//!
//! ```text
//! ---
//! title: "..."
//! created: ...
//! ...
//! ---
//!
//! # Title
//!
//! _Created: ... | Models: ... | Tokens: ... | Tool calls: ..._
//!
//! ---
//!
//! ### User
//! ...
//! ```
//!
//! Frontmatter keys are always emitted, empty when unknown, so downstream
//! tooling can rely on the key set.

pub mod json;
pub mod results;
pub mod tools;
pub mod truncate;

pub use json::{render_json, JSON_SCHEMA_VERSION};
pub use results::render_result;
pub use tools::render_tool_use;

use crate::model::{Message, Role, Session};
use chrono::{DateTime, SecondsFormat, Utc};

/// Frontmatter keys in emission order.
pub const FRONTMATTER_KEYS: &[&str] = &[
    "title",
    "created",
    "updated",
    "session_id",
    "models_used",
    "total_input_tokens",
    "total_output_tokens",
    "total_cache_read_tokens",
    "total_cache_creation_tokens",
    "total_tool_calls",
    "tool_call_breakdown",
    "working_directory",
    "git_branch",
    "claude_code_version",
    "permission_mode",
    "message_count",
    "compactions",
];

/// Render a session as a Markdown document.
pub fn render_markdown(session: &Session) -> String {
    let sections: Vec<String> = session
        .messages()
        .iter()
        .filter_map(render_message)
        .collect();

    format!(
        "{}\n{}\n{}\n",
        frontmatter(session),
        header(session),
        sections.join("\n")
    )
}

fn frontmatter(session: &Session) -> String {
    let meta = session.metadata();
    let mut lines = vec!["---".to_string()];

    lines.push(format!("title: \"{}\"", escape_yaml(session.title())));
    lines.push(format!("created: {}", iso_or_empty(meta.first_timestamp)));
    lines.push(format!("updated: {}", iso_or_empty(meta.last_timestamp)));
    lines.push(format!("session_id: {}", session.id()));
    lines.push(format!("models_used: {}", meta.models_joined()));
    lines.push(format!("total_input_tokens: {}", meta.usage.input_tokens));
    lines.push(format!("total_output_tokens: {}", meta.usage.output_tokens));
    lines.push(format!(
        "total_cache_read_tokens: {}",
        meta.usage.cache_read_input_tokens
    ));
    lines.push(format!(
        "total_cache_creation_tokens: {}",
        meta.usage.cache_creation_input_tokens
    ));
    lines.push(format!("total_tool_calls: {}", meta.total_tool_calls));

    let breakdown = meta.tool_call_breakdown();
    if breakdown.is_empty() {
        lines.push("tool_call_breakdown: {}".to_string());
    } else {
        lines.push("tool_call_breakdown:".to_string());
        lines.extend(
            breakdown
                .iter()
                .map(|(tool, count)| format!("  {tool}: {count}")),
        );
    }

    lines.push(format!(
        "working_directory: \"{}\"",
        escape_yaml(meta.cwd.as_deref().unwrap_or(""))
    ));
    lines.push(format!("git_branch: {}", meta.git_branch.as_deref().unwrap_or("")));
    lines.push(format!(
        "claude_code_version: {}",
        meta.version.as_deref().unwrap_or("")
    ));
    lines.push(format!(
        "permission_mode: {}",
        meta.permission_mode.as_deref().unwrap_or("")
    ));
    lines.push(format!("message_count: {}", session.messages().len()));
    lines.push(format!("compactions: {}", meta.compactions));
    lines.push("---".to_string());
    lines.join("\n")
}

fn header(session: &Session) -> String {
    let meta = session.metadata();
    let mut parts = Vec::new();
    if let Some(created) = meta.first_timestamp {
        parts.push(format!("Created: {}", display_time(created)));
    }
    if !meta.models_used.is_empty() {
        parts.push(format!("Models: {}", meta.models_joined()));
    }
    let tokens = meta.usage.total();
    if tokens > 0 {
        parts.push(format!("Tokens: {}", thousands(tokens)));
    }
    if meta.total_tool_calls > 0 {
        parts.push(format!("Tool calls: {}", meta.total_tool_calls));
    }

    let mut out = format!("\n# {}\n", session.title());
    if !parts.is_empty() {
        out.push_str(&format!("\n_{}_\n", parts.join(" | ")));
    }
    out.push_str("\n---\n");
    out
}

/// Render one message section, or `None` when it has nothing to show.
pub fn render_message(message: &Message) -> Option<String> {
    match message.role() {
        Role::User => Some(render_user(message)),
        Role::Assistant => Some(render_assistant(message)),
        Role::System => render_system(message),
    }
}

fn render_user(message: &Message) -> String {
    let mut blocks = vec![heading("User", message)];

    if let Some(ts) = message.timestamp() {
        blocks.push(format!("_{}_", display_time(ts)));
    }
    if message.tool_result().is_some() {
        if let Some(slug) = message.slug() {
            blocks.push(format!("_Tool response: {slug}_"));
        }
    }

    if let Some(text) = message.text() {
        if message.is_compact_summary() {
            blocks.push(format!(
                "<details><summary>Compacted history</summary>\n\n{text}\n\n</details>"
            ));
        } else {
            blocks.push(text.to_string());
        }
    }
    blocks.extend(message.images().iter().map(|image| {
        format!(
            "_[image: {}, {} bytes]_",
            image.media_type,
            image.decoded_len()
        )
    }));
    if let Some(result) = message.tool_result().and_then(render_result) {
        blocks.push(result);
    }

    finish_section(blocks)
}

fn render_assistant(message: &Message) -> String {
    let mut blocks = vec![heading("Assistant", message)];

    let mut meta = Vec::new();
    if let Some(model) = message.model() {
        meta.push(format!("Model: {}", model.id()));
    }
    let usage = message.usage();
    if usage.input_tokens > 0 {
        meta.push(format!("In: {}", thousands(usage.input_tokens)));
    }
    if usage.output_tokens > 0 {
        meta.push(format!("Out: {}", thousands(usage.output_tokens)));
    }
    if let Some(ts) = message.timestamp() {
        meta.push(display_time(ts));
    }
    if !meta.is_empty() {
        blocks.push(format!("_{}_", meta.join(" | ")));
    }

    if let Some(thinking) = message.thinking() {
        blocks.push(format!(
            "<details><summary>Thinking</summary>\n\n{thinking}\n\n</details>"
        ));
    }
    if let Some(text) = message.text() {
        blocks.push(text.to_string());
    }
    blocks.extend(message.images().iter().map(|image| {
        format!("_[image: {}, {} bytes]_", image.media_type, image.decoded_len())
    }));
    blocks.extend(message.tool_uses().iter().map(render_tool_use));

    finish_section(blocks)
}

fn render_system(message: &Message) -> Option<String> {
    let event = message.system_event()?;
    if event.is_compaction() {
        return Some("*--- Context compacted ---*\n".to_string());
    }
    event
        .content
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(|content| format!("*[System: {content}]*\n"))
}

fn heading(role: &str, message: &Message) -> String {
    if message.is_sidechain() {
        format!("### {role} (subagent)")
    } else {
        format!("### {role}")
    }
}

fn finish_section(blocks: Vec<String>) -> String {
    format!("{}\n\n---\n", blocks.join("\n\n"))
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn display_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn iso_or_empty(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_default()
}

fn escape_yaml(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " ")
}

/// Format with `,` thousands separators.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
