//! Tests for session aggregation.

use super::*;
use crate::model::{ResultKind, ToolName};
use std::path::PathBuf;

fn label() -> PathBuf {
    PathBuf::from("memory.jsonl")
}

fn sid(id: &str) -> Option<SessionId> {
    SessionId::new(id).ok()
}

fn user(uuid: &str, ts: &str, text: &str) -> String {
    serde_json::json!({
        "type": "user", "uuid": uuid, "sessionId": "sess-1", "timestamp": ts,
        "cwd": "/home/me/proj", "gitBranch": "main", "version": "2.0.14",
        "message": {"role": "user", "content": text}
    })
    .to_string()
}

fn assistant(uuid: &str, ts: &str, model: &str, content: serde_json::Value, input: u64, output: u64) -> String {
    serde_json::json!({
        "type": "assistant", "uuid": uuid, "sessionId": "sess-1", "timestamp": ts,
        "message": {
            "role": "assistant", "model": model, "content": content,
            "usage": {"input_tokens": input, "output_tokens": output,
                      "cache_read_input_tokens": 10, "cache_creation_input_tokens": 5},
            "stop_reason": "end_turn"
        }
    })
    .to_string()
}

fn parse(lines: &[String]) -> Session {
    parse_session_str(&label(), &lines.join("\n"), None).unwrap()
}

#[test]
fn folds_user_and_assistant_in_order() {
    let session = parse(&[
        user("u1", "2025-01-01T10:00:00Z", "fix bug X"),
        assistant(
            "a1",
            "2025-01-01T10:00:05Z",
            "claude-sonnet-4-5",
            serde_json::json!([
                {"type": "thinking", "thinking": "look at the tests"},
                {"type": "text", "text": "Running the tests."},
                {"type": "tool_use", "id": "toolu_1", "name": "Bash", "input": {"command": "pytest"}}
            ]),
            100,
            20,
        ),
    ]);

    assert_eq!(session.id().as_str(), "sess-1");
    assert_eq!(session.title(), "fix bug X");
    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role(), Role::User);
    assert_eq!(messages[1].text(), Some("Running the tests."));
    assert_eq!(messages[1].thinking(), Some("look at the tests"));
    assert_eq!(messages[1].tool_uses()[0].name(), &ToolName::Bash);

    let meta = session.metadata();
    assert_eq!(meta.total_tool_calls, 1);
    assert_eq!(meta.tool_call_counts.get("Bash"), Some(&1));
    assert_eq!(meta.cwd.as_deref(), Some("/home/me/proj"));
    assert_eq!(meta.git_branch.as_deref(), Some("main"));
    assert_eq!(meta.version.as_deref(), Some("2.0.14"));
    assert_eq!(meta.wall_clock_seconds(), Some(5));
    assert_eq!(meta.stop_reasons.get("end_turn"), Some(&1));
}

#[test]
fn malformed_middle_line_does_not_stop_the_rest() {
    let mut lines = Vec::new();
    for i in 0..10 {
        let ts = format!("2025-01-01T10:00:{i:02}Z");
        if i == 4 {
            lines.push("{\"type\":\"user\",\"message\":{\"role\":\"us".to_string());
        } else if i % 2 == 0 {
            lines.push(user(&format!("u{i}"), &ts, &format!("question {i}")));
        } else {
            lines.push(assistant(
                &format!("a{i}"),
                &ts,
                "claude-opus-4-1",
                serde_json::json!([{"type": "text", "text": format!("answer {i}")}]),
                1,
                1,
            ));
        }
    }

    let session = parse(&lines);
    assert_eq!(session.messages().len(), 9);
    assert_eq!(session.malformed().len(), 1);
    assert_eq!(session.malformed()[0].line_number(), 5);
    assert_eq!(session.metadata().malformed_lines, 1);
}

#[test]
fn malformed_first_line_is_a_session_error() {
    let content = format!("not json\n{}", user("u1", "2025-01-01T10:00:00Z", "hi"));
    let result = parse_session_str(&label(), &content, sid("x"));
    assert!(matches!(
        result,
        Err(SessionLoadError::UnreadableStart { .. })
    ));
}

#[test]
fn leading_blank_lines_do_not_count_as_first_record() {
    let content = format!("\n   \n{}", user("u1", "2025-01-01T10:00:00Z", "hi"));
    let session = parse_session_str(&label(), &content, None).unwrap();
    assert_eq!(session.messages().len(), 1);
}

#[test]
fn missing_session_id_everywhere_is_an_error() {
    let content = r#"{"type":"summary","summary":"s"}"#;
    assert!(matches!(
        parse_session_str(&label(), content, None),
        Err(SessionLoadError::MissingSessionId { .. })
    ));
}

#[test]
fn preferred_id_wins_over_record_session_id() {
    let content = user("u1", "2025-01-01T10:00:00Z", "hi");
    let session = parse_session_str(&label(), &content, sid("file-stem")).unwrap();
    assert_eq!(session.id().as_str(), "file-stem");
}

#[test]
fn title_falls_back_to_session_id() {
    let session = parse(&[assistant(
        "a1",
        "2025-01-01T10:00:00Z",
        "claude-haiku-4-5",
        serde_json::json!([{"type": "text", "text": "hello"}]),
        1,
        1,
    )]);
    assert_eq!(session.title(), "sess-1");
}

#[test]
fn title_uses_first_line_capped_and_skips_markers() {
    let long = "x".repeat(150);
    let text = format!("<system-reminder>noise</system-reminder>\n\n{long}\nsecond line");
    let session = parse(&[user("u1", "2025-01-01T10:00:00Z", &text)]);
    assert_eq!(session.title().chars().count(), TITLE_MAX_CHARS);
    assert!(!session.title().contains("noise"));
}

#[test]
fn meta_user_turns_do_not_become_the_title() {
    let meta = serde_json::json!({
        "type": "user", "sessionId": "sess-1", "isMeta": true, "timestamp": "2025-01-01T10:00:00Z",
        "message": {"role": "user", "content": "Caveat: generated by local commands"}
    })
    .to_string();
    let session = parse(&[meta, user("u1", "2025-01-01T10:00:01Z", "real question")]);
    assert_eq!(session.title(), "real question");
}

#[test]
fn synthetic_model_is_excluded_but_usage_counts() {
    let session = parse(&[
        user("u1", "2025-01-01T10:00:00Z", "hi"),
        assistant(
            "a1",
            "2025-01-01T10:00:01Z",
            "<synthetic>",
            serde_json::json!([{"type": "text", "text": "No response requested."}]),
            7,
            3,
        ),
        assistant(
            "a2",
            "2025-01-01T10:00:02Z",
            "claude-opus-4-1",
            serde_json::json!([{"type": "text", "text": "ok"}]),
            100,
            50,
        ),
    ]);

    let meta = session.metadata();
    assert_eq!(meta.models_used.len(), 1);
    assert_eq!(meta.models_joined(), "claude-opus-4-1");
    assert!(session.messages()[1].model().is_none());
    assert_eq!(meta.usage.input_tokens, 107);
    assert_eq!(meta.usage.output_tokens, 53);
    assert_eq!(meta.usage.cache_read_input_tokens, 20);

    let summed: u64 = session.messages().iter().map(|m| m.usage().input_tokens).sum();
    assert_eq!(summed, meta.usage.input_tokens);
}

#[test]
fn compaction_emits_boundary_message_and_counts() {
    let boundary = serde_json::json!({
        "type": "system", "subtype": "compact_boundary", "sessionId": "sess-1",
        "timestamp": "2025-01-01T10:05:00Z", "content": "Conversation compacted", "level": "info"
    })
    .to_string();
    let summary = serde_json::json!({
        "type": "user", "sessionId": "sess-1", "isCompactSummary": true,
        "timestamp": "2025-01-01T10:05:01Z",
        "message": {"role": "user", "content": "This session is being continued..."}
    })
    .to_string();
    let session = parse(&[user("u1", "2025-01-01T10:00:00Z", "start"), boundary, summary]);

    assert_eq!(session.metadata().compactions, 1);
    assert!(session.messages()[1].is_compaction());
    assert!(session.messages()[2].is_compact_summary());
    assert!(!session.messages()[2].is_user_authored());
}

#[test]
fn tool_result_is_classified_with_structured_payload() {
    let result = serde_json::json!({
        "type": "user", "sessionId": "sess-1", "timestamp": "2025-01-01T10:00:02Z",
        "message": {"role": "user", "content": [
            {"type": "tool_result", "tool_use_id": "toolu_1", "content": "Exit code 1\nModuleNotFoundError", "is_error": true}
        ]},
        "toolUseResult": {"stdout": "", "stderr": "ModuleNotFoundError", "interrupted": false}
    })
    .to_string();
    let session = parse(&[user("u1", "2025-01-01T10:00:00Z", "run tests"), result]);

    let classified = session.messages()[1].tool_result().unwrap();
    assert!(classified.is_error);
    let ResultKind::Bash(bash) = &classified.kind else {
        panic!("expected bash result");
    };
    assert_eq!(bash.exit_code, Some(1));
    assert_eq!(bash.stderr, "ModuleNotFoundError");
}

#[test]
fn multiple_result_blocks_emit_one_message_each() {
    let result = serde_json::json!({
        "type": "user", "sessionId": "sess-1", "timestamp": "2025-01-01T10:00:02Z",
        "message": {"role": "user", "content": [
            {"type": "tool_result", "tool_use_id": "toolu_1", "content": "one"},
            {"type": "tool_result", "tool_use_id": "toolu_2", "content": "two"}
        ]}
    })
    .to_string();
    let session = parse(&[user("u1", "2025-01-01T10:00:00Z", "go"), result]);
    let ids: Vec<_> = session.messages()[1..]
        .iter()
        .filter_map(|m| m.tool_result())
        .filter_map(|r| r.tool_use_id.as_ref().map(|id| id.as_str().to_string()))
        .collect();
    assert_eq!(ids, vec!["toolu_1", "toolu_2"]);
}

#[test]
fn user_turn_with_only_markers_is_dropped() {
    let session = parse(&[
        user("u1", "2025-01-01T10:00:00Z", "<system-reminder>x</system-reminder>"),
        user("u2", "2025-01-01T10:00:01Z", "real"),
    ]);
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].text(), Some("real"));
}

#[test]
fn unknown_record_types_contribute_only_timestamps() {
    let snapshot = serde_json::json!({
        "type": "file-history-snapshot", "messageId": "m1",
        "snapshot": {"timestamp": "2025-01-01T09:59:00Z", "trackedFileBackups": {}}
    })
    .to_string();
    let session = parse(&[snapshot, user("u1", "2025-01-01T10:00:00Z", "hi")]);
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.metadata().wall_clock_seconds(), Some(60));
}

#[test]
fn parse_session_reads_file_and_uses_stem_as_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("abc-123.jsonl");
    std::fs::write(&path, user("u1", "2025-01-01T10:00:00Z", "hello")).unwrap();
    let session = parse_session(&path).unwrap();
    assert_eq!(session.id().as_str(), "abc-123");
}

#[test]
fn parse_session_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        parse_session(&dir.path().join("gone.jsonl")),
        Err(SessionLoadError::Io { .. })
    ));
}

#[test]
fn derive_title_edge_cases() {
    assert_eq!(derive_title(""), None);
    assert_eq!(derive_title("\n  \n"), None);
    assert_eq!(derive_title("  padded  \nrest").as_deref(), Some("padded"));
}
