//! Property-based tests for the classifier and aggregation invariants.

use crate::aggregate::parse_session_str;
use crate::classify::classify;
use crate::model::{ResultKind, TokenUsage};
use crate::parser::{parse_record_graceful, ParseResult};
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::path::Path;

const KIND_NAMES: &[&str] = &[
    "bash",
    "file_read",
    "file_edit",
    "file_write",
    "glob",
    "grep",
    "web_search",
    "web_fetch",
    "task",
    "todo_write",
    "user_input",
    "plan",
    "unknown",
];

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 _]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(
                (
                    prop_oneof![
                        Just("stdout".to_string()),
                        Just("filePath".to_string()),
                        Just("filenames".to_string()),
                        Just("content".to_string()),
                        Just("oldTodos".to_string()),
                        Just("structuredPatch".to_string()),
                        "[a-z]{1,8}",
                    ],
                    inner
                ),
                0..6
            )
            .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

// ===== Property 1: Classifier Totality =====

proptest! {
    #[test]
    fn classify_maps_any_payload_to_one_known_kind(payload in arb_json(), text in ".{0,40}") {
        let kind = classify(Some(&payload), &text);
        prop_assert!(KIND_NAMES.contains(&kind.name()), "unexpected kind {}", kind.name());
    }

    #[test]
    fn classify_without_payload_is_unknown(text in ".{0,40}") {
        let kind = classify(None, &text);
        prop_assert!(matches!(kind, ResultKind::Unknown(_)));
    }
}

// ===== Property 2: Parser Never Panics =====

proptest! {
    #[test]
    fn parse_record_graceful_accepts_any_line(line in ".{0,200}") {
        match parse_record_graceful(&line, 1) {
            ParseResult::Valid(_) => {}
            ParseResult::Malformed(entry) => prop_assert_eq!(entry.line_number(), 1),
        }
    }
}

// ===== Property 3: Token Totals Are Sums =====

proptest! {
    #[test]
    fn session_usage_is_sum_of_assistant_usage(
        turns in prop::collection::vec(
            (0u64..1_000_000, 0u64..100_000, 0u64..50_000, 0u64..50_000),
            1..20
        )
    ) {
        let mut lines = vec![json!({
            "type": "user", "sessionId": "prop", "message": {"role": "user", "content": "go"}
        }).to_string()];
        let mut expected = TokenUsage::default();
        for (i, (input, output, created, read)) in turns.iter().enumerate() {
            expected.input_tokens += input;
            expected.output_tokens += output;
            expected.cache_creation_input_tokens += created;
            expected.cache_read_input_tokens += read;
            lines.push(json!({
                "type": "assistant", "sessionId": "prop", "uuid": format!("a{i}"),
                "message": {
                    "role": "assistant", "model": "claude-sonnet-4-5",
                    "content": [{"type": "text", "text": "ok"}],
                    "usage": {
                        "input_tokens": input, "output_tokens": output,
                        "cache_creation_input_tokens": created, "cache_read_input_tokens": read
                    }
                }
            }).to_string());
        }

        let session = parse_session_str(Path::new("prop.jsonl"), &lines.join("\n"), None).unwrap();
        prop_assert_eq!(session.metadata().usage, expected);

        let per_message = session
            .messages()
            .iter()
            .fold(TokenUsage::default(), |mut acc, m| {
                acc += *m.usage();
                acc
            });
        prop_assert_eq!(per_message, expected);
    }
}
