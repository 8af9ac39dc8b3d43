//! Markdown templates for tool invocations.
//!
//! Every invocation renders as a block quote headed `> **Tool: Name**`. Known
//! tools get a dedicated body; anything else falls back to its pretty-printed
//! input.

use super::truncate::{
    fenced, quote, truncate, EDIT_SNIPPET_CEILING, GENERIC_INPUT_CEILING, PROMPT_CEILING,
    WRITE_CONTENT_CEILING,
};
use crate::model::{ToolCall, ToolName};
use serde_json::Value;

/// Render one tool invocation.
pub fn render_tool_use(call: &ToolCall) -> String {
    let mut body: Vec<String> = Vec::new();

    match call.name() {
        ToolName::Bash => {
            body.push(fenced(call.input_str("command"), "bash"));
            let description = call.input_str("description");
            if !description.is_empty() {
                body.push(format!("_{description}_"));
            }
        }
        ToolName::Read => {
            body.push(format!("File: `{}`", call.input_str("file_path")));
        }
        ToolName::Write => {
            body.push(format!("File: `{}`", call.input_str("file_path")));
            body.push(fenced(
                &truncate(call.input_str("content"), WRITE_CONTENT_CEILING),
                "",
            ));
        }
        ToolName::Edit => {
            body.push(format!("File: `{}`", call.input_str("file_path")));
            for (label, key) in [("Old", "old_string"), ("New", "new_string")] {
                let snippet = call.input_str(key);
                if !snippet.is_empty() {
                    body.push(format!(
                        "{label}:\n{}",
                        fenced(&truncate(snippet, EDIT_SNIPPET_CEILING), "")
                    ));
                }
            }
        }
        ToolName::Glob | ToolName::Grep => {
            let mut lines = vec![format!("Pattern: `{}`", call.input_str("pattern"))];
            let path = call.input_str("path");
            if !path.is_empty() {
                lines.push(format!("Path: `{path}`"));
            }
            body.push(lines.join("\n"));
        }
        ToolName::WebFetch => {
            body.push(format!("URL: `{}`", call.input_str("url")));
        }
        ToolName::WebSearch => {
            body.push(format!("Query: `{}`", call.input_str("query")));
        }
        ToolName::Task => {
            body.push(format!(
                "Description: {}\nAgent: {}",
                call.input_str("description"),
                call.input_str("subagent_type")
            ));
            let prompt = call.input_str("prompt");
            if !prompt.is_empty() {
                body.push(truncate(prompt, PROMPT_CEILING).into_owned());
            }
        }
        ToolName::TodoWrite => {
            let todos = call
                .input()
                .get("todos")
                .and_then(Value::as_array)
                .map(|todos| {
                    todos
                        .iter()
                        .map(|todo| {
                            let status = todo.get("status").and_then(Value::as_str).unwrap_or("");
                            let content = todo.get("content").and_then(Value::as_str).unwrap_or("");
                            format!("- {} {content}", todo_checkbox(status))
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            if !todos.is_empty() {
                body.push(todos.join("\n"));
            }
        }
        ToolName::AskUserQuestion => {
            if let Some(questions) = call.input().get("questions").and_then(Value::as_array) {
                for question in questions {
                    let text = question.get("question").and_then(Value::as_str).unwrap_or("");
                    body.push(format!("Q: {text}"));
                }
            }
        }
        ToolName::Other(_) => {
            let pretty = serde_json::to_string_pretty(call.input()).unwrap_or_default();
            body.push(format!(
                "Input:\n{}",
                fenced(&truncate(&pretty, GENERIC_INPUT_CEILING), "json")
            ));
        }
    }

    let mut out = format!("> **Tool: {}**", call.name().as_str());
    for part in body {
        out.push_str("\n>\n");
        out.push_str(&quote(&part));
    }
    out
}

/// Checkbox for a todo status.
pub fn todo_checkbox(status: &str) -> &'static str {
    match status {
        "completed" => "[x]",
        "in_progress" => "[~]",
        _ => "[ ]",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, input: Value) -> ToolCall {
        ToolCall::new(None, ToolName::parse(name), input)
    }

    #[test]
    fn bash_shows_literal_command() {
        insta::assert_snapshot!(
            render_tool_use(&call("Bash", json!({"command": "pytest"}))),
            @r"
        > **Tool: Bash**
        >
        > ```bash
        > pytest
        > ```
        "
        );
    }

    #[test]
    fn edit_shows_old_and_new() {
        insta::assert_snapshot!(
            render_tool_use(&call("Edit", json!({
                "file_path": "/a.py", "old_string": "x = 1", "new_string": "x = 2"
            }))),
            @r"
        > **Tool: Edit**
        >
        > File: `/a.py`
        >
        > Old:
        > ```
        > x = 1
        > ```
        >
        > New:
        > ```
        > x = 2
        > ```
        "
        );
    }

    #[test]
    fn write_content_is_truncated() {
        let content = "y".repeat(WRITE_CONTENT_CEILING + 10);
        let out = render_tool_use(&call("Write", json!({"file_path": "/n", "content": content})));
        assert!(out.contains("[truncated]"));
        assert!(!out.contains(&"y".repeat(WRITE_CONTENT_CEILING + 1)));
    }

    #[test]
    fn glob_path_is_optional() {
        let out = render_tool_use(&call("Glob", json!({"pattern": "**/*.rs"})));
        assert!(out.contains("Pattern: `**/*.rs`"));
        assert!(!out.contains("Path:"));
    }

    #[test]
    fn todo_write_lists_checkboxes() {
        let out = render_tool_use(&call(
            "TodoWrite",
            json!({"todos": [
                {"content": "a", "status": "completed"},
                {"content": "b", "status": "in_progress"},
                {"content": "c", "status": "pending"}
            ]}),
        ));
        assert!(out.contains("> - [x] a\n> - [~] b\n> - [ ] c"));
    }

    #[test]
    fn ask_user_question_lists_questions() {
        let out = render_tool_use(&call(
            "AskUserQuestion",
            json!({"questions": [{"question": "Which DB?"}]}),
        ));
        assert!(out.contains("> Q: Which DB?"));
    }

    #[test]
    fn unrecognized_tool_falls_back_to_input_dump() {
        let out = render_tool_use(&call("mcp__db__query", json!({"sql": "select 1"})));
        assert!(out.starts_with("> **Tool: mcp__db__query**"));
        assert!(out.contains("\"sql\": \"select 1\""));
    }
}
