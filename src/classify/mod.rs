//! Tool-result classifier.
//!
//! A tool result's structured payload (`toolUseResult`) does not say which tool
//! produced it. Classification is a shape-matching decision over an explicit,
//! ordered table of [`Shape`]s: each entry pairs a guard on the minimal
//! distinguishing field set with an extractor. The first matching guard wins,
//! and a payload matching none is `unknown` with the raw value preserved.
//!
//! The sibling invocation's tool name is never consulted.

use crate::model::{
    BashResult, ClassifiedResult, FileEditResult, FileReadResult, FileWriteResult, GlobResult,
    GrepResult, PlanResult, QuestionAnswer, ResultKind, SearchHit, TaskResult, TodoItem,
    TodoWriteResult, ToolUseId, UnknownResult, UserInputResult, WebFetchResult,
    WebSearchResult,
};
use crate::parser::flatten_text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

type Object = Map<String, Value>;

/// One entry of the classification table.
pub struct Shape {
    /// `result_kind` this shape yields.
    pub kind: &'static str,
    /// Guard on the minimal distinguishing field set.
    pub matches: fn(&Object) -> bool,
    /// Builds the result; `text` is the tool_result block text.
    pub extract: fn(&Object, &str) -> ResultKind,
}

/// Classification table in priority order.
pub static SHAPES: &[Shape] = &[
    Shape {
        kind: "bash",
        matches: is_bash,
        extract: extract_bash,
    },
    Shape {
        kind: "file_read",
        matches: is_file_read,
        extract: extract_file_read,
    },
    Shape {
        kind: "file_edit",
        matches: is_file_edit,
        extract: extract_file_edit,
    },
    Shape {
        kind: "file_write",
        matches: is_file_write,
        extract: extract_file_write,
    },
    Shape {
        kind: "glob",
        matches: is_glob,
        extract: extract_glob,
    },
    Shape {
        kind: "grep",
        matches: is_grep,
        extract: extract_grep,
    },
    Shape {
        kind: "web_search",
        matches: is_web_search,
        extract: extract_web_search,
    },
    Shape {
        kind: "web_fetch",
        matches: is_web_fetch,
        extract: extract_web_fetch,
    },
    Shape {
        kind: "task",
        matches: is_task,
        extract: extract_task,
    },
    Shape {
        kind: "todo_write",
        matches: is_todo_write,
        extract: extract_todo_write,
    },
    Shape {
        kind: "user_input",
        matches: is_user_input,
        extract: extract_user_input,
    },
    Shape {
        kind: "plan",
        matches: is_plan,
        extract: extract_plan,
    },
];

const EXIT_CODE_KEYS: &[&str] = &["exit_code", "exitCode", "returnCode"];

static EXIT_CODE_PREFIX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(?:Error: )?Exit code (-?\d+)").ok());

/// Classify a tool result.
///
/// * `payload` - the structured `toolUseResult` value, if the record had one
/// * `text` - text of the paired tool_result content block (may be empty)
///
/// Total: every input yields exactly one kind.
pub fn classify(payload: Option<&Value>, text: &str) -> ResultKind {
    match payload {
        Some(Value::Object(obj)) => SHAPES
            .iter()
            .find(|shape| (shape.matches)(obj))
            .map(|shape| (shape.extract)(obj, text))
            .unwrap_or_else(|| unknown(payload, text)),
        _ => unknown(payload, text),
    }
}

/// Classify and attach the pairing id and error flag.
pub fn classify_result(
    payload: Option<&Value>,
    text: &str,
    tool_use_id: Option<ToolUseId>,
    is_error: bool,
) -> ClassifiedResult {
    ClassifiedResult::new(classify(payload, text))
        .with_tool_use_id(tool_use_id)
        .with_error(is_error)
}

/// Whether a classified result has content worth showing on its own.
pub fn has_renderable_body(result: &ClassifiedResult) -> bool {
    result.has_renderable_body()
}

fn unknown(payload: Option<&Value>, text: &str) -> ResultKind {
    let text = if text.trim().is_empty() {
        payload.map(flatten_text).unwrap_or_default()
    } else {
        text.to_string()
    };
    ResultKind::Unknown(UnknownResult {
        text,
        raw: payload.cloned().unwrap_or(Value::Null),
    })
}

// ===== Field helpers =====

fn has(obj: &Object, key: &str) -> bool {
    obj.get(key).is_some_and(|v| !v.is_null())
}

fn str_field(obj: &Object, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_str(obj: &Object, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn opt_u64(obj: &Object, key: &str) -> Option<u64> {
    obj.get(key).and_then(Value::as_u64)
}

fn bool_field(obj: &Object, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn string_list(obj: &Object, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Hunks of a `structuredPatch` as unified diff text.
fn patch_text(obj: &Object) -> String {
    let Some(hunks) = obj.get("structuredPatch").and_then(Value::as_array) else {
        return String::new();
    };
    let mut out = Vec::new();
    for hunk in hunks.iter().filter_map(Value::as_object) {
        out.push(format!(
            "@@ -{},{} +{},{} @@",
            opt_u64(hunk, "oldStart").unwrap_or(0),
            opt_u64(hunk, "oldLines").unwrap_or(0),
            opt_u64(hunk, "newStart").unwrap_or(0),
            opt_u64(hunk, "newLines").unwrap_or(0),
        ));
        out.extend(string_list(hunk, "lines"));
    }
    out.join("\n")
}

// ===== bash =====

fn is_bash(obj: &Object) -> bool {
    has(obj, "stdout")
        || has(obj, "stderr")
        || (EXIT_CODE_KEYS.iter().any(|k| has(obj, k)) && has(obj, "interrupted"))
}

fn extract_bash(obj: &Object, text: &str) -> ResultKind {
    let exit_code = EXIT_CODE_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_i64))
        .or_else(|| exit_code_from_text(text));
    ResultKind::Bash(BashResult {
        stdout: str_field(obj, "stdout"),
        stderr: str_field(obj, "stderr"),
        exit_code,
        interrupted: bool_field(obj, "interrupted"),
        return_code_interpretation: opt_str(obj, "returnCodeInterpretation"),
    })
}

/// Parse a leading `Exit code N` from tool_result text.
fn exit_code_from_text(text: &str) -> Option<i64> {
    EXIT_CODE_PREFIX
        .as_ref()?
        .captures(text.trim_start())?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

// ===== file_read =====

fn is_file_read(obj: &Object) -> bool {
    obj.get("file").is_some_and(Value::is_object)
}

fn extract_file_read(obj: &Object, _text: &str) -> ResultKind {
    let empty = Object::new();
    let file = obj.get("file").and_then(Value::as_object).unwrap_or(&empty);
    ResultKind::FileRead(FileReadResult {
        file_path: str_field(file, "filePath"),
        content: str_field(file, "content"),
        num_lines: opt_u64(file, "numLines"),
        start_line: opt_u64(file, "startLine"),
        total_lines: opt_u64(file, "totalLines"),
    })
}

// ===== file_edit =====

fn is_file_edit(obj: &Object) -> bool {
    has(obj, "filePath") && has(obj, "oldString") && has(obj, "newString")
}

fn extract_file_edit(obj: &Object, _text: &str) -> ResultKind {
    ResultKind::FileEdit(FileEditResult {
        file_path: str_field(obj, "filePath"),
        old_string: str_field(obj, "oldString"),
        new_string: str_field(obj, "newString"),
        replace_all: bool_field(obj, "replaceAll"),
        diff: patch_text(obj),
    })
}

// ===== file_write =====

fn is_file_write(obj: &Object) -> bool {
    has(obj, "filePath")
        && has(obj, "content")
        && !has(obj, "oldString")
        && matches!(
            obj.get("type").and_then(Value::as_str),
            Some("create") | Some("update")
        )
}

fn extract_file_write(obj: &Object, _text: &str) -> ResultKind {
    ResultKind::FileWrite(FileWriteResult {
        file_path: str_field(obj, "filePath"),
        created: obj.get("type").and_then(Value::as_str) == Some("create"),
        content: str_field(obj, "content"),
        diff: patch_text(obj),
    })
}

// ===== glob =====

fn is_glob(obj: &Object) -> bool {
    obj.get("filenames").is_some_and(Value::is_array) && has(obj, "numFiles") && !has(obj, "mode")
}

fn extract_glob(obj: &Object, _text: &str) -> ResultKind {
    ResultKind::Glob(GlobResult {
        filenames: string_list(obj, "filenames"),
        file_count: opt_u64(obj, "numFiles").unwrap_or(0),
        truncated: bool_field(obj, "truncated"),
        duration_ms: opt_u64(obj, "durationMs"),
    })
}

// ===== grep =====

fn is_grep(obj: &Object) -> bool {
    obj.get("mode").is_some_and(Value::is_string)
}

fn extract_grep(obj: &Object, _text: &str) -> ResultKind {
    ResultKind::Grep(GrepResult {
        mode: str_field(obj, "mode"),
        filenames: string_list(obj, "filenames"),
        file_count: opt_u64(obj, "numFiles").unwrap_or(0),
        content: opt_str(obj, "content"),
        num_lines: opt_u64(obj, "numLines"),
    })
}

// ===== web_search =====

fn is_web_search(obj: &Object) -> bool {
    has(obj, "query") && has(obj, "results")
}

fn extract_web_search(obj: &Object, _text: &str) -> ResultKind {
    let mut hits = Vec::new();
    let mut summary = Vec::new();
    for item in obj
        .get("results")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        match item {
            Value::String(s) => summary.push(s.clone()),
            Value::Object(group) => {
                let entries = group.get("content").and_then(Value::as_array);
                for hit in entries.into_iter().flatten().filter_map(Value::as_object) {
                    hits.push(SearchHit {
                        title: str_field(hit, "title"),
                        url: str_field(hit, "url"),
                    });
                }
            }
            _ => {}
        }
    }
    ResultKind::WebSearch(WebSearchResult {
        query: str_field(obj, "query"),
        hits,
        summary: summary.join("\n"),
    })
}

// ===== web_fetch =====

fn is_web_fetch(obj: &Object) -> bool {
    has(obj, "url") && (has(obj, "result") || has(obj, "code") || has(obj, "bytes"))
}

fn extract_web_fetch(obj: &Object, _text: &str) -> ResultKind {
    ResultKind::WebFetch(WebFetchResult {
        url: str_field(obj, "url"),
        code: opt_u64(obj, "code"),
        code_text: opt_str(obj, "codeText"),
        bytes: opt_u64(obj, "bytes"),
        result: str_field(obj, "result"),
    })
}

// ===== task =====

fn is_task(obj: &Object) -> bool {
    (has(obj, "agentId") || has(obj, "totalDurationMs") || has(obj, "totalToolUseCount"))
        && (has(obj, "prompt") || has(obj, "content"))
}

fn extract_task(obj: &Object, text: &str) -> ResultKind {
    let output = obj.get("content").map(flatten_text).unwrap_or_default();
    ResultKind::Task(TaskResult {
        agent_id: opt_str(obj, "agentId"),
        status: opt_str(obj, "status"),
        prompt: str_field(obj, "prompt"),
        output: if output.is_empty() {
            text.to_string()
        } else {
            output
        },
        total_duration_ms: opt_u64(obj, "totalDurationMs"),
        total_tokens: opt_u64(obj, "totalTokens"),
        total_tool_use_count: opt_u64(obj, "totalToolUseCount"),
    })
}

// ===== todo_write =====

fn is_todo_write(obj: &Object) -> bool {
    has(obj, "newTodos") || has(obj, "oldTodos")
}

fn todo_list(obj: &Object, key: &str) -> Vec<TodoItem> {
    obj.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .map(|todo| TodoItem {
            content: str_field(todo, "content"),
            status: str_field(todo, "status"),
        })
        .collect()
}

fn extract_todo_write(obj: &Object, _text: &str) -> ResultKind {
    ResultKind::TodoWrite(TodoWriteResult {
        old_todos: todo_list(obj, "oldTodos"),
        new_todos: todo_list(obj, "newTodos"),
    })
}

// ===== user_input =====

fn is_user_input(obj: &Object) -> bool {
    has(obj, "questions") && has(obj, "answers")
}

fn answer_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn extract_user_input(obj: &Object, _text: &str) -> ResultKind {
    let empty = Object::new();
    let answers = obj.get("answers").and_then(Value::as_object).unwrap_or(&empty);

    let questions: Vec<String> = obj
        .get("questions")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|q| match q {
            Value::String(s) => Some(s.clone()),
            Value::Object(o) => opt_str(o, "question"),
            _ => None,
        })
        .collect();

    let mut pairs: Vec<QuestionAnswer> = questions
        .iter()
        .filter_map(|question| {
            answers.get(question).map(|answer| QuestionAnswer {
                question: question.clone(),
                answer: answer_text(answer),
            })
        })
        .collect();
    for (question, answer) in answers {
        if !questions.contains(question) {
            pairs.push(QuestionAnswer {
                question: question.clone(),
                answer: answer_text(answer),
            });
        }
    }

    ResultKind::UserInput(UserInputResult { answers: pairs })
}

// ===== plan =====

fn is_plan(obj: &Object) -> bool {
    obj.get("plan").is_some_and(Value::is_string)
}

fn extract_plan(obj: &Object, _text: &str) -> ResultKind {
    ResultKind::Plan(PlanResult {
        plan: str_field(obj, "plan"),
        file_path: opt_str(obj, "filePath"),
    })
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
