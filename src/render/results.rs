//! Markdown templates for classified tool results.
//!
//! A result is rendered only when it has a renderable body; otherwise the
//! paired invocation already says what happened and the result is omitted.

use super::truncate::{
    fenced, truncate, DIFF_CEILING, FILE_CONTENT_CEILING, GREP_CONTENT_CEILING,
    LIST_ENTRY_CEILING, PLAN_CEILING, STDERR_CEILING, STDOUT_CEILING, TASK_OUTPUT_CEILING,
    UNKNOWN_TEXT_CEILING, WEB_TEXT_CEILING,
};
use super::tools::todo_checkbox;
use crate::classify::has_renderable_body;
use crate::model::{ClassifiedResult, ResultKind};

/// Render a result, or `None` when it has no body worth showing.
pub fn render_result(result: &ClassifiedResult) -> Option<String> {
    if !has_renderable_body(result) {
        return None;
    }

    let mut parts = vec![result_heading(result)];

    match &result.kind {
        ResultKind::Bash(bash) => {
            if !bash.stdout.trim().is_empty() {
                parts.push(fenced(&truncate(&bash.stdout, STDOUT_CEILING), ""));
            }
            if !bash.stderr.trim().is_empty() {
                parts.push(format!(
                    "stderr:\n{}",
                    fenced(&truncate(&bash.stderr, STDERR_CEILING), "")
                ));
            }
            if let Some(note) = bash.return_code_interpretation.as_deref() {
                parts.push(format!("_{note}_"));
            }
        }
        ResultKind::FileRead(read) => {
            parts.push(format!("File: `{}`", read.file_path));
            parts.push(fenced(&truncate(&read.content, FILE_CONTENT_CEILING), ""));
        }
        ResultKind::FileEdit(edit) => {
            parts.push(format!("File: `{}`", edit.file_path));
            parts.push(fenced(&truncate(&edit.diff, DIFF_CEILING), "diff"));
        }
        ResultKind::FileWrite(write) => {
            let action = if write.created { "created" } else { "updated" };
            parts.push(format!("File: `{}` ({action})", write.file_path));
            parts.push(fenced(&truncate(&write.diff, DIFF_CEILING), "diff"));
        }
        ResultKind::Glob(glob) => {
            let mut summary = format!("{} files", glob.file_count);
            if glob.truncated {
                summary.push_str(" (truncated)");
            }
            parts.push(summary);
            parts.push(file_list(&glob.filenames));
        }
        ResultKind::Grep(grep) => match grep.content.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(content) => parts.push(fenced(&truncate(content, GREP_CONTENT_CEILING), "")),
            None => {
                parts.push(format!("{} files", grep.file_count));
                parts.push(file_list(&grep.filenames));
            }
        },
        ResultKind::WebSearch(search) => {
            if !search.query.is_empty() {
                parts.push(format!("Query: `{}`", search.query));
            }
            if !search.hits.is_empty() {
                parts.push(
                    search
                        .hits
                        .iter()
                        .map(|hit| format!("- [{}]({})", hit.title, hit.url))
                        .collect::<Vec<_>>()
                        .join("\n"),
                );
            }
            if !search.summary.trim().is_empty() {
                parts.push(truncate(&search.summary, WEB_TEXT_CEILING).into_owned());
            }
        }
        ResultKind::WebFetch(fetch) => {
            let mut line = format!("URL: `{}`", fetch.url);
            if let Some(code) = fetch.code {
                line.push_str(&format!(" ({code}"));
                if let Some(text) = fetch.code_text.as_deref() {
                    line.push_str(&format!(" {text}"));
                }
                line.push(')');
            }
            parts.push(line);
            parts.push(truncate(&fetch.result, WEB_TEXT_CEILING).into_owned());
        }
        ResultKind::Task(task) => {
            let mut line = String::from("Subagent");
            if let Some(id) = task.agent_id.as_deref() {
                line.push_str(&format!(" `{id}`"));
            }
            if let Some(status) = task.status.as_deref() {
                line.push_str(&format!(": {status}"));
            }
            parts.push(line);
            parts.push(truncate(&task.output, TASK_OUTPUT_CEILING).into_owned());
        }
        ResultKind::TodoWrite(todo) => {
            parts.push(
                todo.new_todos
                    .iter()
                    .map(|item| format!("- {} {}", todo_checkbox(&item.status), item.content))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        ResultKind::UserInput(input) => {
            parts.push(
                input
                    .answers
                    .iter()
                    .map(|qa| format!("Q: {}\nA: {}", qa.question, qa.answer))
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            );
        }
        ResultKind::Plan(plan) => {
            if let Some(path) = plan.file_path.as_deref() {
                parts.push(format!("File: `{path}`"));
            }
            parts.push(truncate(&plan.plan, PLAN_CEILING).into_owned());
        }
        ResultKind::Unknown(unknown) => {
            parts.push(fenced(&truncate(&unknown.text, UNKNOWN_TEXT_CEILING), ""));
        }
    }

    Some(parts.join("\n\n"))
}

/// `**Result: kind**` followed by exit-code and error indicators.
fn result_heading(result: &ClassifiedResult) -> String {
    let mut heading = format!("**Result: {}**", result.kind_name());
    let mut failed = result.is_error;
    if let ResultKind::Bash(bash) = &result.kind {
        if let Some(code) = bash.exit_code.filter(|code| *code != 0) {
            heading.push_str(&format!(" [exit code {code}]"));
        }
        if bash.interrupted {
            heading.push_str(" [interrupted]");
        }
        failed |= bash.failed();
    }
    if failed {
        heading.push_str(" [error]");
    }
    heading
}

fn file_list(filenames: &[String]) -> String {
    let mut lines: Vec<String> = filenames
        .iter()
        .take(LIST_ENTRY_CEILING)
        .map(|name| format!("- `{name}`"))
        .collect();
    if filenames.len() > LIST_ENTRY_CEILING {
        lines.push(format!("- ... {} more", filenames.len() - LIST_ENTRY_CEILING));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BashResult, GlobResult, UnknownResult};

    #[test]
    fn failing_bash_shows_exit_code_and_stderr() {
        let result = ClassifiedResult::new(ResultKind::Bash(BashResult {
            stderr: "ModuleNotFoundError".to_string(),
            exit_code: Some(1),
            ..Default::default()
        }));
        insta::assert_snapshot!(render_result(&result).unwrap(), @r"
        **Result: bash** [exit code 1] [error]

        stderr:
        ```
        ModuleNotFoundError
        ```
        ");
    }

    #[test]
    fn empty_bash_is_suppressed() {
        let result = ClassifiedResult::new(ResultKind::Bash(BashResult::default()));
        assert_eq!(render_result(&result), None);
    }

    #[test]
    fn glob_with_only_count_is_suppressed() {
        let result = ClassifiedResult::new(ResultKind::Glob(GlobResult {
            file_count: 3,
            ..Default::default()
        }));
        assert_eq!(render_result(&result), None);
    }

    #[test]
    fn long_glob_lists_are_capped() {
        let filenames: Vec<String> = (0..LIST_ENTRY_CEILING + 5).map(|i| format!("f{i}.rs")).collect();
        let result = ClassifiedResult::new(ResultKind::Glob(GlobResult {
            file_count: filenames.len() as u64,
            filenames,
            ..Default::default()
        }));
        let out = render_result(&result).unwrap();
        assert!(out.contains("- ... 5 more"));
    }

    #[test]
    fn error_flag_marks_non_bash_results() {
        let result = ClassifiedResult::new(ResultKind::Unknown(UnknownResult {
            text: "permission denied".to_string(),
            raw: serde_json::Value::Null,
        }))
        .with_error(true);
        let out = render_result(&result).unwrap();
        assert!(out.starts_with("**Result: unknown** [error]"));
        assert!(out.contains("permission denied"));
    }
}
