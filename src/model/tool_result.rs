//! Classified tool results.
//!
//! A tool result payload in the log is producer-defined and not self-describing.
//! The classifier (see [`crate::classify`]) maps every payload to exactly one
//! [`ResultKind`]; this module only holds the resulting shapes.

use crate::model::ToolUseId;
use serde::Serialize;

/// A tool result with its canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedResult {
    /// Invocation this result answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<ToolUseId>,
    /// The producer flagged the result as an error.
    pub is_error: bool,
    /// Shape-specific payload.
    #[serde(flatten)]
    pub kind: ResultKind,
}

impl ClassifiedResult {
    /// Create a non-error result with no invocation id.
    pub fn new(kind: ResultKind) -> Self {
        Self {
            tool_use_id: None,
            is_error: false,
            kind,
        }
    }

    /// Set the invocation id.
    pub fn with_tool_use_id(mut self, id: Option<ToolUseId>) -> Self {
        self.tool_use_id = id;
        self
    }

    /// Set the error flag.
    pub fn with_error(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }

    /// The `result_kind` name used in exports.
    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Whether this result carries content worth surfacing on its own.
    ///
    /// Results without a body are suppressed from rendering; the paired
    /// invocation already states what happened.
    pub fn has_renderable_body(&self) -> bool {
        match &self.kind {
            ResultKind::Bash(r) => !r.stdout.trim().is_empty() || !r.stderr.trim().is_empty(),
            ResultKind::FileRead(r) => !r.content.is_empty(),
            ResultKind::FileEdit(r) => !r.diff.is_empty(),
            ResultKind::FileWrite(r) => !r.diff.is_empty(),
            ResultKind::Glob(r) => !r.filenames.is_empty(),
            ResultKind::Grep(r) => {
                r.content.as_deref().is_some_and(|c| !c.trim().is_empty())
                    || !r.filenames.is_empty()
            }
            ResultKind::WebSearch(r) => !r.hits.is_empty() || !r.summary.trim().is_empty(),
            ResultKind::WebFetch(r) => !r.result.trim().is_empty(),
            ResultKind::Task(r) => !r.output.trim().is_empty(),
            ResultKind::TodoWrite(r) => !r.new_todos.is_empty(),
            ResultKind::UserInput(r) => !r.answers.is_empty(),
            ResultKind::Plan(r) => !r.plan.trim().is_empty(),
            ResultKind::Unknown(r) => !r.text.trim().is_empty(),
        }
    }
}

/// Canonical result shapes, one per `result_kind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result_kind", rename_all = "snake_case")]
pub enum ResultKind {
    /// Shell command output.
    Bash(BashResult),
    /// File contents read.
    FileRead(FileReadResult),
    /// In-place file edit.
    FileEdit(FileEditResult),
    /// File created or overwritten.
    FileWrite(FileWriteResult),
    /// Filename pattern match.
    Glob(GlobResult),
    /// Content search.
    Grep(GrepResult),
    /// Web search hits.
    WebSearch(WebSearchResult),
    /// Fetched web page.
    WebFetch(WebFetchResult),
    /// Subagent run.
    Task(TaskResult),
    /// Todo list update.
    TodoWrite(TodoWriteResult),
    /// Answers to questions put to the user.
    UserInput(UserInputResult),
    /// Approved plan.
    Plan(PlanResult),
    /// No known shape.
    Unknown(UnknownResult),
}

impl ResultKind {
    /// The `result_kind` tag.
    pub fn name(&self) -> &'static str {
        match self {
            ResultKind::Bash(_) => "bash",
            ResultKind::FileRead(_) => "file_read",
            ResultKind::FileEdit(_) => "file_edit",
            ResultKind::FileWrite(_) => "file_write",
            ResultKind::Glob(_) => "glob",
            ResultKind::Grep(_) => "grep",
            ResultKind::WebSearch(_) => "web_search",
            ResultKind::WebFetch(_) => "web_fetch",
            ResultKind::Task(_) => "task",
            ResultKind::TodoWrite(_) => "todo_write",
            ResultKind::UserInput(_) => "user_input",
            ResultKind::Plan(_) => "plan",
            ResultKind::Unknown(_) => "unknown",
        }
    }
}

/// Output of a shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BashResult {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Exit code, when reported or recovered from the text.
    pub exit_code: Option<i64>,
    /// The command was interrupted.
    pub interrupted: bool,
    /// Producer's reading of the exit code.
    pub return_code_interpretation: Option<String>,
}

impl BashResult {
    /// Non-zero exit code or interruption.
    pub fn failed(&self) -> bool {
        self.interrupted || self.exit_code.is_some_and(|code| code != 0)
    }
}

/// Contents of a file read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileReadResult {
    /// Path read.
    pub file_path: String,
    /// Text returned.
    pub content: String,
    /// Lines returned.
    pub num_lines: Option<u64>,
    /// First line returned, 1-based.
    pub start_line: Option<u64>,
    /// Lines in the whole file.
    pub total_lines: Option<u64>,
}

/// An in-place string replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileEditResult {
    /// Path edited.
    pub file_path: String,
    /// Text replaced.
    pub old_string: String,
    /// Replacement text.
    pub new_string: String,
    /// Every occurrence was replaced.
    pub replace_all: bool,
    /// Unified-diff body lines from the structured patch.
    pub diff: String,
}

/// A whole-file write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileWriteResult {
    /// Path written.
    pub file_path: String,
    /// `true` for a new file, `false` for an overwrite.
    pub created: bool,
    /// Text written.
    pub content: String,
    /// Diff against the previous contents.
    pub diff: String,
}

/// Paths matching a glob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GlobResult {
    /// Matching paths.
    pub filenames: Vec<String>,
    /// Number of matches.
    pub file_count: u64,
    /// More matches existed than were returned.
    pub truncated: bool,
    /// Search time.
    pub duration_ms: Option<u64>,
}

/// Matches of a content search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrepResult {
    /// Output mode, e.g. `files_with_matches`.
    pub mode: String,
    /// Files with matches.
    pub filenames: Vec<String>,
    /// Number of files.
    pub file_count: u64,
    /// Matching lines, in content mode.
    pub content: Option<String>,
    /// Number of matching lines.
    pub num_lines: Option<u64>,
}

/// One web search hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
}

/// Web search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebSearchResult {
    /// Query sent.
    pub query: String,
    /// Hits in rank order.
    pub hits: Vec<SearchHit>,
    /// Free text the search tool returned alongside hits.
    pub summary: String,
}

/// A fetched web page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebFetchResult {
    /// URL fetched.
    pub url: String,
    /// HTTP status code.
    pub code: Option<u64>,
    /// HTTP status text.
    pub code_text: Option<String>,
    /// Response size.
    pub bytes: Option<u64>,
    /// Processed page text.
    pub result: String,
}

/// Outcome of a subagent run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskResult {
    /// Subagent id.
    pub agent_id: Option<String>,
    /// Final status.
    pub status: Option<String>,
    /// Prompt given to the subagent.
    pub prompt: String,
    /// Text the subagent returned.
    pub output: String,
    /// Run time.
    pub total_duration_ms: Option<u64>,
    /// Tokens spent.
    pub total_tokens: Option<u64>,
    /// Tool calls made.
    pub total_tool_use_count: Option<u64>,
}

/// One todo entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TodoItem {
    /// Entry text.
    pub content: String,
    /// `pending`, `in_progress` or `completed`.
    pub status: String,
}

/// Todo list before and after an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TodoWriteResult {
    /// List before.
    pub old_todos: Vec<TodoItem>,
    /// List after.
    pub new_todos: Vec<TodoItem>,
}

/// A question and the user's answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuestionAnswer {
    /// Question text.
    pub question: String,
    /// Answer text.
    pub answer: String,
}

/// Answers collected from the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserInputResult {
    /// Answers in question order.
    pub answers: Vec<QuestionAnswer>,
}

/// A plan submitted for approval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanResult {
    /// Plan text.
    pub plan: String,
    /// Where the plan was saved.
    pub file_path: Option<String>,
}

/// Fallback: no known shape matched. The raw payload is kept for rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnknownResult {
    /// Flattened text of the payload.
    pub text: String,
    /// Payload as logged.
    pub raw: serde_json::Value,
}
