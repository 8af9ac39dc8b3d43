//! Length ceilings for rendered text fields.
//!
//! Centralized location for every per-field ceiling so the interactive
//! `render` path and the batch export truncate identically.
//!
//! Ceilings count characters, not bytes. A field shorter than its ceiling is
//! reproduced verbatim; a field at or above it keeps exactly `ceiling`
//! characters followed by [`TRUNCATION_MARKER`].

use std::borrow::Cow;

/// Appended to every truncated field.
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Bash standard output.
///
/// Largest ceiling: command output is usually the point of the call.
pub const STDOUT_CEILING: usize = 5000;

/// Bash standard error.
pub const STDERR_CEILING: usize = 2000;

/// Content returned by a file read.
pub const FILE_CONTENT_CEILING: usize = 2000;

/// Unified diff produced by an edit or write.
pub const DIFF_CEILING: usize = 1500;

/// `old_string` / `new_string` of an Edit invocation.
pub const EDIT_SNIPPET_CEILING: usize = 300;

/// `content` of a Write invocation.
pub const WRITE_CONTENT_CEILING: usize = 500;

/// Pretty-printed input of an unrecognized tool.
pub const GENERIC_INPUT_CEILING: usize = 500;

/// Subagent prompt on a Task invocation.
pub const PROMPT_CEILING: usize = 1000;

/// Subagent final output.
pub const TASK_OUTPUT_CEILING: usize = 3000;

/// Grep content-mode output.
pub const GREP_CONTENT_CEILING: usize = 3000;

/// Fetched page summary and search summary text.
pub const WEB_TEXT_CEILING: usize = 2000;

/// Plan text.
pub const PLAN_CEILING: usize = 3000;

/// Text of a result whose shape was not recognized.
pub const UNKNOWN_TEXT_CEILING: usize = 2000;

/// Maximum file names listed for glob and grep results.
pub const LIST_ENTRY_CEILING: usize = 50;

/// Truncate `text` to `ceiling` characters, appending [`TRUNCATION_MARKER`].
///
/// # Example
///
/// ```
/// use ccexport::render::truncate::{truncate, TRUNCATION_MARKER};
///
/// assert_eq!(truncate("short", 10), "short");
/// assert_eq!(truncate("abcdef", 3), format!("abc{TRUNCATION_MARKER}"));
/// ```
pub fn truncate(text: &str, ceiling: usize) -> Cow<'_, str> {
    match text.char_indices().nth(ceiling) {
        Some((cut, _)) => Cow::Owned(format!("{}{TRUNCATION_MARKER}", &text[..cut])),
        None if text.chars().count() == ceiling => Cow::Owned(format!("{text}{TRUNCATION_MARKER}")),
        None => Cow::Borrowed(text),
    }
}

/// Prefix every line of `text` with `"> "` (`">"` for blank lines).
pub fn quote(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fenced code block around `body`, fence long enough not to be closed by it.
pub fn fenced(body: &str, lang: &str) -> String {
    let fence = crate::parser::sanitize::fence_for(body);
    format!("{fence}{lang}\n{body}\n{fence}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn under_ceiling_is_verbatim() {
        assert!(matches!(truncate("abc", 4), Cow::Borrowed("abc")));
    }

    #[test]
    fn at_ceiling_gets_marker() {
        assert_eq!(truncate("abcd", 4), format!("abcd{TRUNCATION_MARKER}"));
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(truncate("héllo wörld", 5), format!("héllo{TRUNCATION_MARKER}"));
    }

    #[test]
    fn quote_marks_blank_lines() {
        assert_eq!(quote("a\n\nb"), "> a\n>\n> b");
    }

    #[test]
    fn fenced_outgrows_inner_fence() {
        assert_eq!(fenced("x ``` y", ""), "````\nx ``` y\n````");
        assert_eq!(fenced("ls", "bash"), "```bash\nls\n```");
    }

    proptest! {
        #[test]
        fn truncation_round_trip(text in "\\PC{0,200}", ceiling in 1usize..150) {
            let out = truncate(&text, ceiling);
            let len = text.chars().count();
            if len < ceiling {
                prop_assert_eq!(out.as_ref(), text.as_str());
            } else {
                let kept: String = text.chars().take(ceiling).collect();
                prop_assert_eq!(out.into_owned(), format!("{kept}{TRUNCATION_MARKER}"));
            }
        }
    }
}
