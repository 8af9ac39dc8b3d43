//! Removal of producer control markers from message text.
//!
//! Claude Code embeds XML-like tags in user and assistant text (reminders,
//! hook output, IDE notifications, slash-command wrappers). None of it is
//! authored content, so it is stripped before rendering:
//!
//! - block tags are removed together with their content
//! - editor selection and local command output become fenced code
//! - marker tags are removed but their enclosed text is kept
//!
//! Afterwards runs of two or more blank lines collapse to one and the result is trimmed.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Tags removed together with everything they enclose.
pub const REMOVED_BLOCK_TAGS: &[&str] = &[
    "system-reminder",
    "ide_opened_file",
    "user-prompt-submit-hook",
    "claude_background_info",
    "fast_mode_info",
    "env",
];

/// Tags whose content is kept as a fenced code block.
pub const FENCED_TAGS: &[&str] = &[
    "ide_selection",
    "local-command-stdout",
    "local-command-stderr",
];

static REMOVED_BLOCKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    REMOVED_BLOCK_TAGS
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"(?s)<{tag}(?:\s[^>]*)?>.*?</{tag}>")).ok())
        .collect()
});

static FENCED_BLOCKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    FENCED_TAGS
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"(?s)<{tag}(?:\s[^>]*)?>(.*?)</{tag}>")).ok())
        .collect()
});

static BARE_TAGS: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"</?(?:command-name|command-message|command-args|antml:\w+|function_calls|example\w*)>").ok()
});

static BLANK_RUNS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").ok());

/// Strip control markers from `text`. Returns an empty string when nothing
/// authored remains.
pub fn strip_control_markers(text: &str) -> String {
    let mut out = text.to_string();

    for re in REMOVED_BLOCKS.iter() {
        out = re.replace_all(&out, "").into_owned();
    }

    for re in FENCED_BLOCKS.iter() {
        out = re
            .replace_all(&out, |caps: &Captures| {
                let body = caps.get(1).map_or("", |m| m.as_str()).trim_matches('\n');
                if body.trim().is_empty() {
                    String::new()
                } else {
                    let fence = fence_for(body);
                    format!("{fence}\n{body}\n{fence}")
                }
            })
            .into_owned();
    }

    if let Some(re) = BARE_TAGS.as_ref() {
        out = re.replace_all(&out, "").into_owned();
    }

    collapse_blank_lines(&out).trim().to_string()
}

/// Collapse any run of two or more blank lines to a single blank line.
pub fn collapse_blank_lines(text: &str) -> String {
    match BLANK_RUNS.as_ref() {
        Some(re) => re.replace_all(text, "\n\n").into_owned(),
        None => text.to_string(),
    }
}

/// A backtick fence longer than any backtick run inside `content` (minimum 3).
pub fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for ch in content.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_system_reminder_blocks_with_content() {
        let text = "Fix the bug\n<system-reminder>\nDo not mention this.\n</system-reminder>";
        assert_eq!(strip_control_markers(text), "Fix the bug");
    }

    #[test]
    fn removes_every_block_tag() {
        for tag in REMOVED_BLOCK_TAGS {
            let text = format!("keep <{tag}>secret</{tag}> this");
            let stripped = strip_control_markers(&text);
            assert!(!stripped.contains("secret"), "{tag} content should be removed");
            assert!(stripped.starts_with("keep"));
            assert!(stripped.ends_with("this"));
        }
    }

    #[test]
    fn block_tag_with_attributes_is_removed() {
        let text = r#"<ide_opened_file path="/a.rs">The user opened /a.rs</ide_opened_file>Go"#;
        assert_eq!(strip_control_markers(text), "Go");
    }

    #[test]
    fn local_command_stdout_becomes_fenced_code() {
        let text = "<local-command-stdout>total 0\ndrwx .</local-command-stdout>";
        assert_eq!(strip_control_markers(text), "```\ntotal 0\ndrwx .\n```");
    }

    #[test]
    fn fenced_conversion_outgrows_inner_backticks() {
        let text = "<ide_selection>let s = ```x```;</ide_selection>";
        assert_eq!(
            strip_control_markers(text),
            "````\nlet s = ```x```;\n````"
        );
    }

    #[test]
    fn empty_fenced_block_is_dropped() {
        let text = "before<local-command-stderr>\n</local-command-stderr>";
        assert_eq!(strip_control_markers(text), "before");
    }

    #[test]
    fn bare_tags_are_removed_but_text_kept() {
        let text = "<command-name>/clear</command-name>\n<command-message>clear</command-message>\n<command-args></command-args>";
        assert_eq!(strip_control_markers(text), "/clear\nclear");

        let ns = "antml";
        let namespaced = format!("<{ns}:invoke>read the file</{ns}:invoke>\n<{ns}:parameter>path</{ns}:parameter>");
        assert_eq!(strip_control_markers(&namespaced), "read the file\npath");
    }

    #[test]
    fn example_prefixed_tags_are_bare_markers() {
        assert_eq!(
            strip_control_markers("<example_usage>run it</example_usage>"),
            "run it"
        );
    }

    #[test]
    fn collapses_blank_line_runs_and_trims() {
        let text = "\n\n  a\n\n\n\nb\n \n\t\nc\n\nd  \n\n";
        assert_eq!(strip_control_markers(text), "a\n\nb\n\nc\n\nd");
    }

    #[test]
    fn only_markers_yields_empty() {
        assert_eq!(
            strip_control_markers("<system-reminder>x</system-reminder>\n\n"),
            ""
        );
    }

    #[test]
    fn unknown_tags_are_left_alone() {
        assert_eq!(
            strip_control_markers("use <Vec<u8>> here"),
            "use <Vec<u8>> here"
        );
    }

    #[test]
    fn fence_for_defaults_to_three_backticks() {
        assert_eq!(fence_for("plain"), "```");
        assert_eq!(fence_for("a ```` b"), "`````");
    }
}
