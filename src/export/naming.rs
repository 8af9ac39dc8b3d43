//! Output file naming.
//!
//! Exported documents land at
//! `<YYYY-MM-DD>/<project-slug>/<YYYY-MM-DDTHH-MM-SS>__<title-slug>__<id8>.<ext>`.

use chrono::{DateTime, Local, Utc};

/// Maximum length of the title part of a file name.
pub const TITLE_SLUG_MAX: usize = 60;

/// Characters of the session id kept in file names.
pub const SHORT_ID_LEN: usize = 8;

/// Name of the per-export manifest.
pub const MANIFEST_FILE: &str = "manifest.jsonl";

/// Name of the per-export batch summary.
pub const SUMMARY_FILE: &str = "export-summary.json";

/// Lowercase alphanumerics; space, `-`, `_`, `/` and `.` become `-`; everything
/// else is dropped. Dash runs collapse and edge dashes are trimmed.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if matches!(ch, ' ' | '-' | '_' | '/' | '.') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Title slug capped at [`TITLE_SLUG_MAX`] characters, `untitled` when empty.
pub fn title_slug(title: &str) -> String {
    let slug: String = slugify(title).chars().take(TITLE_SLUG_MAX).collect();
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

/// File stem `<timestamp>__<title-slug>__<id8>`.
pub fn file_stem(started: DateTime<Utc>, title: &str, session_id: &str) -> String {
    let short_id: String = session_id.chars().take(SHORT_ID_LEN).collect();
    format!(
        "{}__{}__{short_id}",
        started.format("%Y-%m-%dT%H-%M-%S"),
        title_slug(title)
    )
}

/// Path of a document relative to the export root, `/`-separated.
pub fn relative_path(
    started: DateTime<Utc>,
    project: &str,
    title: &str,
    session_id: &str,
    extension: &str,
) -> String {
    format!(
        "{}/{}/{}.{extension}",
        started.format("%Y-%m-%d"),
        slugify(project),
        file_stem(started, title, session_id)
    )
}

/// `claude-code-export-<YYYY-MM-DD>.zip` for the local date of `now`.
pub fn archive_name(now: DateTime<Local>) -> String {
    format!("claude-code-export-{}.zip", now.format("%Y-%m-%d"))
}
