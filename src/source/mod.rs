//! Project and session discovery.
//!
//! Claude Code stores one directory per project under the projects root
//! (`~/.claude/projects` by default), each holding one `<session-id>.jsonl`
//! file per conversation. This module enumerates them and resolves session
//! ids; it never opens more of a session than needed to name its project.

use crate::model::error::AppError;
use crate::model::SessionId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub mod file;

pub use file::{first_cwd, LineReader};

const LOG_EXTENSION: &str = "jsonl";

/// Lines scanned for a `cwd` when naming a project.
const CWD_SCAN_LINES: usize = 20;

/// One project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    /// On-disk directory name (the project identifier).
    pub name: String,
    /// Human-readable name derived from the working directory.
    pub display_name: String,
    /// Absolute path of the project directory.
    pub path: PathBuf,
    /// Number of session files.
    pub session_count: usize,
    /// Latest modification time across session files.
    pub last_modified: Option<DateTime<Utc>>,
}

/// One session log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFile {
    /// Session id (the file stem).
    pub id: SessionId,
    /// Directory name of the owning project.
    pub project: String,
    /// Path of the log file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// File modification time.
    pub modified: Option<DateTime<Utc>>,
}

impl SessionFile {
    /// Modification time as whole seconds since the Unix epoch (0 if unknown).
    pub fn modified_seconds(&self) -> i64 {
        self.modified.map_or(0, |m| m.timestamp())
    }
}

/// List all projects that contain at least one session file, sorted by name.
///
/// # Errors
///
/// Returns `AppError::ProjectsDirNotFound` if `root` is not a directory and
/// `AppError::Io` if it cannot be read.
pub fn list_projects(root: &Path) -> Result<Vec<ProjectInfo>, AppError> {
    if !root.is_dir() {
        return Err(AppError::ProjectsDirNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut projects = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let sessions = list_sessions(&path, &name)?;
        if sessions.is_empty() {
            continue;
        }
        let display_name = sessions
            .iter()
            .find_map(|s| first_cwd(&s.path, CWD_SCAN_LINES))
            .map(|cwd| display_name_from_cwd(&cwd))
            .unwrap_or_else(|| name.clone());
        let last_modified = sessions.iter().filter_map(|s| s.modified).max();
        projects.push(ProjectInfo {
            name,
            display_name,
            path,
            session_count: sessions.len(),
            last_modified,
        });
    }
    projects.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(projects)
}

/// List the session files of one project directory, sorted by session id.
///
/// Files whose stem is not a usable session id are ignored.
///
/// # Errors
///
/// Returns `AppError::Io` if the directory cannot be read.
pub fn list_sessions(project_dir: &Path, project: &str) -> Result<Vec<SessionFile>, AppError> {
    let mut sessions = Vec::new();
    for entry in fs::read_dir(project_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) || !path.is_file() {
            continue;
        }
        let Some(id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| SessionId::new(s).ok())
        else {
            continue;
        };
        let metadata = entry.metadata()?;
        sessions.push(SessionFile {
            id,
            project: project.to_string(),
            path,
            size: metadata.len(),
            modified: metadata.modified().ok().map(system_time_to_utc),
        });
    }
    sessions.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(sessions)
}

/// Every session under `root`, optionally restricted to projects whose
/// directory name contains `project_filter`. Sorted by (project, id).
///
/// # Errors
///
/// Propagates errors from [`list_projects`] and [`list_sessions`].
pub fn all_sessions(root: &Path, project_filter: Option<&str>) -> Result<Vec<SessionFile>, AppError> {
    let mut sessions = Vec::new();
    for project in list_projects(root)? {
        if project_filter.is_some_and(|filter| !project.name.contains(filter)) {
            continue;
        }
        sessions.extend(list_sessions(&project.path, &project.name)?);
    }
    Ok(sessions)
}

/// Resolve a session by exact id, or else by unique id prefix, across all projects.
///
/// # Errors
///
/// - `AppError::SessionNotFound` if nothing matches
/// - `AppError::AmbiguousSession` if a prefix matches several sessions
pub fn find_session(root: &Path, query: &str) -> Result<SessionFile, AppError> {
    let sessions = all_sessions(root, None)?;

    if let Some(exact) = sessions.iter().find(|s| s.id.as_str() == query) {
        return Ok(exact.clone());
    }

    let mut matches: Vec<SessionFile> = sessions
        .into_iter()
        .filter(|s| !query.is_empty() && s.id.as_str().starts_with(query))
        .collect();

    match matches.len() {
        0 => Err(AppError::SessionNotFound {
            query: query.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(AppError::AmbiguousSession {
            query: query.to_string(),
            candidates: matches.iter().map(|s| s.id.to_string()).collect(),
        }),
    }
}

/// Display name for a working directory: its last component, first letter upper-cased.
pub fn display_name_from_cwd(cwd: &str) -> String {
    let last = cwd
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(cwd);
    let mut chars = last.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => cwd.to_string(),
    }
}

fn system_time_to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
