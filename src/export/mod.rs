//! Batch export driver.
//!
//! An export run:
//!
//! 1. enumerates session files across projects (optionally one project),
//! 2. reads the watermark once and, for `--since last`, keeps only sessions
//!    whose files changed since it,
//! 3. parses, filters and renders each session on a worker pool,
//! 4. writes the documents, `manifest.jsonl` and `export-summary.json` to a
//!    directory or zip archive in (project, session id) order,
//! 5. replaces the watermark once, after everything was written.
//!
//! A session that fails to load or write is recorded in the summary and the
//! run carries on. The run fails only when every selected session failed or
//! when it was cancelled, and in both cases the watermark is left untouched.

pub mod exclusion;
pub mod naming;
pub mod sink;
pub mod watermark;

pub use exclusion::ExclusionRules;
pub use sink::{DirectorySink, ExportSink, ZipSink};
pub use watermark::ExportWatermark;

use crate::aggregate::parse_session;
use crate::config::{OutputFormat, ResolvedConfig};
use crate::model::error::{AppError, ExportError};
use crate::model::{PricingConfig, Session, SessionStats};
use crate::render::{render_json, render_markdown};
use crate::source::{self, SessionFile};
use chrono::{DateTime, Local, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Which sessions a run considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Since {
    /// Every session.
    #[default]
    All,
    /// Only sessions changed since the last export.
    Last,
}

/// Selection policy for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Substring of the project directory name.
    pub project: Option<String>,
    /// Watermark filtering.
    pub since: Since,
}

/// Everything a run needs besides the selection.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Root holding one directory per project.
    pub projects_dir: PathBuf,
    /// Where documents, or the archive, are written.
    pub export_dir: PathBuf,
    /// Watermark file read and advanced by `--since last` runs.
    pub state_file: PathBuf,
    /// Document format.
    pub format: OutputFormat,
    /// Write one zip archive instead of a directory tree.
    pub zip: bool,
    /// Parse and render threads. `0` picks one per core.
    pub workers: usize,
    /// Per-model prices for the cost estimate.
    pub pricing: PricingConfig,
    /// Sessions matching these rules are skipped.
    pub exclusions: ExclusionRules,
}

impl ExportOptions {
    /// Options from resolved configuration.
    pub fn from_config(config: &ResolvedConfig, exclusions: ExclusionRules) -> Self {
        Self {
            projects_dir: config.projects_dir.clone(),
            export_dir: config.export_dir.clone(),
            state_file: config.state_file.clone(),
            format: config.format,
            zip: config.zip,
            workers: config.workers,
            pricing: config.pricing.clone(),
            exclusions,
        }
    }
}

/// A session file plus the display name of its project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Session log on disk.
    pub file: SessionFile,
    /// Project name derived from the session's `cwd`.
    pub project_display: String,
}

/// One line of `manifest.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    /// Session id (file stem).
    pub session_id: String,
    /// Derived title.
    pub title: String,
    /// Project display name.
    pub project: String,
    /// Last record timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    /// Model ids seen, sorted.
    pub models: Vec<String>,
    /// Input plus output tokens.
    pub tokens: u64,
    /// Tool invocations across the session.
    pub tool_calls: usize,
    /// Distinct files read, written or created.
    pub files_touched: usize,
    /// Bash invocations.
    pub commands_run: usize,
    /// `None` when no priced model produced usage.
    pub cost_estimate_usd: Option<f64>,
    /// Seconds between the first and last record.
    pub wall_clock_seconds: Option<i64>,
}

/// Why a selected session was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No user-authored text.
    Empty,
    /// Matched an exclusion rule.
    Excluded,
}

/// A session left out on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSession {
    /// Session id.
    pub session_id: String,
    /// Project display name.
    pub project: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// A session that could not be loaded or written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSession {
    /// Session id.
    pub session_id: String,
    /// Project display name.
    pub project: String,
    /// Error message.
    pub error: String,
}

/// Outcome of a run, written as `export-summary.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportSummary {
    /// Session files found for the selected projects.
    pub total_sessions: usize,
    /// Left out by the watermark.
    pub unchanged: usize,
    /// Sessions whose documents were written.
    pub exported: usize,
    /// Documents written, manifest and summary excluded.
    pub files_written: usize,
    /// Empty or excluded sessions.
    pub skipped: Vec<SkippedSession>,
    /// Sessions that failed to load or write.
    pub failed: Vec<FailedSession>,
    /// Directory or archive written; `None` when nothing was selected.
    pub destination: Option<PathBuf>,
}

/// Summary plus the session files that made it into the export.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    /// Counts and per-session outcomes.
    pub summary: ExportSummary,
    /// Files recorded in the new watermark.
    pub exported: Vec<SessionFile>,
}

struct RenderedSession {
    documents: Vec<(String, String)>,
    manifest: ManifestEntry,
}

enum Prepared {
    Ready(Box<RenderedSession>),
    Skipped(SkipReason),
    Failed(String),
    Cancelled,
}

/// Session files under `root` with their project display names, sorted by
/// (project, session id).
///
/// # Errors
///
/// Propagates discovery errors from [`source::list_projects`].
pub fn collect_candidates(root: &Path, project_filter: Option<&str>) -> Result<Vec<Candidate>, AppError> {
    let mut candidates = Vec::new();
    for project in source::list_projects(root)? {
        if project_filter.is_some_and(|filter| !project.name.contains(filter)) {
            continue;
        }
        for file in source::list_sessions(&project.path, &project.name)? {
            candidates.push(Candidate {
                file,
                project_display: project.display_name.clone(),
            });
        }
    }
    candidates.sort_by(|a, b| {
        (a.file.project.as_str(), a.file.id.as_str()).cmp(&(b.file.project.as_str(), b.file.id.as_str()))
    });
    Ok(candidates)
}

/// Read the watermark. A file that cannot be read or decoded counts as no
/// watermark, with a warning, so the run falls back to a full export.
pub fn load_watermark(path: &Path) -> Option<ExportWatermark> {
    match ExportWatermark::load(path) {
        Ok(watermark) => watermark,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unusable export watermark; exporting everything");
            None
        }
    }
}

/// Full export run: discover, select, export, then advance the watermark.
///
/// # Errors
///
/// - discovery failures
/// - `ExportError::NothingExported` if every selected session failed
/// - `ExportError::Cancelled` if `cancel` was raised
/// - `WatermarkError` if the new watermark cannot be written
pub fn run(
    options: &ExportOptions,
    policy: &SelectionPolicy,
    cancel: &AtomicBool,
) -> Result<ExportSummary, AppError> {
    let candidates = collect_candidates(&options.projects_dir, policy.project.as_deref())?;
    let watermark = load_watermark(&options.state_file);
    let filter = match policy.since {
        Since::All => None,
        Since::Last => watermark.as_ref(),
    };

    let report = export_sessions(candidates, filter, options, cancel)?;

    if !report.exported.is_empty() {
        let updated = watermark.unwrap_or_default().advanced(
            Utc::now(),
            &options.export_dir,
            report
                .exported
                .iter()
                .map(|file| (file.id.to_string(), file.modified)),
        );
        updated.save(&options.state_file)?;
        debug!(path = %options.state_file.display(), "Saved export watermark");
    }
    Ok(report.summary)
}

/// Export `candidates` to the configured destination.
///
/// With a watermark, sessions it reports as unchanged are left out. The
/// watermark itself is not written here.
///
/// # Errors
///
/// - `ExportError::Cancelled` if `cancel` is raised before all sessions were prepared
/// - `ExportError::NothingExported` if sessions were selected and none succeeded
/// - `ExportError::Io` / `ExportError::Archive` if the destination, manifest or
///   summary cannot be written
pub fn export_sessions(
    candidates: Vec<Candidate>,
    watermark: Option<&ExportWatermark>,
    options: &ExportOptions,
    cancel: &AtomicBool,
) -> Result<ExportReport, ExportError> {
    let total_sessions = candidates.len();
    let selected: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| watermark.is_none_or(|w| w.is_changed(c.file.id.as_str(), c.file.modified)))
        .collect();
    let unchanged = total_sessions - selected.len();
    info!(total = total_sessions, selected = selected.len(), unchanged, "Starting export");

    let prepared = prepare_all(&selected, options, cancel);
    if cancel.load(Ordering::SeqCst) || prepared.iter().any(|p| matches!(p, Prepared::Cancelled)) {
        info!("Export cancelled before writing");
        return Err(ExportError::Cancelled);
    }

    let mut summary = ExportSummary {
        total_sessions,
        unchanged,
        ..ExportSummary::default()
    };
    let mut ready = Vec::new();
    for (candidate, outcome) in selected.into_iter().zip(prepared) {
        match outcome {
            Prepared::Ready(rendered) => ready.push((candidate, rendered)),
            Prepared::Skipped(reason) => summary.skipped.push(SkippedSession {
                session_id: candidate.file.id.to_string(),
                project: candidate.file.project,
                reason,
            }),
            Prepared::Failed(error) => summary.failed.push(FailedSession {
                session_id: candidate.file.id.to_string(),
                project: candidate.file.project,
                error,
            }),
            Prepared::Cancelled => return Err(ExportError::Cancelled),
        }
    }

    if ready.is_empty() {
        if !summary.failed.is_empty() {
            return Err(ExportError::NothingExported {
                failed: summary.failed.len(),
            });
        }
        info!(skipped = summary.skipped.len(), "Nothing to export");
        return Ok(ExportReport {
            summary,
            exported: Vec::new(),
        });
    }

    let destination = destination(options);
    let mut sink = open_sink(options, &destination)?;
    let mut manifest = String::new();
    let mut exported = Vec::new();

    for (candidate, rendered) in ready {
        let written = rendered
            .documents
            .iter()
            .try_for_each(|(path, contents)| sink.write(path, contents.as_bytes()));
        match written {
            Ok(()) => {
                summary.files_written += rendered.documents.len();
                manifest.push_str(&encode_line(&rendered.manifest)?);
                exported.push(candidate.file);
            }
            Err(e) => {
                warn!(session_id = %candidate.file.id, error = %e, "Failed to write session");
                summary.failed.push(FailedSession {
                    session_id: candidate.file.id.to_string(),
                    project: candidate.file.project,
                    error: e.to_string(),
                });
            }
        }
    }

    if exported.is_empty() {
        return Err(ExportError::NothingExported {
            failed: summary.failed.len(),
        });
    }

    summary.exported = exported.len();
    summary.destination = Some(destination);
    sink.write(naming::MANIFEST_FILE, manifest.as_bytes())?;
    sink.write(naming::SUMMARY_FILE, encode_pretty(&summary)?.as_bytes())?;
    let destination = sink.finish()?;

    info!(
        exported = summary.exported,
        files = summary.files_written,
        skipped = summary.skipped.len(),
        failed = summary.failed.len(),
        destination = %destination.display(),
        "Export finished"
    );
    Ok(ExportReport { summary, exported })
}

/// Export one session as flat `<stem>.<ext>` files in the export directory.
///
/// Does not consult or advance the watermark.
///
/// # Errors
///
/// Returns `AppError::SessionLoad` if the session cannot be parsed and
/// `AppError::Export` if a file cannot be written.
pub fn export_single(file: &SessionFile, options: &ExportOptions) -> Result<Vec<PathBuf>, AppError> {
    let session = parse_session(&file.path)?;
    let stats = SessionStats::compute(&session, &options.pricing);
    let started = started_at(&session, file);
    let stem = naming::file_stem(started, session.title(), session.id().as_str());

    let documents = render_documents(&session, &stats, options.format).map_err(|e| ExportError::Io {
        path: options.export_dir.clone(),
        source: std::io::Error::other(e),
    })?;

    let mut sink = DirectorySink::create(&options.export_dir)?;
    let mut written = Vec::new();
    for (extension, contents) in documents {
        let name = format!("{stem}.{extension}");
        sink.write(&name, contents.as_bytes())?;
        written.push(options.export_dir.join(name));
    }
    info!(session_id = %session.id(), files = written.len(), "Exported session");
    Ok(written)
}

fn prepare_all(candidates: &[Candidate], options: &ExportOptions, cancel: &AtomicBool) -> Vec<Prepared> {
    let work = || {
        candidates
            .par_iter()
            .map(|c| prepare(c, options, cancel))
            .collect::<Vec<_>>()
    };
    match rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.max(1))
        .build()
    {
        Ok(pool) => pool.install(work),
        Err(e) => {
            warn!(error = %e, "Cannot start worker pool; exporting sequentially");
            candidates.iter().map(|c| prepare(c, options, cancel)).collect()
        }
    }
}

/// Parse, filter and render one session. Cancellation is honoured only
/// before parsing starts.
fn prepare(candidate: &Candidate, options: &ExportOptions, cancel: &AtomicBool) -> Prepared {
    if cancel.load(Ordering::SeqCst) {
        return Prepared::Cancelled;
    }
    let file = &candidate.file;

    let session = match parse_session(&file.path) {
        Ok(session) => session,
        Err(e) => {
            warn!(session_id = %file.id, error = %e, "Failed to load session");
            return Prepared::Failed(e.to_string());
        }
    };

    if !session.has_user_text() {
        debug!(session_id = %file.id, "Skipping session without user text");
        return Prepared::Skipped(SkipReason::Empty);
    }
    if options
        .exclusions
        .excludes_session(&candidate.project_display, &session)
    {
        debug!(session_id = %file.id, "Skipping excluded session");
        return Prepared::Skipped(SkipReason::Excluded);
    }

    let stats = SessionStats::compute(&session, &options.pricing);
    let rendered = match render_documents(&session, &stats, options.format) {
        Ok(rendered) => rendered,
        Err(e) => {
            warn!(session_id = %file.id, error = %e, "Failed to render session");
            return Prepared::Failed(e.to_string());
        }
    };

    let started = started_at(&session, file);
    let documents = rendered
        .into_iter()
        .map(|(extension, contents)| {
            let path = naming::relative_path(
                started,
                &file.project,
                session.title(),
                session.id().as_str(),
                extension,
            );
            (path, contents)
        })
        .collect();

    Prepared::Ready(Box::new(RenderedSession {
        documents,
        manifest: manifest_entry(&session, &stats, &file.project),
    }))
}

fn render_documents(
    session: &Session,
    stats: &SessionStats,
    format: OutputFormat,
) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
    let mut documents = Vec::new();
    if matches!(format, OutputFormat::Md | OutputFormat::Both) {
        documents.push(("md", render_markdown(session)));
    }
    if matches!(format, OutputFormat::Json | OutputFormat::Both) {
        documents.push(("json", render_json(session, stats)?));
    }
    Ok(documents)
}

/// First record timestamp, else the file's modification time.
fn started_at(session: &Session, file: &SessionFile) -> DateTime<Utc> {
    session
        .metadata()
        .first_timestamp
        .or(file.modified)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn manifest_entry(session: &Session, stats: &SessionStats, project: &str) -> ManifestEntry {
    let meta = session.metadata();
    ManifestEntry {
        session_id: session.id().to_string(),
        title: session.title().to_string(),
        project: project.to_string(),
        updated_at: meta.last_timestamp,
        models: meta.models_used.iter().map(|m| m.id().to_string()).collect(),
        tokens: meta.usage.input_tokens + meta.usage.output_tokens,
        tool_calls: meta.total_tool_calls,
        files_touched: stats.files_touched.total_unique,
        commands_run: stats.commands_run.len(),
        cost_estimate_usd: stats.cost_estimate_usd,
        wall_clock_seconds: stats.wall_clock_seconds,
    }
}

fn open_sink(options: &ExportOptions, destination: &Path) -> Result<Box<dyn ExportSink>, ExportError> {
    if options.zip {
        Ok(Box::new(ZipSink::create(destination)?))
    } else {
        Ok(Box::new(DirectorySink::create(&options.export_dir)?))
    }
}

fn destination(options: &ExportOptions) -> PathBuf {
    if options.zip {
        options.export_dir.join(naming::archive_name(Local::now()))
    } else {
        options.export_dir.clone()
    }
}

fn encode_line<T: Serialize>(value: &T) -> Result<String, ExportError> {
    let mut line = serde_json::to_string(value).map_err(encode_error)?;
    line.push('\n');
    Ok(line)
}

fn encode_pretty<T: Serialize>(value: &T) -> Result<String, ExportError> {
    let mut out = serde_json::to_string_pretty(value).map_err(encode_error)?;
    out.push('\n');
    Ok(out)
}

fn encode_error(e: serde_json::Error) -> ExportError {
    ExportError::Io {
        path: PathBuf::from(naming::MANIFEST_FILE),
        source: std::io::Error::other(e),
    }
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
