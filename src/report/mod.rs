//! Plain-text reports for the `list` and `stats` commands.

use crate::aggregate::parse_session;
use crate::model::error::AppError;
use crate::model::{PricingConfig, Session, SessionStats};
use crate::render::thousands;
use crate::source::{self, ProjectInfo, SessionFile};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;
use tracing::warn;

const RULE: char = '\u{2500}';

/// Tool names shown in the aggregate breakdown.
const TOP_TOOLS: usize = 10;

// ===== list =====

/// One row of the per-project session table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    /// Last activity, `YYYY-MM-DD`.
    pub date: String,
    /// Session title.
    pub title: String,
    /// Session id.
    pub id: String,
    /// Input plus output tokens.
    pub tokens: u64,
    /// Tool invocations.
    pub tools: usize,
}

impl SessionRow {
    /// Row for a parsed session.
    pub fn from_session(session: &Session) -> Self {
        let meta = session.metadata();
        Self {
            date: meta
                .first_timestamp
                .map(|ts| ts.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            title: session.title().chars().take(50).collect(),
            id: session.id().short(10).to_string(),
            tokens: meta.usage.input_tokens + meta.usage.output_tokens,
            tools: meta.total_tool_calls,
        }
    }
}

/// Project table, most recently modified first.
pub fn project_table(projects: &[ProjectInfo]) -> String {
    let mut sorted: Vec<&ProjectInfo> = projects.iter().collect();
    sorted.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    let mut out = format!("Projects ({} found):\n\n", projects.len());
    let _ = writeln!(out, "  {:<45} {:>8}   Last Modified", "Project", "Sessions");
    let _ = writeln!(out, "  {} {}   {}", rule(45), rule(8), rule(19));
    for project in sorted {
        let modified = project
            .last_modified
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {:<45} {:>8}   {}",
            project.display_name, project.session_count, modified
        );
    }
    out
}

/// Session table for one project.
pub fn session_table(project_name: &str, total: usize, rows: &[SessionRow]) -> String {
    let mut out = format!("Sessions in {project_name} ({total} found):\n\n");
    let _ = writeln!(
        out,
        "  {:<12} {:<50} {:>10} {:>10} {:>6}",
        "Date", "Title", "ID", "Tokens", "Tools"
    );
    let _ = writeln!(
        out,
        "  {} {} {} {} {}",
        rule(12),
        rule(50),
        rule(10),
        rule(10),
        rule(6)
    );
    for row in rows {
        let _ = writeln!(
            out,
            "  {:<12} {:<50} {:>10} {:>10} {:>6}",
            row.date,
            row.title,
            row.id,
            thousands(row.tokens),
            row.tools
        );
    }
    out
}

/// Rows for the sessions of one project, newest file first. Sessions that
/// fail to load or have no user text are left out.
pub fn session_rows(mut sessions: Vec<SessionFile>) -> Vec<SessionRow> {
    sessions.sort_by(|a, b| b.modified.cmp(&a.modified));
    sessions
        .iter()
        .filter_map(|file| match parse_session(&file.path) {
            Ok(session) if session.has_user_text() => Some(SessionRow::from_session(&session)),
            Ok(_) => None,
            Err(e) => {
                warn!(session_id = %file.id, error = %e, "Failed to parse session");
                None
            }
        })
        .collect()
}

// ===== stats =====

/// Detailed report for one session.
pub fn session_stats_text(session: &Session, stats: &SessionStats) -> String {
    let meta = session.metadata();
    let mut out = format!("=== Session: {} ===\n\n", session.id().short(12));

    let _ = writeln!(out, "  Title:      {}", session.title());
    if let Some(first) = meta.first_timestamp {
        let _ = writeln!(out, "  Created:    {}", first.format("%Y-%m-%dT%H:%M:%S"));
    }
    if let Some(duration) = &stats.wall_clock_display {
        let _ = writeln!(out, "  Duration:   {duration}");
    }
    let models = meta.models_joined();
    let _ = writeln!(
        out,
        "  Models:     {}",
        if models.is_empty() { "unknown" } else { models.as_str() }
    );

    let usage = &meta.usage;
    let _ = writeln!(
        out,
        "  Tokens:     {} (input: {} / output: {})",
        thousands(usage.input_tokens + usage.output_tokens),
        thousands(usage.input_tokens),
        thousands(usage.output_tokens)
    );
    if usage.cache_read_input_tokens > 0 || usage.cache_creation_input_tokens > 0 {
        let _ = writeln!(
            out,
            "  Cache:      read: {} / creation: {}",
            thousands(usage.cache_read_input_tokens),
            thousands(usage.cache_creation_input_tokens)
        );
    }

    let _ = writeln!(out, "  Tool calls: {}", meta.total_tool_calls);
    let breakdown = meta.tool_call_breakdown();
    if !breakdown.is_empty() {
        let _ = writeln!(out, "              {}", join_counts(breakdown));
    }
    if !meta.stop_reasons.is_empty() {
        let reasons = meta.stop_reasons.iter().map(|(r, c)| (r.as_str(), *c));
        let _ = writeln!(out, "  Stop:       {}", join_counts(reasons));
    }

    let files = &stats.files_touched;
    if files.total_unique > 0 {
        let _ = writeln!(
            out,
            "  Files:      {} unique ({} read, {} edited, {} created)",
            files.total_unique,
            files.read.len(),
            files.written.len(),
            files.created.len()
        );
    }
    if !stats.commands_run.is_empty() {
        let (ok, err) = stats.command_outcomes();
        let _ = writeln!(
            out,
            "  Commands:   {} run ({ok} success, {err} error)",
            stats.commands_run.len()
        );
    }
    if meta.compactions > 0 {
        let _ = writeln!(out, "  Compactions: {}", meta.compactions);
    }
    if let Some(cost) = stats.cost_estimate_usd {
        let _ = writeln!(out, "  Est. cost:  ~{} USD", format_cost(cost));
    }
    out
}

/// Totals across many sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    /// Projects covered.
    pub projects: usize,
    /// Sessions loaded.
    pub sessions: usize,
    /// Uncached input tokens.
    pub input_tokens: u64,
    /// Output tokens.
    pub output_tokens: u64,
    /// Cache read tokens.
    pub cache_read_tokens: u64,
    /// Cache creation tokens.
    pub cache_creation_tokens: u64,
    /// Tool invocations.
    pub tool_calls: usize,
    /// Invocations per tool name.
    pub tool_counts: BTreeMap<String, usize>,
    /// Model ids seen.
    pub models: BTreeSet<String>,
    /// Distinct files touched; serialized as a count.
    #[serde(serialize_with = "serialize_len")]
    pub files_unique: BTreeSet<String>,
    /// Bash invocations.
    pub commands_run: usize,
    /// Context resets.
    pub compactions: usize,
    /// Summed cost estimate in USD.
    pub total_cost: f64,
    /// At least one session had a cost estimate.
    pub has_cost: bool,
}

fn serialize_len<S: serde::Serializer>(set: &BTreeSet<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(set.len() as u64)
}

impl AggregateStats {
    /// Fold one session into the totals.
    pub fn add(&mut self, session: &Session, stats: &SessionStats) {
        let meta = session.metadata();
        self.sessions += 1;
        self.input_tokens += meta.usage.input_tokens;
        self.output_tokens += meta.usage.output_tokens;
        self.cache_read_tokens += meta.usage.cache_read_input_tokens;
        self.cache_creation_tokens += meta.usage.cache_creation_input_tokens;
        self.tool_calls += meta.total_tool_calls;
        for (name, count) in &meta.tool_call_counts {
            *self.tool_counts.entry(name.clone()).or_default() += count;
        }
        self.models
            .extend(meta.models_used.iter().map(|m| m.id().to_string()));
        let files = &stats.files_touched;
        self.files_unique
            .extend(files.read.iter().chain(&files.written).chain(&files.created).cloned());
        self.commands_run += stats.commands_run.len();
        self.compactions += meta.compactions;
        if let Some(cost) = stats.cost_estimate_usd {
            self.total_cost += cost;
            self.has_cost = true;
        }
    }

    /// Parse every session under `root` (optionally one project) and total them.
    ///
    /// Sessions that fail to load or hold no user text are left out.
    ///
    /// # Errors
    ///
    /// Propagates discovery errors from [`source::list_projects`].
    pub fn collect(root: &Path, project_filter: Option<&str>, pricing: &PricingConfig) -> Result<Self, AppError> {
        let mut totals = Self::default();
        for project in source::list_projects(root)? {
            if project_filter.is_some_and(|filter| !project.name.contains(filter)) {
                continue;
            }
            totals.projects += 1;
            for file in source::list_sessions(&project.path, &project.name)? {
                match parse_session(&file.path) {
                    Ok(session) if session.has_user_text() => {
                        let stats = SessionStats::compute(&session, pricing);
                        totals.add(&session, &stats);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(session_id = %file.id, project = %project.name, error = %e, "Failed to parse session");
                    }
                }
            }
        }
        Ok(totals)
    }

    /// Plain-text report.
    pub fn to_text(&self) -> String {
        let mut out = String::from("=== Aggregate Stats ===\n\n");
        let _ = writeln!(out, "  Projects:     {}", self.projects);
        let _ = writeln!(out, "  Sessions:     {}", self.sessions);
        let models = self.models.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
        let _ = writeln!(
            out,
            "  Models:       {}",
            if models.is_empty() { "none" } else { models.as_str() }
        );
        let _ = writeln!(
            out,
            "  Total tokens: {} (input: {} / output: {})",
            thousands(self.input_tokens + self.output_tokens),
            thousands(self.input_tokens),
            thousands(self.output_tokens)
        );
        if self.cache_read_tokens > 0 {
            let _ = writeln!(
                out,
                "  Cache:        read: {} / creation: {}",
                thousands(self.cache_read_tokens),
                thousands(self.cache_creation_tokens)
            );
        }
        let _ = writeln!(out, "  Tool calls:   {}", thousands(self.tool_calls as u64));
        if !self.tool_counts.is_empty() {
            let mut counts: Vec<(&str, usize)> =
                self.tool_counts.iter().map(|(n, c)| (n.as_str(), *c)).collect();
            counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            counts.truncate(TOP_TOOLS);
            let _ = writeln!(out, "                {}", join_counts(counts));
        }
        let _ = writeln!(out, "  Files:        {} unique", thousands(self.files_unique.len() as u64));
        let _ = writeln!(out, "  Commands:     {}", thousands(self.commands_run as u64));
        if self.compactions > 0 {
            let _ = writeln!(out, "  Compactions:  {}", self.compactions);
        }
        if self.has_cost {
            let _ = writeln!(out, "  Est. cost:    ~{} USD", format_cost(self.total_cost));
        }
        out
    }
}

// ===== Formatting Helpers =====

fn rule(width: usize) -> String {
    std::iter::repeat_n(RULE, width).collect()
}

fn join_counts<'a>(counts: impl IntoIterator<Item = (&'a str, usize)>) -> String {
    counts
        .into_iter()
        .map(|(name, count)| format!("{name}: {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a cost value in USD.
///
/// Examples:
/// - `format_cost(0.0)` → "$0.00"
/// - `format_cost(123.456)` → "$123.46"
pub fn format_cost(cost: f64) -> String {
    let rounded = (cost * 100.0).round() / 100.0;
    let dollars = rounded.floor() as u64;
    let cents = ((rounded - dollars as f64) * 100.0).round() as u64;
    format!("${}.{:02}", thousands(dollars), cents)
}
