//! Session statistics and cost estimation.
//!
//! This module derives per-session statistics from an aggregated [`Session`]:
//! file activity, commands run, conversation turns, tool-result outcomes and an
//! estimated cost based on pricing configuration.

use crate::model::{ResultKind, Role, Session, ToolName, ToolUseId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ===== SessionStats =====

/// Derived statistics for one session.
///
/// Computed on demand from a finished session; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    /// Files read, written and created.
    pub files_touched: FilesTouched,
    /// Bash invocations in invocation order, paired with their results.
    pub commands_run: Vec<CommandRun>,
    /// Number of user turns answered by the assistant.
    pub conversation_turns: usize,
    /// Seconds from first to last record.
    pub wall_clock_seconds: Option<i64>,
    /// Wall clock as `1h 2m 3s`.
    pub wall_clock_display: Option<String>,
    /// `None` when no message had a priced model and non-zero usage.
    pub cost_estimate_usd: Option<f64>,
    /// Result outcome counters.
    pub tool_result_summary: ToolResultSummary,
    /// Stop reasons and their counts.
    pub stop_reason_summary: BTreeMap<String, usize>,
    /// Messages from subagent branches.
    pub sidechain_message_count: usize,
    /// Context resets.
    pub compactions: usize,
}

/// Files split into read-only, edited and newly created buckets.
///
/// A file both read and edited only shows up under `written`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilesTouched {
    /// Read but never modified.
    pub read: Vec<String>,
    /// Edited, or overwritten by a write.
    pub written: Vec<String>,
    /// Created by a write.
    pub created: Vec<String>,
    /// Distinct paths across all buckets.
    pub total_unique: usize,
}

/// One Bash invocation and, when captured, its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRun {
    /// The command line.
    pub command: String,
    /// When the invocation was logged.
    pub timestamp: Option<DateTime<Utc>>,
    /// Exit code, when known.
    pub exit_code: Option<i64>,
    /// `None` when no result was captured.
    pub is_error: Option<bool>,
    /// The command was interrupted.
    pub interrupted: bool,
    /// Producer's reading of a non-zero exit.
    pub return_code_interpretation: Option<String>,
}

/// Tool-result outcome counters by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToolResultSummary {
    /// Bash results that succeeded.
    pub bash_success: usize,
    /// Bash results that failed.
    pub bash_error: usize,
    /// Bash results that were interrupted.
    pub bash_interrupted: usize,
    /// File reads.
    pub file_reads: usize,
    /// File edits.
    pub file_edits: usize,
    /// File writes.
    pub file_writes: usize,
    /// Glob searches.
    pub glob_searches: usize,
    /// Grep searches.
    pub grep_searches: usize,
    /// Web fetches.
    pub web_fetches: usize,
    /// Web searches.
    pub web_searches: usize,
    /// Subagent tasks.
    pub tasks: usize,
}

impl SessionStats {
    /// Compute statistics for a session.
    pub fn compute(session: &Session, pricing: &PricingConfig) -> Self {
        let metadata = session.metadata();
        let wall_clock_seconds = metadata.wall_clock_seconds();

        Self {
            files_touched: files_touched(session),
            commands_run: commands_run(session),
            conversation_turns: count_turns(session),
            wall_clock_seconds,
            wall_clock_display: wall_clock_seconds.map(format_duration),
            cost_estimate_usd: estimate_cost(session, pricing),
            tool_result_summary: summarize_results(session),
            stop_reason_summary: metadata.stop_reasons.clone(),
            sidechain_message_count: metadata.sidechain_messages,
            compactions: metadata.compactions,
        }
    }

    /// Successful and failed command counts from the result summary.
    pub fn command_outcomes(&self) -> (usize, usize) {
        (
            self.tool_result_summary.bash_success,
            self.tool_result_summary.bash_error,
        )
    }
}

fn files_touched(session: &Session) -> FilesTouched {
    let created_by_result: HashMap<&ToolUseId, bool> = session
        .messages()
        .iter()
        .filter_map(|msg| msg.tool_result())
        .filter_map(|result| match (&result.tool_use_id, &result.kind) {
            (Some(id), ResultKind::FileWrite(w)) => Some((id, w.created)),
            _ => None,
        })
        .collect();

    let mut read = BTreeSet::new();
    let mut written = BTreeSet::new();
    let mut created = BTreeSet::new();

    for call in session.messages().iter().flat_map(|m| m.tool_uses()) {
        let path = call.input_str("file_path");
        if path.is_empty() {
            continue;
        }
        match call.name() {
            ToolName::Read => {
                read.insert(path.to_string());
            }
            ToolName::Edit => {
                written.insert(path.to_string());
            }
            ToolName::Write => {
                let was_created = call
                    .id()
                    .and_then(|id| created_by_result.get(id))
                    .copied()
                    .unwrap_or(false);
                if was_created {
                    created.insert(path.to_string());
                } else {
                    written.insert(path.to_string());
                }
            }
            _ => {}
        }
    }

    let total_unique = read.union(&written).chain(created.iter()).collect::<BTreeSet<_>>().len();
    let read_only = read
        .into_iter()
        .filter(|p| !written.contains(p) && !created.contains(p))
        .collect();

    FilesTouched {
        read: read_only,
        written: written.into_iter().collect(),
        created: created.into_iter().collect(),
        total_unique,
    }
}

fn commands_run(session: &Session) -> Vec<CommandRun> {
    let mut commands: Vec<CommandRun> = Vec::new();
    // tool_use_id -> index into `commands`, in invocation order
    let mut pending: Vec<(Option<&ToolUseId>, usize)> = Vec::new();

    for msg in session.messages() {
        if msg.role() == Role::Assistant {
            for call in msg.tool_uses() {
                if *call.name() != ToolName::Bash {
                    continue;
                }
                let command = call.input_str("command");
                if command.is_empty() {
                    continue;
                }
                pending.push((call.id(), commands.len()));
                commands.push(CommandRun {
                    command: command.to_string(),
                    timestamp: msg.timestamp(),
                    exit_code: None,
                    is_error: None,
                    interrupted: false,
                    return_code_interpretation: None,
                });
            }
        }

        let Some(result) = msg.tool_result() else {
            continue;
        };
        let ResultKind::Bash(bash) = &result.kind else {
            continue;
        };

        // Pair by id; results without an id take the oldest pending command.
        let slot = match &result.tool_use_id {
            Some(id) => pending.iter().position(|(pid, _)| *pid == Some(id)),
            None if !pending.is_empty() => Some(0),
            None => None,
        };
        if let Some(pos) = slot {
            let (_, idx) = pending.remove(pos);
            let entry = &mut commands[idx];
            entry.exit_code = bash.exit_code;
            entry.is_error = Some(result.is_error || bash.failed());
            entry.interrupted = bash.interrupted;
            entry.return_code_interpretation = bash.return_code_interpretation.clone();
        }
    }

    commands
}

fn count_turns(session: &Session) -> usize {
    let mut turns = 0;
    let mut prev_role = None;
    for msg in session.messages() {
        let role = msg.role();
        if role == Role::Assistant && prev_role == Some(Role::User) {
            turns += 1;
        }
        if role != Role::System {
            prev_role = Some(role);
        }
    }
    turns
}

fn estimate_cost(session: &Session, pricing: &PricingConfig) -> Option<f64> {
    let mut total = 0.0;
    let mut has_data = false;

    for msg in session.messages() {
        let Some(model) = msg.model() else {
            continue;
        };
        let usage = msg.usage();
        if usage.is_empty() {
            continue;
        }
        has_data = true;
        total += pricing.get(model.id()).cost(usage);
    }

    has_data.then(|| (total * 10_000.0).round() / 10_000.0)
}

fn summarize_results(session: &Session) -> ToolResultSummary {
    let mut summary = ToolResultSummary::default();
    for result in session.messages().iter().filter_map(|m| m.tool_result()) {
        match &result.kind {
            ResultKind::Bash(bash) => {
                if bash.interrupted {
                    summary.bash_interrupted += 1;
                } else if result.is_error || bash.failed() {
                    summary.bash_error += 1;
                } else {
                    summary.bash_success += 1;
                }
            }
            ResultKind::FileRead(_) => summary.file_reads += 1,
            ResultKind::FileEdit(_) => summary.file_edits += 1,
            ResultKind::FileWrite(_) => summary.file_writes += 1,
            ResultKind::Glob(_) => summary.glob_searches += 1,
            ResultKind::Grep(_) => summary.grep_searches += 1,
            ResultKind::WebFetch(_) => summary.web_fetches += 1,
            ResultKind::WebSearch(_) => summary.web_searches += 1,
            ResultKind::Task(_) => summary.tasks += 1,
            ResultKind::TodoWrite(_)
            | ResultKind::UserInput(_)
            | ResultKind::Plan(_)
            | ResultKind::Unknown(_) => {}
        }
    }
    summary
}

/// Render seconds as `45s`, `3m 20s` or `2h 15m`.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m {}s", minutes, seconds % 60);
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

// ===== PricingConfig =====

/// Pricing configuration for cost estimation.
///
/// Contains pricing for known model families (opus, sonnet, haiku) and a default fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    models: HashMap<String, ModelPricing>,
    default_pricing: ModelPricing,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let mut models = HashMap::new();

        // Claude Opus - $15/$75 per million tokens
        models.insert(
            "opus".to_string(),
            ModelPricing::new(15.0, 75.0).with_cache(1.5),
        );
        // Claude Sonnet - $3/$15 per million tokens
        models.insert(
            "sonnet".to_string(),
            ModelPricing::new(3.0, 15.0).with_cache(0.3),
        );
        // Claude Haiku - $0.80/$4 per million tokens
        models.insert(
            "haiku".to_string(),
            ModelPricing::new(0.8, 4.0).with_cache(0.08),
        );

        Self {
            models,
            default_pricing: ModelPricing::new(15.0, 75.0), // Opus as fallback
        }
    }
}

impl PricingConfig {
    /// Get pricing for a model ID.
    ///
    /// Tries:
    /// 1. Exact match on model_id
    /// 2. Model family match (contains "opus", "sonnet", or "haiku")
    /// 3. Default pricing as fallback
    pub fn get(&self, model_id: &str) -> &ModelPricing {
        if let Some(pricing) = self.models.get(model_id) {
            return pricing;
        }

        let normalized = model_id.to_lowercase();
        for family in ["opus", "sonnet", "haiku"] {
            if normalized.contains(family) {
                if let Some(pricing) = self.models.get(family) {
                    return pricing;
                }
            }
        }

        &self.default_pricing
    }
}

// ===== ModelPricing =====

/// Pricing for a specific model (per million tokens, in USD).
///
/// - `input_cost_per_million` applies to `input_tokens`
/// - `output_cost_per_million` applies to `output_tokens`
/// - `cached_input_cost_per_million` applies to cache creation and cache read tokens
///   (falls back to `input_cost_per_million` if None)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// USD per million input tokens.
    pub input_cost_per_million: f64,
    /// USD per million output tokens.
    pub output_cost_per_million: f64,
    /// USD per million cache tokens.
    pub cached_input_cost_per_million: Option<f64>,
}

impl ModelPricing {
    /// Create new model pricing with input and output costs.
    pub const fn new(input: f64, output: f64) -> Self {
        Self {
            input_cost_per_million: input,
            output_cost_per_million: output,
            cached_input_cost_per_million: None,
        }
    }

    /// Add cached input pricing.
    pub const fn with_cache(mut self, cached: f64) -> Self {
        self.cached_input_cost_per_million = Some(cached);
        self
    }

    /// Cost in USD of one message's usage.
    pub fn cost(&self, usage: &crate::model::TokenUsage) -> f64 {
        let per_million = |tokens: u64, rate: f64| tokens as f64 / 1_000_000.0 * rate;
        let cache_rate = self
            .cached_input_cost_per_million
            .unwrap_or(self.input_cost_per_million);

        per_million(usage.input_tokens, self.input_cost_per_million)
            + per_million(usage.output_tokens, self.output_cost_per_million)
            + per_million(
                usage.cache_creation_input_tokens + usage.cache_read_input_tokens,
                cache_rate,
            )
    }
}

// ===== Config Conversions =====

/// Convert PricingEntry from config file to ModelPricing.
impl From<crate::config::PricingEntry> for ModelPricing {
    fn from(entry: crate::config::PricingEntry) -> Self {
        let mut pricing = ModelPricing::new(entry.input, entry.output);
        pricing.cached_input_cost_per_million = entry.cached_input;
        pricing
    }
}

/// Convert PricingConfigSection from config file to PricingConfig.
///
/// Families missing from the section keep their built-in pricing.
impl From<crate::config::PricingConfigSection> for PricingConfig {
    fn from(section: crate::config::PricingConfigSection) -> Self {
        let mut config = PricingConfig::default();
        for (key, entry) in section.models {
            config.models.insert(key, entry.into());
        }
        if let Some(default) = section.default {
            config.default_pricing = default.into();
        }
        config
    }
}

// ===== Tests =====

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
