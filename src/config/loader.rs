//! Configuration file loading with precedence handling.

use crate::model::PricingConfig;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG: &str = "CCEXPORT_CONFIG";
/// Environment override for the projects root.
pub const ENV_PROJECTS_DIR: &str = "CCEXPORT_PROJECTS_DIR";
/// Environment override for the export destination.
pub const ENV_EXPORT_DIR: &str = "CCEXPORT_EXPORT_DIR";
/// Environment override for the watermark file.
pub const ENV_STATE_FILE: &str = "CCEXPORT_STATE_FILE";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read config file (file may not exist or have permission issues).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },
}

/// Which document formats an export writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown with YAML frontmatter.
    #[default]
    Md,
    /// Structured JSON document.
    Json,
    /// Both, side by side.
    Both,
}

impl OutputFormat {
    /// File extensions written for this format.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            OutputFormat::Md => &["md"],
            OutputFormat::Json => &["json"],
            OutputFormat::Both => &["md", "json"],
        }
    }
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/ccexport/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Root holding one directory per project.
    #[serde(default)]
    pub projects_dir: Option<PathBuf>,

    /// Destination for exported documents or archives.
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    /// Watermark file.
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    /// Exclusion rules file.
    #[serde(default)]
    pub exclusion_rules: Option<PathBuf>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,

    /// Document format.
    #[serde(default)]
    pub format: Option<OutputFormat>,

    /// Bundle the export into a zip archive.
    #[serde(default)]
    pub zip: Option<bool>,

    /// Worker threads for parallel session processing.
    #[serde(default)]
    pub workers: Option<usize>,

    /// Pricing section for cost estimation.
    #[serde(default)]
    pub pricing: Option<PricingConfigSection>,
}

/// Pricing configuration section from TOML.
///
/// Structure matches the TOML format:
/// ```toml
/// [pricing.models.opus]
/// input = 15.0
/// output = 75.0
/// cached_input = 1.5
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PricingConfigSection {
    /// Per-model pricing entries (e.g., "opus", "sonnet", "haiku").
    #[serde(default)]
    pub models: std::collections::HashMap<String, PricingEntry>,

    /// Default pricing for unknown models.
    #[serde(default)]
    pub default: Option<PricingEntry>,
}

/// Pricing entry for a specific model.
///
/// All costs are per million tokens in USD.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PricingEntry {
    /// Cost per million input tokens.
    pub input: f64,

    /// Cost per million output tokens.
    pub output: f64,

    /// Cost per million cached input tokens (optional).
    #[serde(default)]
    pub cached_input: Option<f64>,
}

/// Resolved configuration after applying precedence rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Root holding one directory per project.
    pub projects_dir: PathBuf,
    /// Destination for exported documents or archives.
    pub export_dir: PathBuf,
    /// Watermark file.
    pub state_file: PathBuf,
    /// Exclusion rules file; only used when it exists.
    pub exclusion_rules: PathBuf,
    /// Path to log file for tracing output.
    pub log_file_path: PathBuf,
    /// Document format.
    pub format: OutputFormat,
    /// Bundle into a zip archive.
    pub zip: bool,
    /// Worker threads.
    pub workers: usize,
    /// Model pricing for cost estimates.
    pub pricing: PricingConfig,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let browser_dir = home.join(".claude-code-chat-browser");
        Self {
            projects_dir: home.join(".claude").join("projects"),
            export_dir: PathBuf::from("."),
            state_file: browser_dir.join("export_state.json"),
            exclusion_rules: browser_dir.join("exclusion-rules.txt"),
            log_file_path: default_log_path(),
            format: OutputFormat::default(),
            zip: true,
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            pricing: PricingConfig::default(),
        }
    }
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/ccexport/ccexport.log` on Unix-like systems,
/// or appropriate platform path on other systems.
///
/// If state directory cannot be determined, falls back to current directory.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        state_dir.join("ccexport").join("ccexport.log")
    } else {
        PathBuf::from("ccexport.log")
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/ccexport/config.toml` on Unix, appropriate path on other platforms.
/// Returns `None` if the config directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ccexport").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `CCEXPORT_CONFIG` environment variable
/// 3. Default path `~/.config/ccexport/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG) {
        return load_config_file(PathBuf::from(env_path));
    }

    if let Some(default_path) = default_config_path() {
        return load_config_file(default_path);
    }

    Ok(None)
}

/// Apply environment variable overrides to resolved config.
///
/// Checks `CCEXPORT_PROJECTS_DIR`, `CCEXPORT_EXPORT_DIR` and `CCEXPORT_STATE_FILE`.
/// Empty values are ignored.
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty()).map(PathBuf::from);

    if let Some(dir) = var(ENV_PROJECTS_DIR) {
        config.projects_dir = dir;
    }
    if let Some(dir) = var(ENV_EXPORT_DIR) {
        config.export_dir = dir;
    }
    if let Some(file) = var(ENV_STATE_FILE) {
        config.state_file = file;
    }

    config
}

/// Merge config file into defaults to create resolved config.
///
/// For each field in `ConfigFile`, if `Some(value)`, use it; otherwise use default.
/// A `workers` value of 0 is treated as unset.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    ResolvedConfig {
        projects_dir: config.projects_dir.unwrap_or(defaults.projects_dir),
        export_dir: config.export_dir.unwrap_or(defaults.export_dir),
        state_file: config.state_file.unwrap_or(defaults.state_file),
        exclusion_rules: config.exclusion_rules.unwrap_or(defaults.exclusion_rules),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
        format: config.format.unwrap_or(defaults.format),
        zip: config.zip.unwrap_or(defaults.zip),
        workers: config.workers.filter(|w| *w > 0).unwrap_or(defaults.workers),
        pricing: config.pricing.map(PricingConfig::from).unwrap_or(defaults.pricing),
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--projects-dir`
    pub projects_dir: Option<PathBuf>,
    /// `--out`
    pub export_dir: Option<PathBuf>,
    /// `--state-file`
    pub state_file: Option<PathBuf>,
    /// `--exclude-rules`
    pub exclusion_rules: Option<PathBuf>,
    /// `--format`
    pub format: Option<OutputFormat>,
    /// `--no-zip` sets `Some(false)`
    pub zip: Option<bool>,
    /// `--workers`
    pub workers: Option<usize>,
}

/// Apply CLI argument overrides to resolved config.
///
/// CLI args have the highest precedence and override all other sources.
/// Only flags that were explicitly set are applied.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(mut config: ResolvedConfig, cli: CliOverrides) -> ResolvedConfig {
    if let Some(dir) = cli.projects_dir {
        config.projects_dir = dir;
    }
    if let Some(dir) = cli.export_dir {
        config.export_dir = dir;
    }
    if let Some(file) = cli.state_file {
        config.state_file = file;
    }
    if let Some(rules) = cli.exclusion_rules {
        config.exclusion_rules = rules;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(zip) = cli.zip {
        config.zip = zip;
    }
    if let Some(workers) = cli.workers.filter(|w| *w > 0) {
        config.workers = workers;
    }
    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
