//! ccexport - export Claude Code conversation logs as Markdown or JSON.

use ccexport::config::{self, CliOverrides, OutputFormat, ResolvedConfig};
use ccexport::export::{self, ExclusionRules, ExportOptions, SelectionPolicy, Since};
use ccexport::model::error::AppError;
use ccexport::model::SessionStats;
use ccexport::report::{self, AggregateStats};
use ccexport::{aggregate, logging, render, search, source};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Export Claude Code chat history to Markdown or JSON
#[derive(Parser, Debug)]
#[command(name = "ccexport")]
#[command(version)]
#[command(about = "Export Claude Code JSONL session logs as Markdown or JSON")]
pub struct Args {
    /// Subcommand to run; export when omitted
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Export options when no subcommand is given
    #[command(flatten)]
    pub export: ExportArgs,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Claude Code projects directory
    #[arg(long, global = true)]
    pub projects_dir: Option<PathBuf>,
}

/// Subcommands; a bare invocation exports.
#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Export sessions (the default)
    Export(ExportArgs),
    /// List projects, or the sessions of one project
    List {
        /// Only projects whose directory name contains this
        #[arg(long)]
        project: Option<String>,
    },
    /// Token, tool and cost totals
    Stats {
        /// One session by id or unique id prefix
        #[arg(long)]
        session: Option<String>,
        /// Only projects whose directory name contains this
        #[arg(long)]
        project: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = StatsFormat::Text)]
        format: StatsFormat,
    },
    /// Print one session document
    Render {
        /// Session id or unique id prefix
        session: String,
        /// Print JSON instead of Markdown
        #[arg(long)]
        json: bool,
    },
    /// Search message text across all sessions
    Search {
        /// Case-insensitive text to look for
        query: String,
        /// Maximum number of matches to print
        #[arg(long, default_value_t = search::DEFAULT_LIMIT)]
        limit: usize,
    },
}

/// Flags of the export command.
#[derive(ClapArgs, Debug, Default, PartialEq)]
pub struct ExportArgs {
    /// Only projects whose directory name contains this
    #[arg(long)]
    pub project: Option<String>,

    /// `last` exports only sessions changed since the previous export
    #[arg(long, value_enum, default_value_t = Since::All)]
    pub since: Since,

    /// Output directory
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Write individual files instead of a zip archive
    #[arg(long)]
    pub no_zip: bool,

    /// Document format (markdown or json)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Export one session (by id or unique prefix) as flat files
    #[arg(long)]
    pub session: Option<String>,

    /// Exclusion rules file
    #[arg(long)]
    pub exclude_rules: Option<PathBuf>,

    /// Export watermark file
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Worker threads
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Output of the stats command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatsFormat {
    /// Aligned plain text
    Text,
    /// Pretty-printed JSON
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let command = args.command.unwrap_or(Command::Export(args.export));
    let export_args = match &command {
        Command::Export(export_args) => Some(export_args),
        _ => None,
    };

    // Defaults → Config File → Env Vars → CLI Args
    let config = {
        let config_file = config::load_config_with_precedence(args.config.clone())?;
        let merged = config::merge_config(config_file);
        let with_env = config::apply_env_overrides(merged);
        config::apply_cli_overrides(with_env, cli_overrides(args.projects_dir, export_args))
    };

    logging::init(&config.log_file_path, true)?;
    info!(config = ?config, "Configuration loaded and resolved");

    let mut out = std::io::stdout().lock();
    match command {
        Command::Export(export_args) => run_export(&config, &export_args, &mut out),
        Command::List { project } => run_list(&config, project.as_deref(), &mut out),
        Command::Stats {
            session,
            project,
            format,
        } => run_stats(&config, session.as_deref(), project.as_deref(), format, &mut out),
        Command::Render { session, json } => run_render(&config, &session, json, &mut out),
        Command::Search { query, limit } => {
            let matches = search::search(&config.projects_dir, &query, limit)?;
            for m in &matches {
                let when = m.timestamp.map(render::display_time).unwrap_or_default();
                writeln!(
                    out,
                    "[{}] {} ({}) {}\n    {}\n",
                    m.role.as_str(),
                    m.title,
                    m.session_id,
                    when,
                    m.snippet.replace('\n', " ")
                )?;
            }
            writeln!(out, "{} match(es)", matches.len())?;
            Ok(())
        }
    }
}

fn cli_overrides(projects_dir: Option<PathBuf>, export: Option<&ExportArgs>) -> CliOverrides {
    let Some(export) = export else {
        return CliOverrides {
            projects_dir,
            ..CliOverrides::default()
        };
    };
    CliOverrides {
        projects_dir,
        export_dir: export.out.clone(),
        state_file: export.state_file.clone(),
        exclusion_rules: export.exclude_rules.clone(),
        format: export.format,
        zip: export.no_zip.then_some(false),
        workers: export.workers,
    }
}

fn run_export(config: &ResolvedConfig, args: &ExportArgs, out: &mut impl Write) -> Result<(), AppError> {
    if args.exclude_rules.is_some() && !config.exclusion_rules.is_file() {
        warn!(path = %config.exclusion_rules.display(), "Exclusion rules file not found");
    }
    let exclusions = ExclusionRules::load(&config.exclusion_rules);
    let options = ExportOptions::from_config(config, exclusions);

    if let Some(query) = &args.session {
        let file = source::find_session(&config.projects_dir, query)?;
        for path in export::export_single(&file, &options)? {
            writeln!(out, "Exported: {}", path.display())?;
        }
        return Ok(());
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Finishing sessions in progress...");
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Cannot install Ctrl-C handler");
    }

    let policy = SelectionPolicy {
        project: args.project.clone(),
        since: args.since,
    };
    let summary = export::run(&options, &policy, &cancel)?;

    for failed in &summary.failed {
        eprintln!("  Warning: failed to export {}: {}", failed.session_id, failed.error);
    }
    match &summary.destination {
        Some(destination) => writeln!(
            out,
            "Exported {} session(s), {} file(s) to {} ({} skipped, {} unchanged, {} failed, {} total)",
            summary.exported,
            summary.files_written,
            destination.display(),
            summary.skipped.len(),
            summary.unchanged,
            summary.failed.len(),
            summary.total_sessions
        )?,
        None => writeln!(
            out,
            "Nothing to export ({} skipped, {} unchanged, {} total)",
            summary.skipped.len(),
            summary.unchanged,
            summary.total_sessions
        )?,
    }
    Ok(())
}

fn run_list(config: &ResolvedConfig, project: Option<&str>, out: &mut impl Write) -> Result<(), AppError> {
    let mut projects = source::list_projects(&config.projects_dir)?;
    if let Some(filter) = project {
        projects.retain(|p| p.name.contains(filter));
    }

    if projects.is_empty() {
        writeln!(out, "No projects found.")?;
        return Ok(());
    }

    if project.is_some() && projects.len() == 1 {
        let project = &projects[0];
        let sessions = source::list_sessions(&project.path, &project.name)?;
        let total = sessions.len();
        let rows = report::session_rows(sessions);
        write!(out, "{}", report::session_table(&project.display_name, total, &rows))?;
        return Ok(());
    }

    write!(out, "{}", report::project_table(&projects))?;
    Ok(())
}

fn run_stats(
    config: &ResolvedConfig,
    session: Option<&str>,
    project: Option<&str>,
    format: StatsFormat,
    out: &mut impl Write,
) -> Result<(), AppError> {
    if let Some(query) = session {
        let file = source::find_session(&config.projects_dir, query)?;
        let session = aggregate::parse_session(&file.path)?;
        let stats = SessionStats::compute(&session, &config.pricing);
        match format {
            StatsFormat::Json => writeln!(out, "{}", to_json(&stats)?)?,
            StatsFormat::Text => write!(out, "{}", report::session_stats_text(&session, &stats))?,
        }
        return Ok(());
    }

    let totals = AggregateStats::collect(&config.projects_dir, project, &config.pricing)?;
    match format {
        StatsFormat::Json => writeln!(out, "{}", to_json(&totals)?)?,
        StatsFormat::Text => write!(out, "{}", totals.to_text())?,
    }
    Ok(())
}

fn run_render(config: &ResolvedConfig, query: &str, json: bool, out: &mut impl Write) -> Result<(), AppError> {
    let file = source::find_session(&config.projects_dir, query)?;
    let session = aggregate::parse_session(&file.path)?;
    if json {
        let stats = SessionStats::compute(&session, &config.pricing);
        let document = render::render_json(&session, &stats).map_err(std::io::Error::other)?;
        write!(out, "{document}")?;
    } else {
        write!(out, "{}", render::render_markdown(&session))?;
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::Io(std::io::Error::other(e)))
}
