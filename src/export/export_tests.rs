//! Tests for the export driver.

use super::*;
use crate::model::error::WatermarkError;
use std::fs;
use std::io::Read;
use std::time::{Duration, SystemTime};

const PROJECT: &str = "-home-me-alpha";

fn user_line(session: &str, ts: &str, text: &str) -> String {
    serde_json::json!({
        "type": "user", "uuid": format!("{session}-u"), "sessionId": session, "timestamp": ts,
        "cwd": "/home/me/alpha", "message": {"role": "user", "content": text}
    })
    .to_string()
}

fn assistant_line(session: &str, ts: &str, text: &str) -> String {
    serde_json::json!({
        "type": "assistant", "uuid": format!("{session}-a"), "sessionId": session, "timestamp": ts,
        "message": {
            "role": "assistant", "model": "claude-sonnet-4-5",
            "content": [{"type": "text", "text": text}],
            "usage": {"input_tokens": 100, "output_tokens": 20}
        }
    })
    .to_string()
}

struct Fixture {
    _root: tempfile::TempDir,
    projects: PathBuf,
    out: PathBuf,
    state: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let projects = root.path().join("projects");
        fs::create_dir_all(projects.join(PROJECT)).unwrap();
        Self {
            projects,
            out: root.path().join("out"),
            state: root.path().join("state").join("export_state.json"),
            _root: root,
        }
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.projects.join(PROJECT).join(format!("{id}.jsonl"))
    }

    /// Write a session file and pin its modification time.
    fn write_raw(&self, id: &str, content: &str, mtime_secs: u64) {
        let path = self.session_path(id);
        fs::write(&path, content).unwrap();
        self.touch(id, mtime_secs);
    }

    fn write_session(&self, id: &str, text: &str, mtime_secs: u64) {
        let content = [
            user_line(id, "2026-02-10T01:46:15Z", text),
            assistant_line(id, "2026-02-10T01:46:20Z", "Done."),
        ]
        .join("\n");
        self.write_raw(id, &content, mtime_secs);
    }

    fn touch(&self, id: &str, mtime_secs: u64) {
        let file = fs::File::options()
            .write(true)
            .open(self.session_path(id))
            .unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(mtime_secs))
            .unwrap();
    }

    fn options(&self, zip: bool) -> ExportOptions {
        ExportOptions {
            projects_dir: self.projects.clone(),
            export_dir: self.out.clone(),
            state_file: self.state.clone(),
            format: OutputFormat::Md,
            zip,
            workers: 2,
            pricing: PricingConfig::default(),
            exclusions: ExclusionRules::default(),
        }
    }

    fn candidates(&self) -> Vec<Candidate> {
        collect_candidates(&self.projects, None).unwrap()
    }
}

fn not_cancelled() -> AtomicBool {
    AtomicBool::new(false)
}

fn ids(report: &ExportReport) -> Vec<String> {
    report.exported.iter().map(|f| f.id.to_string()).collect()
}

#[test]
fn directory_export_writes_documents_manifest_and_summary() {
    let fx = Fixture::new();
    fx.write_session("bbbbbbbb-2", "second task", 1_000);
    fx.write_session("aaaaaaaa-1", "fix bug X", 1_000);

    let report = export_sessions(fx.candidates(), None, &fx.options(false), &not_cancelled()).unwrap();

    assert_eq!(ids(&report), vec!["aaaaaaaa-1", "bbbbbbbb-2"]);
    assert_eq!(report.summary.files_written, 2);
    assert_eq!(report.summary.destination.as_deref(), Some(fx.out.as_path()));

    let doc = fx
        .out
        .join("2026-02-10")
        .join("home-me-alpha")
        .join("2026-02-10T01-46-15__fix-bug-x__aaaaaaaa.md");
    assert!(fs::read_to_string(doc).unwrap().contains("# fix bug X"));

    let manifest = fs::read_to_string(fx.out.join(naming::MANIFEST_FILE)).unwrap();
    let lines: Vec<serde_json::Value> = manifest
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["session_id"], "aaaaaaaa-1");
    assert_eq!(lines[0]["tokens"], 120);
    assert_eq!(lines[0]["project"], PROJECT);

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(fx.out.join(naming::SUMMARY_FILE)).unwrap()).unwrap();
    assert_eq!(summary["exported"], 2);
}

#[test]
fn zip_export_bundles_everything_into_one_archive() {
    let fx = Fixture::new();
    fx.write_session("aaaaaaaa-1", "fix bug X", 1_000);
    let mut options = fx.options(true);
    options.format = OutputFormat::Both;

    let report = export_sessions(fx.candidates(), None, &options, &not_cancelled()).unwrap();

    let archive = report.summary.destination.clone().unwrap();
    assert!(archive
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("claude-code-export-"));
    let mut zip = zip::ZipArchive::new(fs::File::open(&archive).unwrap()).unwrap();
    let names: Vec<String> = zip.file_names().map(str::to_string).collect();
    assert!(names.contains(&naming::MANIFEST_FILE.to_string()));
    assert!(names.contains(&naming::SUMMARY_FILE.to_string()));
    assert_eq!(names.iter().filter(|n| n.ends_with(".md")).count(), 1);
    assert_eq!(names.iter().filter(|n| n.ends_with(".json") && n.contains("__")).count(), 1);

    let mut manifest = String::new();
    zip.by_name(naming::MANIFEST_FILE)
        .unwrap()
        .read_to_string(&mut manifest)
        .unwrap();
    assert_eq!(manifest.lines().count(), 1);
}

#[test]
fn watermark_selects_only_the_changed_session() {
    let fx = Fixture::new();
    for id in ["s-one", "s-two", "s-three"] {
        fx.write_session(id, &format!("task {id}"), 1_000);
    }
    let watermark = ExportWatermark::default().advanced(
        DateTime::from_timestamp(2_000, 0).unwrap(),
        &fx.out,
        fx.candidates()
            .into_iter()
            .map(|c| (c.file.id.to_string(), c.file.modified)),
    );
    fx.touch("s-two", 3_000);

    let report =
        export_sessions(fx.candidates(), Some(&watermark), &fx.options(false), &not_cancelled()).unwrap();

    assert_eq!(ids(&report), vec!["s-two"]);
    assert_eq!(report.summary.unchanged, 2);
    assert_eq!(report.summary.total_sessions, 3);
}

#[test]
fn failed_session_is_reported_and_others_still_export() {
    let fx = Fixture::new();
    fx.write_session("good", "fix bug X", 1_000);
    fx.write_raw("broken", "{\"type\": \"user\", \"trunc", 1_000);

    let report = export_sessions(fx.candidates(), None, &fx.options(false), &not_cancelled()).unwrap();

    assert_eq!(ids(&report), vec!["good"]);
    assert_eq!(report.summary.failed.len(), 1);
    assert_eq!(report.summary.failed[0].session_id, "broken");
    assert!(report.summary.failed[0].error.contains("first record"));
}

#[test]
fn all_sessions_failing_is_an_error() {
    let fx = Fixture::new();
    fx.write_raw("broken", "not json at all", 1_000);

    let result = export_sessions(fx.candidates(), None, &fx.options(false), &not_cancelled());

    assert!(matches!(result, Err(ExportError::NothingExported { failed: 1 })));
    assert!(!fx.out.exists());
}

#[test]
fn sessions_without_user_text_are_skipped() {
    let fx = Fixture::new();
    fx.write_session("talk", "hello", 1_000);
    fx.write_raw("quiet", &assistant_line("quiet", "2026-02-10T01:46:20Z", "nobody asked"), 1_000);

    let report = export_sessions(fx.candidates(), None, &fx.options(false), &not_cancelled()).unwrap();

    assert_eq!(ids(&report), vec!["talk"]);
    assert_eq!(
        report.summary.skipped,
        vec![SkippedSession {
            session_id: "quiet".to_string(),
            project: PROJECT.to_string(),
            reason: SkipReason::Empty,
        }]
    );
}

#[test]
fn excluded_sessions_are_skipped() {
    let fx = Fixture::new();
    fx.write_session("public", "refactor parser", 1_000);
    fx.write_session("private", "rotate the SECRET keys", 1_000);
    let mut options = fx.options(false);
    options.exclusions = ExclusionRules::parse("secret");

    let report = export_sessions(fx.candidates(), None, &options, &not_cancelled()).unwrap();

    assert_eq!(ids(&report), vec!["public"]);
    assert_eq!(report.summary.skipped[0].reason, SkipReason::Excluded);
}

#[test]
fn nothing_selected_writes_nothing() {
    let fx = Fixture::new();
    fx.write_raw("quiet", &assistant_line("quiet", "2026-02-10T01:46:20Z", "hi"), 1_000);

    let report = export_sessions(fx.candidates(), None, &fx.options(false), &not_cancelled()).unwrap();

    assert!(report.exported.is_empty());
    assert_eq!(report.summary.destination, None);
    assert!(!fx.out.exists());
}

#[test]
fn cancelled_run_writes_nothing() {
    let fx = Fixture::new();
    fx.write_session("aaaaaaaa-1", "fix bug X", 1_000);

    let result = export_sessions(fx.candidates(), None, &fx.options(false), &AtomicBool::new(true));

    assert!(matches!(result, Err(ExportError::Cancelled)));
    assert!(!fx.out.exists());
}

#[test]
fn run_advances_watermark_and_second_incremental_run_is_empty() {
    let fx = Fixture::new();
    fx.write_session("aaaaaaaa-1", "fix bug X", 1_000);
    let options = fx.options(false);
    let policy = SelectionPolicy {
        project: None,
        since: Since::Last,
    };

    let first = run(&options, &policy, &not_cancelled()).unwrap();
    assert_eq!(first.exported, 1);

    let watermark = ExportWatermark::load(&fx.state).unwrap().unwrap();
    assert_eq!(watermark.sessions.get("aaaaaaaa-1"), Some(&1_000.0));
    assert_eq!(watermark.exported_count, 1);

    let second = run(&options, &policy, &not_cancelled()).unwrap();
    assert_eq!(second.exported, 0);
    assert_eq!(second.unchanged, 1);
}

#[test]
fn corrupt_watermark_falls_back_to_full_export() {
    let fx = Fixture::new();
    fx.write_session("aaaaaaaa-1", "fix bug X", 1_000);
    fs::create_dir_all(fx.state.parent().unwrap()).unwrap();
    fs::write(&fx.state, "{{{ not json").unwrap();

    let policy = SelectionPolicy {
        project: None,
        since: Since::Last,
    };
    let summary = run(&fx.options(false), &policy, &not_cancelled()).unwrap();

    assert_eq!(summary.exported, 1);
    assert!(ExportWatermark::load(&fx.state).unwrap().is_some());
}

#[test]
fn non_utf8_watermark_falls_back_to_full_export() {
    let fx = Fixture::new();
    fx.write_session("aaaaaaaa-1", "fix bug X", 1_000);
    fs::create_dir_all(fx.state.parent().unwrap()).unwrap();
    fs::write(&fx.state, b"{\"sessions\": \xff\xfe garbage").unwrap();

    let policy = SelectionPolicy {
        project: None,
        since: Since::Last,
    };
    let summary = run(&fx.options(false), &policy, &not_cancelled()).unwrap();

    assert_eq!(summary.exported, 1);
    let repaired = ExportWatermark::load(&fx.state).unwrap().unwrap();
    assert!(repaired.sessions.contains_key("aaaaaaaa-1"));
}

#[test]
fn unreadable_watermark_path_counts_as_no_watermark() {
    let fx = Fixture::new();
    fs::create_dir_all(&fx.state).unwrap();

    assert!(matches!(
        ExportWatermark::load(&fx.state),
        Err(WatermarkError::Io { .. })
    ));
    assert_eq!(load_watermark(&fx.state), None);
}

#[test]
fn failed_run_leaves_watermark_untouched() {
    let fx = Fixture::new();
    fx.write_raw("broken", "not json", 1_000);
    fs::create_dir_all(fx.state.parent().unwrap()).unwrap();
    fs::write(&fx.state, r#"{"old": 5.0}"#).unwrap();

    let result = run(&fx.options(false), &SelectionPolicy::default(), &not_cancelled());

    assert!(matches!(
        result,
        Err(AppError::Export(ExportError::NothingExported { .. }))
    ));
    assert_eq!(fs::read_to_string(&fx.state).unwrap(), r#"{"old": 5.0}"#);
}

#[test]
fn project_filter_is_a_substring_of_the_directory_name() {
    let fx = Fixture::new();
    fx.write_session("aaaaaaaa-1", "fix bug X", 1_000);

    assert_eq!(collect_candidates(&fx.projects, Some("alpha")).unwrap().len(), 1);
    assert!(collect_candidates(&fx.projects, Some("beta")).unwrap().is_empty());
}

#[test]
fn exporting_twice_is_byte_identical() {
    let fx = Fixture::new();
    fx.write_session("aaaaaaaa-1", "fix bug X", 1_000);
    let mut options = fx.options(false);
    options.format = OutputFormat::Both;

    let first = export_single(&fx.candidates()[0].file, &options).unwrap();
    let first_bytes: Vec<Vec<u8>> = first.iter().map(|p| fs::read(p).unwrap()).collect();
    let second = export_single(&fx.candidates()[0].file, &options).unwrap();
    let second_bytes: Vec<Vec<u8>> = second.iter().map(|p| fs::read(p).unwrap()).collect();

    assert_eq!(first, second);
    assert_eq!(first_bytes, second_bytes);
}

#[test]
fn single_export_writes_flat_files() {
    let fx = Fixture::new();
    fx.write_session("aaaaaaaa-1", "fix bug X", 1_000);
    let mut options = fx.options(false);
    options.format = OutputFormat::Both;

    let written = export_single(&fx.candidates()[0].file, &options).unwrap();

    assert_eq!(
        written,
        vec![
            fx.out.join("2026-02-10T01-46-15__fix-bug-x__aaaaaaaa.md"),
            fx.out.join("2026-02-10T01-46-15__fix-bug-x__aaaaaaaa.json"),
        ]
    );
    assert!(!fx.state.exists());
}
