//! Integration tests: the `ccexport` binary end to end.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("projects").join("-home-me-shop");
        fs::create_dir_all(&project).unwrap();
        let lines = [
            serde_json::json!({
                "type": "user", "uuid": "u1", "sessionId": "c0ffee00-1111", "timestamp": "2026-05-01T08:00:00Z",
                "cwd": "/home/me/shop", "message": {"role": "user", "content": "add a checkout button"}
            }),
            serde_json::json!({
                "type": "assistant", "uuid": "a1", "sessionId": "c0ffee00-1111", "timestamp": "2026-05-01T08:00:30Z",
                "message": {
                    "role": "assistant", "model": "claude-sonnet-4-5",
                    "content": [{"type": "text", "text": "Added the checkout button."}],
                    "usage": {"input_tokens": 1000, "output_tokens": 234}
                }
            }),
        ];
        let content: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        fs::write(project.join("c0ffee00-1111.jsonl"), content.join("\n")).unwrap();

        let config = format!(
            "projects_dir = {:?}\nexport_dir = {:?}\nstate_file = {:?}\nlog_file_path = {:?}\n",
            dir.path().join("projects"),
            dir.path().join("out"),
            dir.path().join("state.json"),
            dir.path().join("ccexport.log"),
        );
        fs::write(dir.path().join("config.toml"), config).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_ccexport"))
            .arg("--config")
            .arg(self.path("config.toml"))
            .args(args)
            .env_remove("CCEXPORT_PROJECTS_DIR")
            .env_remove("CCEXPORT_EXPORT_DIR")
            .env_remove("CCEXPORT_STATE_FILE")
            .output()
            .expect("Failed to execute binary")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn count_files(dir: &Path, ext: &str) -> usize {
    let mut count = 0;
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            count += count_files(&path, ext);
        } else if path.extension().is_some_and(|e| e == ext) {
            count += 1;
        }
    }
    count
}

#[test]
fn binary_prints_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_ccexport"))
        .arg("--version")
        .output()
        .expect("Failed to execute binary");
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn bare_invocation_exports_to_directory() {
    let env = Env::new();
    let output = env.run(&["--no-zip"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).starts_with("Exported 1 session(s)"));
    assert_eq!(count_files(&env.path("out"), "md"), 1);
    assert!(env.path("state.json").is_file());
    assert!(env.path("ccexport.log").is_file());
}

#[test]
fn export_subcommand_writes_zip_by_default() {
    let env = Env::new();
    let output = env.run(&["export", "--format", "both"]);
    assert!(output.status.success());
    assert_eq!(count_files(&env.path("out"), "zip"), 1);
}

#[test]
fn second_incremental_run_has_nothing_to_export() {
    let env = Env::new();
    assert!(env.run(&["--no-zip", "--since", "last"]).status.success());
    let output = env.run(&["--no-zip", "--since", "last"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("Nothing to export"));
}

#[test]
fn render_prints_markdown_by_id_prefix() {
    let env = Env::new();
    let output = env.run(&["render", "c0ffee"]);
    assert!(output.status.success());
    let doc = stdout(&output);
    assert!(doc.contains("# add a checkout button"));
    assert!(doc.contains("Added the checkout button."));
}

#[test]
fn stats_json_reports_token_totals() {
    let env = Env::new();
    let output = env.run(&["stats", "--session", "c0ffee00", "--format", "json"]);
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(stats["conversation_turns"], 1);
}

#[test]
fn search_finds_message_text() {
    let env = Env::new();
    let output = env.run(&["search", "CHECKOUT"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("2 match(es)"));
}

#[test]
fn unknown_session_fails_with_message() {
    let env = Env::new();
    let output = env.run(&["render", "does-not-exist"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}
