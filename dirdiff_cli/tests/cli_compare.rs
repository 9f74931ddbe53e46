use filetime::{set_file_mtime, FileTime};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const MTIME: i64 = 1_700_000_000;

struct TestFixture {
    _temp: TempDir,
    left: PathBuf,
    right: PathBuf,
}

impl TestFixture {
    fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let left = temp.path().join("left");
        let right = temp.path().join("right");
        fs::create_dir_all(&left).expect("left dir");
        fs::create_dir_all(&right).expect("right dir");
        Self {
            _temp: temp,
            left,
            right,
        }
    }

    fn write(root: &Path, relative: &str, content: &[u8], mtime: i64) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir");
        }
        fs::write(&path, content).expect("write file");
        set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).expect("set mtime");
    }

    fn write_left(&self, relative: &str, content: &[u8]) {
        Self::write(&self.left, relative, content, MTIME);
    }

    fn write_right(&self, relative: &str, content: &[u8]) {
        Self::write(&self.right, relative, content, MTIME);
    }

    fn write_both(&self, relative: &str, left: &[u8], right: &[u8]) {
        self.write_left(relative, left);
        Self::write(&self.right, relative, right, MTIME + 60);
    }

    fn left_str(&self) -> &str {
        self.left.to_str().expect("utf-8 path")
    }

    fn right_str(&self) -> &str {
        self.right.to_str().expect("utf-8 path")
    }
}

fn run_cli(args: &[&str]) -> Output {
    let config_dir = TempDir::new().expect("config dir");
    run_cli_with_config(args, config_dir.path())
}

fn run_cli_with_config(args: &[&str], config_dir: &Path) -> Output {
    let exe = env!("CARGO_BIN_EXE_dirdiff_cli");
    let cache_dir = TempDir::new().expect("cache dir");
    Command::new(exe)
        .args(args)
        .env("XDG_CONFIG_HOME", config_dir)
        .env("XDG_CACHE_HOME", cache_dir.path())
        .env("APPDATA", config_dir)
        .env("LOCALAPPDATA", cache_dir.path())
        .env("HOME", config_dir)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run dirdiff_cli")
}

fn run_cli_success(args: &[&str]) -> String {
    let output = run_cli(args);
    assert!(
        output.status.success(),
        "command failed: {}\n{}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout not utf-8")
}

fn run_cli_json(args: &[&str]) -> (i32, Value) {
    parse_json_output(run_cli(args))
}

fn parse_json_output(output: Output) -> (i32, Value) {
    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8(output.stdout).expect("stdout not utf-8");
    let value = serde_json::from_str(&stdout).expect("invalid json output");
    (code, value)
}

fn item<'a>(response: &'a Value, path: &str) -> &'a Value {
    response["data"]["items"]
        .as_array()
        .expect("items array missing")
        .iter()
        .find(|item| item["relative_path"] == path)
        .unwrap_or_else(|| panic!("no item for {}", path))
}

#[test]
fn test_compare_json_statuses() {
    let fixture = TestFixture::new();
    fixture.write_left("same.txt", b"hello\n");
    fixture.write_right("same.txt", b"hello\n");
    fixture.write_both("changed.txt", b"one\n", b"two\n");
    fixture.write_both("logo.png", b"\x89PNG", b"\x89PNG!");
    fixture.write_left("only_left.txt", b"left");
    fixture.write_right("nested/only_right.txt", b"right");

    let (code, response) = run_cli_json(&[
        "compare",
        fixture.left_str(),
        fixture.right_str(),
        "--json",
    ]);

    assert_eq!(code, 0);
    assert_eq!(response["ok"], true);
    assert!(response.get("error").is_none());

    let data = &response["data"];
    assert_eq!(data["left_file_count"], 4);
    assert_eq!(data["right_file_count"], 4);
    assert_eq!(data["summary"]["same"], 1);
    assert_eq!(data["summary"]["different"], 2);
    assert_eq!(data["summary"]["left_only"], 1);
    assert_eq!(data["summary"]["right_only"], 1);

    let paths: Vec<&str> = data["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["relative_path"].as_str().unwrap())
        .collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);

    assert_eq!(item(&response, "same.txt")["status"], "same");
    assert!(item(&response, "same.txt").get("diff_kind_hint").is_none());
    assert_eq!(item(&response, "changed.txt")["status"], "different");
    assert_eq!(item(&response, "changed.txt")["diff_kind_hint"], "text");
    assert_eq!(item(&response, "logo.png")["diff_kind_hint"], "binary");
    assert_eq!(item(&response, "only_left.txt")["status"], "left_only");
    assert!(item(&response, "only_left.txt").get("right").is_none());
    assert_eq!(item(&response, "nested/only_right.txt")["status"], "right_only");
    assert!(item(&response, "nested/only_right.txt")["right"]["size"].is_u64());
}

#[test]
fn test_compare_json_excludes() {
    let fixture = TestFixture::new();
    fixture.write_left("keep.txt", b"a");
    fixture.write_right("keep.txt", b"a");
    fixture.write_left("node_modules/pkg/index.js", b"x");
    fixture.write_left("dist/app.js", b"x");
    fixture.write_right("src/dist/app.js", b"x");

    let (code, response) = run_cli_json(&[
        "compare",
        fixture.left_str(),
        fixture.right_str(),
        "--exclude",
        "dist",
        "--json",
    ]);

    assert_eq!(code, 0);
    let data = &response["data"];
    assert_eq!(data["items"].as_array().unwrap().len(), 1);
    assert_eq!(data["items"][0]["relative_path"], "keep.txt");

    let applied: Vec<&str> = data["applied_exclude_names"]
        .as_array()
        .unwrap()
        .iter()
        .map(|name| name.as_str().unwrap())
        .collect();
    assert_eq!(applied, vec![".git", "node_modules", "dist"]);
}

#[test]
fn test_compare_missing_root_reports_failure() {
    let fixture = TestFixture::new();
    let missing = fixture.left.join("does-not-exist");

    let (code, response) = run_cli_json(&[
        "compare",
        missing.to_str().unwrap(),
        fixture.right_str(),
        "--json",
    ]);

    assert_eq!(code, 1);
    assert_eq!(response["ok"], false);
    assert!(response.get("data").is_none());
    let error = &response["error"];
    assert_eq!(error["code"], "NOT_FOUND");
    assert_eq!(error["source"], "compare");
    assert_eq!(error["step"], "validate_input");
    assert_eq!(error["retryable"], false);
}

#[test]
fn test_compare_text_output() {
    let fixture = TestFixture::new();
    fixture.write_left("same.txt", b"hello\n");
    fixture.write_right("same.txt", b"hello\n");
    fixture.write_left("gone.txt", b"bye\n");

    let stdout = run_cli_success(&[
        "compare",
        fixture.left_str(),
        fixture.right_str(),
        "--no-color",
    ]);

    assert!(stdout.contains("  ==   same.txt"));
    assert!(stdout.contains("  <<   gone.txt"));
    assert!(stdout.contains("Total entries:   2"));

    let diff_only = run_cli_success(&[
        "compare",
        fixture.left_str(),
        fixture.right_str(),
        "--diff-only",
        "--no-color",
    ]);
    assert!(!diff_only.contains("same.txt"));
    assert!(diff_only.contains("gone.txt"));
}

#[test]
fn test_diff_text_json() {
    let fixture = TestFixture::new();
    fixture.write_both("notes.txt", b"alpha\nbeta\ngamma\n", b"alpha\nBETA\ngamma\ndelta\n");

    let (code, response) = run_cli_json(&[
        "diff",
        fixture.left_str(),
        fixture.right_str(),
        "notes.txt",
        "--json",
    ]);

    assert_eq!(code, 0);
    let data = &response["data"];
    assert_eq!(data["kind"], "text");
    assert_eq!(data["added"], 2);
    assert_eq!(data["removed"], 1);
    assert_eq!(data["max_bytes"], 1024 * 1024);

    let kinds: Vec<&str> = data["lines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["context", "removed", "added", "context", "added"]);
    assert_eq!(data["lines"][1]["text"], "beta");
    assert_eq!(data["lines"][1]["left_line_number"], 2);
}

#[test]
fn test_diff_text_output_collapses_context() {
    let fixture = TestFixture::new();
    let left: String = (1..=30).map(|i| format!("line {}\n", i)).collect();
    let right = left.replace("line 30\n", "line thirty\n");
    fixture.write_both("long.txt", left.as_bytes(), right.as_bytes());

    let stdout = run_cli_success(&[
        "diff",
        fixture.left_str(),
        fixture.right_str(),
        "long.txt",
        "--no-color",
    ]);
    assert!(stdout.contains("... 21 context lines hidden ..."));
    assert!(stdout.contains("21 unchanged lines hidden"));
    assert!(stdout.contains("+1 added, -1 removed"));

    let expanded = run_cli_success(&[
        "diff",
        fixture.left_str(),
        fixture.right_str(),
        "long.txt",
        "--show-all-context",
        "--no-color",
    ]);
    assert!(!expanded.contains("context lines hidden"));
    assert!(expanded.contains("line 15"));
}

#[test]
fn test_diff_binary_and_too_large() {
    let fixture = TestFixture::new();
    fixture.write_both("archive.zip", b"PK1", b"PK2");
    fixture.write_both("blob.dat", b"a\0b", b"a\0c");
    let big = vec![b'a'; 1024 * 1024 + 1];
    fixture.write_both("big.txt", &big, b"small\n");

    for path in ["archive.zip", "blob.dat"] {
        let (code, response) = run_cli_json(&[
            "diff",
            fixture.left_str(),
            fixture.right_str(),
            path,
            "--json",
        ]);
        assert_eq!(code, 0);
        assert_eq!(response["data"]["kind"], "binary", "{}", path);
        assert!(response["data"]["lines"].as_array().unwrap().is_empty());
    }

    let (code, response) = run_cli_json(&[
        "diff",
        fixture.left_str(),
        fixture.right_str(),
        "big.txt",
        "--json",
    ]);
    assert_eq!(code, 0);
    assert_eq!(response["data"]["kind"], "too_large");

    let stdout = run_cli_success(&[
        "diff",
        fixture.left_str(),
        fixture.right_str(),
        "big.txt",
    ]);
    assert!(stdout.contains("File exceeds 1048576 bytes"));
}

#[test]
fn test_diff_missing_file_reports_failure() {
    let fixture = TestFixture::new();
    fixture.write_left("left_only.txt", b"x\n");

    let (code, response) = run_cli_json(&[
        "diff",
        fixture.left_str(),
        fixture.right_str(),
        "left_only.txt",
        "--json",
    ]);

    assert_eq!(code, 1);
    assert_eq!(response["ok"], false);
    assert_eq!(response["error"]["code"], "NOT_FOUND");
    assert_eq!(response["error"]["source"], "file_diff");
    assert_eq!(response["error"]["step"], "read_file");
}

#[test]
fn test_policy_json() {
    let (code, policy) = run_cli_json(&["policy", "--json"]);

    assert_eq!(code, 0);
    assert_eq!(policy["max_text_diff_bytes"], 1024 * 1024);
    let extensions = policy["binary_extensions"].as_array().unwrap();
    assert_eq!(extensions.len(), 17);
    assert!(extensions.iter().any(|ext| ext == ".png"));
    assert_eq!(policy["default_exclude_names"], serde_json::json!([".git", "node_modules"]));
}

#[test]
fn test_config_reports_defaults() {
    let stdout = run_cli_success(&["config"]);
    assert!(stdout.contains("dirdiff.toml"));
    assert!(stdout.contains("not found, using defaults"));
    assert!(stdout.contains("diff_algorithm = \"myers\""));
}

#[cfg(target_os = "linux")]
#[test]
fn test_broken_config_falls_back_to_defaults() {
    let fixture = TestFixture::new();
    fixture.write_left("a.txt", b"a\n");
    fixture.write_right("a.txt", b"a\n");

    let config_dir = TempDir::new().expect("config dir");
    let config_path = config_dir.path().join("dirdiff").join("dirdiff.toml");
    fs::create_dir_all(config_path.parent().unwrap()).unwrap();
    fs::write(&config_path, "exclude_names = 5").unwrap();

    let output = run_cli_with_config(
        &["compare", fixture.left_str(), fixture.right_str(), "--json"],
        config_dir.path(),
    );
    let (code, response) = parse_json_output(output);

    assert_eq!(code, 0);
    assert_eq!(response["ok"], true);
    assert_eq!(response["data"]["summary"]["same"], 1);
}
