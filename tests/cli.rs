//! Integration tests driving the suitewalk binary.

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn suitewalk_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_suitewalk"));
    for var in [
        "SUITEWALK_REPORTER",
        "SUITEWALK_OUTPUT_FILE",
        "SUITEWALK_CI",
        "SUITEWALK_LOG",
        "GITHUB_ACTIONS",
        "GITLAB_CI",
        "TF_BUILD",
        "JENKINS_URL",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn run(path: &Path, args: &[&str]) -> Output {
    suitewalk_cmd()
        .arg("run")
        .arg(path)
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const PASSING: &str = r#"
setup:
  context:
    GREETING: hello
greets:
  run: { cmd: echo, args: ["${GREETING}"] }
  expect: { stdout: "hello\n" }
nested:
  exits:
    run: { cmd: "false" }
    expect: { exit: 1 }
"#;

const FAILING: &str = r#"
ok:
  run: { cmd: "true" }
broken:
  run: { cmd: "false" }
"#;

#[test]
fn passing_suite_exits_zero() {
    let temp_dir = TempDir::new().unwrap();
    let spec = temp_dir.path().join("pass.yaml");
    fs::write(&spec, PASSING).unwrap();

    let output = run(&spec, &[]);
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        stdout(&output),
        stderr(&output)
    );
    let out = stdout(&output);
    assert!(out.contains("✓ greets"), "{out}");
    assert!(out.contains("  nested\n"), "{out}");
    assert!(out.contains("2 passed, 0 failed, 0 skipped"), "{out}");
}

#[test]
fn failing_suite_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let spec = temp_dir.path().join("fail.yaml");
    fs::write(&spec, FAILING).unwrap();

    let output = run(&spec, &[]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("1 passed, 1 failed, 0 skipped"), "{out}");
    assert!(out.contains("broken: Exit code: expected 0, got 1"), "{out}");
}

#[test]
fn junit_report_written_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let spec = temp_dir.path().join("fail.yaml");
    let report = temp_dir.path().join("out").join("junit.xml");
    fs::write(&spec, FAILING).unwrap();

    let output = run(
        &spec,
        &["--reporter", "junit", "--output-file", report.to_str().unwrap()],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());

    let xml = fs::read_to_string(&report).unwrap();
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<testcase name=\"broken\""), "{xml}");
    assert!(xml.contains("<failure message="), "{xml}");
}

#[test]
fn reporter_from_environment() {
    let temp_dir = TempDir::new().unwrap();
    let spec = temp_dir.path().join("pass.yaml");
    fs::write(&spec, PASSING).unwrap();

    let output = suitewalk_cmd()
        .env("SUITEWALK_REPORTER", "tap")
        .arg("run")
        .arg(&spec)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.starts_with("TAP version 13\n"), "{out}");
    assert!(out.contains("\n1..2\n"), "{out}");
    assert!(out.contains("ok 2 - nested > exits"), "{out}");
}

#[test]
fn project_config_selects_reporter_and_seeds_context() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("suitewalk.yaml"),
        "reporter: json\ncontext:\n  TARGET: world\n",
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("ctx.yaml"),
        r#"
uses_target:
  run: { cmd: sh, args: ["-c", "test \"$TARGET\" = world"] }
"#,
    )
    .unwrap();

    let output = run(temp_dir.path(), &[]);
    assert!(output.status.success(), "{}", stderr(&output));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["passed"], 1);
    assert_eq!(json["results"][0]["name"], "uses_target");
}

#[test]
fn expired_skip_fails_the_suite() {
    let temp_dir = TempDir::new().unwrap();
    let spec = temp_dir.path().join("skip.yaml");
    fs::write(
        &spec,
        r#"
legacy:
  skip: { reason: "waiting on fix", until: "2020-01-01" }
  never_runs:
    run: { cmd: "false" }
fresh:
  skip: { reason: "flaky upstream", until: "2999-01-01" }
  also_never_runs:
    run: { cmd: "false" }
"#,
    )
    .unwrap();

    let output = run(&spec, &[]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(
        out.contains("Skip expired on 2020-01-01T00:00:00.000Z: waiting on fix"),
        "{out}"
    );
    assert!(out.contains("- also_never_runs (flaky upstream)"), "{out}");
    assert!(out.contains("0 passed, 1 failed, 1 skipped"), "{out}");
}

#[test]
fn github_annotations_on_stderr() {
    let temp_dir = TempDir::new().unwrap();
    let spec = temp_dir.path().join("fail.yaml");
    fs::write(&spec, FAILING).unwrap();

    let output = run(&spec, &["--ci", "github"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(
        err.contains("::error title=broken::Exit code: expected 0, got 1"),
        "{err}"
    );
}

#[test]
fn several_files_get_their_own_reports() {
    let temp_dir = TempDir::new().unwrap();
    let suites = temp_dir.path().join("suites");
    fs::create_dir(&suites).unwrap();
    fs::write(suites.join("a.yaml"), PASSING).unwrap();
    fs::write(suites.join("b.toml"), "[only.run]\ncmd = \"true\"\n").unwrap();
    let report = temp_dir.path().join("report.json");

    let output = run(
        &suites,
        &["--reporter", "json", "--output-file", report.to_str().unwrap()],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(temp_dir.path().join("report.a.json").exists());
    assert!(temp_dir.path().join("report.b.json").exists());
    assert!(!report.exists());
}

#[test]
fn pattern_filters_files() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("good.yaml"), PASSING).unwrap();
    fs::write(temp_dir.path().join("bad.yaml"), FAILING).unwrap();

    let output = run(temp_dir.path(), &["--pattern", "^good"]);
    assert!(output.status.success(), "{}", stdout(&output));
}

#[test]
fn load_errors_fail_the_run() {
    let temp_dir = TempDir::new().unwrap();
    let spec = temp_dir.path().join("broken.yaml");
    fs::write(&spec, "teardown: [not, a, command]\n").unwrap();

    let output = run(&spec, &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to load"), "{}", stderr(&output));
}

#[test]
fn validate_reports_test_counts() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("pass.yaml"), PASSING).unwrap();

    let output = suitewalk_cmd()
        .arg("validate")
        .arg(temp_dir.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("(2 tests)"), "{}", stdout(&output));
}

#[test]
fn validate_rejects_bad_skip_dates() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("skip.yaml"),
        "skip: { reason: soon, until: next-week }\nt: { run: { cmd: \"true\" } }\n",
    )
    .unwrap();

    let output = suitewalk_cmd()
        .arg("validate")
        .arg(temp_dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("invalid skip date"), "{}", stderr(&output));
}

#[test]
fn schema_is_json() {
    let output = suitewalk_cmd().arg("schema").output().unwrap();
    assert!(output.status.success());
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["title"], "SuiteSpec");
}
